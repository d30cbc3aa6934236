#![deny(unsafe_code)]

/// Terminal chat client for a conversation backend.
///
/// The session controller and its projections live in [`chat`]; [`app`] turns
/// terminal input into controller calls and renders the projections as text.
pub mod app;
/// Session controller, projections, and their domain types.
pub mod chat;
/// Settings persistence.
pub mod settings;
