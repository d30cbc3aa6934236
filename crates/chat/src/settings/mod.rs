pub mod state;

pub use state::{ClientSettings, LayoutMode, SettingsError, SettingsStore};
