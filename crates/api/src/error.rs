use snafu::Snafu;

/// Every way a backend call can fail.
///
/// The backend contract has no separate validation or business-rule class, so
/// callers treat all variants uniformly.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransportError {
    #[snafu(display("backend base URL '{base_url}' is invalid on `{stage}`: {details}"))]
    InvalidBaseUrl {
        stage: &'static str,
        base_url: String,
        details: String,
    },
    #[snafu(display("backend base URL '{base_url}' cannot carry request paths"))]
    CannotBeBase {
        stage: &'static str,
        base_url: String,
    },
    #[snafu(display("failed to build HTTP client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request to {endpoint} failed on `{stage}`: {source}"))]
    Request {
        stage: &'static str,
        endpoint: String,
        source: reqwest::Error,
    },
    #[snafu(display("{endpoint} returned status {status}: {message}"))]
    Status {
        stage: &'static str,
        endpoint: String,
        status: u16,
        message: String,
    },
    #[snafu(display("failed to decode response from {endpoint} on `{stage}`: {source}"))]
    Decode {
        stage: &'static str,
        endpoint: String,
        source: reqwest::Error,
    },
}

impl TransportError {
    /// HTTP status for failures the backend answered, `None` for transport-level ones.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::InvalidBaseUrl { .. }
            | Self::CannotBeBase { .. }
            | Self::BuildClient { .. }
            | Self::Request { .. }
            | Self::Decode { .. } => None,
        }
    }
}

pub type ApiResult<T> = Result<T, TransportError>;
