//! Domain error types.

/// Top-level error type for tradedesk.
#[derive(Debug, thiserror::Error)]
pub enum TradeDeskError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("missing credential: environment variable {var} is not set")]
    CredentialMissing { var: String },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("csv error in {file}: {reason}")]
    Csv { file: String, reason: String },

    #[error("http error: {reason}")]
    Http { reason: String },

    #[error("{service} returned HTTP {status}: {body}")]
    Api {
        service: String,
        status: u16,
        body: String,
    },

    #[error("{service} session expired or rejected")]
    SessionExpired { service: String },

    #[error("login to {service} failed: {reason}")]
    Login { service: String, reason: String },

    #[error("session store error: {reason}")]
    Session { reason: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradeDeskError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for TradeDeskError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http {
            reason: err.to_string(),
        }
    }
}

impl From<&TradeDeskError> for std::process::ExitCode {
    fn from(err: &TradeDeskError) -> Self {
        let code: u8 = match err {
            TradeDeskError::Io(_) => 1,
            TradeDeskError::ConfigParse { .. }
            | TradeDeskError::ConfigMissing { .. }
            | TradeDeskError::ConfigInvalid { .. }
            | TradeDeskError::CredentialMissing { .. } => 2,
            TradeDeskError::InvalidArgument { .. } | TradeDeskError::Csv { .. } => 3,
            TradeDeskError::Http { .. }
            | TradeDeskError::Api { .. }
            | TradeDeskError::NotFound { .. } => 4,
            TradeDeskError::SessionExpired { .. }
            | TradeDeskError::Login { .. }
            | TradeDeskError::Session { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
