//! Domain error types.

/// Top-level error type for confluence.
#[derive(Debug, thiserror::Error)]
pub enum ConfluenceError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("insufficient data for {context}: have {available}, need {required}")]
    InsufficientData {
        context: String,
        available: usize,
        required: usize,
    },

    #[error("no common timestamps across timeframes {}", timeframes.join(", "))]
    EmptyAlignment { timeframes: Vec<String> },

    #[error("model has not been trained")]
    ModelNotTrained,

    #[error("no data for {symbol} at {timeframe}: {reason}")]
    DataUnavailable {
        symbol: String,
        timeframe: String,
        reason: String,
    },

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

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ConfluenceError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        ConfluenceError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn insufficient(context: impl Into<String>, available: usize, required: usize) -> Self {
        ConfluenceError::InsufficientData {
            context: context.into(),
            available,
            required,
        }
    }
}

impl ConfluenceError {
    /// Process exit status reported by the CLI for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ConfluenceError::Io(_) => 1,
            ConfluenceError::ConfigParse { .. }
            | ConfluenceError::ConfigMissing { .. }
            | ConfluenceError::ConfigInvalid { .. } => 2,
            ConfluenceError::InvalidInput { .. } => 3,
            ConfluenceError::InsufficientData { .. } | ConfluenceError::EmptyAlignment { .. } => 4,
            ConfluenceError::ModelNotTrained => 5,
            ConfluenceError::DataUnavailable { .. } => 6,
        }
    }
}

impl From<&ConfluenceError> for std::process::ExitCode {
    fn from(err: &ConfluenceError) -> Self {
        std::process::ExitCode::from(err.exit_code())
    }
}
