use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Time conversion failed for '{input}': {reason}")]
    TimeConversion { input: String, reason: String },

    #[error("Unknown section: {0}")]
    UnknownSection(String),
}

impl From<ReportError> for String {
    fn from(e: ReportError) -> Self {
        e.to_string()
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
