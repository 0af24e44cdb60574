use thiserror::Error;

/// Problems with the user's input table. Reported once, before any row is analyzed.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not decode input with any of the encodings: {}", tried.join(", "))]
    Encoding { tried: Vec<String> },

    #[error("column '{column}' not found; available columns: {}", available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("invalid row range: start_row {start} is greater than end_row {end}")]
    RowRange { start: usize, end: usize },

    #[error("malformed table: {0}")]
    Malformed(String),
}

/// Failure of one call to the remote NLP service.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode service response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Timeouts, transport hiccups, throttling and 5xx are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Timeout(_) | RemoteError::Transport(_) => true,
            RemoteError::Status { status, .. } => *status == 429 || *status >= 500,
            RemoteError::Decode(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_lists_available() {
        let e = InputError::MissingColumn {
            column: "tweet".into(),
            available: vec!["id".into(), "body".into()],
        };
        assert_eq!(e.to_string(), "column 'tweet' not found; available columns: id, body");
    }

    #[test]
    fn transient_classification() {
        assert!(RemoteError::Timeout(5).is_transient());
        assert!(RemoteError::Status { status: 503, message: String::new() }.is_transient());
        assert!(RemoteError::Status { status: 429, message: String::new() }.is_transient());
        assert!(!RemoteError::Status { status: 400, message: String::new() }.is_transient());
        assert!(!RemoteError::Decode("x".into()).is_transient());
    }
}
