//! Failure taxonomy for the analysis workflow.

/// Errors that can occur while preparing an image or invoking the agent.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unsupported image format '{0}'. Supported formats: jpg, jpeg, png, dicom.")]
    UnsupportedFormat(String),

    #[error("Image error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No API key configured; analysis is unavailable.")]
    MissingCredential,

    #[error("Rate limited by the model provider: {0}")]
    RateLimited(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),
}

impl Error {
    /// Classifies a raw upstream failure message. A "429" substring is the
    /// only rate-limit signal common to every error shape the provider
    /// returns, so that is what we key on.
    pub fn classify(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.contains("429") {
            Error::RateLimited(raw)
        } else {
            Error::AnalysisFailed(raw)
        }
    }

    /// The raw upstream message, when this error came from the analysis call.
    pub fn raw_message(&self) -> Option<&str> {
        match self {
            Error::RateLimited(raw) | Error::AnalysisFailed(raw) => Some(raw),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rate_limit() {
        let err = Error::classify("API request failed with status: 429 Too Many Requests");
        assert!(matches!(err, Error::RateLimited(_)));
        assert!(err.raw_message().unwrap().contains("429"));
    }

    #[test]
    fn test_classify_generic_failure_preserves_message() {
        let err = Error::classify("connection reset by peer");
        match err {
            Error::AnalysisFailed(raw) => assert_eq!(raw, "connection reset by peer"),
            other => panic!("expected AnalysisFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_429_embedded_in_body() {
        // The signal can appear anywhere in the message, not just the status.
        let err = Error::classify("error: { \"code\": 429, \"message\": \"quota exceeded\" }");
        assert!(matches!(err, Error::RateLimited(_)));
    }
}
