//! Error types for Threadcast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ThreadcastError>;

#[derive(Error, Debug)]
pub enum ThreadcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Statistics error: {0}")]
    Statistics(#[from] StatsError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// A thread part failed to publish; parts before it were published and recorded
    #[error("Publishing stopped after {published} of {total} parts: {source}")]
    Publish {
        published: usize,
        total: usize,
        #[source]
        source: PlatformError,
    },

    #[error("Commit failed: {0}")]
    Commit(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ThreadcastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ThreadcastError::InvalidInput(_) => 3,
            ThreadcastError::Content(_) => 3,
            ThreadcastError::Platform(PlatformError::Authentication(_)) => 2,
            ThreadcastError::Publish {
                source: PlatformError::Authentication(_),
                ..
            } => 2,
            ThreadcastError::Publish { .. } => 4,
            ThreadcastError::Platform(_) => 1,
            ThreadcastError::Config(_) => 1,
            ThreadcastError::Statistics(_) => 1,
            ThreadcastError::Commit(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Malformed bundle '{bundle}': {reason}")]
    MalformedBundle { bundle: String, reason: String },

    #[error("No content available for selection")]
    NoContentAvailable,

    #[error("Content not found: {0}")]
    ContentNotFound(String),

    #[error("Failed to scan content directory: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Duplicate published item id: {0}")]
    DuplicateId(u64),

    #[error("Failed to persist statistics: {0}")]
    Persistence(String),

    #[error("Statistics IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Statistics format error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Item not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = ThreadcastError::InvalidInput("Unknown format".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_content_errors() {
        let malformed = ThreadcastError::Content(ContentError::MalformedBundle {
            bundle: "announce".to_string(),
            reason: "two text files for part announce1".to_string(),
        });
        assert_eq!(malformed.exit_code(), 3);

        let empty = ThreadcastError::Content(ContentError::NoContentAvailable);
        assert_eq!(empty.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_authentication_error() {
        let error = ThreadcastError::Platform(PlatformError::Authentication(
            "Invalid token".to_string(),
        ));
        assert_eq!(error.exit_code(), 2);

        let publish = ThreadcastError::Publish {
            published: 0,
            total: 2,
            source: PlatformError::Authentication("Token revoked".to_string()),
        };
        assert_eq!(publish.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_partial_publish() {
        let error = ThreadcastError::Publish {
            published: 1,
            total: 3,
            source: PlatformError::Posting("Status rejected".to_string()),
        };
        assert_eq!(error.exit_code(), 4);
    }

    #[test]
    fn test_exit_code_other_errors() {
        let stats = ThreadcastError::Statistics(StatsError::DuplicateId(42));
        assert_eq!(stats.exit_code(), 1);

        let config = ThreadcastError::Config(ConfigError::MissingField(
            "access token".to_string(),
        ));
        assert_eq!(config.exit_code(), 1);

        let commit = ThreadcastError::Commit("git push rejected".to_string());
        assert_eq!(commit.exit_code(), 1);

        let network = ThreadcastError::Platform(PlatformError::Network("timeout".to_string()));
        assert_eq!(network.exit_code(), 1);
    }

    #[test]
    fn test_error_message_formatting_publish() {
        let error = ThreadcastError::Publish {
            published: 1,
            total: 2,
            source: PlatformError::Posting("Status rejected".to_string()),
        };
        assert_eq!(
            error.to_string(),
            "Publishing stopped after 1 of 2 parts: Posting failed: Status rejected"
        );
    }

    #[test]
    fn test_error_message_formatting_content() {
        let error = ThreadcastError::Content(ContentError::ContentNotFound("weekly".to_string()));
        assert_eq!(error.to_string(), "Content error: Content not found: weekly");

        let malformed = ContentError::MalformedBundle {
            bundle: "announce".to_string(),
            reason: "media announce3.png has no text part".to_string(),
        };
        assert_eq!(
            malformed.to_string(),
            "Malformed bundle 'announce': media announce3.png has no text part"
        );
    }

    #[test]
    fn test_error_message_formatting_duplicate_id() {
        let error: ThreadcastError = StatsError::DuplicateId(1234).into();
        assert_eq!(
            error.to_string(),
            "Statistics error: Duplicate published item id: 1234"
        );
    }

    #[test]
    fn test_error_conversion_from_content_error() {
        let error: ThreadcastError = ContentError::NoContentAvailable.into();
        assert!(matches!(error, ThreadcastError::Content(ContentError::NoContentAvailable)));
    }

    #[test]
    fn test_invalid_value_formatting() {
        let error = ConfigError::InvalidValue {
            field: "rotation.period".to_string(),
            reason: "must be greater than zero".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid value for rotation.period: must be greater than zero"
        );
    }

    #[test]
    fn test_platform_error_clone() {
        let original = PlatformError::NotFound("status 99".to_string());
        let cloned = original.clone();

        assert_eq!(format!("{}", original), format!("{}", cloned));
    }
}
