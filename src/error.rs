/// Failures of a round trip to the chat service.
///
/// Both variants display as their bare message; the transcript adds the
/// `"Error: "` prefix.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChatError {
    /// The service answered with a non-success status.
    #[error("{0}")]
    Service(String),
    /// The request never completed or the reply could not be decoded.
    #[error("{0}")]
    Transport(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_bare_message() {
        assert_eq!(ChatError::Service("db down".to_string()).to_string(), "db down");
        assert_eq!(
            ChatError::Transport("connection refused".to_string()).to_string(),
            "connection refused"
        );
    }

    #[test]
    fn test_empty_message() {
        assert_eq!(ChatError::Service(String::new()).to_string(), "");
    }
}
