#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Conversation {0} not found")]
    NotFound(String),

    #[error("Bot gateway unreachable: {0}")]
    GatewayUnreachable(String),

    #[error("Message is empty")]
    EmptyInput,

    #[error("A reply is still pending")]
    Busy,

    #[error("No data to export")]
    NoDataToExport,

    #[error("Export failed: {0}")]
    Export(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ChatError::BackendError(err.to_string())
        } else if err.is_status() {
            ChatError::BackendError(err.to_string())
        } else {
            ChatError::NetworkFailure(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::BackendError(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ChatError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ChatError::Export(err.to_string())
    }
}

impl ChatError {
    /// Text shown in a toast when this error reaches the view.
    pub fn notice(&self) -> String {
        match self {
            ChatError::NoDataToExport => "No data available to download.".to_string(),
            ChatError::Export(_) => "Failed to download Excel file.".to_string(),
            ChatError::NotFound(_) => "That conversation no longer exists.".to_string(),
            ChatError::EmptyInput => "Type a message first.".to_string(),
            ChatError::Busy => "Please wait for the current reply.".to_string(),
            ChatError::NetworkFailure(_)
            | ChatError::BackendError(_)
            | ChatError::BackendUnavailable(_) => {
                "Could not reach the conversation service.".to_string()
            }
            ChatError::GatewayUnreachable(_) => "Could not reach the assistant.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ChatError::EmptyInput.to_string(), "Message is empty");
        assert_eq!(
            ChatError::NotFound("abc".into()).to_string(),
            "Conversation abc not found"
        );
        assert_eq!(
            ChatError::GatewayUnreachable("status 502".into()).to_string(),
            "Bot gateway unreachable: status 502"
        );
    }

    #[test]
    fn test_json_error_is_backend_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(ChatError::from(err), ChatError::BackendError(_)));
    }

    #[test]
    fn test_notices() {
        assert_eq!(
            ChatError::NoDataToExport.notice(),
            "No data available to download."
        );
        assert_eq!(
            ChatError::Export("bad".into()).notice(),
            "Failed to download Excel file."
        );
    }
}
