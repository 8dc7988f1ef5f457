use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::delivery::DeliveryError;
use crate::query::QueryError;

/// Handler errors
///
/// Everything except [`HandlerError::Internal`] is caused by the request or
/// its environment and is reported back as error text in a [`ToolOutput`].
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("IOError: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    pub fn is_soft(&self) -> bool {
        !matches!(self, HandlerError::Internal(_))
    }
}

/// Envelope returned by every tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub is_error: bool,
    pub text: String,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            is_error: false,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            text: text.into(),
        }
    }

    /// Serialize a response; failing to do so is a defect, not a soft error
    pub fn json<T: Serialize>(response: &T) -> Result<Self, HandlerError> {
        serde_json::to_string(response)
            .map(Self::text)
            .map_err(|e| HandlerError::Internal(format!("failed to marshal response: {}", e)))
    }
}

/// One query tool exposed over the transport
///
/// Implementations parse their own arguments and must stop scanning once
/// `cancel` fires.
#[async_trait]
pub trait LogTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    async fn call(&self, args: Value, cancel: CancellationToken) -> Result<ToolOutput, HandlerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_classification() {
        assert!(HandlerError::Validation("bad".into()).is_soft());
        assert!(HandlerError::Query(QueryError::Cancelled).is_soft());
        assert!(!HandlerError::Internal("bug".into()).is_soft());
    }

    #[test]
    fn test_query_errors_keep_their_text() {
        let err = HandlerError::from(QueryError::Cancelled);
        assert_eq!(err.to_string(), "query cancelled");
    }

    #[test]
    fn test_json_output() {
        let output = ToolOutput::json(&serde_json::json!({"a": 1})).unwrap();
        assert!(!output.is_error);
        assert_eq!(output.text, r#"{"a":1}"#);
    }
}
