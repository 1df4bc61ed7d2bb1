//! Run Context: per-invocation settings handed to the executor
use serde_json::Value;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct RunContext {
    /// Correlation id shared by every run started with this context.
    pub trace_id: String,
    pub label: Option<String>,
    pub metadata: HashMap<String, Value>,
    cancel: Option<CancellationToken>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            label: None,
            metadata: HashMap::new(),
            cancel: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Runs using this context stop at the next step boundary once `token`
    /// is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(CancellationToken::is_cancelled)
            .unwrap_or(false)
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
