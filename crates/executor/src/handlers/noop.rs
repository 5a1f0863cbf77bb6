//! Statements left to the ordinary execution path

use clusterbind_core::{Result, Value};
use clusterbind_engine::Session;
use tracing::debug;

use crate::executor::Executor;
use crate::output::ExecutorResult;

/// Always falls back
#[derive(Debug, Clone)]
pub struct NoopExecutor {
    reason: String,
}

impl NoopExecutor {
    /// Fallback with the reason the statement is not routed
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    /// Why the statement is not routed
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Executor for NoopExecutor {
    fn execute(&self, _session: &mut Session, _bindings: &[Value]) -> Result<Option<ExecutorResult>> {
        debug!(target: "clusterbind::sql", reason = %self.reason, "Falling back");
        Ok(None)
    }

    fn is_routed(&self) -> bool {
        false
    }
}
