//! Tracing-based observability hooks for gateway, tool, and conversation phases.
//!
//! ```rust
//! use ctlchat::ConversationHooks;
//! use ctlobserve::TracingObservabilityHooks;
//!
//! fn accepts_conversation_hooks(_hooks: &dyn ConversationHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_conversation_hooks(&hooks);
//! ```

use std::time::Duration;

use ctlchat::{ChatError, ConversationHooks, ToolCallStatus, TurnStatus};
use ctlcommon::SessionId;
use ctlprovider::{FailureClass, ProviderError, ProviderId, ProviderOperationHooks};
use ctltooling::{SchemaViolation, ToolError, ToolExecutionContext, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_request_start(&self, provider: ProviderId, operation: &str) {
        tracing::info!(
            phase = "provider",
            event = "request_start",
            provider = %provider,
            operation
        );
    }

    fn on_success(&self, provider: ProviderId, operation: &str, elapsed: Duration) {
        tracing::info!(
            phase = "provider",
            event = "success",
            provider = %provider,
            operation,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        error: &ProviderError,
        elapsed: Duration,
    ) {
        tracing::error!(
            phase = "provider",
            event = "failure",
            provider = %provider,
            operation,
            elapsed_ms = elapsed.as_millis() as u64,
            status = error.status,
            error_kind = ?error.kind,
            failure_class = ?error.failure_class(),
            error = %error
        );
    }
}

impl ToolRuntimeHooks for TracingObservabilityHooks {
    fn on_execution_start(&self, tool_name: &str, context: &ToolExecutionContext) {
        tracing::info!(
            phase = "tool",
            event = "execution_start",
            tool_name,
            session_id = %context.session_id,
            trace_id = context.trace_id.as_ref().map(|id| id.as_str())
        );
    }

    fn on_execution_success(
        &self,
        tool_name: &str,
        context: &ToolExecutionContext,
        elapsed: Duration,
    ) {
        tracing::info!(
            phase = "tool",
            event = "execution_success",
            tool_name,
            session_id = %context.session_id,
            trace_id = context.trace_id.as_ref().map(|id| id.as_str()),
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_execution_failure(
        &self,
        tool_name: &str,
        context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        tracing::error!(
            phase = "tool",
            event = "execution_failure",
            tool_name,
            session_id = %context.session_id,
            trace_id = context.trace_id.as_ref().map(|id| id.as_str()),
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }

    fn on_arguments_rejected(
        &self,
        tool_name: &str,
        context: &ToolExecutionContext,
        violations: &[SchemaViolation],
    ) {
        let first = violations.first().map(ToString::to_string);
        tracing::warn!(
            phase = "tool",
            event = "arguments_rejected",
            tool_name,
            session_id = %context.session_id,
            violations = violations.len(),
            first_violation = first.as_deref()
        );
    }
}

impl ConversationHooks for TracingObservabilityHooks {
    fn on_turn_start(&self, session: &SessionId, prompt_len: usize) {
        tracing::info!(
            phase = "conversation",
            event = "turn_start",
            session_id = %session,
            prompt_len
        );
    }

    fn on_generation_attempt(&self, session: &SessionId, attempt: u32) {
        tracing::debug!(
            phase = "conversation",
            event = "generation_attempt",
            session_id = %session,
            attempt
        );
    }

    fn on_retry_scheduled(
        &self,
        session: &SessionId,
        failures: u32,
        class: FailureClass,
        backoff: Duration,
    ) {
        tracing::warn!(
            phase = "conversation",
            event = "retry_scheduled",
            session_id = %session,
            failures,
            failure_class = ?class,
            backoff_ms = backoff.as_millis() as u64
        );
    }

    fn on_prompt_compacted(&self, session: &SessionId, removed_index: usize) {
        tracing::warn!(
            phase = "conversation",
            event = "prompt_compacted",
            session_id = %session,
            removed_index
        );
    }

    fn on_tool_call_start(&self, session: &SessionId, tool_name: &str, call_id: &str) {
        tracing::info!(
            phase = "conversation",
            event = "tool_call_start",
            session_id = %session,
            tool_name,
            tool_call_id = call_id,
            "calling tool"
        );
    }

    fn on_tool_call_finish(
        &self,
        session: &SessionId,
        tool_name: &str,
        call_id: &str,
        status: &ToolCallStatus,
        elapsed: Duration,
    ) {
        match status {
            ToolCallStatus::Failed { code, message } => tracing::warn!(
                phase = "conversation",
                event = "tool_call_finish",
                session_id = %session,
                tool_name,
                tool_call_id = call_id,
                status = status.as_str(),
                code,
                error = message.as_str(),
                elapsed_ms = elapsed.as_millis() as u64
            ),
            _ => tracing::info!(
                phase = "conversation",
                event = "tool_call_finish",
                session_id = %session,
                tool_name,
                tool_call_id = call_id,
                status = status.as_str(),
                elapsed_ms = elapsed.as_millis() as u64
            ),
        }
    }

    fn on_turn_cancelled(&self, session: &SessionId) {
        tracing::info!(
            phase = "conversation",
            event = "turn_cancelled",
            session_id = %session,
            "Processing cancelled by user"
        );
    }

    fn on_turn_finish(&self, session: &SessionId, status: TurnStatus, elapsed: Duration) {
        tracing::info!(
            phase = "conversation",
            event = "turn_finish",
            session_id = %session,
            status = status.as_str(),
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_turn_failed(&self, session: &SessionId, error: &ChatError, elapsed: Duration) {
        tracing::error!(
            phase = "conversation",
            event = "turn_failed",
            session_id = %session,
            error_kind = ?error.kind,
            status = error.status,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error
        );
    }
}
