//! Metrics-based observability hooks for gateway, tool, and conversation phases.
//!
//! ```rust
//! use ctlobserve::MetricsObservabilityHooks;
//! use ctlprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_provider_hooks(&hooks);
//! ```

use std::time::Duration;

use ctlchat::{ChatError, ConversationHooks, ToolCallStatus, TurnStatus};
use ctlcommon::SessionId;
use ctlprovider::{FailureClass, ProviderError, ProviderId, ProviderOperationHooks};
use ctltooling::{SchemaViolation, ToolError, ToolExecutionContext, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_request_start(&self, provider: ProviderId, operation: &str) {
        metrics::counter!(
            "opencontrol_provider_request_start_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_success(&self, provider: ProviderId, operation: &str, elapsed: Duration) {
        metrics::counter!(
            "opencontrol_provider_success_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "opencontrol_provider_duration_seconds",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        error: &ProviderError,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "opencontrol_provider_failure_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind),
            "failure_class" => format!("{:?}", error.failure_class())
        )
        .increment(1);
        metrics::histogram!(
            "opencontrol_provider_duration_seconds",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }
}

impl ToolRuntimeHooks for MetricsObservabilityHooks {
    fn on_execution_start(&self, tool_name: &str, _context: &ToolExecutionContext) {
        metrics::counter!(
            "opencontrol_tool_execution_start_total",
            "tool_name" => tool_name.to_string()
        )
        .increment(1);
    }

    fn on_execution_success(
        &self,
        tool_name: &str,
        _context: &ToolExecutionContext,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "opencontrol_tool_execution_success_total",
            "tool_name" => tool_name.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "opencontrol_tool_execution_duration_seconds",
            "tool_name" => tool_name.to_string(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_execution_failure(
        &self,
        tool_name: &str,
        _context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "opencontrol_tool_execution_failure_total",
            "tool_name" => tool_name.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "opencontrol_tool_execution_duration_seconds",
            "tool_name" => tool_name.to_string(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_arguments_rejected(
        &self,
        tool_name: &str,
        _context: &ToolExecutionContext,
        _violations: &[SchemaViolation],
    ) {
        metrics::counter!(
            "opencontrol_tool_arguments_rejected_total",
            "tool_name" => tool_name.to_string()
        )
        .increment(1);
    }
}

impl ConversationHooks for MetricsObservabilityHooks {
    fn on_turn_start(&self, _session: &SessionId, prompt_len: usize) {
        metrics::counter!("opencontrol_conversation_turn_start_total").increment(1);
        metrics::histogram!("opencontrol_conversation_prompt_messages").record(prompt_len as f64);
    }

    fn on_generation_attempt(&self, _session: &SessionId, _attempt: u32) {
        metrics::counter!("opencontrol_conversation_generation_attempt_total").increment(1);
    }

    fn on_retry_scheduled(
        &self,
        _session: &SessionId,
        _failures: u32,
        class: FailureClass,
        backoff: Duration,
    ) {
        metrics::counter!(
            "opencontrol_conversation_retry_scheduled_total",
            "failure_class" => format!("{class:?}")
        )
        .increment(1);
        metrics::histogram!("opencontrol_conversation_retry_delay_seconds")
            .record(backoff.as_secs_f64());
    }

    fn on_prompt_compacted(&self, _session: &SessionId, _removed_index: usize) {
        metrics::counter!("opencontrol_conversation_prompt_compacted_total").increment(1);
    }

    fn on_tool_call_finish(
        &self,
        _session: &SessionId,
        tool_name: &str,
        _call_id: &str,
        status: &ToolCallStatus,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "opencontrol_conversation_tool_call_total",
            "tool_name" => tool_name.to_string(),
            "status" => status.as_str()
        )
        .increment(1);
        metrics::histogram!(
            "opencontrol_conversation_tool_call_duration_seconds",
            "tool_name" => tool_name.to_string()
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_turn_cancelled(&self, _session: &SessionId) {
        metrics::counter!("opencontrol_conversation_turn_cancelled_total").increment(1);
    }

    fn on_turn_finish(&self, _session: &SessionId, status: TurnStatus, elapsed: Duration) {
        metrics::counter!(
            "opencontrol_conversation_turn_finish_total",
            "status" => status.as_str()
        )
        .increment(1);
        metrics::histogram!(
            "opencontrol_conversation_turn_duration_seconds",
            "status" => status.as_str()
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_turn_failed(&self, _session: &SessionId, error: &ChatError, elapsed: Duration) {
        metrics::counter!(
            "opencontrol_conversation_turn_failed_total",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "opencontrol_conversation_turn_duration_seconds",
            "status" => "failed"
        )
        .record(elapsed.as_secs_f64());
    }
}
