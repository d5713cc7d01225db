use std::sync::{Arc, Mutex};
use std::time::Duration;

use ctlchat::{ChatError, ConversationHooks, ToolCallStatus, TurnStatus};
use ctlcommon::SessionId;
use ctlprovider::{FailureClass, ProviderError, ProviderId, ProviderOperationHooks};
use ctltooling::{SchemaViolation, ToolError, ToolExecutionContext, ToolRuntimeHooks};

use crate::{
    MetricsObservabilityHooks, SafeConversationHooks, SafeProviderHooks, SafeToolHooks,
    TracingObservabilityHooks,
};

fn sample_tool_context() -> ToolExecutionContext {
    ToolExecutionContext::new("session-1").with_trace_id("trace-1")
}

fn sample_session() -> SessionId {
    SessionId::from("session-1")
}

fn exercise_provider_hooks(hooks: &dyn ProviderOperationHooks) {
    let error = ProviderError::from_status(429, "slow down");

    hooks.on_request_start(ProviderId::Gateway, "generate");
    hooks.on_success(ProviderId::Gateway, "generate", Duration::from_millis(12));
    hooks.on_failure(
        ProviderId::Gateway,
        "generate",
        &error,
        Duration::from_millis(12),
    );
}

fn exercise_tool_hooks(hooks: &dyn ToolRuntimeHooks) {
    let context = sample_tool_context();
    let error = ToolError::execution("backend unavailable");

    hooks.on_execution_start("list_products", &context);
    hooks.on_execution_success("list_products", &context, Duration::from_millis(20));
    hooks.on_execution_failure("get_orders", &context, &error, Duration::from_millis(20));
    hooks.on_arguments_rejected(
        "add_cart_item",
        &context,
        &[SchemaViolation::new(
            "/quantity",
            "must be greater than or equal to 1",
        )],
    );
}

fn exercise_conversation_hooks(hooks: &dyn ConversationHooks) {
    let session = sample_session();
    let failed = ToolCallStatus::Failed {
        code: -32000,
        message: "tool execution failed: get_orders".to_string(),
    };

    hooks.on_turn_start(&session, 3);
    hooks.on_generation_attempt(&session, 1);
    hooks.on_retry_scheduled(
        &session,
        1,
        FailureClass::Throttled,
        Duration::from_secs(1),
    );
    hooks.on_prompt_compacted(&session, 2);
    hooks.on_tool_call_start(&session, "list_products", "call_1");
    hooks.on_tool_call_finish(
        &session,
        "list_products",
        "call_1",
        &ToolCallStatus::Succeeded,
        Duration::from_millis(5),
    );
    hooks.on_tool_call_finish(
        &session,
        "get_orders",
        "call_2",
        &failed,
        Duration::from_millis(5),
    );
    hooks.on_turn_cancelled(&session);
    hooks.on_turn_finish(&session, TurnStatus::Completed, Duration::from_millis(40));
    hooks.on_turn_failed(
        &session,
        &ChatError::busy("a turn is already processing"),
        Duration::from_millis(1),
    );
}

#[test]
fn tracing_hooks_smoke_test_all_callbacks() {
    let hooks = TracingObservabilityHooks;

    exercise_provider_hooks(&hooks);
    exercise_tool_hooks(&hooks);
    exercise_conversation_hooks(&hooks);
}

#[test]
fn metrics_hooks_smoke_test_all_callbacks() {
    let hooks = MetricsObservabilityHooks;

    exercise_provider_hooks(&hooks);
    exercise_tool_hooks(&hooks);
    exercise_conversation_hooks(&hooks);
}

#[derive(Default, Clone)]
struct RecordingHooks {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingHooks {
    fn push(&self, event: &'static str) {
        self.events.lock().expect("events lock").push(event);
    }

    fn len(&self) -> usize {
        self.events.lock().expect("events lock").len()
    }
}

impl ProviderOperationHooks for RecordingHooks {
    fn on_request_start(&self, _provider: ProviderId, _operation: &str) {
        self.push("request_start");
    }

    fn on_success(&self, _provider: ProviderId, _operation: &str, _elapsed: Duration) {
        self.push("success");
    }

    fn on_failure(
        &self,
        _provider: ProviderId,
        _operation: &str,
        _error: &ProviderError,
        _elapsed: Duration,
    ) {
        self.push("failure");
    }
}

impl ToolRuntimeHooks for RecordingHooks {
    fn on_execution_start(&self, _tool_name: &str, _context: &ToolExecutionContext) {
        self.push("start");
    }

    fn on_execution_success(
        &self,
        _tool_name: &str,
        _context: &ToolExecutionContext,
        _elapsed: Duration,
    ) {
        self.push("success");
    }

    fn on_execution_failure(
        &self,
        _tool_name: &str,
        _context: &ToolExecutionContext,
        _error: &ToolError,
        _elapsed: Duration,
    ) {
        self.push("failure");
    }

    fn on_arguments_rejected(
        &self,
        _tool_name: &str,
        _context: &ToolExecutionContext,
        _violations: &[SchemaViolation],
    ) {
        self.push("rejected");
    }
}

impl ConversationHooks for RecordingHooks {
    fn on_turn_start(&self, _session: &SessionId, _prompt_len: usize) {
        self.push("turn_start");
    }

    fn on_retry_scheduled(
        &self,
        _session: &SessionId,
        _failures: u32,
        _class: FailureClass,
        _backoff: Duration,
    ) {
        self.push("retry");
    }

    fn on_turn_cancelled(&self, _session: &SessionId) {
        self.push("cancelled");
    }
}

struct PanicHooks;

impl ProviderOperationHooks for PanicHooks {
    fn on_request_start(&self, _provider: ProviderId, _operation: &str) {
        panic!("request_start panic");
    }

    fn on_success(&self, _provider: ProviderId, _operation: &str, _elapsed: Duration) {
        panic!("success panic");
    }

    fn on_failure(
        &self,
        _provider: ProviderId,
        _operation: &str,
        _error: &ProviderError,
        _elapsed: Duration,
    ) {
        panic!("failure panic");
    }
}

impl ToolRuntimeHooks for PanicHooks {
    fn on_execution_start(&self, _tool_name: &str, _context: &ToolExecutionContext) {
        panic!("start panic");
    }

    fn on_execution_failure(
        &self,
        _tool_name: &str,
        _context: &ToolExecutionContext,
        _error: &ToolError,
        _elapsed: Duration,
    ) {
        panic!("failure panic");
    }
}

impl ConversationHooks for PanicHooks {
    fn on_turn_start(&self, _session: &SessionId, _prompt_len: usize) {
        panic!("turn_start panic");
    }

    fn on_tool_call_finish(
        &self,
        _session: &SessionId,
        _tool_name: &str,
        _call_id: &str,
        _status: &ToolCallStatus,
        _elapsed: Duration,
    ) {
        panic!("tool_call_finish panic");
    }

    fn on_turn_cancelled(&self, _session: &SessionId) {
        panic!("cancelled panic");
    }
}

#[test]
fn safe_provider_hooks_delegate_when_inner_succeeds() {
    let inner = RecordingHooks::default();
    let hooks = SafeProviderHooks::new(inner.clone());

    exercise_provider_hooks(&hooks);

    assert_eq!(inner.len(), 3);
}

#[test]
fn safe_tool_hooks_delegate_when_inner_succeeds() {
    let inner = RecordingHooks::default();
    let hooks = SafeToolHooks::new(inner.clone());

    exercise_tool_hooks(&hooks);

    assert_eq!(inner.len(), 4);
}

#[test]
fn safe_conversation_hooks_delegate_when_inner_succeeds() {
    let inner = RecordingHooks::default();
    let hooks = SafeConversationHooks::new(inner.clone());

    exercise_conversation_hooks(&hooks);

    assert_eq!(
        *inner.events.lock().expect("events lock"),
        vec!["turn_start", "retry", "cancelled"]
    );
}

#[test]
fn safe_hooks_swallow_panics() {
    exercise_provider_hooks(&SafeProviderHooks::new(PanicHooks));
    exercise_tool_hooks(&SafeToolHooks::new(PanicHooks));
    exercise_conversation_hooks(&SafeConversationHooks::new(PanicHooks));
}
