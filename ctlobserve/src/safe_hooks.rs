use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use ctlchat::{ChatError, ConversationHooks, ToolCallStatus, TurnStatus};
use ctlcommon::SessionId;
use ctlprovider::{FailureClass, ProviderError, ProviderId, ProviderOperationHooks};
use ctltooling::{SchemaViolation, ToolError, ToolExecutionContext, ToolRuntimeHooks};

pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_request_start(&self, provider: ProviderId, operation: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_request_start(provider, operation)
        }));
    }

    fn on_success(&self, provider: ProviderId, operation: &str, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_success(provider, operation, elapsed)
        }));
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        error: &ProviderError,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failure(provider, operation, error, elapsed)
        }));
    }
}

pub struct SafeToolHooks<H> {
    inner: H,
}

impl<H> SafeToolHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ToolRuntimeHooks for SafeToolHooks<H>
where
    H: ToolRuntimeHooks,
{
    fn on_execution_start(&self, tool_name: &str, context: &ToolExecutionContext) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_execution_start(tool_name, context)
        }));
    }

    fn on_execution_success(
        &self,
        tool_name: &str,
        context: &ToolExecutionContext,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_execution_success(tool_name, context, elapsed)
        }));
    }

    fn on_execution_failure(
        &self,
        tool_name: &str,
        context: &ToolExecutionContext,
        error: &ToolError,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_execution_failure(tool_name, context, error, elapsed)
        }));
    }

    fn on_arguments_rejected(
        &self,
        tool_name: &str,
        context: &ToolExecutionContext,
        violations: &[SchemaViolation],
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_arguments_rejected(tool_name, context, violations)
        }));
    }
}

pub struct SafeConversationHooks<H> {
    inner: H,
}

impl<H> SafeConversationHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ConversationHooks for SafeConversationHooks<H>
where
    H: ConversationHooks,
{
    fn on_turn_start(&self, session: &SessionId, prompt_len: usize) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_start(session, prompt_len)
        }));
    }

    fn on_generation_attempt(&self, session: &SessionId, attempt: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_generation_attempt(session, attempt)
        }));
    }

    fn on_retry_scheduled(
        &self,
        session: &SessionId,
        failures: u32,
        class: FailureClass,
        backoff: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_retry_scheduled(session, failures, class, backoff)
        }));
    }

    fn on_prompt_compacted(&self, session: &SessionId, removed_index: usize) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_prompt_compacted(session, removed_index)
        }));
    }

    fn on_tool_call_start(&self, session: &SessionId, tool_name: &str, call_id: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_tool_call_start(session, tool_name, call_id)
        }));
    }

    fn on_tool_call_finish(
        &self,
        session: &SessionId,
        tool_name: &str,
        call_id: &str,
        status: &ToolCallStatus,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_tool_call_finish(session, tool_name, call_id, status, elapsed)
        }));
    }

    fn on_turn_cancelled(&self, session: &SessionId) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_turn_cancelled(session)));
    }

    fn on_turn_finish(&self, session: &SessionId, status: TurnStatus, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_finish(session, status, elapsed)
        }));
    }

    fn on_turn_failed(&self, session: &SessionId, error: &ChatError, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_failed(session, error, elapsed)
        }));
    }
}
