//! Turn lifecycle hooks.
//!
//! ```rust
//! use ctlchat::{ConversationHooks, NoopConversationHooks};
//!
//! fn assert_hooks_trait(_hooks: &dyn ConversationHooks) {}
//!
//! assert_hooks_trait(&NoopConversationHooks);
//! ```

use std::time::Duration;

use ctlcommon::SessionId;
use ctlprovider::FailureClass;

use crate::{ChatError, ToolCallStatus, TurnStatus};

pub trait ConversationHooks: Send + Sync {
    fn on_turn_start(&self, _session: &SessionId, _prompt_len: usize) {}

    fn on_generation_attempt(&self, _session: &SessionId, _attempt: u32) {}

    fn on_retry_scheduled(
        &self,
        _session: &SessionId,
        _failures: u32,
        _class: FailureClass,
        _backoff: Duration,
    ) {
    }

    /// `removed_index` is the prompt position that was dropped.
    fn on_prompt_compacted(&self, _session: &SessionId, _removed_index: usize) {}

    fn on_tool_call_start(&self, _session: &SessionId, _tool_name: &str, _call_id: &str) {}

    fn on_tool_call_finish(
        &self,
        _session: &SessionId,
        _tool_name: &str,
        _call_id: &str,
        _status: &ToolCallStatus,
        _elapsed: Duration,
    ) {
    }

    fn on_turn_cancelled(&self, _session: &SessionId) {}

    fn on_turn_finish(&self, _session: &SessionId, _status: TurnStatus, _elapsed: Duration) {}

    fn on_turn_failed(&self, _session: &SessionId, _error: &ChatError, _elapsed: Duration) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopConversationHooks;

impl ConversationHooks for NoopConversationHooks {}
