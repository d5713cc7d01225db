//! Conversation orchestration over a generation gateway and a tool-calling
//! JSON-RPC client.
//!
//! ```rust
//! use ctlchat::prelude::*;
//!
//! let policy = ChatPolicy::default().with_max_attempts(3);
//! assert_eq!(policy.retry.max_attempts, 3);
//! assert_eq!(TurnPhase::default(), TurnPhase::Idle);
//! ```

mod conversation;
mod error;
mod hooks;
mod outcome;
mod policy;
mod state;

pub mod prelude {
    pub use crate::{
        ChatError, ChatErrorKind, ChatPolicy, Conversation, ConversationBuilder,
        ConversationHooks, ConversationState, SeedMessages, ToolCallRecord, ToolCallStatus,
        TurnOutcome, TurnPhase, TurnStatus,
    };
    pub use ctlcommon::SessionId;
    pub use tokio_util::sync::CancellationToken;
}

pub use conversation::{Conversation, ConversationBuilder};
pub use error::{ChatError, ChatErrorKind};
pub use hooks::{ConversationHooks, NoopConversationHooks};
pub use outcome::{ToolCallRecord, ToolCallStatus, TurnOutcome, TurnStatus};
pub use policy::{ChatPolicy, DEFAULT_TEMPERATURE};
pub use state::{ConversationState, DEFAULT_INSTRUCTIONS, SeedMessages, TurnPhase};
pub use tokio_util::sync::CancellationToken;
