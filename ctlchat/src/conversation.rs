//! The conversation orchestrator.
//!
//! A turn alternates between generation and sequential tool execution until
//! the model stops, the turn is cancelled, or the retry ceiling is reached.
//! Cancellation is cooperative: it is observed before each generation request
//! and right after each response, so an in-flight request finishes but its
//! result is discarded.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ctlchat::{ChatErrorKind, Conversation};
//! use ctlprovider::GenerationGateway;
//! use ctlrpc::{RpcClient, RpcDispatcher};
//! use ctltooling::ToolRegistry;
//!
//! # tokio_block(async {
//! let dispatcher = RpcDispatcher::new(Arc::new(ToolRegistry::empty()));
//! let conversation =
//!     Conversation::new(GenerationGateway::unconfigured(), RpcClient::new(Arc::new(dispatcher)));
//!
//! let error = conversation.send("hello").await.expect_err("no model is configured");
//! assert_eq!(error.kind, ChatErrorKind::Provider);
//! assert!(!conversation.is_processing());
//! assert_eq!(conversation.prompt().len(), 3);
//!
//! conversation.clear().expect("idle conversations can be cleared");
//! assert_eq!(conversation.prompt().len(), 2);
//! # });
//! # fn tokio_block<F: std::future::Future>(future: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread()
//! #         .enable_time()
//! #         .build()
//! #         .expect("runtime")
//! #         .block_on(future)
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{Local, NaiveDate};
use ctlcommon::SessionId;
use ctlprovider::{FailureClass, FinishReason, GenerationGateway, Message, ToolCall, ToolDefinition};
use ctlrpc::{INVALID_PARAMS, RpcClient};
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::{
    ChatError, ChatPolicy, ConversationHooks, ConversationState, NoopConversationHooks,
    SeedMessages, ToolCallRecord, ToolCallStatus, TurnOutcome, TurnPhase, TurnStatus,
};

type Clock = dyn Fn() -> NaiveDate + Send + Sync;

pub struct Conversation {
    gateway: GenerationGateway,
    tools: RpcClient,
    hooks: Arc<dyn ConversationHooks>,
    policy: ChatPolicy,
    seed: SeedMessages,
    session_id: SessionId,
    clock: Arc<Clock>,
    state: Mutex<ConversationState>,
    tool_cache: OnceCell<Vec<ToolDefinition>>,
    turn_active: AtomicBool,
    active_token: Mutex<Option<CancellationToken>>,
}

pub struct ConversationBuilder {
    gateway: GenerationGateway,
    tools: RpcClient,
    hooks: Arc<dyn ConversationHooks>,
    policy: ChatPolicy,
    seed: SeedMessages,
    session_id: SessionId,
    clock: Arc<Clock>,
}

impl ConversationBuilder {
    pub fn hooks(mut self, hooks: Arc<dyn ConversationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn policy(mut self, policy: ChatPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn seed(mut self, seed: SeedMessages) -> Self {
        self.seed = seed;
        self
    }

    pub fn session_id(mut self, session_id: impl Into<SessionId>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Date source for the seed messages.
    pub fn clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn build(self) -> Conversation {
        let prompt = self.seed.render((self.clock)());

        Conversation {
            gateway: self.gateway,
            tools: self.tools,
            hooks: self.hooks,
            policy: self.policy,
            seed: self.seed,
            session_id: self.session_id,
            clock: self.clock,
            state: Mutex::new(ConversationState::seeded(prompt)),
            tool_cache: OnceCell::new(),
            turn_active: AtomicBool::new(false),
            active_token: Mutex::new(None),
        }
    }
}

impl Conversation {
    pub fn new(gateway: GenerationGateway, tools: RpcClient) -> Self {
        Self::builder(gateway, tools).build()
    }

    pub fn builder(gateway: GenerationGateway, tools: RpcClient) -> ConversationBuilder {
        ConversationBuilder {
            gateway,
            tools,
            hooks: Arc::new(NoopConversationHooks),
            policy: ChatPolicy::default(),
            seed: SeedMessages::default(),
            session_id: SessionId::new("default"),
            clock: Arc::new(|| Local::now().date_naive()),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn policy(&self) -> &ChatPolicy {
        &self.policy
    }

    pub fn snapshot(&self) -> ConversationState {
        self.lock_state().clone()
    }

    pub fn prompt(&self) -> Vec<Message> {
        self.lock_state().prompt.clone()
    }

    pub fn is_processing(&self) -> bool {
        self.lock_state().is_processing
    }

    pub fn is_rate_limited(&self) -> bool {
        self.lock_state().rate_limited
    }

    pub fn phase(&self) -> TurnPhase {
        self.lock_state().phase
    }

    /// Tool descriptors from `tools/list`, fetched once per conversation.
    pub async fn tool_definitions(&self) -> Result<Vec<ToolDefinition>, ChatError> {
        self.tool_cache
            .get_or_try_init(|| async { self.tools.list_tools().await.map_err(ChatError::from) })
            .await
            .cloned()
    }

    pub async fn send(&self, message: impl Into<String>) -> Result<TurnOutcome, ChatError> {
        self.send_with_cancel(message, CancellationToken::new()).await
    }

    /// Runs one turn. Cancelling `token` has the same effect as [`Conversation::cancel`].
    pub async fn send_with_cancel(
        &self,
        message: impl Into<String>,
        token: CancellationToken,
    ) -> Result<TurnOutcome, ChatError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ChatError::invalid_request("message must not be empty"));
        }

        let _guard = TurnGuard::acquire(self, &token)?;
        let started = Instant::now();

        let outcome = self.run_turn(message, &token).await;
        match &outcome {
            Ok(outcome) => {
                self.hooks
                    .on_turn_finish(&self.session_id, outcome.status, started.elapsed())
            }
            Err(error) => self
                .hooks
                .on_turn_failed(&self.session_id, error, started.elapsed()),
        }

        outcome
    }

    /// Requests cancellation of the active turn. Returns false when idle.
    pub fn cancel(&self) -> bool {
        let Some(token) = self.lock_token().clone() else {
            return false;
        };

        token.cancel();
        self.update(|state| {
            state.is_processing = false;
            state.phase = TurnPhase::Cancelled;
        });
        true
    }

    /// Resets the prompt to freshly dated seed messages.
    pub fn clear(&self) -> Result<(), ChatError> {
        let mut state = self.lock_state();
        if self.turn_active.load(Ordering::Acquire) {
            return Err(ChatError::busy(
                "conversation cannot be cleared while a turn is processing",
            ));
        }

        *state = ConversationState::seeded(self.seed.render((self.clock)()));
        Ok(())
    }

    async fn run_turn(
        &self,
        message: String,
        token: &CancellationToken,
    ) -> Result<TurnOutcome, ChatError> {
        let tools = self.tool_definitions().await?;
        let prompt_len = self.update(|state| {
            state.prompt.push(Message::user(message));
            state.prompt.len()
        });
        self.hooks.on_turn_start(&self.session_id, prompt_len);

        let mut text = None;
        let mut records = Vec::new();
        let mut failures = 0u32;
        let mut attempt = 0u32;

        loop {
            if token.is_cancelled() {
                return Ok(self.cancelled(text, records));
            }

            self.set_phase(TurnPhase::AwaitingGeneration);
            attempt += 1;
            self.hooks.on_generation_attempt(&self.session_id, attempt);

            let prompt = self.prompt();
            let response = self
                .gateway
                .generate(&prompt, &tools, self.policy.options)
                .await;

            if token.is_cancelled() {
                return Ok(self.cancelled(text, records));
            }

            let result = match response {
                Ok(result) => result,
                Err(error) => {
                    failures += 1;
                    let class = error.failure_class();
                    if !self.policy.retry.should_retry(failures, &error) {
                        return Err(match class {
                            FailureClass::Fatal => ChatError::from(error),
                            _ => ChatError::retries_exhausted(failures, &error),
                        });
                    }

                    match class {
                        FailureClass::Rejected => self.compact_prompt(),
                        FailureClass::Throttled => self.update(|state| state.rate_limited = true),
                        FailureClass::Fatal | FailureClass::Transient => {}
                    }

                    let backoff = self.policy.retry.backoff;
                    self.hooks
                        .on_retry_scheduled(&self.session_id, failures, class, backoff);
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = token.cancelled() => {}
                    }
                    continue;
                }
            };

            failures = 0;
            let answer = result.answer().map(str::to_string);
            self.update(|state| {
                state.rate_limited = false;
                if let Some(answer) = &answer {
                    state.prompt.push(Message::assistant(answer.clone()));
                }
            });
            if answer.is_some() {
                text = answer;
            }

            if result.finish_reason != FinishReason::ToolCalls || result.tool_calls.is_empty() {
                return Ok(TurnOutcome {
                    status: TurnStatus::Completed,
                    text,
                    tool_calls: records,
                });
            }

            self.set_phase(TurnPhase::ExecutingTools);
            self.execute_batch(&result.tool_calls, &mut records).await;
        }
    }

    /// Runs calls in order and stops at the first failure; the rest are
    /// recorded as skipped.
    async fn execute_batch(&self, calls: &[ToolCall], records: &mut Vec<ToolCallRecord>) {
        let mut pending = calls.iter();

        for call in pending.by_ref() {
            self.hooks
                .on_tool_call_start(&self.session_id, &call.name, &call.id);
            let started = Instant::now();

            let record = self.execute_call(call).await;
            self.hooks.on_tool_call_finish(
                &self.session_id,
                &call.name,
                &call.id,
                &record.status,
                started.elapsed(),
            );

            let failed = matches!(record.status, ToolCallStatus::Failed { .. });
            records.push(record);
            if failed {
                break;
            }
        }

        records.extend(pending.map(|call| ToolCallRecord {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call_arguments(call),
            status: ToolCallStatus::Skipped,
        }));
    }

    async fn execute_call(&self, call: &ToolCall) -> ToolCallRecord {
        let parsed = call.parse_arguments();
        let arguments = call_arguments(call);
        self.push_message(Message::tool_call(&call.id, &call.name, arguments.clone()));

        let status = match parsed {
            Ok(parsed) => match self.tools.call_tool(&call.name, parsed).await {
                Ok(content) => {
                    self.push_message(Message::tool_result(&call.id, &call.name, content));
                    ToolCallStatus::Succeeded
                }
                Err(error) => ToolCallStatus::Failed {
                    code: error.code_or_internal(),
                    message: error.message,
                },
            },
            Err(error) => ToolCallStatus::Failed {
                code: INVALID_PARAMS,
                message: format!("invalid params: arguments are not valid JSON: {error}"),
            },
        };

        if let ToolCallStatus::Failed { code, message } = &status {
            self.push_message(Message::tool_error(
                &call.id,
                &call.name,
                json!({ "error": { "code": code, "message": message } }),
            ));
        }

        ToolCallRecord {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments,
            status,
        }
    }

    fn compact_prompt(&self) {
        let seed_len = SeedMessages::LEN;
        if self.update(|state| state.compact(seed_len)) {
            self.hooks.on_prompt_compacted(&self.session_id, seed_len);
        }
    }

    fn cancelled(&self, text: Option<String>, tool_calls: Vec<ToolCallRecord>) -> TurnOutcome {
        self.hooks.on_turn_cancelled(&self.session_id);
        TurnOutcome {
            status: TurnStatus::Cancelled,
            text,
            tool_calls,
        }
    }

    fn push_message(&self, message: Message) {
        self.update(|state| state.prompt.push(message));
    }

    fn set_phase(&self, phase: TurnPhase) {
        self.update(|state| {
            if state.phase != TurnPhase::Cancelled {
                state.phase = phase;
            }
        });
    }

    fn update<T>(&self, apply: impl FnOnce(&mut ConversationState) -> T) -> T {
        apply(&mut self.lock_state())
    }

    fn lock_state(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_token(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.active_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("session_id", &self.session_id)
            .field("gateway", &self.gateway)
            .field("policy", &self.policy)
            .field("state", &*self.lock_state())
            .finish()
    }
}

fn call_arguments(call: &ToolCall) -> Value {
    call.parse_arguments()
        .unwrap_or_else(|_| Value::String(call.arguments.clone()))
}

/// Marks a turn active for its whole lifetime and resets the processing flags
/// on every exit path.
struct TurnGuard<'a> {
    conversation: &'a Conversation,
}

impl<'a> TurnGuard<'a> {
    fn acquire(
        conversation: &'a Conversation,
        token: &CancellationToken,
    ) -> Result<Self, ChatError> {
        conversation
            .turn_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ChatError::busy("a turn is already processing"))?;

        *conversation.lock_token() = Some(token.clone());
        conversation.update(|state| {
            state.is_processing = true;
            state.phase = TurnPhase::AwaitingGeneration;
        });

        Ok(Self { conversation })
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        *self.conversation.lock_token() = None;
        self.conversation.update(|state| {
            state.is_processing = false;
            state.phase = TurnPhase::Idle;
        });
        self.conversation.turn_active.store(false, Ordering::Release);
    }
}
