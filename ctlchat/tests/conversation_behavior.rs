use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use ctlchat::{
    CancellationToken, ChatErrorKind, ChatPolicy, Conversation, ConversationHooks,
    ToolCallStatus, TurnPhase, TurnStatus,
};
use ctlcommon::SessionId;
use ctlprovider::{
    ContentPart, FailureClass, GenerationGateway, GenerationRequest, GenerationResult,
    ModelProvider, ProviderError, ProviderFuture, ProviderId, Role, ToolCall,
};
use ctlrpc::{
    INVALID_PARAMS, JsonRpcRequest, JsonRpcResponse, RpcClient, RpcDispatcher, RpcError,
    RpcFuture, RpcTransport, TOOL_EXECUTION_FAILED,
};
use ctltooling::{FunctionTool, ToolError, ToolRegistry};
use serde_json::{Value, json};
use tokio::sync::Notify;

type Scripted = Result<GenerationResult, ProviderError>;

#[derive(Default)]
struct ScriptedProvider {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<GenerationRequest>>,
    gated: bool,
    entered: Notify,
    release: Notify,
}

impl ScriptedProvider {
    fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Every call waits for `release` after announcing itself on `entered`.
    fn gated(script: Vec<Scripted>) -> Self {
        Self {
            gated: true,
            ..Self::new(script)
        }
    }

    fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl ModelProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn generate<'a>(
        &'a self,
        request: GenerationRequest,
    ) -> ProviderFuture<'a, Result<GenerationResult, ProviderError>> {
        Box::pin(async move {
            self.requests.lock().expect("requests lock").push(request);
            if self.gated {
                self.entered.notify_one();
                self.release.notified().await;
            }

            self.script
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::other("script exhausted")))
        })
    }
}

struct CountingTransport {
    inner: RpcDispatcher,
    methods: Mutex<Vec<String>>,
}

impl RpcTransport for CountingTransport {
    fn send<'a>(
        &'a self,
        request: JsonRpcRequest,
    ) -> RpcFuture<'a, Result<JsonRpcResponse, RpcError>> {
        self.methods
            .lock()
            .expect("methods lock")
            .push(request.method.clone());
        self.inner.send(request)
    }
}

#[derive(Default)]
struct RecordingHooks {
    events: Mutex<Vec<String>>,
}

impl RecordingHooks {
    fn events(&self) -> Vec<String> {
        self.events.lock().expect("events lock").clone()
    }

    fn push(&self, event: String) {
        self.events.lock().expect("events lock").push(event);
    }
}

impl ConversationHooks for RecordingHooks {
    fn on_retry_scheduled(
        &self,
        _session: &SessionId,
        failures: u32,
        class: FailureClass,
        _backoff: Duration,
    ) {
        self.push(format!("retry:{failures}:{class:?}"));
    }

    fn on_prompt_compacted(&self, _session: &SessionId, removed_index: usize) {
        self.push(format!("compacted:{removed_index}"));
    }

    fn on_tool_call_finish(
        &self,
        _session: &SessionId,
        tool_name: &str,
        _call_id: &str,
        status: &ToolCallStatus,
        _elapsed: Duration,
    ) {
        self.push(format!("tool:{tool_name}:{}", status.as_str()));
    }

    fn on_turn_cancelled(&self, _session: &SessionId) {
        self.push("cancelled".to_string());
    }

    fn on_turn_finish(&self, _session: &SessionId, status: TurnStatus, _elapsed: Duration) {
        self.push(format!("finish:{}", status.as_str()));
    }
}

struct Harness {
    conversation: Arc<Conversation>,
    provider: Arc<ScriptedProvider>,
    transport: Arc<CountingTransport>,
    executed: Arc<Mutex<Vec<String>>>,
    hooks: Arc<RecordingHooks>,
}

impl Harness {
    fn new(provider: ScriptedProvider) -> Self {
        Self::with_policy(provider, ChatPolicy::default())
    }

    fn with_policy(provider: ScriptedProvider, policy: ChatPolicy) -> Self {
        let executed = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = RpcDispatcher::new(Arc::new(shop_registry(Arc::clone(&executed))));
        let transport = Arc::new(CountingTransport {
            inner: dispatcher,
            methods: Mutex::new(Vec::new()),
        });
        let provider = Arc::new(provider);
        let hooks = Arc::new(RecordingHooks::default());

        let conversation = Conversation::builder(
            GenerationGateway::new(provider.clone()),
            RpcClient::new(transport.clone()),
        )
        .hooks(hooks.clone())
        .policy(policy.with_backoff(Duration::from_millis(5)))
        .session_id("test-session")
        .clock(|| NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date"))
        .build();

        Self {
            conversation: Arc::new(conversation),
            provider,
            transport,
            executed,
            hooks,
        }
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().expect("executed lock").clone()
    }
}

fn recording_tool(
    name: &'static str,
    executed: &Arc<Mutex<Vec<String>>>,
    output: Result<Value, &'static str>,
) -> FunctionTool {
    let executed = Arc::clone(executed);
    FunctionTool::new(name, format!("{name} tool"), move |_args, _ctx| {
        executed.lock().expect("executed lock").push(name.to_string());
        let output = output.clone().map_err(ToolError::execution);
        async move { output }
    })
}

fn shop_registry(executed: Arc<Mutex<Vec<String>>>) -> ToolRegistry {
    ToolRegistry::builder()
        .tool(recording_tool(
            "list_products",
            &executed,
            Ok(json!([{"id": "prd_1", "name": "Cron"}])),
        ))
        .tool(recording_tool(
            "add_cart_item",
            &executed,
            Ok(json!({"items": 1})),
        ))
        .tool(recording_tool(
            "get_orders",
            &executed,
            Err("orders backend unavailable"),
        ))
        .tool(recording_tool(
            "convert_cart_to_order",
            &executed,
            Ok(json!({"id": "ord_1"})),
        ))
        .build()
        .expect("registry should build")
}

fn roles(conversation: &Conversation) -> Vec<Role> {
    conversation
        .prompt()
        .iter()
        .map(|message| message.role)
        .collect()
}

#[tokio::test]
async fn tool_round_trip_ends_with_six_prompt_messages() {
    let harness = Harness::new(ScriptedProvider::new(vec![
        Ok(GenerationResult::tool_calls(vec![ToolCall::new(
            "call_1",
            "list_products",
            "{}",
        )])),
        Ok(GenerationResult::stop("Here are the products")),
    ]));

    let outcome = harness
        .conversation
        .send("list your tools")
        .await
        .expect("turn should complete");

    assert_eq!(outcome.status, TurnStatus::Completed);
    assert_eq!(outcome.text.as_deref(), Some("Here are the products"));
    assert_eq!(outcome.tool_calls.len(), 1);
    assert_eq!(outcome.tool_calls[0].status, ToolCallStatus::Succeeded);
    assert_eq!(outcome.tool_calls[0].arguments, json!({}));

    assert_eq!(
        roles(&harness.conversation),
        vec![
            Role::System,
            Role::System,
            Role::User,
            Role::Assistant,
            Role::Tool,
            Role::Assistant
        ]
    );
    let prompt = harness.conversation.prompt();
    assert_eq!(
        prompt[4].content[0],
        ContentPart::ToolResult {
            tool_call_id: "call_1".to_string(),
            tool_name: "list_products".to_string(),
            result: json!([{"id": "prd_1", "name": "Cron"}]),
            is_error: false,
        }
    );
    assert!(!harness.conversation.is_processing());
    assert_eq!(harness.conversation.phase(), TurnPhase::Idle);

    let requests = harness.provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].prompt.len(), 3);
    assert_eq!(requests[1].prompt.len(), 5);
    assert_eq!(requests[0].temperature, Some(1.0));
    assert_eq!(
        requests[0]
            .mode
            .tools()
            .iter()
            .map(|tool| tool.name.as_str())
            .collect::<Vec<_>>(),
        vec![
            "list_products",
            "add_cart_item",
            "get_orders",
            "convert_cart_to_order"
        ]
    );
    assert_eq!(harness.executed(), vec!["list_products"]);
    assert_eq!(
        harness.hooks.events(),
        vec!["tool:list_products:succeeded", "finish:completed"]
    );
}

#[tokio::test]
async fn failing_call_stops_the_rest_of_the_batch() {
    let harness = Harness::new(ScriptedProvider::new(vec![
        Ok(GenerationResult::tool_calls(vec![
            ToolCall::new(
                "call_a",
                "add_cart_item",
                r#"{"productVariantID":"var_1","quantity":1}"#,
            ),
            ToolCall::new("call_b", "get_orders", "{}"),
            ToolCall::new("call_c", "convert_cart_to_order", "{}"),
        ])),
        Ok(GenerationResult::stop("The order service is down.")),
    ]));

    let outcome = harness
        .conversation
        .send("order my usual")
        .await
        .expect("turn should complete");

    let statuses = outcome
        .tool_calls
        .iter()
        .map(|record| record.status.clone())
        .collect::<Vec<_>>();
    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses[0], ToolCallStatus::Succeeded);
    assert!(matches!(
        &statuses[1],
        ToolCallStatus::Failed { code, message }
            if *code == TOOL_EXECUTION_FAILED && !message.contains("backend unavailable")
    ));
    assert_eq!(statuses[2], ToolCallStatus::Skipped);
    assert_eq!(outcome.failed_calls().count(), 1);
    assert_eq!(harness.executed(), vec!["add_cart_item", "get_orders"]);

    let prompt = harness.conversation.prompt();
    assert_eq!(prompt.len(), 8);
    assert!(prompt.iter().all(|message| !message
        .content
        .iter()
        .any(|part| matches!(part, ContentPart::ToolCall { tool_call_id, .. } if tool_call_id == "call_c"))));
    let ContentPart::ToolResult {
        result, is_error, ..
    } = &prompt[6].content[0]
    else {
        panic!("expected a tool result at index 6");
    };
    assert!(*is_error);
    assert_eq!(result["error"]["code"], json!(TOOL_EXECUTION_FAILED));

    assert_eq!(harness.provider.requests().len(), 2);
}

#[tokio::test]
async fn throttled_generation_retries_the_same_prompt() {
    let harness = Harness::new(ScriptedProvider::gated(vec![
        Err(ProviderError::from_status(429, "slow down")),
        Ok(GenerationResult::stop("done")),
    ]));

    let conversation = Arc::clone(&harness.conversation);
    let turn = tokio::spawn(async move { conversation.send("hi").await });

    harness.provider.entered.notified().await;
    harness.provider.release.notify_one();
    harness.provider.entered.notified().await;

    assert!(harness.conversation.is_rate_limited());
    assert!(harness.conversation.is_processing());
    harness.provider.release.notify_one();

    let outcome = turn
        .await
        .expect("turn task should join")
        .expect("turn should complete");
    assert_eq!(outcome.status, TurnStatus::Completed);
    assert!(!harness.conversation.is_rate_limited());

    let requests = harness.provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].prompt, requests[1].prompt);
    assert!(
        harness
            .hooks
            .events()
            .contains(&"retry:1:Throttled".to_string())
    );
}

#[tokio::test]
async fn rejected_generation_drops_first_message_after_seed() {
    let harness = Harness::new(ScriptedProvider::new(vec![
        Ok(GenerationResult::stop("first reply")),
        Err(ProviderError::from_status(400, "context too long")),
        Ok(GenerationResult::stop("second reply")),
    ]));

    harness
        .conversation
        .send("hello")
        .await
        .expect("first turn should complete");
    harness
        .conversation
        .send("again")
        .await
        .expect("second turn should complete");

    let requests = harness.provider.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].prompt.len(), 5);
    assert_eq!(requests[2].prompt.len(), 4);
    assert_eq!(requests[2].prompt[..2], requests[1].prompt[..2]);
    assert_eq!(requests[2].prompt[2].text_content(), "first reply");
    assert_eq!(requests[2].prompt[3].text_content(), "again");

    assert_eq!(harness.conversation.prompt().len(), 5);
    assert!(
        harness
            .hooks
            .events()
            .contains(&"compacted:2".to_string())
    );
}

#[tokio::test]
async fn cancel_during_slow_generation_discards_the_response() {
    let harness = Harness::new(ScriptedProvider::gated(vec![Ok(
        GenerationResult::stop("too late"),
    )]));

    let conversation = Arc::clone(&harness.conversation);
    let turn = tokio::spawn(async move { conversation.send("take your time").await });

    harness.provider.entered.notified().await;
    assert!(harness.conversation.is_processing());
    assert!(harness.conversation.cancel());
    assert!(!harness.conversation.is_processing());
    assert_eq!(harness.conversation.phase(), TurnPhase::Cancelled);
    harness.provider.release.notify_one();

    let outcome = turn
        .await
        .expect("turn task should join")
        .expect("cancelled turns are not errors");
    assert_eq!(outcome.status, TurnStatus::Cancelled);
    assert_eq!(outcome.text, None);

    assert_eq!(harness.conversation.prompt().len(), 3);
    assert_eq!(harness.conversation.phase(), TurnPhase::Idle);
    assert!(!harness.conversation.cancel());
    assert_eq!(
        harness.hooks.events(),
        vec!["cancelled", "finish:cancelled"]
    );
}

#[tokio::test]
async fn cancelled_token_stops_before_any_generation() {
    let harness = Harness::new(ScriptedProvider::new(vec![Ok(GenerationResult::stop(
        "unused",
    ))]));
    let token = CancellationToken::new();
    token.cancel();

    let outcome = harness
        .conversation
        .send_with_cancel("hello", token)
        .await
        .expect("cancelled turns are not errors");

    assert!(outcome.is_cancelled());
    assert!(harness.provider.requests().is_empty());
    assert_eq!(harness.conversation.prompt().len(), 3);
}

#[tokio::test]
async fn repeated_failures_stop_at_the_retry_ceiling() {
    let harness = Harness::with_policy(
        ScriptedProvider::new(vec![
            Err(ProviderError::from_status(502, "bad gateway")),
            Err(ProviderError::from_status(502, "bad gateway")),
            Err(ProviderError::from_status(502, "bad gateway")),
        ]),
        ChatPolicy::default().with_max_attempts(3),
    );

    let error = harness
        .conversation
        .send("hello")
        .await
        .expect_err("ceiling should be reached");

    assert_eq!(error.kind, ChatErrorKind::RetriesExhausted);
    assert_eq!(error.status, Some(502));
    assert_eq!(harness.provider.requests().len(), 3);
    assert!(!harness.conversation.is_processing());
    assert_eq!(
        harness.hooks.events(),
        vec!["retry:1:Transient", "retry:2:Transient"]
    );
}

#[tokio::test]
async fn authentication_failures_are_not_retried() {
    let harness = Harness::new(ScriptedProvider::new(vec![Err(
        ProviderError::authentication("invalid api key").with_status(401),
    )]));

    let error = harness
        .conversation
        .send("hello")
        .await
        .expect_err("authentication failures are fatal");

    assert_eq!(error.kind, ChatErrorKind::Provider);
    assert_eq!(harness.provider.requests().len(), 1);
}

#[tokio::test]
async fn busy_conversation_rejects_send_and_clear() {
    let harness = Harness::new(ScriptedProvider::gated(vec![Ok(
        GenerationResult::stop("done"),
    )]));

    let conversation = Arc::clone(&harness.conversation);
    let turn = tokio::spawn(async move { conversation.send("first").await });
    harness.provider.entered.notified().await;

    let error = harness
        .conversation
        .send("second")
        .await
        .expect_err("only one turn at a time");
    assert_eq!(error.kind, ChatErrorKind::Busy);
    let error = harness
        .conversation
        .clear()
        .expect_err("cannot clear mid-turn");
    assert_eq!(error.kind, ChatErrorKind::Busy);

    harness.provider.release.notify_one();
    turn.await
        .expect("turn task should join")
        .expect("turn should complete");

    harness.conversation.clear().expect("first clear");
    let first = harness.conversation.snapshot();
    harness.conversation.clear().expect("second clear");
    let second = harness.conversation.snapshot();

    assert_eq!(first, second);
    assert_eq!(second.prompt.len(), 2);
    assert_eq!(
        second.prompt[1].text_content(),
        "The current date is Fri Oct 16 2026"
    );
}

#[tokio::test]
async fn tool_list_is_fetched_once_per_conversation() {
    let harness = Harness::new(ScriptedProvider::new(vec![
        Ok(GenerationResult::stop("one")),
        Ok(GenerationResult::stop("two")),
    ]));

    harness.conversation.send("a").await.expect("first turn");
    harness.conversation.send("b").await.expect("second turn");

    assert_eq!(
        *harness.transport.methods.lock().expect("methods lock"),
        vec!["tools/list".to_string()]
    );
}

#[tokio::test]
async fn unparsable_arguments_fail_without_calling_the_tool() {
    let harness = Harness::new(ScriptedProvider::new(vec![
        Ok(GenerationResult::tool_calls(vec![
            ToolCall::new("call_x", "list_products", "{not json"),
            ToolCall::new("call_y", "list_products", "{}"),
        ])),
        Ok(GenerationResult::stop("Let me try that again.")),
    ]));

    let outcome = harness
        .conversation
        .send("show products")
        .await
        .expect("turn should complete");

    assert_eq!(outcome.tool_calls[0].arguments, json!("{not json"));
    assert!(matches!(
        outcome.tool_calls[0].status,
        ToolCallStatus::Failed { code, .. } if code == INVALID_PARAMS
    ));
    assert_eq!(outcome.tool_calls[1].status, ToolCallStatus::Skipped);
    assert!(harness.executed().is_empty());
    assert_eq!(
        *harness.transport.methods.lock().expect("methods lock"),
        vec!["tools/list".to_string()]
    );
}
