use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ctlrpc::{
    DispatcherConfig, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
    RpcDispatcher, TOOL_EXECUTION_FAILED,
};
use ctltooling::{
    ArgumentSchema, FunctionTool, JsonSchema, SchemaViolation, ToolError, ToolExecutionContext,
    ToolRegistry, ToolRuntimeHooks,
};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Deserialize, JsonSchema)]
struct CartItem {
    #[serde(rename = "productVariantID")]
    product_variant_id: String,
    #[schemars(range(min = 1))]
    quantity: u32,
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

impl ToolRuntimeHooks for RecordingHooks {
    fn on_execution_start(&self, tool_name: &str, _context: &ToolExecutionContext) {
        self.push(format!("start:{tool_name}"));
    }

    fn on_execution_success(
        &self,
        tool_name: &str,
        _context: &ToolExecutionContext,
        _elapsed: Duration,
    ) {
        self.push(format!("success:{tool_name}"));
    }

    fn on_execution_failure(
        &self,
        tool_name: &str,
        _context: &ToolExecutionContext,
        error: &ToolError,
        _elapsed: Duration,
    ) {
        self.push(format!("failure:{tool_name}:{:?}", error.kind));
    }

    fn on_arguments_rejected(
        &self,
        tool_name: &str,
        _context: &ToolExecutionContext,
        violations: &[SchemaViolation],
    ) {
        self.push(format!("rejected:{tool_name}:{}", violations.len()));
    }
}

struct Fixture {
    dispatcher: RpcDispatcher,
    hooks: Arc<RecordingHooks>,
    cart_calls: Arc<AtomicUsize>,
}

fn fixture(config: DispatcherConfig) -> Fixture {
    let cart_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&cart_calls);

    let registry = ToolRegistry::builder()
        .tool(FunctionTool::new(
            "list_products",
            "List products in the shop",
            |_args, _ctx| async move { Ok(json!([{"id": "p1", "name": "Cron"}])) },
        ))
        .tool(FunctionTool::typed(
            "add_cart_item",
            "Add an item",
            move |item: CartItem, _ctx| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"added": item.product_variant_id, "quantity": item.quantity}))
                }
            },
        ))
        .tool(FunctionTool::new(
            "get_orders",
            "List past orders",
            |_args, _ctx| async move {
                Err(ToolError::execution(
                    "upstream returned 503 with internal host db-7.internal",
                ))
            },
        ))
        .tool(FunctionTool::new(
            "slow_lookup",
            "Takes too long",
            |_args, _ctx| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(json!("late"))
            },
        ))
        .build()
        .expect("registry should build");

    let hooks = Arc::new(RecordingHooks::default());
    let dispatcher = RpcDispatcher::new(Arc::new(registry))
        .with_hooks(hooks.clone())
        .with_config(config);

    Fixture {
        dispatcher,
        hooks,
        cart_calls,
    }
}

fn call(id: Value, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

#[tokio::test]
async fn tools_list_preserves_registration_order() {
    let fixture = fixture(DispatcherConfig::default());

    let response = fixture
        .dispatcher
        .process(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .await;

    let result = response.result.expect("list should succeed");
    let names = result["tools"]
        .as_array()
        .expect("tools array")
        .iter()
        .map(|tool| tool["name"].as_str().expect("tool name").to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec!["list_products", "add_cart_item", "get_orders", "slow_lookup"]
    );
    assert_eq!(
        result["tools"][1]["inputSchema"]["required"],
        json!(["productVariantID", "quantity"])
    );
    assert_eq!(
        result["tools"][0]["inputSchema"],
        json!({"type": "object", "properties": {}})
    );
}

#[tokio::test]
async fn tools_call_wraps_output_in_content() {
    let fixture = fixture(DispatcherConfig::default());

    let response = fixture
        .dispatcher
        .process(call(
            json!("req-1"),
            "add_cart_item",
            json!({"productVariantID": "v1", "quantity": 2}),
        ))
        .await;

    assert_eq!(response.id, json!("req-1"));
    assert_eq!(
        response.result,
        Some(json!({"content": {"added": "v1", "quantity": 2}}))
    );
    assert_eq!(
        fixture.hooks.events(),
        vec!["start:add_cart_item", "success:add_cart_item"]
    );
}

#[tokio::test]
async fn unknown_tool_echoes_request_id() {
    let fixture = fixture(DispatcherConfig::default());

    let response = fixture
        .dispatcher
        .process(call(json!(42), "delete_everything", json!({})))
        .await;

    assert_eq!(response.id, json!(42));
    let error = response.error.expect("unknown tool should fail");
    assert_eq!(error.code, METHOD_NOT_FOUND);
    assert_eq!(error.data, Some(json!({"name": "delete_everything"})));
    assert!(fixture.hooks.events().is_empty());
}

#[tokio::test]
async fn schema_violations_never_reach_the_tool() {
    let fixture = fixture(DispatcherConfig::default());

    let response = fixture
        .dispatcher
        .process(call(
            json!(3),
            "add_cart_item",
            json!({"productVariantID": "v1", "quantity": 0}),
        ))
        .await;

    let error = response.error.expect("quantity 0 should be rejected");
    assert_eq!(error.code, INVALID_PARAMS);
    let data = error.data.expect("violations attached");
    assert_eq!(data["name"], "add_cart_item");
    assert_eq!(data["violations"][0]["path"], "/quantity");
    assert_eq!(fixture.cart_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fixture.hooks.events(), vec!["rejected:add_cart_item:1"]);
}

#[tokio::test]
async fn missing_required_arguments_are_invalid_params() {
    let fixture = fixture(DispatcherConfig::default());

    let response = fixture
        .dispatcher
        .process(json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {"name": "add_cart_item"}
        }))
        .await;

    assert_eq!(
        response.error.expect("missing arguments").code,
        INVALID_PARAMS
    );
    assert_eq!(fixture.cart_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn arguments_the_tool_cannot_deserialize_are_invalid_params() {
    let fixture = fixture(DispatcherConfig::default());

    let response = fixture
        .dispatcher
        .process(call(
            json!(9),
            "add_cart_item",
            json!({"productVariantID": "v1", "quantity": 2.0}),
        ))
        .await;

    let error = response.error.expect("2.0 is not a u32");
    assert_eq!(error.code, INVALID_PARAMS);
    assert_eq!(error.data.expect("violations attached")["name"], "add_cart_item");
    assert_eq!(fixture.cart_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        fixture.hooks.events(),
        vec!["start:add_cart_item", "failure:add_cart_item:InvalidArguments"]
    );
}

#[tokio::test]
async fn arguments_are_checked_against_the_advertised_schema() {
    let executions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&executions);
    let advertised = json!({
        "type": "object",
        "properties": {"email": {"type": "string", "format": "email"}}
    });

    let registry = ToolRegistry::builder()
        .tool(
            FunctionTool::new("update_profile", "Update the profile", move |args, _ctx| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(args)
                }
            })
            .with_schema(ArgumentSchema::from_document(advertised.clone())),
        )
        .build()
        .expect("registry should build");
    let dispatcher = RpcDispatcher::new(Arc::new(registry));

    let listed = dispatcher
        .process(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .await
        .result
        .expect("list should succeed");
    assert_eq!(listed["tools"][0]["inputSchema"], advertised);

    for arguments in [json!({"email": null}), json!({"email": "not-an-email"})] {
        let response = dispatcher
            .process(call(json!(2), "update_profile", arguments))
            .await;
        let error = response.error.expect("arguments violate the advertised schema");
        assert_eq!(error.code, INVALID_PARAMS);
        assert_eq!(error.data.expect("violations")["violations"][0]["path"], "/email");
    }
    assert_eq!(executions.load(Ordering::SeqCst), 0);

    let accepted = dispatcher
        .process(call(json!(3), "update_profile", json!({"email": "ada@example.com"})))
        .await;
    assert_eq!(
        accepted.result,
        Some(json!({"content": {"email": "ada@example.com"}}))
    );
    assert_eq!(executions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn tool_failures_are_sanitized() {
    let fixture = fixture(DispatcherConfig::default());

    let response = fixture
        .dispatcher
        .process(call(json!(5), "get_orders", json!({})))
        .await;

    let error = response.error.expect("tool failure");
    assert_eq!(error.code, TOOL_EXECUTION_FAILED);
    assert_eq!(error.message, "tool execution failed: get_orders");
    let rendered = serde_json::to_string(&error).expect("serialize error");
    assert!(!rendered.contains("db-7.internal"));
    assert_eq!(
        fixture.hooks.events(),
        vec!["start:get_orders", "failure:get_orders:Execution"]
    );
}

#[tokio::test]
async fn slow_tools_time_out_as_execution_failures() {
    let fixture = fixture(DispatcherConfig::default().with_tool_timeout(Duration::from_millis(20)));

    let response = fixture
        .dispatcher
        .process(call(json!(6), "slow_lookup", json!({})))
        .await;

    assert_eq!(
        response.error.expect("timeout").code,
        TOOL_EXECUTION_FAILED
    );
    assert_eq!(
        fixture.hooks.events(),
        vec!["start:slow_lookup", "failure:slow_lookup:Timeout"]
    );
}

#[tokio::test]
async fn malformed_envelopes_are_rejected() {
    let fixture = fixture(DispatcherConfig::default());

    let wrong_version = fixture
        .dispatcher
        .process(json!({"jsonrpc": "1.0", "id": 7, "method": "tools/list"}))
        .await;
    assert_eq!(wrong_version.id, json!(7));
    assert_eq!(
        wrong_version.error.expect("bad version").code,
        INVALID_REQUEST
    );

    let unparsable = fixture.dispatcher.process_str("{\"jsonrpc\": ").await;
    assert_eq!(unparsable.id, Value::Null);
    assert_eq!(unparsable.error.expect("parse error").code, PARSE_ERROR);
}

#[tokio::test]
async fn unknown_methods_are_method_not_found() {
    let fixture = fixture(DispatcherConfig::default());

    let response = fixture
        .dispatcher
        .process_str(r#"{"jsonrpc": "2.0", "id": 8, "method": "resources/list"}"#)
        .await;

    assert_eq!(response.id, json!(8));
    let error = response.error.expect("unknown method");
    assert_eq!(error.code, METHOD_NOT_FOUND);
    assert_eq!(error.data, Some(json!({"method": "resources/list"})));
}
