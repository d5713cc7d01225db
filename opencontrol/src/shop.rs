//! Example shop tool catalog over an opaque [`ShopBackend`].
//!
//! Every tool except `think` maps to one backend request. Arguments are
//! validated by the dispatcher before a tool runs, so bodies forward them
//! unchanged.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use opencontrol::shop::{HttpShopBackend, shop_registry};
//!
//! let backend = Arc::new(HttpShopBackend::new(
//!     reqwest::Client::new(),
//!     "https://api.dev.terminal.shop",
//!     None,
//! ));
//! let registry = shop_registry(backend, false).expect("catalog names are unique");
//!
//! assert_eq!(registry.names()[0], "list_products");
//! assert!(registry.contains("think"));
//! assert!(!registry.contains("create_order"));
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use ctlprovider::SecretString;
use ctltooling::{
    ArgumentSchema, FunctionTool, RegistryError, Tool, ToolError, ToolFuture, ToolRegistry,
    parse_arguments, required_string,
};
use futures_util::future::try_join;
use reqwest::{Client, Method, StatusCode, Url};
use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::ShopSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl ShopMethod {
    fn as_http(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
            Self::Delete => Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShopRequest {
    pub method: ShopMethod,
    /// Unescaped path segments, e.g. `["product", "prd_123"]`.
    pub path: Vec<String>,
    pub body: Option<Value>,
}

impl ShopRequest {
    pub fn new<I, S>(method: ShopMethod, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            path: path.into_iter().map(Into::into).collect(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

pub trait ShopBackend: Send + Sync {
    /// Resolves to the response's `data` payload.
    fn send<'a>(&'a self, request: ShopRequest) -> ToolFuture<'a, Result<Value, ToolError>>;
}

#[derive(Debug, Clone)]
pub struct HttpShopBackend {
    client: Client,
    base_url: String,
    token: Option<SecretString>,
}

impl HttpShopBackend {
    pub fn new(client: Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token: token.map(SecretString::new),
        }
    }

    pub fn from_settings(client: Client, settings: &ShopSettings) -> Self {
        Self::from_settings_with(client, settings, |name| std::env::var(name).ok())
    }

    pub fn from_settings_with<F>(client: Client, settings: &ShopSettings, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup(&settings.token_env).filter(|token| !token.trim().is_empty());
        if token.is_none() {
            tracing::warn!(
                phase = "shop",
                event = "missing_token",
                token_env = settings.token_env.as_str(),
                "shop requests will be sent without a bearer token"
            );
        }

        Self::new(client, settings.base_url.clone(), token)
    }

    fn url(&self, path: &[String]) -> Result<Url, ToolError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| ToolError::other(format!("invalid shop url: {err}")))?;
        url.path_segments_mut()
            .map_err(|()| ToolError::other("shop url cannot carry a path"))?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }
}

impl ShopBackend for HttpShopBackend {
    fn send<'a>(&'a self, request: ShopRequest) -> ToolFuture<'a, Result<Value, ToolError>> {
        Box::pin(async move {
            let url = self.url(&request.path)?;
            let mut builder = self.client.request(request.method.as_http(), url);
            if let Some(token) = &self.token {
                builder = builder.bearer_auth(token.expose());
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(|err| {
                if err.is_timeout() {
                    ToolError::timeout(err.to_string())
                } else {
                    ToolError::execution(err.to_string())
                }
            })?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(ToolError::unauthorized(format!(
                    "shop rejected credentials with status {status}"
                )));
            }
            if !status.is_success() {
                return Err(ToolError::execution(format!(
                    "shop request failed with status {status}"
                )));
            }

            let body = response
                .json::<Value>()
                .await
                .map_err(|err| ToolError::execution(format!("invalid shop response: {err}")))?;
            Ok(take_data(body))
        })
    }
}

fn take_data(mut body: Value) -> Value {
    if body.get("data").is_some() {
        body["data"].take()
    } else {
        body
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ProductLookup {
    /// The product ID (e.g., prd_XXXXXXXXXXXXXXXXXXXXXXXXX)
    #[serde(rename = "productId")]
    product_id: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct AddressLookup {
    /// The address ID (e.g., shp_XXXXXXXXXXXXXXXXXXXXXXXXX)
    #[serde(rename = "addressId")]
    address_id: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct CardLookup {
    /// The card ID (e.g., crd_XXXXXXXXXXXXXXXXXXXXXXXXX)
    #[serde(rename = "cardId")]
    card_id: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct OrderLookup {
    /// The order ID (e.g., ord_XXXXXXXXXXXXXXXXXXXXXXXXX)
    #[serde(rename = "orderId")]
    order_id: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct SubscriptionLookup {
    /// The subscription ID (e.g., sub_XXXXXXXXXXXXXXXXXXXXXXXXX)
    #[serde(rename = "subscriptionId")]
    subscription_id: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct SubscriptionCancel {
    /// The subscription ID to cancel (e.g., sub_XXXXXXXXXXXXXXXXXXXXXXXXX)
    #[serde(rename = "subscriptionId")]
    subscription_id: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct TokenLookup {
    /// The token ID (e.g., pat_XXXXXXXXXXXXXXXXXXXXXXXXX)
    #[serde(rename = "tokenId")]
    token_id: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct TokenDelete {
    /// The token ID to delete (e.g., pat_XXXXXXXXXXXXXXXXXXXXXXXXX)
    #[serde(rename = "tokenId")]
    token_id: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ProfileUpdate {
    #[schemars(email)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct NewAddress {
    city: String,
    country: String,
    name: String,
    street1: String,
    zip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    street2: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct NewCard {
    /// Stripe token representing the card (e.g., tok_1N3T00LkdIwHu7ixt44h1F8k)
    token: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct CartItem {
    /// The product variant ID to add
    #[serde(rename = "productVariantID")]
    product_variant_id: String,
    /// Quantity to add
    #[schemars(range(min = 1))]
    quantity: u32,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct CartAddress {
    /// The address ID to use for shipping
    #[serde(rename = "addressID")]
    address_id: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct CartCard {
    /// The card ID to use for payment
    #[serde(rename = "cardID")]
    card_id: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct NewSubscription {
    /// The shipping address ID
    #[serde(rename = "addressID")]
    address_id: String,
    /// The payment card ID
    #[serde(rename = "cardID")]
    card_id: String,
    /// The product variant ID to subscribe to
    #[serde(rename = "productVariantID")]
    product_variant_id: String,
    /// The quantity for the subscription
    #[schemars(range(min = 1))]
    quantity: u32,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct EmailSubscription {
    /// The email address to subscribe
    #[schemars(email)]
    email: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct DirectOrder {
    /// The shipping address ID
    #[serde(rename = "addressID")]
    address_id: String,
    /// The payment card ID
    #[serde(rename = "cardID")]
    card_id: String,
    #[schemars(schema_with = "variant_quantities")]
    variants: BTreeMap<String, u32>,
}

fn variant_quantities(_generator: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "type": "object",
        "description": "An object mapping product variant IDs to quantities (e.g., { var_XXXXXXXXXXXXXXXXXXXXXXXXX: 1 })",
        "additionalProperties": {"type": "integer", "minimum": 1}
    })
}

/// Derived schema plus a round trip through `A`, so the backend only ever
/// sees the typed shape of the arguments.
struct Arguments {
    schema: ArgumentSchema,
    normalize: fn(Value) -> Result<Value, ToolError>,
}

impl Arguments {
    fn of<A>() -> Self
    where
        A: DeserializeOwned + Serialize + JsonSchema,
    {
        Self {
            schema: ArgumentSchema::of::<A>(),
            normalize: normalize::<A>,
        }
    }
}

fn normalize<A>(arguments: Value) -> Result<Value, ToolError>
where
    A: DeserializeOwned + Serialize,
{
    let parsed = parse_arguments::<A>(arguments)?;
    serde_json::to_value(parsed)
        .map_err(|err| ToolError::other(format!("failed to encode arguments: {err}")))
}

enum Input {
    None,
    Id {
        field: &'static str,
        arguments: Arguments,
    },
    Body(Arguments),
}

struct Endpoint {
    name: &'static str,
    description: &'static str,
    method: ShopMethod,
    path: &'static [&'static str],
    input: Input,
}

impl Endpoint {
    fn new(
        name: &'static str,
        description: &'static str,
        method: ShopMethod,
        path: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            description,
            method,
            path,
            input: Input::None,
        }
    }

    /// `field` is the wire name of the identifier `A` carries.
    fn by_id<A>(mut self, field: &'static str) -> Self
    where
        A: DeserializeOwned + Serialize + JsonSchema,
    {
        self.input = Input::Id {
            field,
            arguments: Arguments::of::<A>(),
        };
        self
    }

    fn body<A>(mut self) -> Self
    where
        A: DeserializeOwned + Serialize + JsonSchema,
    {
        self.input = Input::Body(Arguments::of::<A>());
        self
    }

    fn into_tool(self, backend: &Arc<dyn ShopBackend>) -> Arc<dyn Tool> {
        let Endpoint {
            name,
            description,
            method,
            path,
            input,
        } = self;

        let (schema, normalize, id_field, forwards_body) = match input {
            Input::None => (None, None, None, false),
            Input::Id { field, arguments } => (
                Some(arguments.schema),
                Some(arguments.normalize),
                Some(field),
                false,
            ),
            Input::Body(arguments) => (
                Some(arguments.schema),
                Some(arguments.normalize),
                None,
                true,
            ),
        };

        let backend = Arc::clone(backend);
        let mut tool = FunctionTool::new(name, description, move |arguments: Value, _context| {
            let backend = Arc::clone(&backend);
            async move {
                let arguments = match normalize {
                    Some(normalize) => normalize(arguments)?,
                    None => arguments,
                };

                let mut request = ShopRequest::new(method, path.iter().copied());
                if let Some(field) = id_field {
                    request.path.push(required_string(&arguments, field)?);
                }
                if forwards_body {
                    request = request.with_body(arguments);
                }
                backend.send(request).await
            }
        });

        if let Some(schema) = schema {
            tool = tool.with_schema(schema);
        }
        Arc::new(tool)
    }
}

fn catalog() -> Vec<Endpoint> {
    use ShopMethod::{Delete, Get, Post, Put};

    vec![
        Endpoint::new(
            "list_products",
            "List all available products from Terminal.shop",
            Get,
            &["product"],
        ),
        Endpoint::new(
            "get_product",
            "Get details of a specific product by ID",
            Get,
            &["product"],
        )
        .by_id::<ProductLookup>("productId"),
        Endpoint::new(
            "get_profile",
            "Get the current user's profile information",
            Get,
            &["profile"],
        ),
        Endpoint::new(
            "update_profile",
            "Update the current user's profile information",
            Put,
            &["profile"],
        )
        .body::<ProfileUpdate>(),
        Endpoint::new(
            "list_addresses",
            "List all saved addresses for the current user",
            Get,
            &["address"],
        ),
        Endpoint::new(
            "get_address",
            "Get details of a specific address by ID",
            Get,
            &["address"],
        )
        .by_id::<AddressLookup>("addressId"),
        Endpoint::new(
            "create_address",
            "Create a new shipping address",
            Post,
            &["address"],
        )
        .body::<NewAddress>(),
        Endpoint::new(
            "delete_address",
            "Delete a shipping address by ID",
            Delete,
            &["address"],
        )
        .by_id::<AddressLookup>("addressId"),
        Endpoint::new(
            "list_cards",
            "List all saved credit cards for the current user",
            Get,
            &["card"],
        ),
        Endpoint::new(
            "get_card",
            "Get details of a specific credit card by ID",
            Get,
            &["card"],
        )
        .by_id::<CardLookup>("cardId"),
        Endpoint::new(
            "create_card",
            "Attach a new credit card (via Stripe token) to the current user",
            Post,
            &["card"],
        )
        .body::<NewCard>(),
        Endpoint::new(
            "collect_card",
            "Create a temporary URL for collecting credit card information",
            Post,
            &["card", "collect"],
        ),
        Endpoint::new(
            "get_cart",
            "Get the current user's cart contents",
            Get,
            &["cart"],
        ),
        Endpoint::new(
            "add_cart_item",
            "Add an item to the current user's cart. This is the default when a user would like to place an order. Adding items to cart does not automatically place the order.",
            Put,
            &["cart", "item"],
        )
        .body::<CartItem>(),
        Endpoint::new(
            "set_cart_address",
            "Set the shipping address for the current user's cart",
            Put,
            &["cart", "address"],
        )
        .body::<CartAddress>(),
        Endpoint::new(
            "set_cart_card",
            "Set the payment card for the current user's cart",
            Put,
            &["cart", "card"],
        )
        .body::<CartCard>(),
        Endpoint::new(
            "convert_cart_to_order",
            "Convert the current user's cart to an order. Always double check before calling this.",
            Post,
            &["cart", "convert"],
        ),
        Endpoint::new(
            "clear_cart",
            "Clear all items from the current user's cart",
            Delete,
            &["cart"],
        ),
        Endpoint::new(
            "list_orders",
            "List all orders for the current user",
            Get,
            &["order"],
        ),
        Endpoint::new(
            "get_order",
            "Get details of a specific order by ID",
            Get,
            &["order"],
        )
        .by_id::<OrderLookup>("orderId"),
        Endpoint::new(
            "list_subscriptions",
            "List all subscriptions for the current user",
            Get,
            &["subscription"],
        ),
        Endpoint::new(
            "get_subscription",
            "Get details of a specific subscription by ID",
            Get,
            &["subscription"],
        )
        .by_id::<SubscriptionLookup>("subscriptionId"),
        Endpoint::new(
            "create_subscription",
            "Create a new subscription for the current user",
            Post,
            &["subscription"],
        )
        .body::<NewSubscription>(),
        Endpoint::new(
            "cancel_subscription",
            "Cancel a subscription by ID",
            Delete,
            &["subscription"],
        )
        .by_id::<SubscriptionCancel>("subscriptionId"),
        Endpoint::new(
            "list_tokens",
            "List all personal access tokens for the current user",
            Get,
            &["token"],
        ),
        Endpoint::new(
            "get_token",
            "Get details of a specific personal access token by ID",
            Get,
            &["token"],
        )
        .by_id::<TokenLookup>("tokenId"),
        Endpoint::new(
            "create_token",
            "Create a new personal access token",
            Post,
            &["token"],
        ),
        Endpoint::new(
            "delete_token",
            "Delete a personal access token by ID",
            Delete,
            &["token"],
        )
        .by_id::<TokenDelete>("tokenId"),
        Endpoint::new(
            "subscribe_email",
            "Subscribe an email address to Terminal updates",
            Post,
            &["email"],
        )
        .body::<EmailSubscription>(),
    ]
}

/// The default catalog: every shop endpoint tool followed by `think`.
pub fn shop_tools(backend: Arc<dyn ShopBackend>) -> Vec<Arc<dyn Tool>> {
    let mut tools: Vec<Arc<dyn Tool>> = catalog()
        .into_iter()
        .map(|endpoint| endpoint.into_tool(&backend))
        .collect();
    tools.push(Arc::new(think_tool()));
    tools
}

/// Places an order without going through the cart. Not in the default catalog.
pub fn create_order_tool(backend: Arc<dyn ShopBackend>) -> Arc<dyn Tool> {
    Endpoint::new(
        "create_order",
        "Create an order directly, bypassing the cart. Use with caution. Do not use this unless specifically requested by the user to order directly. The default should always be to add items to the cart.",
        ShopMethod::Post,
        &["order"],
    )
    .body::<DirectOrder>()
    .into_tool(&backend)
}

#[derive(Debug, Deserialize, JsonSchema)]
struct Thought {
    thought: String,
}

pub fn think_tool() -> FunctionTool {
    FunctionTool::typed(
        "think",
        "Use the tool to think about something. It will not obtain new information or change the database, but just append the thought to the log. Use it when complex reasoning or some cache memory is needed.",
        |args: Thought, _context| async move { Ok(json!({ "thought": args.thought })) },
    )
}

pub fn shop_registry(
    backend: Arc<dyn ShopBackend>,
    direct_orders: bool,
) -> Result<ToolRegistry, RegistryError> {
    let mut builder = ToolRegistry::builder().extend(shop_tools(Arc::clone(&backend)));
    if direct_orders {
        builder = builder.shared(create_order_tool(backend));
    }
    builder.build()
}

/// The cart with each item joined to the product owning its variant.
/// Items whose variant matches no listed product are left as they are.
pub async fn cart_with_products(backend: &dyn ShopBackend) -> Result<Value, ToolError> {
    let (products, mut cart) = try_join(
        backend.send(ShopRequest::new(ShopMethod::Get, ["product"])),
        backend.send(ShopRequest::new(ShopMethod::Get, ["cart"])),
    )
    .await?;

    if let Some(items) = cart.get_mut("items").and_then(Value::as_array_mut) {
        for item in items {
            let product = item
                .get("productVariantID")
                .and_then(Value::as_str)
                .and_then(|variant| product_for_variant(&products, variant));
            if let (Some(product), Some(fields)) = (product, item.as_object_mut()) {
                fields.insert("product".to_string(), product.clone());
            }
        }
    }

    Ok(cart)
}

pub async fn orders(backend: &dyn ShopBackend) -> Result<Value, ToolError> {
    backend
        .send(ShopRequest::new(ShopMethod::Get, ["order"]))
        .await
}

fn product_for_variant<'a>(products: &'a Value, variant: &str) -> Option<&'a Value> {
    products.as_array()?.iter().find(|product| {
        product
            .get("variants")
            .and_then(Value::as_array)
            .is_some_and(|variants| {
                variants
                    .iter()
                    .any(|candidate| candidate.get("id").and_then(Value::as_str) == Some(variant))
            })
    })
}
