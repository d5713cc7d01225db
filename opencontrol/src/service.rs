//! Framework-free request handlers for the `/auth`, `/generate` and `/mcp`
//! endpoints, plus the public `/cart` and `/order` views. Callers map
//! [`ServiceResponse`] onto their HTTP server.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ctlprovider::GenerationGateway;
//! use ctlrpc::RpcDispatcher;
//! use ctltooling::ToolRegistry;
//! use opencontrol::{BearerGate, ControlService};
//!
//! # tokio_block(async {
//! let service = ControlService::new(
//!     BearerGate::new("hunter2"),
//!     GenerationGateway::unconfigured(),
//!     Arc::new(RpcDispatcher::new(Arc::new(ToolRegistry::empty()))),
//! );
//!
//! let denied = service.handle_generate(None, "{}").await;
//! assert_eq!(denied.status, 401);
//!
//! let unconfigured = service.handle_generate(Some("Bearer hunter2"), "{}").await;
//! assert_eq!(unconfigured.status, 400);
//! assert_eq!(unconfigured.body["message"], "No model configured");
//! # });
//! # fn tokio_block<F: std::future::Future>(future: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().expect("runtime").block_on(future)
//! # }
//! ```

use std::sync::Arc;

use ctlchat::{Conversation, ConversationBuilder};
use ctlprovider::{GenerationGateway, GenerationRequest, ProviderError, ProviderErrorKind};
use ctlrpc::{RpcClient, RpcDispatcher};
use ctltooling::ToolError;
use serde_json::{Value, json};

use crate::auth::BearerGate;
use crate::shop::{ShopBackend, cart_with_products, orders};

pub const NO_MODEL_CONFIGURED: &str = "No model configured";
pub const NO_SHOP_CONFIGURED: &str = "No shop configured";

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: Value,
}

impl ServiceResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "message": message.into() }),
        }
    }

    pub fn unauthorized() -> Self {
        Self::error(401, "Unauthorized")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Clone)]
pub struct ControlService {
    gate: BearerGate,
    gateway: GenerationGateway,
    dispatcher: Arc<RpcDispatcher>,
    shop: Option<Arc<dyn ShopBackend>>,
}

impl ControlService {
    pub fn new(gate: BearerGate, gateway: GenerationGateway, dispatcher: Arc<RpcDispatcher>) -> Self {
        Self {
            gate,
            gateway,
            dispatcher,
            shop: None,
        }
    }

    /// Backs the `/cart` and `/order` views.
    pub fn with_shop(mut self, shop: Arc<dyn ShopBackend>) -> Self {
        self.shop = Some(shop);
        self
    }

    pub fn gateway(&self) -> &GenerationGateway {
        &self.gateway
    }

    pub fn dispatcher(&self) -> Arc<RpcDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// A conversation talking to this service's gateway and dispatcher in-process.
    pub fn conversation(&self) -> ConversationBuilder {
        Conversation::builder(
            self.gateway.clone(),
            RpcClient::new(self.dispatcher.clone()),
        )
    }

    pub fn handle_auth(&self, authorization: Option<&str>) -> ServiceResponse {
        match self.authorize("auth", authorization) {
            Ok(()) => ServiceResponse::ok(json!({})),
            Err(response) => response,
        }
    }

    /// Relays one generation request. Provider failures answer with the
    /// upstream status, or 500, and a fixed `"error"` message.
    pub async fn handle_generate(&self, authorization: Option<&str>, body: &str) -> ServiceResponse {
        if let Err(response) = self.authorize("generate", authorization) {
            return response;
        }

        if !self.gateway.is_configured() {
            return ServiceResponse::error(400, NO_MODEL_CONFIGURED);
        }

        let request = match serde_json::from_str::<GenerationRequest>(body) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(
                    phase = "service",
                    event = "invalid_generate_body",
                    error = %err
                );
                return ServiceResponse::error(400, format!("invalid generation request: {err}"));
            }
        };

        match self.gateway.forward(request).await {
            Ok(result) => match serde_json::to_value(&result) {
                Ok(body) => ServiceResponse::ok(body),
                Err(err) => {
                    tracing::error!(phase = "service", event = "encode_failure", error = %err);
                    ServiceResponse::error(500, "error")
                }
            },
            Err(error) => ServiceResponse::error(failure_status(&error), "error"),
        }
    }

    /// Runs one JSON-RPC message. Protocol errors travel inside a 200 envelope.
    pub async fn handle_mcp(&self, authorization: Option<&str>, body: &str) -> ServiceResponse {
        if let Err(response) = self.authorize("mcp", authorization) {
            return response;
        }

        let response = self.dispatcher.process_str(body).await;
        match serde_json::to_value(&response) {
            Ok(body) => ServiceResponse::ok(body),
            Err(err) => {
                tracing::error!(phase = "service", event = "encode_failure", error = %err);
                ServiceResponse::error(500, "error")
            }
        }
    }

    /// The cart with products joined in. Served without the bearer gate.
    pub async fn handle_cart(&self) -> ServiceResponse {
        let Some(shop) = &self.shop else {
            return ServiceResponse::error(404, NO_SHOP_CONFIGURED);
        };
        shop_view("cart", cart_with_products(shop.as_ref()).await)
    }

    /// The current user's orders. Served without the bearer gate.
    pub async fn handle_order(&self) -> ServiceResponse {
        let Some(shop) = &self.shop else {
            return ServiceResponse::error(404, NO_SHOP_CONFIGURED);
        };
        shop_view("order", orders(shop.as_ref()).await)
    }

    fn authorize(&self, endpoint: &str, authorization: Option<&str>) -> Result<(), ServiceResponse> {
        self.gate.authorize(authorization).map_err(|err| {
            tracing::warn!(
                phase = "service",
                event = "unauthorized",
                endpoint,
                reason = %err
            );
            ServiceResponse::unauthorized()
        })
    }
}

impl std::fmt::Debug for ControlService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlService")
            .field("gateway", &self.gateway)
            .field("dispatcher", &self.dispatcher)
            .field("shop", &self.shop.is_some())
            .finish_non_exhaustive()
    }
}

fn shop_view(endpoint: &str, outcome: Result<Value, ToolError>) -> ServiceResponse {
    match outcome {
        Ok(body) => ServiceResponse::ok(body),
        Err(err) => {
            tracing::warn!(
                phase = "service",
                event = "shop_view_failure",
                endpoint,
                error_kind = ?err.kind,
                error = %err
            );
            ServiceResponse::error(502, "error")
        }
    }
}

/// Request validation failures are the caller's fault even without a status.
fn failure_status(error: &ProviderError) -> u16 {
    match error.status {
        Some(status) if (400..=599).contains(&status) => status,
        _ if error.kind == ProviderErrorKind::InvalidRequest => 400,
        _ => 500,
    }
}
