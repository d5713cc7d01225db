//! reqwest transport posting JSON-RPC envelopes to a remote `/mcp` endpoint.

use ctlprovider::SecretString;
use reqwest::Client;

use crate::{JsonRpcRequest, JsonRpcResponse, RpcError, RpcFuture, RpcTransport};

#[derive(Debug, Clone)]
pub struct HttpRpcTransport {
    client: Client,
    endpoint: String,
    token: SecretString,
}

impl HttpRpcTransport {
    pub fn new(client: Client, base_url: impl AsRef<str>, token: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: format!("{}/mcp", base_url.as_ref().trim_end_matches('/')),
            token: SecretString::new(token),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RpcTransport for HttpRpcTransport {
    fn send<'a>(
        &'a self,
        request: JsonRpcRequest,
    ) -> RpcFuture<'a, Result<JsonRpcResponse, RpcError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(self.token.expose())
                .json(&request)
                .send()
                .await
                .map_err(|err| RpcError::transport(err.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(RpcError::transport(format!(
                    "mcp request failed with status {status}"
                ))
                .with_status(status.as_u16()));
            }

            response
                .json::<JsonRpcResponse>()
                .await
                .map_err(|err| RpcError::invalid_response(err.to_string()))
        })
    }
}
