use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::workflow::context::ExecutionContext;
use crate::workflow::errors::NodeError;
use crate::workflow::models::{HttpMethod, Node};

/// Fixed request timeout; network, DNS, and timeout failures all surface the
/// same way.
const HTTP_TIMEOUT_SECS: u64 = 10;

struct HttpParams {
    url: String,
    method: HttpMethod,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

impl HttpParams {
    fn from_node(node: &Node) -> Result<Self, NodeError> {
        let url = node
            .string_parameter("url")
            .ok_or_else(|| NodeError::execution("Missing required parameter: url"))?
            .to_string();

        let method = match node.string_parameter("method") {
            Some(raw) => raw.parse::<HttpMethod>().map_err(NodeError::execution)?,
            None => HttpMethod::Get,
        };

        let mut headers = Vec::new();
        if let Some(raw_headers) = node.parameters.get("headers") {
            let map = raw_headers
                .as_object()
                .ok_or_else(|| NodeError::execution("headers must be a string map"))?;
            for (name, value) in map {
                let value = value
                    .as_str()
                    .ok_or_else(|| NodeError::execution("headers must be a string map"))?;
                headers.push((name.clone(), value.to_string()));
            }
        }

        let body = node.parameters.get("body").cloned();

        Ok(Self {
            url,
            method,
            headers,
            body,
        })
    }
}

pub fn validate_parameters(node: &Node) -> Result<(), NodeError> {
    HttpParams::from_node(node).map(|_| ())
}

pub struct HttpRequestRunner {
    client: Client,
}

impl HttpRequestRunner {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Perform the request and build the `{status, success, raw, body}`
    /// envelope. Transport failures and non-success statuses are appended to
    /// the run's error list in addition to failing the node.
    pub async fn execute(
        &self,
        node: &Node,
        context: &mut ExecutionContext,
    ) -> Result<Value, NodeError> {
        let params = HttpParams::from_node(node)?;

        tracing::info!(node = %node.name, method = %params.method, url = %params.url, "http request");

        let method = match params.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        };

        let mut request = self
            .client
            .request(method, &params.url)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS));
        for (name, value) in &params.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &params.body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let message = format!("HTTP request failed: {e}");
                context.add_error(message.clone());
                return Err(NodeError::execution(message));
            }
        };

        let status = response.status().as_u16();
        let raw = match response.text().await {
            Ok(raw) => raw,
            Err(e) => {
                let message = format!("HTTP request failed: {e}");
                context.add_error(message.clone());
                return Err(NodeError::execution(message));
            }
        };

        let success = (200..400).contains(&status);
        if !success {
            let message = format!("HTTP request failed with status {status}");
            context.add_error(message.clone());
            return Err(NodeError::execution(message));
        }

        let body: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);

        Ok(json!({
            "status": status,
            "success": success,
            "raw": raw,
            "body": body,
        }))
    }
}

impl Default for HttpRequestRunner {
    fn default() -> Self {
        Self::new()
    }
}
