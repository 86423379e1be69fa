//! Generation gateway: sends an assembled prompt to a text-generation
//! backend and returns the raw completion.
//!
//! Gateways are stateless per call and never retry. Any transport failure,
//! non-success status or empty completion is reported as
//! [`StoryError::GenerationUnavailable`].

mod chat;
mod ollama;

pub use chat::ChatCompletionsGateway;
pub use ollama::OllamaGateway;

use crate::config::{ProviderKind, StoryConfig};
use crate::{Result, StoryError};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_ERROR_DETAIL_CHARS: usize = 400;

/// A text-generation backend
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Complete `prompt` and return the raw generated text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Short backend description for logs
    fn name(&self) -> &str;
}

/// Connection settings shared by the HTTP gateways
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout: Duration,
    pub api_key: Option<String>,
}

impl GatewaySettings {
    pub fn from_config(config: &StoryConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        Self {
            base_url: config.resolved_base_url(),
            model: config.model.clone(),
            temperature: config.temperature,
            request_timeout: Duration::from_secs(config.generation_timeout_secs),
            api_key,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Build the gateway selected by the configuration.
pub fn from_config(config: &StoryConfig) -> Result<Arc<dyn GenerationGateway>> {
    let settings = GatewaySettings::from_config(config);
    info!(
        "Generation gateway: provider={:?}, model={}, base_url={}, timeout={:?}",
        config.provider, settings.model, settings.base_url, settings.request_timeout
    );

    let gateway: Arc<dyn GenerationGateway> = match config.provider {
        ProviderKind::Ollama => Arc::new(OllamaGateway::new(settings)?),
        ProviderKind::Chat => Arc::new(ChatCompletionsGateway::new(settings)?),
    };
    Ok(gateway)
}

fn build_client(settings: &GatewaySettings) -> Result<Client> {
    Client::builder()
        .timeout(settings.request_timeout)
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(concat!("storyloop/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| StoryError::Config(format!("failed to build HTTP client: {e}")))
}

/// Reject empty completions; the narrator must always say something.
fn non_empty(text: String) -> Result<String> {
    if text.trim().is_empty() {
        return Err(StoryError::GenerationUnavailable(
            "backend returned an empty completion".to_string(),
        ));
    }
    Ok(text)
}

async fn check_response_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = truncate_error_detail(&extract_error_detail(&body), MAX_ERROR_DETAIL_CHARS);
    if detail.is_empty() {
        return Err(StoryError::GenerationUnavailable(format!("API error {status}")));
    }
    Err(StoryError::GenerationUnavailable(format!(
        "API error {status}: {detail}"
    )))
}

fn extract_error_detail(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(msg) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return msg.to_string();
        }
        // Ollama reports {"error": "..."}
        if let Some(msg) = value.get("error").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
        if let Some(msg) = value.get("message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
    }

    trimmed.to_string()
}

fn truncate_error_detail(detail: &str, max_chars: usize) -> String {
    if detail.chars().count() <= max_chars {
        return detail.to_string();
    }

    let mut truncated = detail.chars().take(max_chars).collect::<String>();
    truncated.push_str("... [truncated]");
    truncated
}

fn map_reqwest_error(e: reqwest::Error) -> StoryError {
    if e.is_timeout() {
        StoryError::GenerationUnavailable(format!("timeout: {e}"))
    } else if e.is_connect() {
        StoryError::GenerationUnavailable(format!("network: {e}"))
    } else if e.is_decode() {
        StoryError::GenerationUnavailable(format!("malformed response: {e}"))
    } else {
        StoryError::GenerationUnavailable(e.to_string())
    }
}

/// One-shot HTTP stub used by the gateway tests.
#[cfg(test)]
pub(crate) mod stub_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve a single request with `status` and `body`.
    /// Returns the base URL and a receiver for the raw request text.
    pub async fn serve_once(status: u16, body: &str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = body.to_string();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            let _ = tx.send(String::from_utf8_lossy(&request).to_string());
        });

        (format!("http://{}", addr), rx)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }
}
