//! Ollama native generate API (`/api/generate`)

use super::{
    build_client, check_response_status, map_reqwest_error, non_empty, GatewaySettings,
    GenerationGateway,
};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Gateway for a local Ollama server
pub struct OllamaGateway {
    client: Client,
    settings: GatewaySettings,
    name: String,
}

impl OllamaGateway {
    pub fn new(settings: GatewaySettings) -> Result<Self> {
        let client = build_client(&settings)?;
        let name = format!("ollama:{}", settings.model);
        Ok(Self {
            client,
            settings,
            name,
        })
    }
}

#[async_trait]
impl GenerationGateway for OllamaGateway {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = self.settings.endpoint("api/generate");
        debug!("POST {} (prompt {} bytes)", url, prompt.len());

        let request = GenerateRequest {
            model: &self.settings.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.settings.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_response_status(response).await?;

        let body: GenerateResponse = response.json().await.map_err(map_reqwest_error)?;
        non_empty(body.response)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
