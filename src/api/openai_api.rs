use crate::api::player_ids::{parse_id_response, PlayerIdResolver};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const OPENAI_RESPONSES_URL: &str = "https://api.openai.com/v1/responses";

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: String,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesResponse {
    /// Concatenated text of every assistant message
    fn output_text(&self) -> String {
        self.output
            .iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content.iter())
            .filter(|c| c.kind == "output_text")
            .filter_map(|c| c.text.as_deref())
            .collect()
    }
}

/// Asks an OpenAI model for basketball-reference player ids
pub struct OpenAiPlayerIdResolver {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiPlayerIdResolver {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key,
            model,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .context("Failed to build OpenAI client")?,
        })
    }

    fn prompt(names: &[String]) -> String {
        format!(
            "What is the PlayerID for each of the following players on Basketball Reference: {:?}. \
             Answer with only a Python list containing one list of ids per player, in the same order.",
            names
        )
    }
}

impl PlayerIdResolver for OpenAiPlayerIdResolver {
    async fn resolve(&self, names: &[String]) -> Result<Vec<Vec<String>>> {
        info!("Asking {} for {} player ids", self.model, names.len());

        let request = ResponsesRequest {
            model: &self.model,
            input: Self::prompt(names),
        };

        let response = self
            .client
            .post(OPENAI_RESPONSES_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to call OpenAI Responses API")?;

        if !response.status().is_success() {
            anyhow::bail!("OpenAI API returned error: {}", response.status());
        }

        let body: ResponsesResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        let text = body.output_text();
        debug!("Player id response: {}", text);

        Ok(parse_id_response(&text, names.len())?)
    }
}
