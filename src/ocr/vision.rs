//! Google Vision text detection client.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use once_cell::sync::OnceCell;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::ports::OcrEngine;
use crate::utils::error::{CasefilesError, Result};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
    image_context: ImageContext,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature {
    #[serde(rename = "type")]
    feature_type: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext {
    language_hints: Vec<String>,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    responses: Vec<ImageResponse>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    full_text_annotation: Option<FullTextAnnotation>,
    text_annotations: Option<Vec<TextAnnotation>>,
    error: Option<ApiStatus>,
}

#[derive(Deserialize)]
struct FullTextAnnotation {
    text: String,
}

#[derive(Deserialize)]
struct TextAnnotation {
    description: String,
}

#[derive(Deserialize)]
struct ApiStatus {
    message: String,
}

/// [`OcrEngine`] backed by the Vision `images:annotate` endpoint with an
/// API key.
///
/// The key is resolved on the first `annotate` call, so earlier pipeline
/// steps run without credentials configured.
pub struct VisionOcr {
    client: Client,
    endpoint: String,
    key_lookup: Box<dyn Fn() -> Result<String> + Send + Sync>,
    api_key: OnceCell<String>,
}

impl VisionOcr {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self::with_key_lookup(endpoint, move || Ok(api_key.clone()))
    }

    pub fn with_key_lookup<F>(endpoint: String, lookup: F) -> Self
    where
        F: Fn() -> Result<String> + Send + Sync + 'static,
    {
        Self {
            client: Client::new(),
            endpoint,
            key_lookup: Box::new(lookup),
            api_key: OnceCell::new(),
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .get_or_try_init(|| (self.key_lookup)())
            .map(String::as_str)
    }
}

#[async_trait]
impl OcrEngine for VisionOcr {
    async fn annotate(&self, image: &[u8], language_hints: &[String]) -> Result<String> {
        let api_key = self.api_key()?;
        let body = AnnotateRequest {
            requests: vec![ImageRequest {
                image: ImageContent {
                    content: BASE64.encode(image),
                },
                features: vec![Feature {
                    feature_type: "TEXT_DETECTION".to_string(),
                }],
                image_context: ImageContext {
                    language_hints: language_hints.to_vec(),
                },
            }],
        };

        debug!("sending {} byte image to Vision", image.len());
        let response = self
            .client
            .post(format!("{}?key={}", self.endpoint, api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CasefilesError::OcrError {
                message: format!("Vision API returned {}", status),
            });
        }

        let parsed: AnnotateResponse = response.json().await?;
        let first = parsed
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| CasefilesError::OcrError {
                message: "Vision API returned no responses".to_string(),
            })?;

        if let Some(error) = first.error {
            return Err(CasefilesError::OcrError {
                message: error.message,
            });
        }

        // full text when present, first raw annotation otherwise
        if let Some(full) = first.full_text_annotation {
            return Ok(full.text);
        }
        Ok(first
            .text_annotations
            .and_then(|mut annotations| {
                if annotations.is_empty() {
                    None
                } else {
                    Some(annotations.remove(0).description)
                }
            })
            .unwrap_or_default())
    }
}
