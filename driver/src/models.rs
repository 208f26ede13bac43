use serde::Deserialize;
use tracing::debug;

use crate::client::GeminiClient;
use crate::error::GenerationError;

const GENERATE_CONTENT: &str = "generateContent";
const PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|method| method == GENERATE_CONTENT)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelPage {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

impl GeminiClient {
    /// Walk the whole model catalog, page by page.
    pub fn list_models(&self) -> Result<Vec<ModelInfo>, GenerationError> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .get("models")
                .query("pageSize", &PAGE_SIZE.to_string());

            if let Some(token) = &page_token {
                request = request.query("pageToken", token);
            }

            let page: ModelPage = request
                .call()?
                .into_json()
                .map_err(|e| GenerationError::Malformed(e.to_string()))?;

            debug!(count = page.models.len(), "fetched model page");

            models.extend(page.models);

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(models)
    }
}

/// Models that can serve `generateContent` calls.
pub fn generation_models(models: &[ModelInfo]) -> impl Iterator<Item = &ModelInfo> {
    models.iter().filter(|model| model.supports_generation())
}
