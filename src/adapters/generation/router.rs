//! Provider routing.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::gemini::{GeminiClient, GeminiConfig};
use super::generic_rest::GenericRestClient;
use crate::domain::models::{ProviderType, ProvidersConfig};
use crate::domain::ports::{GenerationClient, GenerationError, GenerationRequest, GenerationResponse};

/// Sends each request to the backend named by its `provider`.
pub struct ProviderRouter {
    gemini: Arc<dyn GenerationClient>,
    generic_rest: Arc<dyn GenerationClient>,
}

impl ProviderRouter {
    pub fn new(gemini: Arc<dyn GenerationClient>, generic_rest: Arc<dyn GenerationClient>) -> Self {
        Self { gemini, generic_rest }
    }

    /// Build the HTTP-backed router from provider configuration.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, GenerationError> {
        let gemini = GeminiClient::new(GeminiConfig::from(&config.gemini))?;
        let generic_rest = GenericRestClient::new(&config.generic_rest)?;
        Ok(Self::new(Arc::new(gemini), Arc::new(generic_rest)))
    }

    fn client_for(&self, provider: ProviderType) -> &Arc<dyn GenerationClient> {
        match provider {
            ProviderType::GoogleGemini => &self.gemini,
            ProviderType::GenericRest => &self.generic_rest,
        }
    }
}

#[async_trait]
impl GenerationClient for ProviderRouter {
    fn name(&self) -> &str {
        "router"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        let client = self.client_for(request.provider);
        debug!(provider = request.provider.as_str(), backend = client.name(), "routing generation request");
        client.generate(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::generation::{MockGenerationClient, MockReply};
    use crate::domain::models::{AgentDefinition, AgentStep};

    #[tokio::test]
    async fn test_routes_by_provider() {
        let gemini = Arc::new(MockGenerationClient::new().with_default(MockReply::text("from gemini")));
        let rest = Arc::new(MockGenerationClient::new().with_default(MockReply::text("from rest")));
        let router = ProviderRouter::new(gemini.clone(), rest.clone());

        let g_step = AgentStep::new("G", "p");
        let r_step = AgentStep::new("R", "p").with_rest_endpoint("http://localhost/x");
        let agent = AgentDefinition::new("A", "").with_step(g_step.clone()).with_step(r_step.clone());

        let g = router.generate(GenerationRequest::for_step(&agent, &g_step, "x")).await.unwrap();
        let r = router.generate(GenerationRequest::for_step(&agent, &r_step, "x")).await.unwrap();

        assert_eq!(g.text, "from gemini");
        assert_eq!(r.text, "from rest");
        assert_eq!(gemini.calls().await.len(), 1);
        assert_eq!(rest.calls().await.len(), 1);
    }
}
