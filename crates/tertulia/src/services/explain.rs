use tertulia_core::ModelClient;
use tertulia_model::{ModelMessage, ModelParameters, TokenUsage};

use crate::config::ExplainSettings;
use crate::error::ApiError;

/// Prices a request from its token usage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CostEstimator {
    input_price_per_million: f64,
    output_price_per_million: f64,
}

impl CostEstimator {
    pub fn new(input_price_per_million: f64, output_price_per_million: f64) -> Self {
        Self {
            input_price_per_million,
            output_price_per_million,
        }
    }

    /// Returns the estimated cost in USD.
    pub fn estimate(&self, usage: &TokenUsage) -> f64 {
        (usage.input_tokens as f64 * self.input_price_per_million
            + usage.output_tokens as f64 * self.output_price_per_million)
            / 1_000_000.0
    }

    /// One log line with the token counts and their estimated cost.
    pub fn report(&self, usage: &TokenUsage) -> String {
        format!(
            "usage: {} input, {} output, {} total tokens, estimated cost ${:.8}",
            usage.input_tokens,
            usage.output_tokens,
            usage.total_tokens(),
            self.estimate(usage)
        )
    }
}

/// The single-shot joke explainer behind `/api/v1/manual/explain`.
pub struct ExplainService {
    model_client: ModelClient,
    parameters: ModelParameters,
    cost: CostEstimator,
}

impl ExplainService {
    pub fn new(model_client: ModelClient, settings: &ExplainSettings) -> Self {
        Self {
            model_client,
            parameters: ModelParameters::default()
                .with_model_name(&settings.model)
                .with_temperature(settings.temperature)
                .with_max_output_tokens(settings.max_output_tokens),
            cost: CostEstimator::new(
                settings.input_price_per_million,
                settings.output_price_per_million,
            ),
        }
    }

    pub async fn explain(&self, topic: &str) -> Result<String, ApiError> {
        info!("preparing an explanation about `{topic}`");
        let prompt = format!("Tell me a funny explain about {topic}");
        let resp = self
            .model_client
            .chat(vec![ModelMessage::User(prompt)], self.parameters.clone())
            .await?;

        if resp.usage.total_tokens() == 0 {
            warn!("the provider reported no token usage, the cost below is unknown");
        }
        info!("{}", self.cost.report(&resp.usage));
        Ok(resp.text)
    }
}

#[cfg(test)]
mod tests {
    use tertulia_test_model::{PresetResponse, TestModelProvider};

    use super::*;

    fn settings() -> ExplainSettings {
        ExplainSettings {
            model: "gpt-4o-mini".to_owned(),
            temperature: 1.0,
            max_output_tokens: 50,
            input_price_per_million: 0.15,
            output_price_per_million: 0.60,
        }
    }

    #[test]
    fn test_cost_estimate() {
        let cost = CostEstimator::new(0.15, 0.60);
        let usage = TokenUsage::new(1_000_000, 1_000_000);
        assert!((cost.estimate(&usage) - 0.75).abs() < 1e-12);

        let usage = TokenUsage::new(12, 40);
        assert_eq!(format!("{:.8}", cost.estimate(&usage)), "0.00002580");
        assert_eq!(
            cost.report(&usage),
            "usage: 12 input, 40 output, 52 total tokens, estimated cost $0.00002580"
        );
        assert_eq!(
            cost.report(&TokenUsage::default()),
            "usage: 0 input, 0 output, 0 total tokens, estimated cost $0.00000000"
        );
    }

    #[tokio::test]
    async fn test_explain_overrides_parameters() {
        let mut model_provider = TestModelProvider::default();
        model_provider
            .add_response(PresetResponse::text("Rust es como...").with_usage(12, 40));
        let model_client = ModelClient::new(model_provider.clone()).with_defaults(
            ModelParameters::default()
                .with_model_name("gpt-4o-mini")
                .with_temperature(0.7)
                .with_max_output_tokens(100),
        );

        let service = ExplainService::new(model_client, &settings());
        let text = service.explain("Rust").await.unwrap();
        assert_eq!(text, "Rust es como...");

        let request = &model_provider.requests()[0];
        assert_eq!(
            request.messages,
            vec![ModelMessage::User("Tell me a funny explain about Rust".to_owned())]
        );
        assert!(request.tools.is_empty());
        assert_eq!(request.parameters.temperature, Some(1.0));
        assert_eq!(request.parameters.max_output_tokens, Some(50));
    }

    #[tokio::test]
    async fn test_explain_without_reported_usage() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_response(PresetResponse::text("sin cuentas"));
        let service = ExplainService::new(ModelClient::new(model_provider), &settings());
        assert_eq!(service.explain("Rust").await.unwrap(), "sin cuentas");
    }
}
