use crate::data_structures::ModelPricing;
use std::collections::HashMap;
use tracing::warn;

pub const DEFAULT_MODEL_ID: &str = "amazon.titan-text-express-v1";

/// USD per 1K input tokens for the default model.
pub const DEFAULT_INPUT_RATE_PER_1K: f64 = 0.0008;
/// USD per 1K output tokens for the default model.
pub const DEFAULT_OUTPUT_RATE_PER_1K: f64 = 0.0016;

pub struct PricingProvider {
    pricing_cache: HashMap<String, ModelPricing>,
}

impl PricingProvider {
    pub fn new() -> Self {
        let mut pricing_cache = HashMap::new();

        pricing_cache.insert(
            DEFAULT_MODEL_ID.to_string(),
            ModelPricing::new(DEFAULT_INPUT_RATE_PER_1K, DEFAULT_OUTPUT_RATE_PER_1K),
        );

        pricing_cache.insert(
            "amazon.titan-text-lite-v1".to_string(),
            ModelPricing::new(
                0.00015, // $0.00015 per 1K input tokens
                0.0002,  // $0.0002 per 1K output tokens
            ),
        );

        pricing_cache.insert(
            "amazon.titan-text-premier-v1:0".to_string(),
            ModelPricing::new(
                0.0005, // $0.0005 per 1K input tokens
                0.0015, // $0.0015 per 1K output tokens
            ),
        );

        Self { pricing_cache }
    }

    pub fn default_pricing() -> ModelPricing {
        ModelPricing::new(DEFAULT_INPUT_RATE_PER_1K, DEFAULT_OUTPUT_RATE_PER_1K)
    }

    /// Registers or replaces the rates for `model`.
    pub fn set_pricing(&mut self, model: impl Into<String>, pricing: ModelPricing) {
        self.pricing_cache.insert(model.into(), pricing);
    }

    pub fn get_pricing(&self, model: &str) -> Option<&ModelPricing> {
        self.pricing_cache.get(model)
    }

    /// Falls back to the default model's rates for models missing from the table.
    pub fn pricing_or_default(&self, model: &str) -> ModelPricing {
        match self.pricing_cache.get(model) {
            Some(pricing) => *pricing,
            None => {
                warn!(model, "no pricing known for model, using default rates");
                Self::default_pricing()
            }
        }
    }

    pub fn supported_models(&self) -> Vec<&String> {
        let mut models: Vec<&String> = self.pricing_cache.keys().collect();
        models.sort();
        models
    }
}

impl Default for PricingProvider {
    fn default() -> Self {
        Self::new()
    }
}
