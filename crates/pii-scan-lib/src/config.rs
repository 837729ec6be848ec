use crate::backend::{DecodingParams, DEFAULT_REGION};
use crate::data_structures::ModelPricing;
use crate::loader::DEFAULT_MAX_SAMPLES;
use crate::pricing::{PricingProvider, DEFAULT_MODEL_ID};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const MODEL_ID_ENV: &str = "PII_SCAN_MODEL_ID";
pub const ENDPOINT_ENV: &str = "PII_SCAN_ENDPOINT";
pub const REGION_ENV: &str = "AWS_REGION";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    pub model_id: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub max_samples_per_column: usize,
    /// Overrides the built-in rates for `model_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<ModelPricing>,
    pub decoding: DecodingParams,
    pub request_timeout_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            max_samples_per_column: DEFAULT_MAX_SAMPLES,
            pricing: None,
            decoding: DecodingParams::default(),
            request_timeout_secs: 60,
        }
    }
}

impl ScanConfig {
    /// Reads `path`, or returns defaults when it does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: ScanConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Applies `AWS_REGION`, `PII_SCAN_MODEL_ID` and `PII_SCAN_ENDPOINT`.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(region) = non_empty(REGION_ENV) {
            self.region = region;
        }
        if let Some(model_id) = non_empty(MODEL_ID_ENV) {
            self.model_id = model_id;
        }
        if let Some(endpoint) = non_empty(ENDPOINT_ENV) {
            self.endpoint = Some(endpoint);
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Configured override, else the provider's rates for `model_id`.
    pub fn resolve_pricing(&self, provider: &PricingProvider) -> ModelPricing {
        self.pricing
            .unwrap_or_else(|| provider.pricing_or_default(&self.model_id))
    }
}
