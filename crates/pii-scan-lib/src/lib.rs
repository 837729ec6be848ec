pub mod analyzer;
pub mod backend;
pub mod calculator;
pub mod classifier;
pub mod config;
pub mod data_structures;
pub mod loader;
pub mod pricing;

pub use analyzer::CsvAnalyzer;
pub use backend::{BedrockTitanClient, DecodingParams, ModelClient, ModelError};
pub use calculator::{estimate_tokens, CostCalculator};
pub use classifier::{classify_column, parse_response, ColumnClassifier, CLASSIFICATION_RULES};
pub use config::ScanConfig;
pub use data_structures::{
    category_breakdown, AnalysisReport, ClassificationResult, ColumnSample, CostEstimate,
    ModelPricing, PiiCategory,
};
pub use loader::CsvLoader;
pub use pricing::PricingProvider;

pub use anyhow::Result;
pub use chrono::{DateTime, Utc};

pub mod prelude {
    pub use crate::analyzer::CsvAnalyzer;
    pub use crate::backend::{ModelClient, ModelError};
    pub use crate::calculator::CostCalculator;
    pub use crate::data_structures::{AnalysisReport, ClassificationResult, CostEstimate, PiiCategory};
    pub use crate::loader::CsvLoader;
    pub use anyhow::Result;
}
