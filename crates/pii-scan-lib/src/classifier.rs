use crate::backend::ModelClient;
use crate::calculator::{estimate_tokens, CostCalculator};
use crate::data_structures::{ClassificationResult, ColumnSample, CostEstimate, PiiCategory};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIDENCE: f64 = 0.5;
pub const NO_DATA_REASONING: &str = "Column contains no data";

/// One step of response parsing: any of `patterns` in the upper-cased
/// answer selects `category` with `confidence`.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    pub category: PiiCategory,
    pub patterns: &'static [&'static str],
    pub confidence: f64,
}

/// Evaluated top to bottom, first match wins. `NO_PII` comes first because
/// models often echo the category list from the prompt.
pub const CLASSIFICATION_RULES: [ClassificationRule; 8] = [
    ClassificationRule {
        category: PiiCategory::NoPii,
        patterns: &[
            "NO_PII",
            "NOT PII",
            "NO PII",
            "NOT CONSIDERED PII",
            "IS NOT CONSIDERED PII",
        ],
        confidence: 0.8,
    },
    ClassificationRule {
        category: PiiCategory::Email,
        patterns: &["EMAIL"],
        confidence: 0.9,
    },
    ClassificationRule {
        category: PiiCategory::Ssn,
        patterns: &["SSN", "SOCIAL SECURITY"],
        confidence: 0.95,
    },
    ClassificationRule {
        category: PiiCategory::Phone,
        patterns: &["PHONE"],
        confidence: 0.85,
    },
    ClassificationRule {
        category: PiiCategory::Address,
        patterns: &["ADDRESS"],
        confidence: 0.8,
    },
    ClassificationRule {
        category: PiiCategory::Dob,
        patterns: &["DOB", "DATE OF BIRTH"],
        confidence: 0.75,
    },
    ClassificationRule {
        category: PiiCategory::Name,
        patterns: &["NAME"],
        confidence: 0.8,
    },
    ClassificationRule {
        category: PiiCategory::HashedPii,
        patterns: &["HASHED"],
        confidence: 0.7,
    },
];

/// Categories offered to the model, in prompt order.
const PROMPT_CATEGORIES: [PiiCategory; 8] = [
    PiiCategory::Ssn,
    PiiCategory::Email,
    PiiCategory::Phone,
    PiiCategory::Address,
    PiiCategory::Dob,
    PiiCategory::Name,
    PiiCategory::HashedPii,
    PiiCategory::NoPii,
];

/// Sample values are rendered as a compact JSON array (`["a","b"]`), which
/// shifts the token count by a character or two per value compared with a
/// quoted list written with single quotes.
pub fn build_prompt(column_name: &str, samples: &[String]) -> String {
    let values = serde_json::Value::from(samples.to_vec());

    let mut prompt = format!(
        "Analyze this data for PII (Personally Identifiable Information):\n\n\
         Column: {}\nValues: {}\n\n\
         Is this PII? What type?\n",
        column_name, values
    );
    for category in PROMPT_CATEGORIES {
        prompt.push_str(&format!("- {} ({})\n", category.as_str(), category.description()));
    }
    prompt.push_str(
        "\nAnswer with just the category (like \"EMAIL\" or \"NO_PII\") and a brief reason.",
    );
    prompt
}

/// Maps a free-text model answer onto the taxonomy. Never fails: text that
/// matches no rule is `UNKNOWN` at the default confidence.
pub fn parse_response(response: &str) -> (PiiCategory, f64) {
    let upper = response.to_uppercase();
    CLASSIFICATION_RULES
        .iter()
        .find(|rule| rule.patterns.iter().any(|pattern| upper.contains(pattern)))
        .map(|rule| (rule.category, rule.confidence))
        .unwrap_or((PiiCategory::Unknown, DEFAULT_CONFIDENCE))
}

/// Classifies one column through `model`.
///
/// `samples` must already be de-duplicated and capped by the caller. An empty
/// sample list short-circuits to `NO_DATA` without calling the model. A
/// failed call is reported as `ERROR` with zero cost rather than returned as
/// an error, so a batch of columns always runs to completion.
pub async fn classify_column(
    column_name: &str,
    samples: &[String],
    model: &dyn ModelClient,
    calculator: &CostCalculator,
) -> ClassificationResult {
    if samples.is_empty() {
        debug!(column = column_name, "no samples, skipping model call");
        return ClassificationResult::new(
            column_name.to_string(),
            Vec::new(),
            PiiCategory::NoData,
            0.0,
            NO_DATA_REASONING.to_string(),
            CostEstimate::zero(),
        );
    }

    let prompt = build_prompt(column_name, samples);
    let input_tokens = estimate_tokens(&prompt);
    debug!(column = column_name, input_tokens, "prompt built");

    let response = match model.generate(&prompt).await {
        Ok(response) => response,
        Err(e) => {
            warn!(column = column_name, error = %e, "model call failed");
            return ClassificationResult::new(
                column_name.to_string(),
                samples.to_vec(),
                PiiCategory::Error,
                0.0,
                format!("Error analyzing column: {}", e),
                CostEstimate::zero(),
            );
        }
    };

    let output_tokens = estimate_tokens(&response);
    let cost = calculator.calculate_cost(input_tokens, output_tokens);
    let (classification, confidence) = parse_response(&response);

    info!(
        column = column_name,
        classification = %classification,
        confidence,
        total_tokens = cost.total_tokens(),
        "column classified"
    );

    ClassificationResult::new(
        column_name.to_string(),
        samples.to_vec(),
        classification,
        confidence,
        response.trim().to_string(),
        cost,
    )
}

/// A model client bundled with the pricing used to cost its calls.
#[derive(Clone)]
pub struct ColumnClassifier {
    model: Arc<dyn ModelClient>,
    calculator: CostCalculator,
}

impl ColumnClassifier {
    pub fn new(model: Arc<dyn ModelClient>, calculator: CostCalculator) -> Self {
        Self { model, calculator }
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    pub fn calculator(&self) -> &CostCalculator {
        &self.calculator
    }

    pub async fn classify(&self, column: &ColumnSample) -> ClassificationResult {
        self.classify_column(column.column_name(), column.samples()).await
    }

    pub async fn classify_column(&self, column_name: &str, samples: &[String]) -> ClassificationResult {
        classify_column(column_name, samples, self.model.as_ref(), &self.calculator).await
    }
}
