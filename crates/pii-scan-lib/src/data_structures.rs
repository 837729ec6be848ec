use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

/// Rounds a USD amount to 6 fractional digits.
pub(crate) fn round_usd(amount: f64) -> f64 {
    (amount * 1_000_000.0).round() / 1_000_000.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiCategory {
    NoData,
    Ssn,
    Email,
    Phone,
    Address,
    Dob,
    Name,
    HashedPii,
    NoPii,
    Unknown,
    Error,
}

impl PiiCategory {
    pub const ALL: [PiiCategory; 11] = [
        PiiCategory::NoData,
        PiiCategory::Ssn,
        PiiCategory::Email,
        PiiCategory::Phone,
        PiiCategory::Address,
        PiiCategory::Dob,
        PiiCategory::Name,
        PiiCategory::HashedPii,
        PiiCategory::NoPii,
        PiiCategory::Unknown,
        PiiCategory::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PiiCategory::NoData => "NO_DATA",
            PiiCategory::Ssn => "SSN",
            PiiCategory::Email => "EMAIL",
            PiiCategory::Phone => "PHONE",
            PiiCategory::Address => "ADDRESS",
            PiiCategory::Dob => "DOB",
            PiiCategory::Name => "NAME",
            PiiCategory::HashedPii => "HASHED_PII",
            PiiCategory::NoPii => "NO_PII",
            PiiCategory::Unknown => "UNKNOWN",
            PiiCategory::Error => "ERROR",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PiiCategory::NoData => "Column contains no data",
            PiiCategory::Ssn => "Social Security Numbers",
            PiiCategory::Email => "Email addresses",
            PiiCategory::Phone => "Phone numbers",
            PiiCategory::Address => "Physical addresses",
            PiiCategory::Dob => "Date of Birth",
            PiiCategory::Name => "Personal names",
            PiiCategory::HashedPii => "Hashed/encrypted PII",
            PiiCategory::NoPii => "Not PII",
            PiiCategory::Unknown => "Model answer did not name a category",
            PiiCategory::Error => "Model call failed",
        }
    }

    /// True for the seven concrete PII types. `UNKNOWN`, `ERROR`, `NO_DATA`
    /// and `NO_PII` are all false; callers that want to treat `UNKNOWN` as
    /// sensitive must check for it themselves.
    pub fn is_identifying(&self) -> bool {
        matches!(
            self,
            PiiCategory::Ssn
                | PiiCategory::Email
                | PiiCategory::Phone
                | PiiCategory::Address
                | PiiCategory::Dob
                | PiiCategory::Name
                | PiiCategory::HashedPii
        )
    }
}

impl fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for PiiCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        PiiCategory::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == upper)
            .ok_or_else(|| anyhow::anyhow!("Unknown PII category: {}", s))
    }
}

/// One column's name plus its ordered, de-duplicated, non-null sample values.
/// Samples are expected to be truncated to `max_samples_per_column` already.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSample {
    column_name: String,
    samples: Vec<String>,
}

impl ColumnSample {
    pub fn new(column_name: impl Into<String>, samples: Vec<String>) -> Self {
        Self {
            column_name: column_name.into(),
            samples,
        }
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    input_rate_per_1k: f64,
    output_rate_per_1k: f64,
}

impl ModelPricing {
    pub fn new(input_rate_per_1k: f64, output_rate_per_1k: f64) -> Self {
        Self {
            input_rate_per_1k,
            output_rate_per_1k,
        }
    }

    pub fn input_rate_per_1k(&self) -> f64 {
        self.input_rate_per_1k
    }

    pub fn output_rate_per_1k(&self) -> f64 {
        self.output_rate_per_1k
    }

    pub fn input_cost(&self, input_tokens: u64) -> f64 {
        input_tokens as f64 / 1000.0 * self.input_rate_per_1k
    }

    pub fn output_cost(&self, output_tokens: u64) -> f64 {
        output_tokens as f64 / 1000.0 * self.output_rate_per_1k
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostEstimate {
    input_tokens: u64,
    output_tokens: u64,
    total_tokens: u64,
    input_cost_usd: f64,
    output_cost_usd: f64,
    total_cost_usd: f64,
}

impl CostEstimate {
    /// Builds an estimate from raw token counts and unrounded costs. All cost
    /// fields are rounded to 6 digits; the total is rounded from the raw sum.
    pub fn new(input_tokens: u64, output_tokens: u64, input_cost: f64, output_cost: f64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
            input_cost_usd: round_usd(input_cost),
            output_cost_usd: round_usd(output_cost),
            total_cost_usd: round_usd(input_cost + output_cost),
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn input_cost_usd(&self) -> f64 {
        self.input_cost_usd
    }

    pub fn output_cost_usd(&self) -> f64 {
        self.output_cost_usd
    }

    pub fn total_cost_usd(&self) -> f64 {
        self.total_cost_usd
    }

    pub fn is_zero(&self) -> bool {
        self.total_tokens == 0 && self.total_cost_usd == 0.0
    }

    pub fn combine(&self, other: &CostEstimate) -> CostEstimate {
        CostEstimate {
            input_tokens: self.input_tokens.saturating_add(other.input_tokens),
            output_tokens: self.output_tokens.saturating_add(other.output_tokens),
            total_tokens: self.total_tokens.saturating_add(other.total_tokens),
            input_cost_usd: round_usd(self.input_cost_usd + other.input_cost_usd),
            output_cost_usd: round_usd(self.output_cost_usd + other.output_cost_usd),
            total_cost_usd: round_usd(self.total_cost_usd + other.total_cost_usd),
        }
    }
}

impl<'a> Sum<&'a CostEstimate> for CostEstimate {
    fn sum<I: Iterator<Item = &'a CostEstimate>>(iter: I) -> Self {
        iter.fold(CostEstimate::zero(), |acc, cost| acc.combine(cost))
    }
}

impl Sum for CostEstimate {
    fn sum<I: Iterator<Item = CostEstimate>>(iter: I) -> Self {
        iter.fold(CostEstimate::zero(), |acc, cost| acc.combine(&cost))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    column_name: String,
    samples: Vec<String>,
    classification: PiiCategory,
    confidence: f64,
    reasoning: String,
    cost: CostEstimate,
}

impl ClassificationResult {
    pub fn new(
        column_name: String,
        samples: Vec<String>,
        classification: PiiCategory,
        confidence: f64,
        reasoning: String,
        cost: CostEstimate,
    ) -> Self {
        Self {
            column_name,
            samples,
            classification,
            confidence,
            reasoning,
            cost,
        }
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn classification(&self) -> PiiCategory {
        self.classification
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn cost(&self) -> &CostEstimate {
        &self.cost
    }
}

/// Number of results per category.
pub fn category_breakdown(results: &[ClassificationResult]) -> BTreeMap<PiiCategory, usize> {
    let mut breakdown = BTreeMap::new();
    for result in results {
        *breakdown.entry(result.classification()).or_insert(0) += 1;
    }
    breakdown
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    source: String,
    model_id: String,
    generated_at: DateTime<Utc>,
    columns: Vec<ClassificationResult>,
}

impl AnalysisReport {
    pub fn new(source: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            model_id: model_id.into(),
            generated_at: Utc::now(),
            columns: Vec::new(),
        }
    }

    pub fn push(&mut self, result: ClassificationResult) {
        self.columns.push(result);
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn columns(&self) -> &[ClassificationResult] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn total_cost(&self) -> CostEstimate {
        self.columns.iter().map(|column| column.cost()).sum()
    }

    pub fn category_breakdown(&self) -> BTreeMap<PiiCategory, usize> {
        category_breakdown(&self.columns)
    }

    pub fn identified_pii_columns(&self) -> Vec<&ClassificationResult> {
        self.columns
            .iter()
            .filter(|column| column.classification().is_identifying())
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.columns
            .iter()
            .filter(|column| column.classification() == PiiCategory::Error)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, category: PiiCategory, cost: CostEstimate) -> ClassificationResult {
        ClassificationResult::new(
            name.to_string(),
            vec!["x".to_string()],
            category,
            0.8,
            "reason".to_string(),
            cost,
        )
    }

    #[test]
    fn test_category_string_roundtrip() {
        for category in PiiCategory::ALL {
            assert_eq!(category.as_str().parse::<PiiCategory>().unwrap(), category);
        }
        assert_eq!("hashed_pii".parse::<PiiCategory>().unwrap(), PiiCategory::HashedPii);
        assert!("CREDIT_CARD".parse::<PiiCategory>().is_err());
    }

    #[test]
    fn test_category_serializes_as_taxonomy_name() {
        let json = serde_json::to_string(&PiiCategory::HashedPii).unwrap();
        assert_eq!(json, "\"HASHED_PII\"");
        let json = serde_json::to_string(&PiiCategory::NoData).unwrap();
        assert_eq!(json, "\"NO_DATA\"");
    }

    #[test]
    fn test_is_identifying() {
        assert!(PiiCategory::Email.is_identifying());
        assert!(PiiCategory::HashedPii.is_identifying());
        assert!(!PiiCategory::NoPii.is_identifying());
        assert!(!PiiCategory::Unknown.is_identifying());
        assert!(!PiiCategory::Error.is_identifying());
        assert!(!PiiCategory::NoData.is_identifying());
    }

    #[test]
    fn test_cost_estimate_totals() {
        let cost = CostEstimate::new(100, 50, 0.00008, 0.00008);
        assert_eq!(cost.total_tokens(), 150);
        assert_eq!(cost.total_cost_usd(), 0.00016);
        assert!(CostEstimate::zero().is_zero());
    }

    #[test]
    fn test_cost_estimate_sum() {
        let costs = vec![
            CostEstimate::new(1000, 1000, 0.0008, 0.0016),
            CostEstimate::zero(),
            CostEstimate::new(500, 0, 0.0004, 0.0),
        ];
        let total: CostEstimate = costs.iter().sum();
        assert_eq!(total.input_tokens(), 1500);
        assert_eq!(total.output_tokens(), 1000);
        assert_eq!(total.total_tokens(), 2500);
        assert_eq!(total.input_cost_usd(), 0.0012);
        assert_eq!(total.total_cost_usd(), 0.0028);
    }

    #[test]
    fn test_result_serializes_flat_fields() {
        let result = result("email", PiiCategory::Email, CostEstimate::zero());
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["column_name"], "email");
        assert_eq!(value["classification"], "EMAIL");
        assert_eq!(value["confidence"], 0.8);
        assert_eq!(value["cost"]["total_tokens"], 0);
        assert_eq!(value["samples"][0], "x");
    }

    #[test]
    fn test_report_aggregates() {
        let mut report = AnalysisReport::new("people.csv", "amazon.titan-text-express-v1");
        report.push(result("email", PiiCategory::Email, CostEstimate::new(100, 10, 0.00008, 0.000016)));
        report.push(result("notes", PiiCategory::NoPii, CostEstimate::new(100, 10, 0.00008, 0.000016)));
        report.push(result("broken", PiiCategory::Error, CostEstimate::zero()));
        report.push(result("mystery", PiiCategory::Unknown, CostEstimate::new(50, 5, 0.00004, 0.000008)));

        assert_eq!(report.column_count(), 4);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.identified_pii_columns().len(), 1);
        assert_eq!(report.total_cost().input_tokens(), 250);
        assert_eq!(report.total_cost().output_tokens(), 25);

        let breakdown = report.category_breakdown();
        assert_eq!(breakdown.get(&PiiCategory::Email), Some(&1));
        assert_eq!(breakdown.get(&PiiCategory::Unknown), Some(&1));
        assert_eq!(breakdown.get(&PiiCategory::Ssn), None);
    }
}
