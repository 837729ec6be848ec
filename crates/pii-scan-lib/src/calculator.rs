use crate::data_structures::{ColumnSample, CostEstimate, ModelPricing};
use crate::pricing::PricingProvider;

/// Average characters per token for English text on the Titan models.
pub const AVG_CHARS_PER_TOKEN: f64 = 4.7;

/// Approximate prompt template length used by pre-flight estimates.
pub const PROMPT_TEMPLATE_CHARS: u64 = 200;
/// Allowance for the column name inside the prompt.
pub const COLUMN_NAME_CHARS: u64 = 15;
/// Expected length of a model answer.
pub const RESPONSE_CHARS: u64 = 50;

pub const DEFAULT_SAMPLES_PER_COLUMN: u64 = 5;
pub const DEFAULT_SAMPLE_LENGTH: u64 = 20;

/// Heuristic token count for `text`.
///
/// Whitespace runs are collapsed to one space and the ends trimmed before
/// measuring. The empty string is 0 tokens; any other input, whitespace-only
/// included, is at least 1.
pub fn estimate_tokens(text: &str) -> u64 {
    if text.is_empty() {
        return 0;
    }

    let mut words = 0u64;
    let mut word_chars = 0u64;
    for word in text.split_whitespace() {
        words += 1;
        word_chars += word.chars().count() as u64;
    }
    let cleaned_len = word_chars + words.saturating_sub(1);

    tokens_for_length(cleaned_len)
}

fn tokens_for_length(char_count: u64) -> u64 {
    let estimated = (char_count as f64 / AVG_CHARS_PER_TOKEN) as u64;
    estimated.saturating_add(1)
}

#[derive(Debug, Clone)]
pub struct CostCalculator {
    pricing: ModelPricing,
}

impl CostCalculator {
    pub fn new(pricing: ModelPricing) -> Self {
        Self { pricing }
    }

    pub fn for_model(provider: &PricingProvider, model: &str) -> Self {
        Self::new(provider.pricing_or_default(model))
    }

    pub fn pricing(&self) -> &ModelPricing {
        &self.pricing
    }

    pub fn calculate_cost(&self, input_tokens: u64, output_tokens: u64) -> CostEstimate {
        CostEstimate::new(
            input_tokens,
            output_tokens,
            self.pricing.input_cost(input_tokens),
            self.pricing.output_cost(output_tokens),
        )
    }

    /// Projects the cost of classifying `column_count` columns without
    /// calling the model. Token counts saturate at `u64::MAX`.
    pub fn estimate_csv_analysis_cost(
        &self,
        column_count: u64,
        avg_samples_per_column: u64,
        avg_sample_length: u64,
    ) -> CostEstimate {
        let column_input_chars = (PROMPT_TEMPLATE_CHARS + COLUMN_NAME_CHARS)
            .saturating_add(avg_samples_per_column.saturating_mul(avg_sample_length));
        let column_input_tokens = tokens_for_length(column_input_chars);
        let column_output_tokens = tokens_for_length(RESPONSE_CHARS);

        self.calculate_cost(
            column_input_tokens.saturating_mul(column_count),
            column_output_tokens.saturating_mul(column_count),
        )
    }

    /// Pre-flight estimate for already sampled columns. Columns without
    /// samples are skipped since they never reach the model.
    pub fn estimate_for_columns(&self, columns: &[ColumnSample]) -> CostEstimate {
        let populated: Vec<&ColumnSample> = columns.iter().filter(|c| !c.is_empty()).collect();
        if populated.is_empty() {
            return CostEstimate::zero();
        }

        let column_count = populated.len() as u64;
        let total_samples: u64 = populated.iter().map(|c| c.samples().len() as u64).sum();
        let total_chars: u64 = populated
            .iter()
            .flat_map(|c| c.samples())
            .map(|s| s.chars().count() as u64)
            .sum();

        self.estimate_csv_analysis_cost(
            column_count,
            total_samples / column_count,
            total_chars / total_samples,
        )
    }

    pub fn format_cost_display(cost: &CostEstimate) -> String {
        format!("${:.4} ({} tokens)", cost.total_cost_usd(), cost.total_tokens())
    }
}

impl Default for CostCalculator {
    fn default() -> Self {
        Self::new(PricingProvider::default_pricing())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_empty_and_whitespace() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("   "), 1);
        assert_eq!(estimate_tokens("\n\t"), 1);
    }

    #[test]
    fn test_estimate_tokens_length_rule() {
        assert_eq!(estimate_tokens(&"x".repeat(47)), 11);
        assert_eq!(estimate_tokens("x"), 1);
        assert_eq!(estimate_tokens(&"x".repeat(5)), 2);
    }

    #[test]
    fn test_estimate_tokens_collapses_whitespace() {
        assert_eq!(
            estimate_tokens("  hello    world \n\n again  "),
            estimate_tokens("hello world again")
        );
    }

    #[test]
    fn test_estimate_tokens_counts_chars_not_bytes() {
        // 10 two-byte characters
        assert_eq!(estimate_tokens(&"é".repeat(10)), 3);
    }

    #[test]
    fn test_estimate_tokens_monotonic() {
        let mut previous = 0;
        for len in 0..200 {
            let tokens = estimate_tokens(&"a".repeat(len));
            assert!(tokens >= previous);
            previous = tokens;
        }
    }

    #[test]
    fn test_calculate_cost_per_thousand() {
        let calculator = CostCalculator::default();
        let cost = calculator.calculate_cost(1000, 1000);
        assert_eq!(cost.input_cost_usd(), 0.0008);
        assert_eq!(cost.output_cost_usd(), 0.0016);
        assert_eq!(cost.total_cost_usd(), 0.0024);
        assert_eq!(cost.total_tokens(), 2000);
    }

    #[test]
    fn test_calculate_cost_zero() {
        let cost = CostCalculator::default().calculate_cost(0, 0);
        assert_eq!(cost, CostEstimate::zero());
    }

    #[test]
    fn test_calculate_cost_invariants() {
        let calculator = CostCalculator::default();
        for (a, b) in [(1, 1), (68, 11), (12345, 678), (999_999, 3)] {
            let cost = calculator.calculate_cost(a, b);
            assert_eq!(cost.total_tokens(), a + b);
            // Total is rounded from the raw sum, so it may differ from the
            // sum of the rounded parts by one unit in the sixth decimal.
            let summed = cost.input_cost_usd() + cost.output_cost_usd();
            assert!((cost.total_cost_usd() - summed).abs() <= 1e-6 + 1e-12);
        }
    }

    #[test]
    fn test_calculate_cost_rounds_total_from_raw_sum() {
        let cost = CostCalculator::default().calculate_cost(1, 1);
        assert_eq!(cost.input_cost_usd(), 0.000001);
        assert_eq!(cost.output_cost_usd(), 0.000002);
        assert_eq!(cost.total_cost_usd(), 0.000002);
    }

    #[test]
    fn test_estimate_saturates_on_huge_inputs() {
        let calculator = CostCalculator::default();

        let cost = calculator.estimate_csv_analysis_cost(u64::MAX / 10, 5, 20);
        assert_eq!(cost.input_tokens(), u64::MAX);
        assert_eq!(cost.output_tokens(), u64::MAX);
        assert_eq!(cost.total_tokens(), u64::MAX);
        assert!(cost.total_cost_usd().is_finite());
        assert!(cost.total_cost_usd() > 0.0);

        let cost = calculator.estimate_csv_analysis_cost(1, u64::MAX, u64::MAX);
        assert!(cost.input_tokens() > u64::MAX / 10);
        assert_eq!(cost.output_tokens(), 11);
    }

    #[test]
    fn test_calculate_cost_custom_pricing() {
        let calculator = CostCalculator::new(ModelPricing::new(0.0005, 0.0015));
        let cost = calculator.calculate_cost(2000, 1000);
        assert_eq!(cost.input_cost_usd(), 0.001);
        assert_eq!(cost.output_cost_usd(), 0.0015);
        assert_eq!(cost.total_cost_usd(), 0.0025);
    }

    #[test]
    fn test_estimate_csv_analysis_cost() {
        let calculator = CostCalculator::default();
        let estimate = calculator.estimate_csv_analysis_cost(
            10,
            DEFAULT_SAMPLES_PER_COLUMN,
            DEFAULT_SAMPLE_LENGTH,
        );

        // 315 chars -> 68 tokens in, 50 chars -> 11 tokens out, per column
        assert_eq!(estimate, calculator.calculate_cost(680, 110));
        assert_eq!(estimate.input_cost_usd(), 0.000544);
        assert_eq!(estimate.output_cost_usd(), 0.000176);
        assert_eq!(estimate.total_cost_usd(), 0.00072);

        let again = calculator.estimate_csv_analysis_cost(10, 5, 20);
        assert_eq!(estimate, again);
    }

    #[test]
    fn test_estimate_csv_analysis_cost_no_columns() {
        let estimate = CostCalculator::default().estimate_csv_analysis_cost(0, 5, 20);
        assert!(estimate.is_zero());
    }

    #[test]
    fn test_estimate_for_columns() {
        let calculator = CostCalculator::default();
        let columns = vec![
            ColumnSample::new("email", vec!["a@b.com".to_string(), "c@d.org".to_string()]),
            ColumnSample::new("empty", vec![]),
            ColumnSample::new("zip", vec!["12345".to_string(), "54321".to_string()]),
        ];

        // 2 populated columns, 2 samples each, (7+7+5+5)/4 = 6 chars average
        let expected = calculator.estimate_csv_analysis_cost(2, 2, 6);
        assert_eq!(calculator.estimate_for_columns(&columns), expected);
        assert!(calculator.estimate_for_columns(&[]).is_zero());
    }

    #[test]
    fn test_format_cost_display() {
        let cost = CostCalculator::default().calculate_cost(1000, 1000);
        assert_eq!(CostCalculator::format_cost_display(&cost), "$0.0024 (2000 tokens)");
    }
}
