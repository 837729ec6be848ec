use crate::backend::ModelClient;
use crate::calculator::CostCalculator;
use crate::classifier::ColumnClassifier;
use crate::data_structures::{AnalysisReport, ClassificationResult, ColumnSample, CostEstimate};
use crate::loader::CsvLoader;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Runs the classifier over every column of a CSV, one column at a time.
pub struct CsvAnalyzer {
    classifier: ColumnClassifier,
    loader: CsvLoader,
}

impl CsvAnalyzer {
    pub fn new(model: Arc<dyn ModelClient>, calculator: CostCalculator, loader: CsvLoader) -> Self {
        Self {
            classifier: ColumnClassifier::new(model, calculator),
            loader,
        }
    }

    pub fn classifier(&self) -> &ColumnClassifier {
        &self.classifier
    }

    pub fn loader(&self) -> &CsvLoader {
        &self.loader
    }

    pub fn load_columns<P: AsRef<Path>>(&self, path: P) -> Result<Vec<ColumnSample>> {
        self.loader.load_from_file(path)
    }

    pub fn estimate_columns(&self, columns: &[ColumnSample]) -> CostEstimate {
        self.classifier.calculator().estimate_for_columns(columns)
    }

    pub fn estimate_file<P: AsRef<Path>>(&self, path: P) -> Result<CostEstimate> {
        let columns = self.load_columns(path)?;
        Ok(self.estimate_columns(&columns))
    }

    pub async fn analyze_file<P: AsRef<Path>>(&self, path: P) -> Result<AnalysisReport> {
        let path = path.as_ref();
        let columns = self.load_columns(path)?;
        Ok(self.analyze_columns(&path.display().to_string(), &columns).await)
    }

    pub async fn analyze_columns(&self, source: &str, columns: &[ColumnSample]) -> AnalysisReport {
        self.analyze_columns_with_progress(source, columns, |_, _| {}).await
    }

    /// Calls `on_column(index, result)` as each column finishes. A failed
    /// column is recorded as `ERROR` and the batch carries on.
    pub async fn analyze_columns_with_progress<F>(
        &self,
        source: &str,
        columns: &[ColumnSample],
        mut on_column: F,
    ) -> AnalysisReport
    where
        F: FnMut(usize, &ClassificationResult),
    {
        let mut report = AnalysisReport::new(source, self.classifier.model_id());

        for (index, column) in columns.iter().enumerate() {
            let result = self.classifier.classify(column).await;
            on_column(index, &result);
            report.push(result);
        }

        let total = report.total_cost();
        info!(
            source,
            columns = report.column_count(),
            pii_columns = report.identified_pii_columns().len(),
            errors = report.error_count(),
            total_cost_usd = total.total_cost_usd(),
            "analysis finished"
        );

        report
    }
}
