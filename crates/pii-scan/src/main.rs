use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use pii_column_classifier::prelude::*;
use pii_column_classifier::{
    category_breakdown, BedrockTitanClient, ColumnSample, PricingProvider, ScanConfig,
};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    DefaultTerminal, Frame,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod widgets;
use widgets::*;

const CONFIG_DIR: &str = "~/.config/pii-scan";

#[derive(Debug, Clone, PartialEq)]
pub enum PopupType {
    ColumnDetail,
    Summary,
}

#[derive(Parser, Debug)]
#[clap(author = "Red", version, about)]
struct Args {
    #[arg(short = 'v', global = true)]
    verbose: bool,

    /// Model id; persisted to the config file when given
    #[arg(short = 'm', long = "model", global = true)]
    model: Option<String>,

    #[arg(short = 'c', long = "config", global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify every column of a CSV file
    Scan {
        file: PathBuf,

        #[arg(short = 'n', long = "max-samples")]
        max_samples: Option<usize>,

        /// Write the JSON report here when the scan finishes
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,

        #[arg(long, conflicts_with = "plain")]
        json: bool,

        #[arg(long)]
        plain: bool,
    },
    /// Classify a single column from values given on the command line
    Column {
        name: String,
        values: Vec<String>,

        #[arg(long)]
        json: bool,
    },
    /// Estimate the cost of a scan without calling the model
    Estimate {
        file: Option<PathBuf>,

        #[arg(long, required_unless_present = "file")]
        columns: Option<u64>,

        #[arg(long, default_value_t = 5)]
        samples: u64,

        #[arg(long = "sample-length", default_value_t = 20)]
        sample_length: u64,

        #[arg(long)]
        json: bool,
    },
    /// List models with known pricing
    Models,
}

impl Command {
    fn is_interactive(&self) -> bool {
        matches!(self, Command::Scan { json: false, plain: false, .. })
    }
}

fn get_config_dir() -> PathBuf {
    PathBuf::from(shellexpand::tilde(CONFIG_DIR).as_ref())
}

fn get_config_path(override_path: Option<&str>) -> PathBuf {
    match override_path {
        Some(path) => PathBuf::from(shellexpand::tilde(path).as_ref()),
        None => get_config_dir().join("config.json"),
    }
}

fn load_config(args: &Args) -> Result<ScanConfig> {
    let config_path = get_config_path(args.config.as_deref());
    let mut config = ScanConfig::load(&config_path)?;
    config.apply_env();

    // A model given on the command line becomes the new default
    if let Some(model) = &args.model {
        config.model_id = model.clone();
        if let Err(e) = config.save(&config_path) {
            warn!("Could not save config: {}", e);
        }
    }

    Ok(config)
}

fn init_logging(verbose: bool, to_file: bool) -> Result<Option<WorkerGuard>> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if to_file {
        // The dashboard owns the terminal
        let log_dir = get_config_dir();
        fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create {}", log_dir.display()))?;
        let appender = tracing_appender::rolling::never(&log_dir, "pii-scan.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false),
            )
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        Ok(None)
    }
}

fn build_analyzer(config: &ScanConfig, max_samples: Option<usize>) -> Result<CsvAnalyzer> {
    let mut client = BedrockTitanClient::from_env(
        &config.region,
        config.model_id.clone(),
        config.decoding,
        config.request_timeout(),
    )?;
    if let Some(endpoint) = &config.endpoint {
        client = client.with_endpoint(endpoint.clone());
    }

    Ok(CsvAnalyzer::new(
        Arc::new(client),
        build_calculator(config),
        CsvLoader::new(max_samples.unwrap_or(config.max_samples_per_column)),
    ))
}

fn build_calculator(config: &ScanConfig) -> CostCalculator {
    CostCalculator::new(config.resolve_pricing(&PricingProvider::new()))
}

fn write_report(report: &AnalysisReport, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(report)?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    info!(path = %path.display(), "report written");
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars.saturating_sub(3)).collect::<String>() + "..."
    }
}

fn print_results(results: &[ClassificationResult]) {
    println!(
        "{:<24} {:<12} {:>5} {:>7} {:>10}  {}",
        "COLUMN", "CATEGORY", "CONF", "TOKENS", "COST", "REASON"
    );
    for result in results {
        println!(
            "{:<24} {:<12} {:>5.2} {:>7} {:>10.6}  {}",
            truncate(result.column_name(), 24),
            result.classification(),
            result.confidence(),
            result.cost().total_tokens(),
            result.cost().total_cost_usd(),
            truncate(&result.reasoning().replace('\n', " "), 60)
        );
    }
}

fn print_cost(label: &str, cost: &CostEstimate) {
    println!(
        "{}: {} (in {} / out {})",
        label,
        CostCalculator::format_cost_display(cost),
        cost.input_tokens(),
        cost.output_tokens()
    );
}

async fn run_scan_batch(
    analyzer: CsvAnalyzer,
    file: &Path,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let report = analyzer.analyze_file(file).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_results(report.columns());
        println!();
        println!(
            "{} of {} columns hold PII, {} failed",
            report.identified_pii_columns().len(),
            report.column_count(),
            report.error_count()
        );
        print_cost("Total cost", &report.total_cost());
    }

    if let Some(path) = output {
        write_report(&report, path)?;
    }
    Ok(())
}

async fn run_column(analyzer: CsvAnalyzer, name: &str, values: Vec<String>, json: bool) -> Result<()> {
    // Same sampling rules as a CSV column
    let mut samples: Vec<String> = Vec::new();
    for value in values {
        if !value.trim().is_empty() && !samples.contains(&value) {
            samples.push(value);
        }
    }
    samples.truncate(analyzer.loader().max_samples_per_column());

    let result = analyzer.classifier().classify_column(name, &samples).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_results(std::slice::from_ref(&result));
        println!();
        print_cost("Cost", result.cost());
    }
    Ok(())
}

fn run_estimate(
    config: &ScanConfig,
    file: Option<&Path>,
    columns: Option<u64>,
    samples: u64,
    sample_length: u64,
    json: bool,
) -> Result<()> {
    let calculator = build_calculator(config);
    let estimate = match (file, columns) {
        (Some(path), _) => {
            let loaded = CsvLoader::new(config.max_samples_per_column).load_from_file(path)?;
            calculator.estimate_for_columns(&loaded)
        }
        (None, Some(count)) => calculator.estimate_csv_analysis_cost(count, samples, sample_length),
        (None, None) => anyhow::bail!("Give a CSV file or --columns"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&estimate)?);
    } else {
        println!("Model: {}", config.model_id);
        print_cost("Estimated cost", &estimate);
    }
    Ok(())
}

fn run_models(config: &ScanConfig) {
    let provider = PricingProvider::new();
    println!("{:<34} {:>12} {:>12}", "MODEL", "IN $/1K", "OUT $/1K");
    for model in provider.supported_models() {
        if let Some(pricing) = provider.get_pricing(model) {
            let marker = if *model == config.model_id { "*" } else { " " };
            println!(
                "{}{:<33} {:>12.5} {:>12.5}",
                marker,
                model,
                pricing.input_rate_per_1k(),
                pricing.output_rate_per_1k()
            );
        }
    }
}

pub struct AppState {
    pub source: String,
    pub model_id: String,
    pub columns: Vec<ColumnSample>,
    pub results: Vec<ClassificationResult>,
    pub estimate: CostEstimate,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_update: DateTime<Utc>,
    pub is_loading: bool,
    pub spinner_state: usize,
    pub selected: usize,
    pub error_message: Option<String>,
    pub active_popup: Option<PopupType>,
}

impl AppState {
    fn new(source: String, model_id: String, columns: Vec<ColumnSample>, estimate: CostEstimate) -> Self {
        Self {
            source,
            model_id,
            columns,
            results: Vec::new(),
            estimate,
            started_at: Utc::now(),
            finished_at: None,
            last_update: Utc::now(),
            is_loading: true,
            spinner_state: 0,
            selected: 0,
            error_message: None,
            active_popup: None,
        }
    }

    fn record_result(&mut self, result: ClassificationResult) {
        self.results.push(result);
        self.last_update = Utc::now();
    }

    fn finish(&mut self) {
        self.is_loading = false;
        self.finished_at = Some(Utc::now());
        self.last_update = Utc::now();
    }

    fn update_spinner(&mut self) {
        self.spinner_state = (self.spinner_state + 1) % 10;
    }

    pub fn get_spinner_char(&self) -> char {
        match self.spinner_state {
            0 => '⠋',
            1 => '⠙',
            2 => '⠹',
            3 => '⠸',
            4 => '⠼',
            5 => '⠴',
            6 => '⠦',
            7 => '⠧',
            8 => '⠇',
            9 => '⠏',
            _ => '⠋',
        }
    }

    pub fn total_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn completed_columns(&self) -> usize {
        self.results.len()
    }

    pub fn get_progress_percentage(&self) -> f64 {
        if self.columns.is_empty() {
            return 100.0;
        }
        (self.completed_columns() as f64 / self.total_columns() as f64) * 100.0
    }

    pub fn get_spent_cost(&self) -> CostEstimate {
        self.results.iter().map(|result| result.cost()).sum()
    }

    /// Spend so far as a share of the pre-flight estimate; may exceed 100.
    pub fn get_spend_percentage(&self) -> f64 {
        let estimated = self.estimate.total_cost_usd();
        if estimated <= 0.0 {
            return 0.0;
        }
        (self.get_spent_cost().total_cost_usd() / estimated) * 100.0
    }

    pub fn get_current_column(&self) -> Option<&str> {
        if !self.is_loading {
            return None;
        }
        self.columns
            .get(self.completed_columns())
            .map(|column| column.column_name())
    }

    pub fn get_pii_count(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.classification().is_identifying())
            .count()
    }

    pub fn get_count(&self, category: PiiCategory) -> usize {
        self.results
            .iter()
            .filter(|result| result.classification() == category)
            .count()
    }

    pub fn get_category_breakdown(&self) -> BTreeMap<PiiCategory, usize> {
        category_breakdown(&self.results)
    }

    pub fn get_elapsed_seconds(&self) -> i64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_seconds().max(0)
    }

    pub fn selected_result(&self) -> Option<&ClassificationResult> {
        self.results.get(self.selected)
    }

    fn select_next(&mut self) {
        if self.selected + 1 < self.results.len() {
            self.selected += 1;
        }
    }

    fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn toggle_popup(&mut self, popup: PopupType) {
        self.active_popup = if self.active_popup.as_ref() == Some(&popup) {
            None
        } else {
            Some(popup)
        };
    }
}

pub struct App {
    state: Arc<Mutex<AppState>>,
    exit: bool,
}

impl App {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            exit: false,
        }
    }

    pub async fn run(
        &mut self,
        terminal: &mut DefaultTerminal,
        analyzer: CsvAnalyzer,
        output: Option<PathBuf>,
    ) -> Result<()> {
        let state_clone = Arc::clone(&self.state);
        let (source, columns) = match self.state.lock() {
            Ok(state) => (state.source.clone(), state.columns.clone()),
            Err(_) => anyhow::bail!("Dashboard state is poisoned"),
        };

        tokio::spawn(async move {
            let report = analyzer
                .analyze_columns_with_progress(&source, &columns, |_, result| {
                    if let Ok(mut state) = state_clone.lock() {
                        state.record_result(result.clone());
                    }
                })
                .await;

            let write_error = output
                .as_deref()
                .and_then(|path| write_report(&report, path).err());

            if let Ok(mut state) = state_clone.lock() {
                state.finish();
                if let Some(e) = write_error {
                    state.error_message = Some(e.to_string());
                }
            }
        });

        let mut tick_interval = interval(Duration::from_millis(100));

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    if let Ok(mut state) = self.state.lock() {
                        if state.is_loading {
                            state.update_spinner();
                        }
                    }

                    terminal.draw(|frame| self.draw(frame))?;
                }

                _ = async {
                    if event::poll(Duration::from_millis(0)).unwrap_or(false) {
                        if let Ok(event) = event::read() {
                            self.handle_event(event);
                        }
                    }
                } => {}
            }

            if self.exit {
                break;
            }
        }

        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(6),
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(area);

        if let Ok(state) = self.state.lock() {
            HeaderWidget::render(frame, chunks[0], &state);
            ProgressBarsWidget::render(frame, chunks[1], &state);
            StatisticsWidget::render(frame, chunks[2], &state);
            ResultsWidget::render(frame, chunks[3], &state);
            ShortcutsWidget::render(frame, chunks[4], &state);

            match &state.active_popup {
                Some(PopupType::ColumnDetail) => {
                    PopupWidget::render(frame, area, &state);
                }
                Some(PopupType::Summary) => {
                    SummaryPopupWidget::render(frame, area, &state);
                }
                None => {}
            }
        }
    }

    fn handle_event(&mut self, event: Event) {
        if let Event::Key(key_event) = event {
            if key_event.kind == KeyEventKind::Press {
                match key_event.code {
                    KeyCode::Char('q') => self.exit = true,
                    KeyCode::Down | KeyCode::Char('j') => {
                        if let Ok(mut state) = self.state.lock() {
                            state.select_next();
                        }
                    }
                    KeyCode::Up | KeyCode::Char('k') => {
                        if let Ok(mut state) = self.state.lock() {
                            state.select_previous();
                        }
                    }
                    KeyCode::Enter => {
                        if let Ok(mut state) = self.state.lock() {
                            if state.selected_result().is_some() {
                                state.toggle_popup(PopupType::ColumnDetail);
                            }
                        }
                    }
                    KeyCode::Char('s') => {
                        if let Ok(mut state) = self.state.lock() {
                            state.toggle_popup(PopupType::Summary);
                        }
                    }
                    KeyCode::Esc => {
                        if let Ok(mut state) = self.state.lock() {
                            state.active_popup = None;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn summary_line(&self) -> Option<String> {
        let state = self.state.lock().ok()?;
        Some(format!(
            "{}: {}/{} columns scanned, {} hold PII, {}",
            state.source,
            state.completed_columns(),
            state.total_columns(),
            state.get_pii_count(),
            CostCalculator::format_cost_display(&state.get_spent_cost())
        ))
    }
}

async fn run_dashboard(
    analyzer: CsvAnalyzer,
    file: &Path,
    output: Option<PathBuf>,
) -> Result<()> {
    // Load before taking over the terminal so file errors print normally
    let columns = analyzer.load_columns(file)?;
    let estimate = analyzer.estimate_columns(&columns);
    let state = AppState::new(
        file.display().to_string(),
        analyzer.classifier().model_id().to_string(),
        columns,
        estimate,
    );

    let mut terminal = ratatui::init();
    let mut app = App::new(state);

    let result = app.run(&mut terminal, analyzer, output).await;

    ratatui::restore();

    if let Some(line) = app.summary_line() {
        println!("{}", line);
    }

    result
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(args.verbose, args.command.is_interactive())?;

    let config = load_config(&args)?;

    match &args.command {
        Command::Scan {
            file,
            max_samples,
            output,
            json,
            plain,
        } => {
            let analyzer = build_analyzer(&config, *max_samples)?;
            if *json || *plain {
                run_scan_batch(analyzer, file, output.as_deref(), *json).await
            } else {
                run_dashboard(analyzer, file, output.clone()).await
            }
        }
        Command::Column { name, values, json } => {
            let analyzer = build_analyzer(&config, None)?;
            run_column(analyzer, name, values.clone(), *json).await
        }
        Command::Estimate {
            file,
            columns,
            samples,
            sample_length,
            json,
        } => run_estimate(&config, file.as_deref(), *columns, *samples, *sample_length, *json),
        Command::Models => {
            run_models(&config);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, category: PiiCategory, tokens: u64) -> ClassificationResult {
        let cost = CostCalculator::default().calculate_cost(tokens, tokens);
        ClassificationResult::new(
            name.to_string(),
            vec!["value".to_string()],
            category,
            0.8,
            "reason".to_string(),
            cost,
        )
    }

    fn state() -> AppState {
        let columns = vec![
            ColumnSample::new("email", vec!["a@b.com".to_string()]),
            ColumnSample::new("ssn", vec!["123-45-6789".to_string()]),
            ColumnSample::new("notes", vec!["hello".to_string()]),
        ];
        let estimate = CostCalculator::default().estimate_for_columns(&columns);
        AppState::new("people.csv".to_string(), "model".to_string(), columns, estimate)
    }

    #[test]
    fn test_progress_tracking() {
        let mut state = state();
        assert_eq!(state.get_progress_percentage(), 0.0);
        assert_eq!(state.get_current_column(), Some("email"));

        state.record_result(result("email", PiiCategory::Email, 100));
        assert_eq!(state.get_current_column(), Some("ssn"));
        assert!((state.get_progress_percentage() - 100.0 / 3.0).abs() < 1e-9);

        state.record_result(result("ssn", PiiCategory::Error, 0));
        state.record_result(result("notes", PiiCategory::NoPii, 100));
        state.finish();

        assert_eq!(state.get_progress_percentage(), 100.0);
        assert_eq!(state.get_current_column(), None);
        assert_eq!(state.get_pii_count(), 1);
        assert_eq!(state.get_count(PiiCategory::Error), 1);
        assert_eq!(state.get_spent_cost().input_tokens(), 200);
        assert!(state.get_spend_percentage() > 0.0);

        let mut report = AnalysisReport::new("people.csv", "model");
        for result in &state.results {
            report.push(result.clone());
        }
        let breakdown = state.get_category_breakdown();
        assert_eq!(breakdown, report.category_breakdown());
        assert_eq!(breakdown.get(&PiiCategory::Email), Some(&1));
        assert_eq!(breakdown.get(&PiiCategory::NoPii), Some(&1));
    }

    #[test]
    fn test_selection_and_popups() {
        let mut state = state();
        state.select_next();
        assert_eq!(state.selected, 0);

        state.record_result(result("email", PiiCategory::Email, 10));
        state.record_result(result("ssn", PiiCategory::Ssn, 10));
        state.select_next();
        state.select_next();
        assert_eq!(state.selected, 1);
        assert_eq!(state.selected_result().map(|r| r.column_name()), Some("ssn"));
        state.select_previous();
        state.select_previous();
        assert_eq!(state.selected, 0);

        state.toggle_popup(PopupType::Summary);
        assert_eq!(state.active_popup, Some(PopupType::Summary));
        state.toggle_popup(PopupType::ColumnDetail);
        assert_eq!(state.active_popup, Some(PopupType::ColumnDetail));
        state.toggle_popup(PopupType::ColumnDetail);
        assert_eq!(state.active_popup, None);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer column name", 10), "a much ...");
    }

    #[test]
    fn test_interactive_only_for_default_scan() {
        let args = Args::parse_from(["pii-scan", "scan", "people.csv"]);
        assert!(args.command.is_interactive());
        let args = Args::parse_from(["pii-scan", "scan", "people.csv", "--json"]);
        assert!(!args.command.is_interactive());
        let args = Args::parse_from(["pii-scan", "estimate", "--columns", "10"]);
        assert!(!args.command.is_interactive());
    }

    #[test]
    fn test_estimate_requires_file_or_columns() {
        assert!(Args::try_parse_from(["pii-scan", "estimate"]).is_err());
        assert!(Args::try_parse_from(["pii-scan", "estimate", "data.csv"]).is_ok());
    }
}
