//! Data-quality analytics for uploaded datasets
//!
//! Everything is computed locally from a [`Dataset`]; percentages are in
//! the 0-100 range and are reported as 0 for empty inputs rather than NaN.

use crate::dataset::Dataset;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Inferred column type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ColumnType {
    Numeric,
    Date,
    Text,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Numeric => write!(f, "Numeric"),
            ColumnType::Date => write!(f, "Date"),
            ColumnType::Text => write!(f, "Text"),
        }
    }
}

/// Analytics tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Non-empty values sampled per column for type inference
    pub type_sample_size: usize,
    /// Share of the sample that must parse for a type to be chosen
    pub type_threshold: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            type_sample_size: 100,
            type_threshold: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicStats {
    pub total_rows: usize,
    pub total_columns: usize,
    pub total_cells: usize,
    pub empty_cells: usize,
    pub numeric_columns: usize,
    pub date_columns: usize,
    pub text_columns: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    pub completeness: f64,
    pub consistency: f64,
    pub uniqueness: f64,
    /// Mean of the three scores above
    pub overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub inferred_type: ColumnType,
    pub unique_count: usize,
    pub total_non_empty: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub column: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingValues {
    pub column: String,
    pub missing: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudTally {
    pub column: String,
    pub fraud_count: usize,
    pub legitimate_count: usize,
    /// Fraud share of labelled rows, in percent
    pub fraud_ratio: f64,
}

/// Pearson correlations between numeric columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Pairs with |r| at or above `threshold`, strongest first
    pub fn strong_pairs(&self, threshold: f64) -> Vec<(String, String, f64)> {
        let mut pairs = Vec::new();
        for i in 0..self.columns.len() {
            for j in (i + 1)..self.columns.len() {
                let r = self.values[i][j];
                if r.abs() >= threshold {
                    pairs.push((self.columns[i].clone(), self.columns[j].clone(), r));
                }
            }
        }
        pairs.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()));
        pairs
    }
}

/// Complete data-quality report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub basic: BasicStats,
    pub quality: QualityScores,
    pub columns: Vec<ColumnProfile>,
    pub distributions: Vec<Distribution>,
    pub correlation: CorrelationMatrix,
    pub missing: Vec<MissingValues>,
    pub fraud: Option<FraudTally>,
}

impl Report {
    /// Export as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn distribution(&self, name: &str) -> Option<&Distribution> {
        self.distributions.iter().find(|d| d.column == name)
    }
}

/// Analyze with default settings
pub fn analyze(dataset: &Dataset) -> Report {
    Reporter::new().analyze(dataset)
}

/// Dataset reporter
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    config: AnalyticsConfig,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, dataset: &Dataset) -> Report {
        let columns: Vec<ColumnProfile> = (0..dataset.column_count())
            .map(|i| self.profile_column(dataset, i))
            .collect();

        let numeric: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.inferred_type == ColumnType::Numeric)
            .map(|(i, _)| i)
            .collect();

        let total_rows = dataset.row_count();
        let total_cells = total_rows * dataset.column_count();
        let empty_cells = dataset
            .rows
            .iter()
            .flat_map(|r| r.iter())
            .filter(|v| v.is_empty())
            .count();

        let basic = BasicStats {
            total_rows,
            total_columns: dataset.column_count(),
            total_cells,
            empty_cells,
            numeric_columns: numeric.len(),
            date_columns: count_type(&columns, ColumnType::Date),
            text_columns: count_type(&columns, ColumnType::Text),
        };

        let completeness = percentage(total_cells.saturating_sub(empty_cells), total_cells);
        let complete_rows = dataset
            .rows
            .iter()
            .filter(|r| r.iter().all(|v| !v.is_empty()))
            .count();
        let consistency = percentage(complete_rows, total_rows);
        let uniqueness = percentage(distinct_rows(dataset), total_rows);

        let quality = QualityScores {
            completeness,
            consistency,
            uniqueness,
            overall: (completeness + consistency + uniqueness) / 3.0,
        };

        let distributions = numeric
            .iter()
            .filter_map(|&i| distribution(&dataset.columns[i], dataset.column_values(i)))
            .collect();

        let missing = (0..dataset.column_count())
            .map(|i| {
                let count = dataset.column_values(i).filter(|v| v.is_empty()).count();
                MissingValues {
                    column: dataset.columns[i].clone(),
                    missing: count,
                    percentage: percentage(count, total_rows),
                }
            })
            .collect();

        Report {
            basic,
            quality,
            columns,
            distributions,
            correlation: correlation_matrix(dataset, &numeric),
            missing,
            fraud: fraud_tally(dataset),
        }
    }

    fn profile_column(&self, dataset: &Dataset, index: usize) -> ColumnProfile {
        let non_empty: Vec<&str> = dataset
            .column_values(index)
            .filter(|v| !v.is_empty())
            .collect();
        let unique: HashSet<&str> = non_empty.iter().copied().collect();

        ColumnProfile {
            name: dataset.columns[index].clone(),
            inferred_type: self.infer_type(&non_empty),
            unique_count: unique.len(),
            total_non_empty: non_empty.len(),
        }
    }

    /// Classify a column from its non-empty values
    pub fn infer_type(&self, non_empty: &[&str]) -> ColumnType {
        let sample = &non_empty[..non_empty.len().min(self.config.type_sample_size)];
        if sample.is_empty() {
            return ColumnType::Text;
        }

        let share = |hits: usize| hits as f64 / sample.len() as f64;
        let numeric = sample.iter().filter(|v| parse_number(v).is_some()).count();
        if share(numeric) >= self.config.type_threshold {
            return ColumnType::Numeric;
        }
        let dates = sample.iter().filter(|v| parse_date(v).is_some()).count();
        if share(dates) >= self.config.type_threshold {
            return ColumnType::Date;
        }
        ColumnType::Text
    }
}

fn count_type(columns: &[ColumnProfile], kind: ColumnType) -> usize {
    columns.iter().filter(|c| c.inferred_type == kind).count()
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Number of distinct rows, compared cell by cell
fn distinct_rows(dataset: &Dataset) -> usize {
    dataset
        .rows
        .iter()
        .map(Vec::as_slice)
        .collect::<HashSet<&[String]>>()
        .len()
}

/// Finite number, or `None`
pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Calendar date or timestamp in one of the common upload formats
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = crate::parse_timestamp(value) {
        return Some(dt);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc2822(value) {
        return Some(dt.naive_utc());
    }
    for format in ["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    ["%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y", "%b %d %Y", "%d %b %Y"]
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Median of an unsorted slice; mean of the middle pair for even lengths
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn distribution<'a>(name: &str, values: impl Iterator<Item = &'a str>) -> Option<Distribution> {
    let numbers: Vec<f64> = values.filter_map(parse_number).collect();
    let count = numbers.len();
    if count == 0 {
        return None;
    }

    let mean = numbers.iter().sum::<f64>() / count as f64;
    let variance = numbers.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

    Some(Distribution {
        column: name.to_string(),
        count,
        min: numbers.iter().copied().fold(f64::INFINITY, f64::min),
        max: numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean,
        median: median(&numbers)?,
        std_dev: variance.sqrt(),
    })
}

/// Pearson correlation over paired observations. Returns 0 when there are
/// fewer than two pairs or either side has no variance.
pub fn pearson(pairs: &[(f64, f64)]) -> f64 {
    let n = pairs.len();
    if n < 2 {
        return 0.0;
    }
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n as f64;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (sxy / denom).clamp(-1.0, 1.0)
}

fn correlation_matrix(dataset: &Dataset, numeric: &[usize]) -> CorrelationMatrix {
    let parsed: Vec<Vec<Option<f64>>> = numeric
        .iter()
        .map(|&i| dataset.column_values(i).map(parse_number).collect())
        .collect();

    let n = numeric.len();
    let mut values = vec![vec![0.0; n]; n];
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let pairs: Vec<(f64, f64)> = parsed[i]
                .iter()
                .zip(&parsed[j])
                .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                .collect();
            let r = pearson(&pairs);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        columns: numeric.iter().map(|&i| dataset.columns[i].clone()).collect(),
        values,
    }
}

fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)fraud|class|target").unwrap())
}

fn is_fraud_label(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "1" | "true" | "yes" | "fraud" | "fraudulent"
    ) || parse_number(value) == Some(1.0)
}

fn fraud_tally(dataset: &Dataset) -> Option<FraudTally> {
    let index = dataset
        .columns
        .iter()
        .position(|c| label_pattern().is_match(c))?;

    let (mut fraud_count, mut legitimate_count) = (0, 0);
    for value in dataset.column_values(index).filter(|v| !v.is_empty()) {
        if is_fraud_label(value) {
            fraud_count += 1;
        } else {
            legitimate_count += 1;
        }
    }

    Some(FraudTally {
        column: dataset.columns[index].clone(),
        fraud_count,
        legitimate_count,
        fraud_ratio: percentage(fraud_count, fraud_count + legitimate_count),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_columns_correlate_exactly() {
        let report = analyze(&Dataset::parse("a,b\n1,2\n3,4\n5,6"));

        assert_eq!(report.column("a").unwrap().inferred_type, ColumnType::Numeric);
        assert_eq!(report.column("b").unwrap().inferred_type, ColumnType::Numeric);
        assert_eq!(report.correlation.get("a", "b"), Some(1.0));
        assert_eq!(report.correlation.get("b", "a"), Some(1.0));
        assert_eq!(report.correlation.get("a", "a"), Some(1.0));
    }

    #[test]
    fn test_negative_correlation() {
        let report = analyze(&Dataset::parse("x,y\n1,10\n2,8\n3,6\n4,4"));
        let r = report.correlation.get("x", "y").unwrap();
        assert!((r + 1.0).abs() < 1e-12);
        assert_eq!(report.correlation.strong_pairs(0.9).len(), 1);
    }

    #[test]
    fn test_missing_values_excluded_from_correlation() {
        let report = analyze(&Dataset::parse("x,y\n1,2\n2,\n3,6\n4,8\n5,10"));
        assert_eq!(report.correlation.get("x", "y"), Some(1.0));
    }

    #[test]
    fn test_constant_column_has_zero_correlation() {
        let report = analyze(&Dataset::parse("x,y\n1,5\n2,5\n3,5"));
        assert_eq!(report.correlation.get("x", "y"), Some(0.0));
        assert_eq!(report.correlation.get("y", "y"), Some(1.0));
    }

    #[test]
    fn test_empty_dataset_reports_zero() {
        for text in ["", "a,b,c\n"] {
            let report = analyze(&Dataset::parse(text));
            assert_eq!(report.quality.completeness, 0.0);
            assert_eq!(report.quality.consistency, 0.0);
            assert_eq!(report.quality.uniqueness, 0.0);
            assert_eq!(report.quality.overall, 0.0);
            assert!(report.distributions.is_empty());
            assert!(report.missing.iter().all(|m| m.percentage == 0.0));
        }
    }

    #[test]
    fn test_quality_percentages() {
        let ds = Dataset::parse("a,b\n1,x\n1,x\n2,\n3,y");
        let report = analyze(&ds);

        assert_eq!(report.basic.total_cells, 8);
        assert_eq!(report.basic.empty_cells, 1);
        assert_eq!(report.quality.completeness, 87.5);
        assert_eq!(report.quality.consistency, 75.0);
        assert_eq!(report.quality.uniqueness, 75.0);

        let missing_b = report.missing.iter().find(|m| m.column == "b").unwrap();
        assert_eq!(missing_b.missing, 1);
        assert_eq!(missing_b.percentage, 25.0);
    }

    #[test]
    fn test_empty_cell_rows_count_against_quality() {
        let report = analyze(&Dataset::parse("a,b\n1,2\n,\n"));

        assert_eq!(report.basic.total_rows, 2);
        assert_eq!(report.basic.empty_cells, 2);
        assert_eq!(report.quality.completeness, 50.0);
        assert_eq!(report.quality.consistency, 50.0);
    }

    #[test]
    fn test_uniqueness_compares_whole_rows() {
        let report = analyze(&Dataset::parse("a,b\nx,yz\nxy,z\nx,yz"));
        assert!((report.quality.uniqueness - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_type_inference() {
        let ds = Dataset::parse(
            "amount,when,who\n\
             10,2025-01-01,alice\n\
             12.5,2025-01-02T10:00:00,bob\n\
             n/a,01/03/2025,carol\n\
             40,2025-01-04 08:30:00,dave\n\
             55,2025-01-05,erin",
        );
        let report = analyze(&ds);

        assert_eq!(report.column("amount").unwrap().inferred_type, ColumnType::Numeric);
        assert_eq!(report.column("when").unwrap().inferred_type, ColumnType::Date);
        assert_eq!(report.column("who").unwrap().inferred_type, ColumnType::Text);
        assert_eq!(report.basic.numeric_columns, 1);
        assert_eq!(report.basic.date_columns, 1);
    }

    #[test]
    fn test_inference_below_threshold_is_text() {
        let reporter = Reporter::new();
        assert_eq!(reporter.infer_type(&["1", "2", "x", "y"]), ColumnType::Text);
        assert_eq!(reporter.infer_type(&[]), ColumnType::Text);
        assert_eq!(
            reporter.infer_type(&["1", "2", "3", "4", "x"]),
            ColumnType::Numeric
        );
    }

    #[test]
    fn test_sample_limited_to_first_values() {
        let reporter = Reporter::with_config(AnalyticsConfig {
            type_sample_size: 3,
            ..Default::default()
        });
        assert_eq!(
            reporter.infer_type(&["1", "2", "3", "a", "b", "c", "d"]),
            ColumnType::Numeric
        );
    }

    #[test]
    fn test_distribution() {
        let report = analyze(&Dataset::parse("v\n4\n1\n3\n2"));
        let d = report.distribution("v").unwrap();

        assert_eq!(d.count, 4);
        assert_eq!(d.min, 1.0);
        assert_eq!(d.max, 4.0);
        assert_eq!(d.mean, 2.5);
        assert_eq!(d.median, 2.5);
        assert!((d.std_dev - 1.118033988749895).abs() < 1e-12);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[5.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_fraud_tally() {
        let ds = Dataset::parse("amount,Is_Fraud\n10,1\n20,0\n30,0\n40,true\n50,");
        let tally = analyze(&ds).fraud.unwrap();

        assert_eq!(tally.column, "Is_Fraud");
        assert_eq!(tally.fraud_count, 2);
        assert_eq!(tally.legitimate_count, 2);
        assert_eq!(tally.fraud_ratio, 50.0);
    }

    #[test]
    fn test_label_column_name_variants() {
        assert!(analyze(&Dataset::parse("x,CLASS\n1,0")).fraud.is_some());
        assert!(analyze(&Dataset::parse("x,target_label\n1,0")).fraud.is_some());
        assert!(analyze(&Dataset::parse("x,y\n1,0")).fraud.is_none());
    }

    #[test]
    fn test_column_profile_counts() {
        let report = analyze(&Dataset::parse("c\na\nb\na\n\n"));
        let profile = report.column("c").unwrap();
        assert_eq!(profile.unique_count, 2);
        assert_eq!(profile.total_non_empty, 3);
    }

    #[test]
    fn test_report_json() {
        let json = analyze(&Dataset::parse("a,b\n1,2")).to_json().unwrap();
        assert!(json.contains("completeness"));
        assert!(json.contains("correlation"));
    }
}
