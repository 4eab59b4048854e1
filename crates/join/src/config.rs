use serde::{Deserialize, Serialize};

use crate::error::JoinError;
use crate::headers::DataSource;
use crate::key::{CITY, STATE};
use crate::similarity::Scorer;

// ---------------------------------------------------------------------------
// Join options
// ---------------------------------------------------------------------------

/// How leftover cities are paired within a state after the exact join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// First candidate where one name is a prefix of the other.
    #[default]
    Prefix,
    /// Highest similarity score above `min_score`.
    Ratio,
}

/// Whether a right-side city can be claimed by more than one left city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimPolicy {
    /// A matched right city is removed from the candidate pool.
    #[default]
    SingleUse,
    /// Right cities stay available; one right row may feed several output rows.
    Reuse,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct JoinOptions {
    pub strategy: MatchStrategy,
    /// Ratio mode only: a candidate must score strictly above this.
    pub min_score: u8,
    /// Ratio mode only.
    pub scorer: Scorer,
    pub claim: ClaimPolicy,
    /// Appended to non-key column names present on both sides (left, right).
    pub suffixes: (String, String),
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::Prefix,
            min_score: 0,
            scorer: Scorer::Indel,
            claim: ClaimPolicy::SingleUse,
            suffixes: ("_x".into(), "_y".into()),
        }
    }
}

impl JoinOptions {
    pub fn ratio(min_score: u8) -> Self {
        Self {
            strategy: MatchStrategy::Ratio,
            min_score,
            ..Self::default()
        }
    }

    pub fn with_suffixes(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.suffixes = (left.into(), right.into());
        self
    }

    pub fn with_claim(mut self, claim: ClaimPolicy) -> Self {
        self.claim = claim;
        self
    }
}

// ---------------------------------------------------------------------------
// Merge plan
// ---------------------------------------------------------------------------

/// A list of datasets folded left-to-right into one comparison table.
#[derive(Debug, Clone, Deserialize)]
pub struct MergePlan {
    pub name: String,
    #[serde(default)]
    pub join: JoinOptions,
    pub datasets: Vec<DatasetConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub file: String,
    pub source: DataSource,
    /// Right-side suffix for colliding column names (left side keeps its names).
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub join_column: JoinColumn,
    /// Lines to skip before the header row.
    #[serde(default)]
    pub header_row: usize,
}

impl DatasetConfig {
    /// Join options for folding this dataset onto the accumulator.
    pub fn join_options(&self, base: &JoinOptions) -> JoinOptions {
        match &self.suffix {
            Some(suffix) => base.clone().with_suffixes("", suffix.as_str()),
            None => base.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinColumn {
    /// Exact + fuzzy join on `(state, city)`.
    #[default]
    StateCity,
    /// Exact left join on `county_fips`.
    CountyFips,
}

impl std::fmt::Display for JoinColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StateCity => write!(f, "state_city"),
            Self::CountyFips => write!(f, "county_fips"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    #[default]
    Utf8,
    /// Windows-1252 (a superset of ISO-8859-1).
    Latin1,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub file: Option<String>,
    pub encoding: Encoding,
    /// Sort rows by `(state, city)`.
    pub sort: bool,
    pub leading_columns: Vec<String>,
    pub density: Option<DensityConfig>,
    /// Per-capita rate columns. Their count columns are dropped afterwards.
    pub rates: Vec<RateConfig>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: None,
            encoding: Encoding::Utf8,
            sort: true,
            leading_columns: vec![CITY.into(), STATE.into()],
            density: None,
            rates: Vec::new(),
        }
    }
}

/// Derived `numerator / denominator` column, e.g. population density.
#[derive(Debug, Clone, Deserialize)]
pub struct DensityConfig {
    pub column: String,
    pub numerator: String,
    pub denominator: String,
}

/// Derived `count / population * per` column, e.g. COVID-19 deaths per 100k.
#[derive(Debug, Clone, Deserialize)]
pub struct RateConfig {
    pub column: String,
    pub count: String,
    pub population: String,
    #[serde(default = "default_rate_per")]
    pub per: f64,
}

fn default_rate_per() -> f64 {
    100_000.0
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MergePlan {
    pub fn from_toml(input: &str) -> Result<Self, JoinError> {
        let plan: MergePlan =
            toml::from_str(input).map_err(|e| JoinError::ConfigParse(e.to_string()))?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<(), JoinError> {
        if self.datasets.len() < 2 {
            return Err(JoinError::ConfigValidation(format!(
                "at least 2 datasets are required, found {}",
                self.datasets.len()
            )));
        }

        // The accumulator is keyed by (state, city); county joins hang off it.
        if self.datasets[0].join_column != JoinColumn::StateCity {
            return Err(JoinError::ConfigValidation(
                "first dataset must use join_column = \"state_city\"".into(),
            ));
        }

        if self.join.min_score > 100 {
            return Err(JoinError::ConfigValidation(format!(
                "min_score must be 0..=100, got {}",
                self.join.min_score
            )));
        }

        for (i, dataset) in self.datasets.iter().enumerate() {
            if dataset.file.trim().is_empty() {
                return Err(JoinError::ConfigValidation(format!(
                    "dataset {} ({}): file is empty",
                    i + 1,
                    dataset.source
                )));
            }
        }

        if let Some(density) = &self.output.density {
            if density.column.trim().is_empty() {
                return Err(JoinError::ConfigValidation("output.density.column is empty".into()));
            }
        }

        for rate in &self.output.rates {
            if rate.column.trim().is_empty() {
                return Err(JoinError::ConfigValidation("output.rates: column is empty".into()));
            }
            if !(rate.per.is_finite() && rate.per > 0.0) {
                return Err(JoinError::ConfigValidation(format!(
                    "output.rates '{}': per must be positive, got {}",
                    rate.column, rate.per
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
