use serde::Serialize;

use crate::key::CityKey;
use crate::table::Table;

/// How a left row found its right-side partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Prefix,
    Ratio { score: u8 },
}

impl MatchMethod {
    pub fn is_fuzzy(&self) -> bool {
        !matches!(self, Self::Exact)
    }
}

/// One emitted output row and where its halves came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    /// Key written to the output row (left city spelling).
    pub key: CityKey,
    pub left_row: usize,
    pub right_row: usize,
    /// City as spelled on the right side.
    pub right_city: String,
    pub method: MatchMethod,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinSummary {
    pub left_rows: usize,
    pub right_rows: usize,
    /// Output rows from the exact pass.
    pub exact: usize,
    /// Output rows from fuzzy reconciliation.
    pub fuzzy: usize,
    /// Left rows that appear in no output row.
    pub left_unmatched: usize,
    pub right_unmatched: usize,
    pub total_rows: usize,
}

#[derive(Debug, Clone)]
pub struct JoinResult {
    pub table: Table,
    /// In output row order.
    pub matches: Vec<MatchRecord>,
    pub summary: JoinSummary,
}

impl JoinResult {
    pub fn fuzzy_matches(&self) -> impl Iterator<Item = &MatchRecord> {
        self.matches.iter().filter(|m| m.method.is_fuzzy())
    }
}
