//! `citycmp-join`: City/state join engine.
//!
//! Pure engine crate: receives in-memory tables keyed by `(state, city)`,
//! returns one combined table. Exact composite-key matching runs first,
//! then per-state fuzzy reconciliation of the leftovers.
//! No CLI or IO dependencies.

pub mod config;
pub mod error;
pub mod exact;
pub mod fuzzy;
pub mod headers;
pub mod join;
pub mod key;
mod layout;
pub mod merge;
pub mod model;
pub mod similarity;
pub mod table;

pub use config::{ClaimPolicy, JoinOptions, MatchStrategy, MergePlan};
pub use error::JoinError;
pub use headers::DataSource;
pub use join::join_on_state_and_city;
pub use key::CityKey;
pub use merge::merge_tables;
pub use model::{JoinResult, JoinSummary, MatchMethod, MatchRecord};
pub use similarity::{fuzzy_match, prefix_match, Scorer};
pub use table::Table;
