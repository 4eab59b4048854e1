use std::collections::HashSet;

use crate::config::JoinOptions;
use crate::error::JoinError;
use crate::exact::exact_join;
use crate::fuzzy::reconcile;
use crate::key::require_key_columns;
use crate::model::{JoinResult, JoinSummary, MatchRecord};
use crate::table::Table;

/// Join two tables on `(state, city)`: exact matches first, then fuzzy
/// reconciliation of the residue within each shared state.
///
/// Both inputs must already carry normalized `state` and `city` columns. The
/// output leads with `state` and `city`, followed by the left then right
/// non-key columns. Exact rows come first in left row order, then fuzzy rows
/// grouped by state.
pub fn join_on_state_and_city(left: &Table, right: &Table, options: &JoinOptions) -> Result<JoinResult, JoinError> {
    require_key_columns(left, "left")?;
    require_key_columns(right, "right")?;

    let exact = exact_join(left, right, &options.suffixes)?;
    let fuzzy = reconcile(left, right, &exact.left_missing, &exact.right_missing, options)?;

    let table = exact.table.append(fuzzy.table)?;
    let mut matches = exact.matches;
    let exact_count = matches.len();
    matches.extend(fuzzy.matches);

    let summary = summarize(left, right, &matches, exact_count);
    log::info!(
        "joined {} x {} rows: {} exact, {} fuzzy, {} left / {} right unmatched",
        summary.left_rows,
        summary.right_rows,
        summary.exact,
        summary.fuzzy,
        summary.left_unmatched,
        summary.right_unmatched
    );

    Ok(JoinResult { table, matches, summary })
}

fn summarize(left: &Table, right: &Table, matches: &[MatchRecord], exact: usize) -> JoinSummary {
    let left_used: HashSet<usize> = matches.iter().map(|m| m.left_row).collect();
    let right_used: HashSet<usize> = matches.iter().map(|m| m.right_row).collect();
    JoinSummary {
        left_rows: left.row_count(),
        right_rows: right.row_count(),
        exact,
        fuzzy: matches.len() - exact,
        left_unmatched: left.row_count() - left_used.len(),
        right_unmatched: right.row_count() - right_used.len(),
        total_rows: matches.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClaimPolicy, MatchStrategy};
    use crate::model::MatchMethod;
    use proptest::prelude::*;

    fn keyed(rows: &[(&str, &str, &str)]) -> Table {
        Table::from_columns(vec![
            ("state", rows.iter().map(|r| r.0).collect::<Vec<_>>()),
            ("city", rows.iter().map(|r| r.1).collect()),
            ("data", rows.iter().map(|r| r.2).collect()),
        ])
        .unwrap()
    }

    fn example_left() -> Table {
        keyed(&[("a", "1", "1"), ("a", "2", "2"), ("b", "3", "3"), ("b", "4", "4")])
    }

    fn example_right() -> Table {
        keyed(&[("a", "1", "1"), ("a", "3", "3"), ("b", "4.", "4"), ("c", "2", "2")])
    }

    fn expected() -> Table {
        Table::from_columns(vec![
            ("state", vec!["a", "b"]),
            ("city", vec!["1", "4"]),
            ("data_x", vec!["1", "4"]),
            ("data_y", vec!["1", "4"]),
        ])
        .unwrap()
    }

    #[test]
    fn end_to_end_prefix() {
        let out = join_on_state_and_city(&example_left(), &example_right(), &JoinOptions::default()).unwrap();
        assert_eq!(out.table, expected());
        assert_eq!(out.matches[1].method, MatchMethod::Prefix);
        assert_eq!(out.matches[1].right_city, "4.");
    }

    #[test]
    fn end_to_end_ratio() {
        let out = join_on_state_and_city(&example_left(), &example_right(), &JoinOptions::ratio(0)).unwrap();
        assert_eq!(out.table, expected());
        assert_eq!(out.matches[1].method, MatchMethod::Ratio { score: 67 });
    }

    #[test]
    fn ratio_leaves_zero_score_leftovers_unpaired() {
        // "2" vs "3" scores 0, which never clears the threshold.
        let out = join_on_state_and_city(&example_left(), &example_right(), &JoinOptions::ratio(0)).unwrap();
        assert!(out.matches.iter().all(|m| m.key.city != "2"));
    }

    #[test]
    fn summary_counts() {
        let out = join_on_state_and_city(&example_left(), &example_right(), &JoinOptions::default()).unwrap();
        assert_eq!(
            out.summary,
            JoinSummary {
                left_rows: 4,
                right_rows: 4,
                exact: 1,
                fuzzy: 1,
                left_unmatched: 2,
                right_unmatched: 2,
                total_rows: 2,
            }
        );
    }

    #[test]
    fn exact_rows_do_not_depend_on_input_order() {
        let left = keyed(&[("b", "y", "ly"), ("a", "x", "lx")]);
        let right = keyed(&[("a", "x", "rx"), ("b", "y", "ry")]);
        let out = join_on_state_and_city(&left, &right, &JoinOptions::default()).unwrap();
        let flipped = keyed(&[("b", "y", "ry"), ("a", "x", "rx")]);
        let again = join_on_state_and_city(&left, &flipped, &JoinOptions::default()).unwrap();
        assert_eq!(out.table, again.table);
        assert_eq!(out.table.row_count(), 2);
    }

    #[test]
    fn exact_keys_are_not_reconsidered() {
        // "ab" matches exactly; the fuzzy pass must not pair "a" with it too.
        let left = keyed(&[("s", "ab", "1"), ("s", "a", "2")]);
        let right = keyed(&[("s", "ab", "3")]);
        let opts = JoinOptions::default().with_claim(ClaimPolicy::Reuse);
        let out = join_on_state_and_city(&left, &right, &opts).unwrap();
        assert_eq!(out.table.row_count(), 1);
        assert_eq!(out.summary.fuzzy, 0);
    }

    #[test]
    fn never_crosses_states() {
        let left = keyed(&[("a", "springfield", "1")]);
        let right = keyed(&[("b", "springfield", "2")]);
        for opts in [JoinOptions::default(), JoinOptions::ratio(0)] {
            let out = join_on_state_and_city(&left, &right, &opts).unwrap();
            assert!(out.table.is_empty());
        }
    }

    #[test]
    fn missing_key_column_aborts() {
        let left = Table::from_columns(vec![("state", vec!["a"]), ("data", vec!["1"])]).unwrap();
        let err = join_on_state_and_city(&left, &example_right(), &JoinOptions::default()).unwrap_err();
        assert_eq!(
            err,
            JoinError::MissingKeyColumn { table: "left".into(), column: "city".into() }
        );
    }

    #[test]
    fn custom_suffixes() {
        let opts = JoinOptions::default().with_suffixes("", "_walkscore");
        let out = join_on_state_and_city(&example_left(), &example_right(), &opts).unwrap();
        assert_eq!(out.table.headers(), &["state", "city", "data", "data_walkscore"]);
    }

    fn city() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["a", "ab", "abc", "b", "ba", "bab", "c"]).prop_map(String::from)
    }

    proptest! {
        #[test]
        fn single_use_never_reuses_a_right_row(
            left in prop::collection::btree_set(city(), 0..6),
            right in prop::collection::btree_set(city(), 0..6),
            ratio in any::<bool>(),
        ) {
            let to_table = |cities: &std::collections::BTreeSet<String>| {
                let n = cities.len();
                Table::from_columns(vec![
                    ("state", vec!["s".to_string(); n]),
                    ("city", cities.iter().cloned().collect()),
                ])
                .unwrap()
            };
            let mut opts = JoinOptions::default();
            if ratio {
                opts.strategy = MatchStrategy::Ratio;
            }
            let out = join_on_state_and_city(&to_table(&left), &to_table(&right), &opts).unwrap();
            let mut right_rows: Vec<usize> = out.matches.iter().map(|m| m.right_row).collect();
            let mut left_rows: Vec<usize> = out.matches.iter().map(|m| m.left_row).collect();
            let total = right_rows.len();
            right_rows.sort_unstable();
            right_rows.dedup();
            left_rows.sort_unstable();
            left_rows.dedup();
            prop_assert_eq!(right_rows.len(), total);
            prop_assert_eq!(left_rows.len(), total);
            prop_assert_eq!(out.table.row_count(), total);
        }
    }
}
