// Output column layout for a two-table merge.
//
// Non-key columns present on both sides get the side's suffix; an empty
// suffix keeps the original name. Key columns appear once. Pinned left
// columns never take a suffix, only their right-side namesake does.

use std::collections::HashSet;

use crate::error::JoinError;
use crate::table::Table;

pub(crate) struct MergeLayout {
    headers: Vec<String>,
    /// Left column indices copied into the row (after the keys when keys lead).
    left_cols: Vec<usize>,
    right_cols: Vec<usize>,
    keys_leading: bool,
}

impl MergeLayout {
    /// `keys_leading`: key columns first (inner join), otherwise left columns
    /// stay where they are and the keys are among them (left join).
    /// `pinned`: left column names that keep their name on collision.
    pub(crate) fn new(
        left: &Table,
        right: &Table,
        keys: &[&str],
        keys_leading: bool,
        pinned: &[&str],
        suffixes: (&str, &str),
    ) -> Result<Self, JoinError> {
        let is_key = |h: &str| keys.contains(&h);
        let left_non_key: HashSet<&str> = left
            .headers()
            .iter()
            .map(String::as_str)
            .filter(|h| !is_key(*h))
            .collect();
        let collides = |h: &str| {
            !is_key(h) && left_non_key.contains(h) && right.has_column(h)
        };
        let named = |h: &str, suffix: &str| {
            if collides(h) {
                format!("{h}{suffix}")
            } else {
                h.to_string()
            }
        };
        let named_left = |h: &str| {
            if pinned.contains(&h) {
                h.to_string()
            } else {
                named(h, suffixes.0)
            }
        };

        let mut headers: Vec<String> = Vec::new();
        let left_cols: Vec<usize>;
        if keys_leading {
            headers.extend(keys.iter().map(|k| k.to_string()));
            left_cols = (0..left.column_count())
                .filter(|&i| !is_key(&left.headers()[i]))
                .collect();
        } else {
            left_cols = (0..left.column_count()).collect();
        }
        for &i in &left_cols {
            headers.push(named_left(&left.headers()[i]));
        }
        let right_cols: Vec<usize> = (0..right.column_count())
            .filter(|&i| !is_key(&right.headers()[i]))
            .collect();
        for &i in &right_cols {
            headers.push(named(&right.headers()[i], suffixes.1));
        }

        let mut seen = HashSet::new();
        for h in &headers {
            if !seen.insert(h.as_str()) {
                return Err(JoinError::DuplicateColumn(h.clone()));
            }
        }

        Ok(Self {
            headers,
            left_cols,
            right_cols,
            keys_leading,
        })
    }

    pub(crate) fn empty_table(&self) -> Result<Table, JoinError> {
        Table::new(self.headers.iter().cloned())
    }

    /// One output row. `key_values` is only used when keys lead.
    /// A `None` right row yields empty right-side cells.
    pub(crate) fn merge_row(
        &self,
        key_values: &[&str],
        left: &Table,
        left_row: usize,
        right: &Table,
        right_row: Option<usize>,
    ) -> Vec<String> {
        let mut row = Vec::with_capacity(self.headers.len());
        if self.keys_leading {
            row.extend(key_values.iter().map(|v| v.to_string()));
        }
        row.extend(self.left_cols.iter().map(|&c| left.cell(left_row, c).to_string()));
        match right_row {
            Some(r) => row.extend(self.right_cols.iter().map(|&c| right.cell(r, c).to_string())),
            None => row.extend(self.right_cols.iter().map(|_| String::new())),
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn left() -> Table {
        Table::from_columns(vec![
            ("city", vec!["x"]),
            ("state", vec!["a"]),
            ("data", vec!["1"]),
            ("only_left", vec!["l"]),
        ])
        .unwrap()
    }

    fn right() -> Table {
        Table::from_columns(vec![
            ("state", vec!["a"]),
            ("data", vec!["2"]),
            ("city", vec!["x"]),
        ])
        .unwrap()
    }

    #[test]
    fn keys_lead_and_collisions_get_suffixes() {
        let layout = MergeLayout::new(&left(), &right(), &["state", "city"], true, &[], ("_x", "_y")).unwrap();
        assert_eq!(layout.headers, vec!["state", "city", "data_x", "only_left", "data_y"]);
        let row = layout.merge_row(&["a", "x"], &left(), 0, &right(), Some(0));
        assert_eq!(row, vec!["a", "x", "1", "l", "2"]);
    }

    #[test]
    fn left_layout_keeps_left_order() {
        let layout = MergeLayout::new(&left(), &right(), &["state", "city"], false, &[], ("", "_r")).unwrap();
        assert_eq!(layout.headers, vec!["city", "state", "data", "only_left", "data_r"]);
        let row = layout.merge_row(&[], &left(), 0, &right(), None);
        assert_eq!(row, vec!["x", "a", "1", "l", ""]);
    }

    #[test]
    fn empty_suffixes_collide() {
        let err = MergeLayout::new(&left(), &right(), &["state", "city"], true, &[], ("", "")).err();
        assert_eq!(err, Some(JoinError::DuplicateColumn("data".into())));
    }

    #[test]
    fn pinned_left_columns_keep_their_names() {
        let layout = MergeLayout::new(&left(), &right(), &["city"], false, &["state"], ("_x", "_y")).unwrap();
        assert_eq!(layout.headers, vec!["city", "state", "data_x", "only_left", "state_y", "data_y"]);
    }

    #[test]
    fn pinned_name_still_collides_without_right_suffix() {
        let err = MergeLayout::new(&left(), &right(), &["city"], false, &["state"], ("_x", "")).err();
        assert_eq!(err, Some(JoinError::DuplicateColumn("state".into())));
    }
}
