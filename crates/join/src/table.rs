// In-memory tabular dataset: named string columns of equal length.
// Empty string = missing value. Every transform consumes `self` and
// returns a new table; nothing is shared between inputs and outputs.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::error::JoinError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    columns: Vec<Vec<String>>,
    rows: usize,
}

impl Table {
    /// Empty table with the given headers.
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Result<Self, JoinError> {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        check_unique(&headers)?;
        let columns = vec![Vec::new(); headers.len()];
        Ok(Self { headers, columns, rows: 0 })
    }

    /// Build from `(name, values)` pairs. All columns must have the same length.
    pub fn from_columns<N, V>(columns: impl IntoIterator<Item = (N, Vec<V>)>) -> Result<Self, JoinError>
    where
        N: Into<String>,
        V: Into<String>,
    {
        let mut headers = Vec::new();
        let mut data: Vec<Vec<String>> = Vec::new();
        for (name, values) in columns {
            headers.push(name.into());
            data.push(values.into_iter().map(Into::into).collect());
        }
        check_unique(&headers)?;

        let rows = data.first().map(Vec::len).unwrap_or(0);
        for (name, values) in headers.iter().zip(&data) {
            if values.len() != rows {
                return Err(JoinError::ColumnLength {
                    column: name.clone(),
                    expected: rows,
                    found: values.len(),
                });
            }
        }

        Ok(Self { headers, columns: data, rows })
    }

    /// Build from a header list plus row-major cells.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, JoinError> {
        let mut table = Self::new(headers)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.column_index(name).map(|i| self.columns[i].as_slice())
    }

    pub fn value(&self, row: usize, name: &str) -> Option<&str> {
        let col = self.column_index(name)?;
        self.columns[col].get(row).map(String::as_str)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        &self.columns[col][row]
    }

    pub fn row(&self, row: usize) -> Option<Vec<&str>> {
        if row >= self.rows {
            return None;
        }
        Some(self.columns.iter().map(|c| c[row].as_str()).collect())
    }

    // ------------------------------------------------------------------
    // Building
    // ------------------------------------------------------------------

    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), JoinError> {
        if row.len() != self.headers.len() {
            return Err(JoinError::RowWidth {
                row: self.rows,
                expected: self.headers.len(),
                found: row.len(),
            });
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.push(value);
        }
        self.rows += 1;
        Ok(())
    }

    /// Append a column at the end (or replace it in place if the name exists).
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<String>) -> Result<Self, JoinError> {
        let name = name.into();
        if values.len() != self.rows {
            return Err(JoinError::ColumnLength {
                column: name,
                expected: self.rows,
                found: values.len(),
            });
        }
        match self.column_index(&name) {
            Some(i) => self.columns[i] = values,
            None => {
                self.headers.push(name);
                self.columns.push(values);
            }
        }
        Ok(self)
    }

    /// Append the rows of `other`. Headers must be identical.
    pub fn append(mut self, other: Table) -> Result<Self, JoinError> {
        if self.headers != other.headers {
            let mismatch = self
                .headers
                .iter()
                .zip(&other.headers)
                .find(|(a, b)| a != b)
                .map(|(_, b)| b.clone())
                .unwrap_or_else(|| format!("<{} vs {} columns>", self.headers.len(), other.headers.len()));
            return Err(JoinError::UnknownColumn(mismatch));
        }
        for (column, extra) in self.columns.iter_mut().zip(other.columns) {
            column.extend(extra);
        }
        self.rows += other.rows;
        Ok(self)
    }

    pub fn select_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| indices.iter().map(|&i| c[i].clone()).collect())
            .collect();
        Table {
            headers: self.headers.clone(),
            columns,
            rows: indices.len(),
        }
    }

    // ------------------------------------------------------------------
    // Column transforms
    // ------------------------------------------------------------------

    /// Rewrite every header. Fails if two headers collapse to the same name.
    pub fn map_headers(mut self, f: impl Fn(&str) -> String) -> Result<Self, JoinError> {
        self.headers = self.headers.iter().map(|h| f(h.as_str())).collect();
        check_unique(&self.headers)?;
        Ok(self)
    }

    /// Drop columns by name. Names not present are ignored.
    pub fn drop_columns<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        let drop: HashSet<&str> = names.iter().map(AsRef::as_ref).collect();
        let mut headers = Vec::with_capacity(self.headers.len());
        let mut columns = Vec::with_capacity(self.columns.len());
        for (header, column) in self.headers.drain(..).zip(self.columns.drain(..)) {
            if !drop.contains(header.as_str()) {
                headers.push(header);
                columns.push(column);
            }
        }
        self.headers = headers;
        self.columns = columns;
        self
    }

    /// Rename `(from, to)` pairs. Absent `from` names are ignored.
    pub fn rename_columns(mut self, renames: &[(&str, &str)]) -> Result<Self, JoinError> {
        for (from, to) in renames {
            if let Some(i) = self.column_index(from) {
                self.headers[i] = (*to).to_string();
            }
        }
        check_unique(&self.headers)?;
        Ok(self)
    }

    /// Move the named columns to the front, in the given order. Absent names are skipped.
    pub fn move_to_front<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        let mut order: Vec<usize> = names
            .iter()
            .filter_map(|n| self.column_index(n.as_ref()))
            .collect();
        order.dedup();
        for i in 0..self.headers.len() {
            if !order.contains(&i) {
                order.push(i);
            }
        }
        let mut headers: Vec<Option<String>> = self.headers.drain(..).map(Some).collect();
        let mut columns: Vec<Option<Vec<String>>> = self.columns.drain(..).map(Some).collect();
        for i in order {
            if let (Some(h), Some(c)) = (headers[i].take(), columns[i].take()) {
                self.headers.push(h);
                self.columns.push(c);
            }
        }
        self
    }

    /// Rewrite every value in a column. No-op if the column is absent.
    pub fn map_column(mut self, name: &str, f: impl Fn(&str) -> String) -> Self {
        if let Some(i) = self.column_index(name) {
            self.columns[i] = self.columns[i].iter().map(|v| f(v.as_str())).collect();
        }
        self
    }

    /// Propagate the last non-empty value downward into empty cells.
    pub fn fill_down(mut self, name: &str) -> Result<Self, JoinError> {
        let i = self.require(name)?;
        let mut last = String::new();
        for value in &mut self.columns[i] {
            if value.trim().is_empty() {
                value.clone_from(&last);
            } else {
                last.clone_from(value);
            }
        }
        Ok(self)
    }

    // ------------------------------------------------------------------
    // Row transforms
    // ------------------------------------------------------------------

    /// Stable sort by the named columns, compared as strings.
    pub fn sort_by_columns<S: AsRef<str>>(self, names: &[S]) -> Result<Self, JoinError> {
        let keys = names
            .iter()
            .map(|n| self.require(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let mut order: Vec<usize> = (0..self.rows).collect();
        order.sort_by(|&a, &b| {
            keys.iter()
                .map(|&k| self.columns[k][a].cmp(&self.columns[k][b]))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        Ok(self.select_rows(&order))
    }

    /// Drop rows with an empty value in any of the named columns.
    pub fn drop_rows_missing<S: AsRef<str>>(self, names: &[S]) -> Result<Self, JoinError> {
        let keys = names
            .iter()
            .map(|n| self.require(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let keep: Vec<usize> = (0..self.rows)
            .filter(|&r| keys.iter().all(|&k| !self.columns[k][r].trim().is_empty()))
            .collect();
        Ok(self.select_rows(&keep))
    }

    /// Keep only the first row for each distinct value tuple of the named columns.
    pub fn dedup_by_columns<S: AsRef<str>>(self, names: &[S]) -> Result<Self, JoinError> {
        let keys = names
            .iter()
            .map(|n| self.require(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let mut seen: HashSet<Vec<&str>> = HashSet::new();
        let mut keep = Vec::new();
        for r in 0..self.rows {
            let tuple: Vec<&str> = keys.iter().map(|&k| self.columns[k][r].as_str()).collect();
            if seen.insert(tuple) {
                keep.push(r);
            }
        }
        Ok(self.select_rows(&keep))
    }

    // ------------------------------------------------------------------
    // Numeric helpers
    // ------------------------------------------------------------------

    /// New column = numerator / denominator, rounded half-to-even to `decimals`
    /// (whole numbers when `None`). Non-numeric or zero-denominator rows get an empty cell.
    pub fn divide_columns(
        self,
        new_name: &str,
        numerator: &str,
        denominator: &str,
        decimals: Option<u32>,
    ) -> Result<Self, JoinError> {
        let num = self.require(numerator)?;
        let den = self.require(denominator)?;
        let values = (0..self.rows)
            .map(|r| {
                match (parse_number(&self.columns[num][r]), parse_number(&self.columns[den][r])) {
                    (Some(n), Some(d)) if d != 0.0 => format_number(n / d, decimals),
                    _ => String::new(),
                }
            })
            .collect();
        self.with_column(new_name, values)
    }

    /// New column = `count / population * per` (e.g. deaths per 100k), to two
    /// decimals. Rows without a numeric count or a positive population get an empty cell.
    pub fn per_population(
        self,
        new_name: &str,
        count: &str,
        population: &str,
        per: f64,
    ) -> Result<Self, JoinError> {
        let count = self.require(count)?;
        let pop = self.require(population)?;
        let values = (0..self.rows)
            .map(|r| {
                match (parse_number(&self.columns[count][r]), parse_number(&self.columns[pop][r])) {
                    (Some(c), Some(p)) if p > 0.0 => format_number(c / p * per, Some(2)),
                    _ => String::new(),
                }
            })
            .collect();
        self.with_column(new_name, values)
    }

    fn require(&self, name: &str) -> Result<usize, JoinError> {
        self.column_index(name)
            .ok_or_else(|| JoinError::UnknownColumn(name.to_string()))
    }
}

fn check_unique(headers: &[String]) -> Result<(), JoinError> {
    let mut seen = HashSet::new();
    for h in headers {
        if !seen.insert(h.as_str()) {
            return Err(JoinError::DuplicateColumn(h.clone()));
        }
    }
    Ok(())
}

/// Parse a spreadsheet number: strips whitespace and thousands separators.
pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn format_number(value: f64, decimals: Option<u32>) -> String {
    match decimals {
        None | Some(0) => format!("{}", value.round_ties_even() as i64),
        Some(d) => {
            let scale = 10f64.powi(d as i32);
            let rounded = (value * scale).round_ties_even() / scale;
            format!("{rounded:.prec$}", prec = d as usize)
        }
    }
}
