use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    /// A required `state` or `city` column is absent. The join cannot proceed.
    MissingKeyColumn { table: String, column: String },
    /// A column referenced by an operation does not exist.
    UnknownColumn(String),
    /// Two columns would end up with the same name.
    DuplicateColumn(String),
    /// Column lengths disagree within one table.
    ColumnLength { column: String, expected: usize, found: usize },
    /// A pushed row has the wrong number of cells.
    RowWidth { row: usize, expected: usize, found: usize },
    /// Number of tables handed to a merge doesn't match the plan.
    DatasetCount { expected: usize, found: usize },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Plan validation error (too few datasets, bad join column, etc.).
    ConfigValidation(String),
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKeyColumn { table, column } => {
                write!(f, "{table} table: missing key column '{column}'")
            }
            Self::UnknownColumn(column) => write!(f, "unknown column '{column}'"),
            Self::DuplicateColumn(column) => write!(f, "duplicate column '{column}'"),
            Self::ColumnLength { column, expected, found } => {
                write!(f, "column '{column}' has {found} value(s), expected {expected}")
            }
            Self::RowWidth { row, expected, found } => {
                write!(f, "row {row} has {found} cell(s), expected {expected}")
            }
            Self::DatasetCount { expected, found } => {
                write!(f, "plan lists {expected} dataset(s), got {found} table(s)")
            }
            Self::ConfigParse(msg) => write!(f, "plan parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "plan validation error: {msg}"),
        }
    }
}

impl std::error::Error for JoinError {}
