//! `citycmp merge` / `citycmp validate`: plan-driven multi-dataset merge.

use std::path::{Path, PathBuf};

use citycmp_io::csv::{read_table, to_csv_string, write_table};
use citycmp_join::headers::normalize_headers;
use citycmp_join::{merge_tables, MergePlan};

use crate::exit_codes::EXIT_INVALID_PLAN;
use crate::CliError;

fn load_plan(path: &Path) -> Result<MergePlan, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_INVALID_PLAN,
        message: format!("cannot read plan {}: {e}", path.display()),
        hint: None,
    })?;
    MergePlan::from_toml(&text).map_err(CliError::join)
}

pub fn cmd_validate(plan_path: PathBuf) -> Result<(), CliError> {
    let plan = load_plan(&plan_path)?;
    eprintln!("plan '{}': {} datasets, ok", plan.name, plan.datasets.len());
    for (i, dataset) in plan.datasets.iter().enumerate() {
        eprintln!("  {}. {} ({}) on {}", i + 1, dataset.file, dataset.source, dataset.join_column);
    }
    Ok(())
}

pub fn cmd_merge(plan_path: PathBuf, output: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let plan = load_plan(&plan_path)?;

    // Resolve dataset paths relative to the plan file's directory
    let base_dir = plan_path.parent().unwrap_or_else(|| Path::new("."));

    let mut tables = Vec::with_capacity(plan.datasets.len());
    for dataset in &plan.datasets {
        let path = base_dir.join(&dataset.file);
        let raw = read_table(&path, dataset.header_row).map_err(|e| {
            CliError::io(e).with_hint(format!("dataset '{}' is listed in {}", dataset.source, plan_path.display()))
        })?;
        let table = normalize_headers(dataset.source, raw).map_err(CliError::join)?;
        tables.push(table);
    }

    let result = merge_tables(&plan, tables).map_err(CliError::join)?;

    let output_path = output.or_else(|| plan.output.file.as_ref().map(|f| base_dir.join(f)));
    match &output_path {
        Some(path) => {
            write_table(&result.table, path, plan.output.encoding).map_err(CliError::io)?;
            eprintln!("wrote {}", path.display());
        }
        None if !json => {
            let text = to_csv_string(&result.table).map_err(CliError::general)?;
            print!("{text}");
        }
        None => {}
    }

    if json {
        let text = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{text}");
    }

    for step in &result.steps {
        match &step.summary {
            Some(s) => eprintln!(
                "  {}: {} rows ({} exact, {} fuzzy)",
                step.dataset, step.rows, s.exact, s.fuzzy
            ),
            None => eprintln!("  {}: {} rows", step.dataset, step.rows),
        }
    }
    eprintln!(
        "merged {} datasets: {} rows x {} columns",
        result.steps.len(),
        result.table.row_count(),
        result.table.column_count()
    );
    Ok(())
}
