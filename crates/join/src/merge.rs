//! Multi-dataset merge: fold every table of a [`MergePlan`] onto the first one.

use serde::Serialize;

use crate::config::{JoinColumn, MergePlan};
use crate::error::JoinError;
use crate::exact::left_join_on_column;
use crate::headers::cleanup_final;
use crate::join::join_on_state_and_city;
use crate::key::{CITY, COUNTY_FIPS, STATE};
use crate::model::JoinSummary;
use crate::table::Table;

#[derive(Debug, Clone, Serialize)]
pub struct MergeMeta {
    pub plan_name: String,
    pub engine_version: String,
    pub run_at: String,
}

/// One fold step. The first dataset is recorded as a step with no summary.
#[derive(Debug, Clone, Serialize)]
pub struct MergeStep {
    pub dataset: String,
    pub join_column: JoinColumn,
    /// Accumulator rows after this step.
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<JoinSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeResult {
    pub meta: MergeMeta,
    pub steps: Vec<MergeStep>,
    #[serde(skip)]
    pub table: Table,
}

/// Fold `tables` (one per plan dataset, same order) into one comparison table,
/// then apply the plan's output post-processing.
pub fn merge_tables(plan: &MergePlan, tables: Vec<Table>) -> Result<MergeResult, JoinError> {
    if tables.len() != plan.datasets.len() {
        return Err(JoinError::DatasetCount {
            expected: plan.datasets.len(),
            found: tables.len(),
        });
    }

    let mut steps = Vec::with_capacity(tables.len());
    let mut datasets = plan.datasets.iter().zip(tables);
    let Some((first, mut acc)) = datasets.next() else {
        return Err(JoinError::DatasetCount { expected: 1, found: 0 });
    };
    steps.push(MergeStep {
        dataset: first.source.to_string(),
        join_column: first.join_column,
        rows: acc.row_count(),
        summary: None,
    });

    for (dataset, table) in datasets {
        let options = dataset.join_options(&plan.join);
        log::info!("merging {} ({}) on {}", dataset.source, dataset.file, dataset.join_column);
        let summary = match dataset.join_column {
            JoinColumn::StateCity => {
                let result = join_on_state_and_city(&acc, &table, &options)?;
                acc = result.table;
                Some(result.summary)
            }
            JoinColumn::CountyFips => {
                acc = left_join_on_column(&acc, &table, COUNTY_FIPS, &options.suffixes)?;
                None
            }
        };
        steps.push(MergeStep {
            dataset: dataset.source.to_string(),
            join_column: dataset.join_column,
            rows: acc.row_count(),
            summary,
        });
    }

    let table = finish(plan, acc)?;
    Ok(MergeResult {
        meta: MergeMeta {
            plan_name: plan.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        steps,
        table,
    })
}

fn finish(plan: &MergePlan, table: Table) -> Result<Table, JoinError> {
    let output = &plan.output;
    let mut table = cleanup_final(table)?;
    let mut leading = output.leading_columns.clone();

    if let Some(density) = &output.density {
        table = table.divide_columns(&density.column, &density.numerator, &density.denominator, None)?;
        leading.push(density.column.clone());
    }

    if !output.rates.is_empty() {
        for rate in &output.rates {
            table = table.per_population(&rate.column, &rate.count, &rate.population, rate.per)?;
        }
        let counts: Vec<&str> = output.rates.iter().map(|r| r.count.as_str()).collect();
        table = table.drop_columns(&counts);
    }
    table = table.move_to_front(&leading);

    if output.sort {
        table = table.sort_by_columns(&[STATE, CITY])?;
    }
    Ok(table)
}
