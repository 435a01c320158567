use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::core::{AugmentedRow, AugmentedTable, Cell, Metric};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportScope {
    #[value(name = "none")]
    #[serde(rename = "none")]
    Off,
    First,
    All,
}

pub fn report_lines(table: &AugmentedTable, scope: ReportScope, decimals: usize) -> Vec<String> {
    let rows: &[AugmentedRow] = match scope {
        ReportScope::Off => &[],
        ReportScope::First => &table.rows[..table.rows.len().min(1)],
        ReportScope::All => &table.rows,
    };

    let mut lines = Vec::new();
    for row in rows {
        if scope == ReportScope::All {
            lines.push(row_heading(row, &table.passthrough_columns));
        }
        match &row.outcome {
            Ok(outcome) => {
                for metric in Metric::ORDER {
                    let mut line = metric_line(metric, outcome.metrics.get(metric), decimals);
                    if let Some(reason) = outcome.issue(metric) {
                        line.push_str(&format!(" ({reason})"));
                    }
                    lines.push(line);
                }
            }
            Err(err) => lines.push(format!("Scenario rejected: {err}")),
        }
    }
    lines
}

pub fn metric_line(metric: Metric, value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(value) => format!(
            "{} '{}' is {} %",
            metric.description(),
            metric.column(),
            format_percent(value, decimals)
        ),
        None => format!(
            "{} '{}' is unavailable",
            metric.description(),
            metric.column()
        ),
    }
}

pub fn format_percent(value: f64, decimals: usize) -> String {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * 100.0 * factor).round() / factor;
    // avoid printing "-0.00"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.decimals$}")
}

fn row_heading(row: &AugmentedRow, passthrough: &[String]) -> String {
    let labels: Vec<String> = passthrough
        .iter()
        .filter_map(|column| match row.source.get(column) {
            Some(Cell::Text(text)) => Some(format!("{column}={text}")),
            Some(Cell::Number(value)) => Some(format!("{column}={value}")),
            _ => None,
        })
        .collect();
    if labels.is_empty() {
        format!("Scenario {}", row.index)
    } else {
        format!("Scenario {} ({})", row.index, labels.join(", "))
    }
}
