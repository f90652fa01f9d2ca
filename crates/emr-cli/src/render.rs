//! Flattening of built reports into printable grids.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use emr_model::{ALL_AGES, AggregatedReport, CountRow, Gender, ReportRow};
use emr_report::families::regimen_columns;
use emr_report::{BuiltReport, SurvivalRow};
use serde_json::Value;

/// Output format of report commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// A header row plus string cells, ready for a table or CSV writer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Columns whose cells are all numeric, for right alignment.
    pub fn numeric_columns(&self) -> Vec<usize> {
        (0..self.headers.len())
            .filter(|&index| {
                !self.rows.is_empty()
                    && self.rows.iter().all(|row| {
                        row.get(index)
                            .is_some_and(|cell| cell.parse::<f64>().is_ok())
                    })
            })
            .collect()
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .context("flush csv output")?;
        String::from_utf8(bytes).context("csv output is not UTF-8")
    }
}

/// Flattens `report` into a grid. `indicators` fixes the column order of
/// disaggregated reports; when empty, the columns found in the rows are used.
pub fn report_grid(report: &BuiltReport, indicators: &[String]) -> Grid {
    match report {
        BuiltReport::Disaggregated(report) => disaggregated_grid(report, indicators),
        BuiltReport::Counts(rows) => counts_grid(rows),
        BuiltReport::Survival(rows) => survival_grid(rows),
        BuiltReport::Rows(rows) => rows_grid(rows),
    }
}

/// Patient counts per age group and gender, each gender closed by its
/// all-ages roll-up.
pub fn disaggregated_grid(report: &AggregatedReport, indicators: &[String]) -> Grid {
    let columns = if indicators.is_empty() {
        report
            .rows()
            .flat_map(|row| row.indicators.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    } else {
        indicators.to_vec()
    };
    let mut grid = Grid::new(["Age group", "Gender"]);
    grid.headers.extend(columns.iter().cloned());

    for gender in Gender::ALL {
        let gender_report = report.gender(gender);
        for row in &gender_report.rows {
            grid.push(count_cells(row, &columns));
        }
        let mut total = vec![ALL_AGES.to_string(), gender.as_code().to_string()];
        total.extend(
            columns
                .iter()
                .map(|column| gender_report.total(column).to_string()),
        );
        grid.push(total);
    }
    grid
}

/// Rows produced by maternal reclassification or any other row list.
pub fn row_grid(rows: &[ReportRow], indicators: &[String]) -> Grid {
    let mut grid = Grid::new(["Age group", "Gender"]);
    grid.headers.extend(indicators.iter().cloned());
    for row in rows {
        grid.push(count_cells(row, indicators));
    }
    grid
}

fn count_cells(row: &ReportRow, columns: &[String]) -> Vec<String> {
    let mut cells = vec![row.age_group.clone(), row.gender.as_code().to_string()];
    cells.extend(columns.iter().map(|column| row.count(column).to_string()));
    cells
}

/// Count rows; regimen columns keep their display order, anything else
/// follows alphabetically.
pub fn counts_grid(rows: &[CountRow]) -> Grid {
    let present: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.values.keys().map(String::as_str))
        .collect();
    let is_regimen = |column: &str| regimen_columns().any(|regimen| regimen == column);
    let mut columns: Vec<&str> = Vec::with_capacity(present.len());
    for regimen in regimen_columns() {
        if present.contains(regimen) {
            columns.push(regimen);
        }
    }
    columns.extend(present.iter().copied().filter(|column| !is_regimen(*column)));

    let mut grid = Grid::new(["Label", "Gender"]);
    grid.headers.extend(columns.iter().map(|c| (*c).to_string()));
    grid.headers.push("Total".to_string());
    for row in rows {
        let mut cells = vec![
            row.label.clone(),
            row.gender.map_or_else(String::new, |g| g.as_code().to_string()),
        ];
        cells.extend(columns.iter().map(|column| row.get(column).to_string()));
        cells.push(row.total().to_string());
        grid.push(cells);
    }
    grid
}

pub fn survival_grid(rows: &[SurvivalRow]) -> Grid {
    let mut grid = Grid::new([
        "Group",
        "Quarter",
        "Interval (months)",
        "Alive",
        "Died",
        "Defaulted",
        "Stopped",
        "Transferred",
        "Unknown",
        "Total",
    ]);
    for row in rows {
        grid.push(vec![
            row.sub_group.to_string(),
            row.quarter.clone(),
            row.interval.map_or_else(|| "-".to_string(), |i| i.to_string()),
            row.alive.to_string(),
            row.died.to_string(),
            row.defaulted.to_string(),
            row.stopped.to_string(),
            row.transferred.to_string(),
            row.unknown.to_string(),
            row.total.to_string(),
        ]);
    }
    grid
}

/// Free-form JSON rows; columns are the object keys in first-seen order.
pub fn rows_grid(rows: &[Value]) -> Grid {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        if let Some(object) = row.as_object() {
            for key in object.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }
    let mut grid = Grid::new(columns.iter().cloned());
    for row in rows {
        grid.push(
            columns
                .iter()
                .map(|column| row.get(column).map_or_else(String::new, cell_text))
                .collect(),
        );
    }
    grid
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items.len().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emr_model::PatientId;
    use serde_json::json;

    #[test]
    fn test_rows_grid_unions_keys() {
        let grid = rows_grid(&[json!({"a": 1, "b": "x"}), json!({"c": [1, 2], "a": null})]);
        assert_eq!(grid.headers, ["a", "b", "c"]);
        assert_eq!(grid.rows[0], ["1", "x", ""]);
        assert_eq!(grid.rows[1], ["", "", "2"]);
    }

    #[test]
    fn test_counts_grid_orders_regimens() {
        let row = CountRow {
            label: "25 - 29.9 Kg".to_string(),
            gender: Some(Gender::Female),
            values: [("13A".to_string(), 2), ("0A".to_string(), 1), ("zz".to_string(), 4)]
                .into(),
        };
        let grid = counts_grid(&[row]);
        assert_eq!(grid.headers, ["Label", "Gender", "0A", "13A", "zz", "Total"]);
        assert_eq!(grid.rows[0], ["25 - 29.9 Kg", "F", "1", "2", "4", "7"]);
    }

    #[test]
    fn test_row_grid_counts_patients() {
        let mut row = ReportRow::new(Gender::Female, ALL_AGES);
        row.indicators
            .insert("tx_curr".to_string(), vec![PatientId::new(1), PatientId::new(2)]);
        let grid = row_grid(&[row], &["tx_curr".to_string(), "missing".to_string()]);
        assert_eq!(grid.rows[0], ["All", "F", "2", "0"]);
        assert_eq!(grid.numeric_columns(), [2, 3]);
    }
}
