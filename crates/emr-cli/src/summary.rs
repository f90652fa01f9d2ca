use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use emr_cli::render::Grid;
use emr_report::dates::Quarter;
use emr_report::{DashboardStats, ReportFamily};
use emr_validate::CohortReport;

pub fn print_grid(title: &str, grid: &Grid) {
    println!("{title}");
    if grid.is_empty() {
        println!("No data.");
        return;
    }
    let mut table = Table::new();
    table.set_header(grid.headers.iter().map(|h| header_cell(h)));
    apply_report_table_style(&mut table);
    for index in grid.numeric_columns() {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for row in &grid.rows {
        let total = row.first().is_some_and(|label| label == emr_model::ALL_AGES);
        table.add_row(row.iter().map(|cell| {
            if total {
                Cell::new(cell)
                    .fg(Color::Cyan)
                    .add_attribute(Attribute::Bold)
            } else if cell == "0" {
                dim_cell(cell)
            } else {
                Cell::new(cell)
            }
        }));
    }
    println!("{table}");
}

pub fn print_validation(report: &CohortReport, remote: &[String]) {
    println!("Rules checked: {}", report.rules_checked);
    if report.is_valid() {
        println!("All cohort rules hold.");
    } else {
        let mut table = Table::new();
        table.set_header(vec![
            header_cell("#"),
            header_cell("Comparator"),
            header_cell("Expected"),
            header_cell("Sum"),
            header_cell("Message"),
        ]);
        apply_table_style(&mut table);
        align_column(&mut table, 0, CellAlignment::Right);
        align_column(&mut table, 2, CellAlignment::Right);
        align_column(&mut table, 3, CellAlignment::Right);
        for violation in &report.violations {
            table.add_row(vec![
                dim_cell(violation.rule + 1),
                Cell::new(&violation.comparator),
                Cell::new(violation.expected),
                Cell::new(violation.actual).fg(Color::Red),
                Cell::new(&violation.error),
            ]);
        }
        println!("{table}");
    }
    if !remote.is_empty() {
        println!();
        println!("Remote validation:");
        for message in remote {
            println!("- {message}");
        }
    }
}

pub fn print_quarters(quarters: &[Quarter]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Quarter"),
        header_cell("Start"),
        header_cell("End"),
    ]);
    apply_table_style(&mut table);
    for quarter in quarters {
        let range = quarter.date_range();
        table.add_row(vec![
            Cell::new(quarter.to_string()).fg(Color::Blue),
            Cell::new(range.start),
            Cell::new(range.end),
        ]);
    }
    println!("{table}");
}

pub fn print_dashboard(stats: &DashboardStats) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Statistic"), header_cell("Patients")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for (label, count) in stats.counts() {
        let count_cell = if count > 0 {
            Cell::new(count).add_attribute(Attribute::Bold)
        } else {
            dim_cell(count)
        };
        table.add_row(vec![Cell::new(label), count_cell]);
    }
    println!("{table}");

    if stats.encounters.iter().any(|stat| stat.facility > 0) {
        let mut encounters = Table::new();
        encounters.set_header(vec![
            header_cell("Encounter"),
            header_cell("Female"),
            header_cell("Male"),
            header_cell("Me"),
            header_cell("Facility"),
        ]);
        apply_table_style(&mut encounters);
        for column in 1..=4 {
            align_column(&mut encounters, column, CellAlignment::Right);
        }
        for stat in &stats.encounters {
            encounters.add_row(vec![
                Cell::new(&stat.encounter),
                Cell::new(stat.female),
                Cell::new(stat.male),
                Cell::new(stat.me),
                Cell::new(stat.facility).add_attribute(Attribute::Bold),
            ]);
        }
        println!();
        println!("Encounters:");
        println!("{encounters}");
    }

    if !stats.visits.dates.is_empty() {
        let mut visits = Table::new();
        visits.set_header(vec![
            header_cell("Date"),
            header_cell("Complete"),
            header_cell("Incomplete"),
        ]);
        apply_table_style(&mut visits);
        align_column(&mut visits, 1, CellAlignment::Right);
        align_column(&mut visits, 2, CellAlignment::Right);
        let days = stats
            .visits
            .dates
            .iter()
            .zip(&stats.visits.complete)
            .zip(&stats.visits.incomplete);
        for ((date, complete), incomplete) in days {
            visits.add_row(vec![
                Cell::new(date),
                Cell::new(complete).fg(Color::Green),
                Cell::new(incomplete).fg(Color::Yellow),
            ]);
        }
        println!();
        println!("Visits:");
        println!("{visits}");
    }
}

pub fn print_families() {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Family"),
        header_cell("Endpoint"),
        header_cell("Indicators"),
    ]);
    apply_table_style(&mut table);
    for family in ReportFamily::ALL {
        let endpoint = if family.is_program_report() {
            format!("programs/<id>/reports/{}", family.endpoint())
        } else {
            format!("reports/{}", family.endpoint())
        };
        let indicators = family.indicators();
        let indicators = if indicators.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(indicators.join(", "))
        };
        table.add_row(vec![
            Cell::new(format!("{family:?}"))
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(endpoint),
            indicators,
        ]);
    }
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_report_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(200);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
