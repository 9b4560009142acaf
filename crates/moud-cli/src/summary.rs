use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use moud_model::Timepoint;

use crate::types::RunOutcome;

pub fn print_summary(outcome: &RunOutcome) {
    match &outcome.artifact_path {
        Some(path) => println!("Artifact: {}", path.display()),
        None => println!("Dry run: artifact validated, nothing written"),
    }
    println!("Generated: {}", outcome.artifact.generated_at);

    print_response_table(outcome);
    print_retention_table(outcome);

    let resolve = &outcome.resolve;
    println!(
        "Imputed: {} demographic fill(s), {} treatment default(s), {} utilization zero(s); \
         {} outcome value(s) left missing",
        resolve.demographics_filled,
        resolve.treatments_defaulted,
        resolve.utilization_zeroed,
        resolve.outcomes_preserved
    );
}

fn print_response_table(outcome: &RunOutcome) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Timepoint"),
        header_cell("Source file"),
        header_cell("Records"),
        header_cell("Response"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);

    for point in &outcome.artifact.metrics.response {
        let source = outcome
            .artifact
            .sources
            .files
            .iter()
            .find(|entry| entry.timepoint == point.timepoint)
            .map(|entry| entry.path.clone())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(point.timepoint.label())
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(source),
            Cell::new(point.records),
            Cell::new(format!("{:.1}%", point.response_rate_pct)),
        ]);
    }
    println!("{table}");
}

fn print_retention_table(outcome: &RunOutcome) {
    let retention = &outcome.artifact.metrics.retention;
    if retention.is_empty() {
        return;
    }

    let mut header = vec![header_cell("Medication"), header_cell("Baseline N")];
    let timepoints: Vec<Timepoint> = retention[0]
        .points
        .iter()
        .map(|point| point.timepoint)
        .collect();
    for timepoint in &timepoints {
        header.push(header_cell(timepoint.label()));
    }

    let mut table = Table::new();
    table.set_header(header);
    apply_table_style(&mut table);
    for index in 1..=timepoints.len() + 1 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    for series in retention {
        let mut row = vec![
            Cell::new(series.medication.label())
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(series.baseline_starters),
        ];
        for point in &series.points {
            row.push(if point.denominator == 0 {
                dim_cell("-")
            } else {
                Cell::new(format!("{:.1}%", point.rate_pct))
            });
        }
        table.add_row(row);
    }
    println!();
    println!("Retention (baseline starters, lost-to-follow-up as discontinued):");
    println!("{table}");
}

/// Print the fixed timepoint-to-file contract.
pub fn print_timepoints() {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Timepoint"),
        header_cell("Expected file"),
        header_cell("Months"),
        header_cell("Months at risk"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);

    for timepoint in Timepoint::ALL {
        table.add_row(vec![
            Cell::new(timepoint.label())
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(timepoint.source_filename()),
            Cell::new(timepoint.months_from_baseline()),
            Cell::new(timepoint.months_at_risk()),
        ]);
    }
    println!("{table}");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
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
