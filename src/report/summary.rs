//! Terminal tables for fitted binnings, scorecards and monitoring runs

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::{
    BinningTableRow, FeaturePsi, FeatureSummary, PerformanceMetrics, PointsRow,
    PopulationDistribution, PsiLevel,
};

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

fn number(value: f64, precision: usize) -> Cell {
    Cell::new(format!("{:.*}", precision, value)).set_alignment(CellAlignment::Right)
}

fn section_header(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

/// IV strength as conventionally read in credit scoring
fn iv_color(iv: f64) -> Color {
    if iv >= 0.3 {
        Color::Green
    } else if iv >= 0.1 {
        Color::Cyan
    } else if iv >= 0.02 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// One row per fitted feature, highest IV first
pub fn binning_summary_table(summary: &[FeatureSummary]) -> Table {
    let mut table = new_table(&["Feature", "Type", "Bins", "IV", "Trend", "Warnings"]);

    let mut rows: Vec<&FeatureSummary> = summary.iter().collect();
    rows.sort_by(|a, b| b.iv.total_cmp(&a.iv));

    for row in rows {
        let warnings = row
            .warnings
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(&row.name),
            Cell::new(row.kind),
            Cell::new(row.n_bins).set_alignment(CellAlignment::Right),
            number(row.iv, 4).fg(iv_color(row.iv)),
            Cell::new(format!("{} → {}", row.requested_trend, row.achieved_trend)),
            Cell::new(warnings).fg(Color::Yellow),
        ]);
    }
    table
}

pub fn print_binning_summary(summary: &[FeatureSummary]) {
    section_header("📋", "BINNING SUMMARY");
    print_indented(&binning_summary_table(summary));
}

/// Bins of a single feature with counts, event rate, WoE and IV
pub fn binning_table(rows: &[BinningTableRow]) -> Table {
    let mut table = new_table(&[
        "Bin", "Count", "Count %", "Events", "Non-events", "Event rate", "WoE", "IV",
    ]);
    for row in rows {
        let totals = row.bin == "Totals";
        let mut bin = Cell::new(&row.bin);
        if totals {
            bin = bin.add_attribute(Attribute::Bold);
        }
        table.add_row(vec![
            bin,
            Cell::new(row.count).set_alignment(CellAlignment::Right),
            number(row.count_pct * 100.0, 2),
            Cell::new(row.event_count).set_alignment(CellAlignment::Right),
            Cell::new(row.nonevent_count).set_alignment(CellAlignment::Right),
            number(row.event_rate, 4),
            if totals { Cell::new("") } else { number(row.woe, 4) },
            number(row.iv, 4),
        ]);
    }
    table
}

pub fn print_binning_table(feature: &str, rows: &[BinningTableRow]) {
    section_header("📊", &format!("BINNING TABLE: {}", feature));
    print_indented(&binning_table(rows));
}

/// Points per bin, base points first
pub fn points_table(rows: &[PointsRow]) -> Table {
    let mut table = new_table(&["Feature", "Bin", "WoE", "Coefficient", "Points"]);
    for row in rows {
        table.add_row(vec![
            Cell::new(&row.feature),
            Cell::new(&row.bin),
            number(row.woe, 4),
            number(row.coefficient, 4),
            number(row.points, 2).add_attribute(Attribute::Bold),
        ]);
    }
    table
}

pub fn print_points_table(rows: &[PointsRow]) {
    section_header("🧮", "SCORECARD POINTS");
    print_indented(&points_table(rows));
}

pub fn print_performance(population: &PopulationDistribution, metrics: Option<&PerformanceMetrics>) {
    section_header("🎯", "MODEL PERFORMANCE");

    let mut table = new_table(&["Metric", "Value"]);
    table.add_row(vec![Cell::new("Observations"), Cell::new(population.observations)]);
    table.add_row(vec![Cell::new("Events"), Cell::new(population.events)]);
    table.add_row(vec![Cell::new("Non-events"), Cell::new(population.non_events)]);
    table.add_row(vec![
        Cell::new("Default rate"),
        Cell::new(format!("{:.2}%", population.default_rate * 100.0)),
    ]);
    if let Some(m) = metrics {
        table.add_row(vec![Cell::new("AUC"), number(m.auc, 4)]);
        table.add_row(vec![
            Cell::new("Gini"),
            number(m.gini, 4).fg(Color::Green).add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![Cell::new("KS"), number(m.ks, 4)]);
        table.add_row(vec![Cell::new("Youden cut-off"), number(m.cutoff, 4)]);
    }
    print_indented(&table);
}

fn psi_color(level: PsiLevel) -> Color {
    match level {
        PsiLevel::Stable => Color::Green,
        PsiLevel::Moderate => Color::Yellow,
        PsiLevel::Significant => Color::Red,
    }
}

/// One row per feature with its PSI and stability reading
pub fn psi_summary_table(results: &[FeaturePsi]) -> Table {
    let mut table = new_table(&["Feature", "Bins", "PSI", "Stability"]);
    for result in results {
        let level = PsiLevel::from_psi(result.psi);
        table.add_row(vec![
            Cell::new(&result.feature),
            Cell::new(result.bins.len()).set_alignment(CellAlignment::Right),
            number(result.psi, 4).fg(psi_color(level)),
            Cell::new(level).fg(psi_color(level)),
        ]);
    }
    table
}

pub fn print_psi_summary(results: &[FeaturePsi]) {
    section_header("📈", "POPULATION STABILITY");
    print_indented(&psi_summary_table(results));
}
