use std::fmt::Write as _;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::deviation::{self, Comparison};
use crate::error::Result;
use crate::history::History;
use crate::models::{Deviation, Period, ReportRecord, RiskRating, Status};
use crate::risk;

/// Latest comparison re-derived from the two most recent records.
/// Deviations are never persisted; this is always computed on demand.
pub fn latest_comparison(history: &History) -> Option<Comparison> {
    let records: Vec<&ReportRecord> = history.all().collect();
    let (&current, rest) = records.split_last()?;
    Some(deviation::compare(rest.last().copied(), current))
}

/// Markdown report: history summary, the latest period-over-period
/// comparison, and the aggregated risk rating. Empty and single-record
/// histories render neutral states rather than failing.
pub fn build_report(system: &str, history: &History) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# EWA Traffic-Light Report for {system}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## History");

    if history.is_empty() {
        let _ = writeln!(output, "No reports ingested yet.");
        return output;
    }

    for record in history.all() {
        let _ = writeln!(
            output,
            "- {}: overall {} (ingested {})",
            record.period,
            record.overall,
            record.ingested_at.format("%Y-%m-%d %H:%M UTC")
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Comparison");

    match latest_comparison(history) {
        None | Some(Comparison::NoBaseline) => {
            let _ = writeln!(output, "Only one report on file; nothing to compare yet.");
            let _ = writeln!(output);
            let _ = writeln!(output, "## Risk Rating");
            let _ = writeln!(output, "{}", RiskRating::Low);
        }
        Some(Comparison::Against {
            previous_period,
            deviations,
        }) => {
            let current_period = history
                .latest()
                .map(|r| r.period.to_string())
                .unwrap_or_default();
            let _ = writeln!(
                output,
                "{previous_period} vs {current_period}:"
            );
            for dev in &deviations {
                let _ = writeln!(
                    output,
                    "- {}: {} -> {} ({})",
                    dev.section, dev.previous, dev.current, dev.direction
                );
            }

            let unknowns: Vec<&str> = deviations
                .iter()
                .filter(|d| d.current == Status::Unknown && d.section != "overall")
                .map(|d| d.section.as_str())
                .collect();
            if !unknowns.is_empty() {
                let _ = writeln!(output);
                let _ = writeln!(
                    output,
                    "Sections without a readable indicator this period: {}.",
                    unknowns.join(", ")
                );
            }

            let _ = writeln!(output);
            let _ = writeln!(output, "## Risk Rating");
            let _ = writeln!(output, "{}", risk::score(&deviations));
        }
    }

    output
}

/// Structured payload handed to the external UI and chatbot layer as
/// prompt context.
#[derive(Debug, Serialize)]
pub struct ChatContext {
    pub system: String,
    pub history: Vec<ReportRecord>,
    pub previous_period: Option<Period>,
    pub deviations: Vec<Deviation>,
    pub risk: RiskRating,
}

pub fn build_context(system: &str, history: &History) -> ChatContext {
    let (previous_period, deviations) = match latest_comparison(history) {
        Some(Comparison::Against {
            previous_period,
            deviations,
        }) => (Some(previous_period), deviations),
        _ => (None, Vec::new()),
    };
    ChatContext {
        system: system.to_string(),
        history: history.all().cloned().collect(),
        risk: risk::score(&deviations),
        previous_period,
        deviations,
    }
}

/// Writes the history as a wide CSV, one row per period and one column per
/// section. This is the training/inference feed for the external
/// trend-prediction model.
pub fn write_history_csv<W: io::Write>(history: &History, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut sections: Vec<&str> = history
        .all()
        .flat_map(|r| r.sections.keys().map(String::as_str))
        .collect();
    sections.sort_unstable();
    sections.dedup();

    let mut header = vec!["system", "period", "overall_status"];
    header.extend(&sections);
    csv.write_record(&header)?;

    for record in history.all() {
        let mut row = vec![
            record.system.clone(),
            record.period.to_string(),
            record.overall.as_str().to_string(),
        ];
        for section in &sections {
            row.push(record.status_of(section).as_str().to_string());
        }
        csv.write_record(&row)?;
    }

    csv.flush()?;
    Ok(())
}

pub fn export_history_csv(history: &History, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_history_csv(history, file)
}
