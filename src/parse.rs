use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::extract::{BlockKind, TextBlock};
use crate::models::{Period, ReportRecord, Status, SECTIONS};

/// The one SAP system this pipeline tracks.
pub const SYSTEM: &str = "A1C";

/// Pulls a report period out of a filename, e.g.
/// `A1C_21277797_850764463_2025-11-24_R_EWA.html` or `EWA_A1C~20251124.htm`.
pub fn sniff_period(path: &Path) -> Option<Period> {
    static DATED: OnceLock<Regex> = OnceLock::new();
    let dated = DATED
        .get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}|\d{8}").expect("static pattern"));
    let name = path.file_name()?.to_string_lossy();
    let period = dated
        .find_iter(&name)
        .filter_map(|m| m.as_str().parse::<Period>().ok())
        .next();
    period
}

fn is_overall_marker(text: &str) -> bool {
    let text = text.to_lowercase();
    text.contains("overall") && (text.contains("rating") || text.contains("status"))
}

fn alias_match(text: &str, aliases: &[&str]) -> bool {
    let text = text.to_lowercase();
    aliases.iter().any(|alias| text.contains(alias))
}

/// Status attached to the block at `start`: its own icon token if it carries
/// one, otherwise the first token in the following blocks up to the next
/// heading.
fn status_near(blocks: &[TextBlock], start: usize) -> Option<Status> {
    if let Some(status) = blocks[start]
        .status_token
        .as_deref()
        .and_then(Status::from_token)
    {
        return Some(status);
    }
    for block in &blocks[start + 1..] {
        if matches!(block.kind, BlockKind::Heading(_)) {
            return None;
        }
        if let Some(status) = block.status_token.as_deref().and_then(Status::from_token) {
            return Some(status);
        }
    }
    None
}

/// Turns extracted blocks into one candidate report record for `period`.
///
/// The overall rating anchors the whole parse: the first block reading like
/// "Overall Rating"/"Overall Status" is the marker, and its status is the
/// first readable icon token at or after it. Without that, the document is
/// presumed not to be an EWA report and the parse fails. Section lookups
/// start strictly after the marker; when a section heading appears more than
/// once, the first occurrence after the marker wins. Sections that never
/// match, or match without a readable icon, degrade to Unknown.
pub fn parse_report(blocks: &[TextBlock], period: Period) -> Result<ReportRecord> {
    let marker = blocks
        .iter()
        .position(|b| is_overall_marker(&b.text))
        .ok_or(PipelineError::NoOverallStatusFound)?;

    let overall = blocks[marker..]
        .iter()
        .filter_map(|b| b.status_token.as_deref().and_then(Status::from_token))
        .next()
        .ok_or(PipelineError::NoOverallStatusFound)?;

    let mut sections: BTreeMap<String, Status> = BTreeMap::new();
    for (name, aliases) in SECTIONS {
        let found = blocks
            .iter()
            .enumerate()
            .skip(marker + 1)
            .find(|(_, b)| alias_match(&b.text, aliases))
            .and_then(|(idx, _)| status_near(blocks, idx));
        sections.insert((*name).to_string(), found.unwrap_or(Status::Unknown));
    }

    Ok(ReportRecord {
        id: Uuid::new_v4(),
        system: SYSTEM.to_string(),
        period,
        overall,
        sections,
        ingested_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_from_str;

    fn period() -> Period {
        Period::new(2025, 11).unwrap()
    }

    const REPORT: &str = r#"
        <h1>SAP EarlyWatch Alert - A1C</h1>
        <h2>Overall Rating</h2>
        <table><tr><td><img alt="yellow rating"></td><td>Overall</td></tr></table>
        <h3>Hardware Capacity</h3>
        <table><tr><td><img alt="green rating"></td><td>CPU capacity</td></tr></table>
        <h3>Security</h3>
        <table><tr><td><img alt="red rating"></td><td>Default passwords</td></tr></table>
        <h3>Security</h3>
        <table><tr><td><img alt="green rating"></td><td>TLS configuration</td></tr></table>
    "#;

    #[test]
    fn parses_overall_and_section_statuses() {
        let blocks = extract_from_str(REPORT);
        let record = parse_report(&blocks, period()).unwrap();
        assert_eq!(record.system, "A1C");
        assert_eq!(record.overall, Status::Yellow);
        assert_eq!(record.status_of("Hardware Capacity"), Status::Green);
    }

    #[test]
    fn first_occurrence_after_marker_wins_for_duplicate_headings() {
        let blocks = extract_from_str(REPORT);
        let record = parse_report(&blocks, period()).unwrap();
        // "Security" appears twice; the red first occurrence is the one kept.
        assert_eq!(record.status_of("Security"), Status::Red);
    }

    #[test]
    fn unmatched_sections_degrade_to_unknown() {
        let blocks = extract_from_str(REPORT);
        let record = parse_report(&blocks, period()).unwrap();
        assert_eq!(record.status_of("Financial Data Quality"), Status::Unknown);
        assert_eq!(record.status_of("UI Technologies"), Status::Unknown);
        // Every known section is present in the map even when unmatched.
        assert_eq!(record.sections.len(), SECTIONS.len());
    }

    #[test]
    fn missing_overall_marker_fails_the_parse() {
        let blocks = extract_from_str("<h2>Hardware Capacity</h2><p>fine</p>");
        let err = parse_report(&blocks, period()).unwrap_err();
        assert!(matches!(err, PipelineError::NoOverallStatusFound));
    }

    #[test]
    fn marker_without_readable_icon_fails_the_parse() {
        let html = r#"
            <h2>Overall Rating</h2>
            <table><tr><td><img alt="no rating"></td><td>Overall</td></tr></table>
        "#;
        let blocks = extract_from_str(html);
        let err = parse_report(&blocks, period()).unwrap_err();
        assert!(matches!(err, PipelineError::NoOverallStatusFound));
    }

    #[test]
    fn section_heading_without_icon_is_unknown() {
        let html = r#"
            <h2>Overall Status</h2>
            <table><tr><td><img alt="green rating"></td><td>Overall</td></tr></table>
            <h3>Upgrade Planning</h3>
            <p>Text only, no indicator.</p>
            <h3>Hardware Capacity</h3>
            <table><tr><td><img alt="yellow rating"></td><td>CPU</td></tr></table>
        "#;
        let blocks = extract_from_str(html);
        let record = parse_report(&blocks, period()).unwrap();
        assert_eq!(record.status_of("Upgrade Planning"), Status::Unknown);
        assert_eq!(record.status_of("Hardware Capacity"), Status::Yellow);
    }

    #[test]
    fn sniffs_period_from_filename_variants() {
        let p = Period::new(2025, 11).unwrap();
        assert_eq!(
            sniff_period(Path::new("A1C_21277797_2025-11-24_R_EWA.html")),
            Some(p)
        );
        assert_eq!(sniff_period(Path::new("EWA_A1C~20251124.htm")), Some(p));
        assert_eq!(sniff_period(Path::new("report_latest.html")), None);
    }
}
