use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Traffic-light status of a report section. Severity order is
/// Unknown < Green < Yellow < Red.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Unknown,
    Green,
    Yellow,
    Red,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unknown => "UNKNOWN",
            Status::Green => "GREEN",
            Status::Yellow => "YELLOW",
            Status::Red => "RED",
        }
    }

    /// Maps a status token from a report (icon alt text, cell label) to a
    /// status via the synonym table. "no rating" and unrecognized tokens
    /// yield None.
    pub fn from_token(token: &str) -> Option<Status> {
        let token = token.to_lowercase();
        if token.contains("no rating") {
            return None;
        }
        for (pattern, status) in COLOR_SYNONYMS {
            if token.contains(pattern) {
                return Some(*status);
            }
        }
        None
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GREEN" => Ok(Status::Green),
            "YELLOW" => Ok(Status::Yellow),
            "RED" => Ok(Status::Red),
            "UNKNOWN" | "NA" => Ok(Status::Unknown),
            other => Err(format!("not a status: {other}")),
        }
    }
}

/// Recognized color wording from real EWA reports, mapped to a status.
/// Order matters: earlier patterns win when a token contains several.
pub const COLOR_SYNONYMS: &[(&str, Status)] = &[
    ("red", Status::Red),
    ("critical", Status::Red),
    ("error", Status::Red),
    ("yellow", Status::Yellow),
    ("warning", Status::Yellow),
    ("medium", Status::Yellow),
    ("green", Status::Green),
    ("ok", Status::Green),
    ("good", Status::Green),
];

/// The fixed section set tracked for system A1C, with the keyword aliases
/// each section is recognized by in report text. New wording variants are
/// added here, not in the parser.
pub const SECTIONS: &[(&str, &[&str])] = &[
    ("Financial Data Quality", &["financial data quality"]),
    ("Gateway", &["netweaver gateway", "gateway"]),
    (
        "HANA Database",
        &["hana database", "hana stability", "hana resource"],
    ),
    (
        "Hardware Capacity",
        &["hardware capacity", "cpu capacity", "disk capacity"],
    ),
    (
        "Performance Overview",
        &["performance overview", "dialog response", "cpu load"],
    ),
    (
        "Security",
        &["security", "authorization", "password", "tls", "ssl"],
    ),
    ("Service Data Quality", &["data quality", "service readiness"]),
    ("Service Summary", &["service summary"]),
    (
        "Software Change Management",
        &["transport management", "software change", "change management"],
    ),
    ("Software Configuration", &["software configuration"]),
    ("System Operating", &["system operating", "system operation"]),
    ("UI Technologies", &["ui technologies", "fiori", "web dynpro"]),
    (
        "Upgrade Planning",
        &["upgrade planning", "maintenance strategy"],
    ),
];

pub fn section_names() -> impl Iterator<Item = &'static str> {
    SECTIONS.iter().map(|(name, _)| *name)
}

/// A report period, year-month granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Period> {
        if (1..=12).contains(&month) {
            Some(Period { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Period {
        Period {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First day of the month, the form periods take in SQL.
    pub fn to_date(self) -> NaiveDate {
        // month is validated on construction; only an absurd year can fail
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = String;

    /// Accepts the forms seen in report filenames and on the CLI:
    /// 2025-11, 2025-11-24, 20251124.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parts: Vec<&str> = s.split('-').collect();
        let (year, month) = match parts.as_slice() {
            [y, m] | [y, m, _] => (
                y.parse::<i32>().map_err(|e| e.to_string())?,
                m.parse::<u32>().map_err(|e| e.to_string())?,
            ),
            [compact] if compact.len() == 8 && compact.chars().all(|c| c.is_ascii_digit()) => (
                compact[0..4].parse::<i32>().map_err(|e| e.to_string())?,
                compact[4..6].parse::<u32>().map_err(|e| e.to_string())?,
            ),
            _ => return Err(format!("not a period: {s}")),
        };
        Period::new(year, month).ok_or_else(|| format!("not a period: {s}"))
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One ingested report: overall status plus one status per known section.
/// Immutable once appended to history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: Uuid,
    pub system: String,
    pub period: Period,
    pub overall: Status,
    pub sections: BTreeMap<String, Status>,
    pub ingested_at: DateTime<Utc>,
}

impl ReportRecord {
    pub fn status_of(&self, section: &str) -> Status {
        self.sections.get(section).copied().unwrap_or(Status::Unknown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Improved,
    Unchanged,
    Worsened,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Direction::Improved => "Improved",
            Direction::Unchanged => "Unchanged",
            Direction::Worsened => "Worsened",
        };
        f.write_str(label)
    }
}

/// A status change for one section between two consecutive reports.
/// Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deviation {
    pub section: String,
    pub previous: Status,
    pub current: Status,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskRating {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskRating::Low => "LOW",
            RiskRating::Medium => "MEDIUM",
            RiskRating::High => "HIGH",
        };
        f.write_str(label)
    }
}
