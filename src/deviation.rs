use std::collections::BTreeSet;

use crate::models::{Deviation, Direction, Period, ReportRecord, Status};

/// Result of comparing a candidate record against the history baseline.
/// `NoBaseline` is the valid first-ingestion state, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    NoBaseline,
    Against {
        previous_period: Period,
        deviations: Vec<Deviation>,
    },
}

impl Comparison {
    pub fn deviations(&self) -> &[Deviation] {
        match self {
            Comparison::NoBaseline => &[],
            Comparison::Against { deviations, .. } => deviations,
        }
    }
}

/// Direction of a status change under the severity total order.
pub fn direction_of(previous: Status, current: Status) -> Direction {
    match current.cmp(&previous) {
        std::cmp::Ordering::Greater => Direction::Worsened,
        std::cmp::Ordering::Less => Direction::Improved,
        std::cmp::Ordering::Equal => Direction::Unchanged,
    }
}

fn deviation(section: &str, previous: Status, current: Status) -> Deviation {
    Deviation {
        section: section.to_string(),
        previous,
        current,
        direction: direction_of(previous, current),
    }
}

/// Compares a new candidate record against the latest stored record:
/// one deviation for the overall rating first, then one per section in the
/// union of both records' section sets, alphabetical. Deterministic; a
/// section absent on one side reads as Unknown there.
pub fn compare(baseline: Option<&ReportRecord>, candidate: &ReportRecord) -> Comparison {
    let Some(previous) = baseline else {
        return Comparison::NoBaseline;
    };

    let mut deviations = vec![deviation("overall", previous.overall, candidate.overall)];

    let sections: BTreeSet<&str> = previous
        .sections
        .keys()
        .chain(candidate.sections.keys())
        .map(String::as_str)
        .collect();

    for section in sections {
        deviations.push(deviation(
            section,
            previous.status_of(section),
            candidate.status_of(section),
        ));
    }

    Comparison::Against {
        previous_period: previous.period,
        deviations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn record(period: &str, overall: Status, sections: &[(&str, Status)]) -> ReportRecord {
        ReportRecord {
            id: Uuid::new_v4(),
            system: "A1C".to_string(),
            period: period.parse().unwrap(),
            overall,
            sections: sections
                .iter()
                .map(|(name, status)| (name.to_string(), *status))
                .collect::<BTreeMap<_, _>>(),
            ingested_at: Utc::now(),
        }
    }

    #[test]
    fn first_ingestion_has_no_baseline() {
        let candidate = record("2025-11", Status::Green, &[]);
        let comparison = compare(None, &candidate);
        assert_eq!(comparison, Comparison::NoBaseline);
        assert!(comparison.deviations().is_empty());
    }

    #[test]
    fn monthly_worsening_scenario() {
        let previous = record(
            "2025-10",
            Status::Green,
            &[("Database", Status::Green), ("Security", Status::Yellow)],
        );
        let candidate = record(
            "2025-11",
            Status::Yellow,
            &[("Database", Status::Red), ("Security", Status::Yellow)],
        );

        let Comparison::Against {
            previous_period,
            deviations,
        } = compare(Some(&previous), &candidate)
        else {
            panic!("expected a baseline comparison");
        };

        assert_eq!(previous_period.to_string(), "2025-10");
        assert_eq!(
            deviations,
            vec![
                Deviation {
                    section: "overall".to_string(),
                    previous: Status::Green,
                    current: Status::Yellow,
                    direction: Direction::Worsened,
                },
                Deviation {
                    section: "Database".to_string(),
                    previous: Status::Green,
                    current: Status::Red,
                    direction: Direction::Worsened,
                },
                Deviation {
                    section: "Security".to_string(),
                    previous: Status::Yellow,
                    current: Status::Yellow,
                    direction: Direction::Unchanged,
                },
            ]
        );
    }

    #[test]
    fn direction_is_antisymmetric() {
        let statuses = [Status::Unknown, Status::Green, Status::Yellow, Status::Red];
        for a in statuses {
            for b in statuses {
                let forward = direction_of(a, b);
                let backward = direction_of(b, a);
                if a == b {
                    assert_eq!(forward, Direction::Unchanged);
                    assert_eq!(backward, Direction::Unchanged);
                } else {
                    match forward {
                        Direction::Worsened => assert_eq!(backward, Direction::Improved),
                        Direction::Improved => assert_eq!(backward, Direction::Worsened),
                        Direction::Unchanged => panic!("unequal statuses cannot be unchanged"),
                    }
                }
            }
        }
    }

    #[test]
    fn comparison_is_deterministic() {
        let previous = record(
            "2025-10",
            Status::Green,
            &[("Security", Status::Green), ("Gateway", Status::Yellow)],
        );
        let candidate = record(
            "2025-11",
            Status::Red,
            &[("Security", Status::Red), ("Gateway", Status::Green)],
        );
        let first = compare(Some(&previous), &candidate);
        let second = compare(Some(&previous), &candidate);
        assert_eq!(first, second);
    }

    #[test]
    fn section_union_covers_both_records() {
        let previous = record("2025-10", Status::Green, &[("Old Only", Status::Green)]);
        let candidate = record("2025-11", Status::Green, &[("New Only", Status::Yellow)]);

        let comparison = compare(Some(&previous), &candidate);
        let sections: Vec<&str> = comparison
            .deviations()
            .iter()
            .map(|d| d.section.as_str())
            .collect();
        assert_eq!(sections, vec!["overall", "New Only", "Old Only"]);

        let new_only = &comparison.deviations()[1];
        assert_eq!(new_only.previous, Status::Unknown);
        assert_eq!(new_only.current, Status::Yellow);
        assert_eq!(new_only.direction, Direction::Worsened);

        let old_only = &comparison.deviations()[2];
        assert_eq!(old_only.previous, Status::Green);
        assert_eq!(old_only.current, Status::Unknown);
        assert_eq!(old_only.direction, Direction::Improved);
    }
}
