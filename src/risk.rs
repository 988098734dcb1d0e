use crate::models::{Deviation, Direction, RiskRating, Status};

/// Aggregates a deviation sequence into one rating via the fixed rule
/// table, applied in order:
/// - High: any worsening that lands on Red, or two or more worsenings.
/// - Medium: exactly one worsening not covered above (the overall rating
///   worsening is itself a deviation and counts here).
/// - Low: no worsenings, including the empty no-baseline sequence.
///
/// Pure and total; ties resolve toward the higher rating.
pub fn score(deviations: &[Deviation]) -> RiskRating {
    let worsened: Vec<&Deviation> = deviations
        .iter()
        .filter(|d| d.direction == Direction::Worsened)
        .collect();

    if worsened.iter().any(|d| d.current == Status::Red) || worsened.len() >= 2 {
        return RiskRating::High;
    }
    if !worsened.is_empty() {
        return RiskRating::Medium;
    }
    RiskRating::Low
}
