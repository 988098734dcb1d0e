use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::history::History;
use crate::models::{Period, ReportRecord, Status};

pub async fn init_db(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(sqlx::Error::from)?;
    Ok(())
}

/// Loads the full history for one system, period ascending.
pub async fn load_history(pool: &PgPool, system: &str) -> Result<History> {
    let rows = sqlx::query(
        "SELECT id, system, period, overall_status, sections, ingested_at \
         FROM ewa_tracker.report_records \
         WHERE system = $1 \
         ORDER BY period ASC",
    )
    .bind(system)
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let period: NaiveDate = row.get("period");
        let overall: String = row.get("overall_status");
        let sections: String = row.get("sections");
        let ingested_at: DateTime<Utc> = row.get("ingested_at");

        let sections: BTreeMap<String, Status> = serde_json::from_str(&sections)?;
        records.push(ReportRecord {
            id: row.get::<Uuid, _>("id"),
            system: row.get("system"),
            period: Period::from_date(period),
            overall: overall.parse().unwrap_or(Status::Unknown),
            sections,
            ingested_at,
        });
    }

    History::from_records(records)
}

/// Durable append. The unique (system, period) index is the authority on
/// duplicates: a conflicting insert changes no rows and surfaces as
/// `DuplicatePeriod`, never as an overwrite.
pub async fn insert_record(pool: &PgPool, record: &ReportRecord) -> Result<()> {
    let sections = serde_json::to_string(&record.sections)?;

    let result = sqlx::query(
        r#"
        INSERT INTO ewa_tracker.report_records
        (id, system, period, overall_status, sections, ingested_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (system, period) DO NOTHING
        "#,
    )
    .bind(record.id)
    .bind(&record.system)
    .bind(record.period.to_date())
    .bind(record.overall.as_str())
    .bind(sections)
    .bind(record.ingested_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(PipelineError::DuplicatePeriod {
            system: record.system.clone(),
            period: record.period,
        });
    }
    Ok(())
}
