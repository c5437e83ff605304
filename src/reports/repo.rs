use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::reports::repo_types::{ConfirmOutcome, NewReport, Report, ReportRow};
use crate::store::{DeletedReport, ProximityQuery};

const REPORT_SELECT: &str = r#"
    SELECT r.id, r.city, r.kind, r.location, r.bus_number, r.direction,
           r.lat, r.lng, r.created_at, r.author_id,
           count(c.user_id) AS confirmation_count
      FROM reports r
      LEFT JOIN confirmations c ON c.report_id = r.id
"#;

pub async fn exists_nearby(db: &PgPool, q: ProximityQuery<'_>) -> sqlx::Result<bool> {
    let found = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT 1
          FROM reports
         WHERE city = $1
           AND kind = $2
           AND created_at > $3
           AND abs(lat - $4) < $6
           AND abs(lng - $5) < $6
         LIMIT 1
        "#,
    )
    .bind(q.city)
    .bind(q.kind.as_str())
    .bind(q.created_after)
    .bind(q.lat)
    .bind(q.lng)
    .bind(q.max_delta)
    .fetch_optional(db)
    .await?;
    Ok(found.is_some())
}

pub async fn insert(db: &PgPool, new: NewReport) -> sqlx::Result<Report> {
    sqlx::query(
        r#"
        INSERT INTO reports (id, city, kind, location, bus_number, direction, lat, lng, created_at, author_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(new.id)
    .bind(&new.city)
    .bind(new.kind.as_str())
    .bind(&new.location)
    .bind(&new.bus_number)
    .bind(&new.direction)
    .bind(new.lat)
    .bind(new.lng)
    .bind(new.created_at)
    .bind(new.author_id)
    .execute(db)
    .await?;
    Ok(new.into_report())
}

pub async fn list_since(
    db: &PgPool,
    city: &str,
    created_after: OffsetDateTime,
) -> sqlx::Result<Vec<Report>> {
    let rows = sqlx::query_as::<_, ReportRow>(&format!(
        r#"{REPORT_SELECT}
         WHERE r.city = $1 AND r.created_at > $2
         GROUP BY r.id
         ORDER BY r.created_at DESC
        "#
    ))
    .bind(city)
    .bind(created_after)
    .fetch_all(db)
    .await?;
    rows.into_iter().map(Report::try_from).collect()
}

pub async fn list_latest(db: &PgPool, limit: i64) -> sqlx::Result<Vec<Report>> {
    let rows = sqlx::query_as::<_, ReportRow>(&format!(
        r#"{REPORT_SELECT}
         GROUP BY r.id
         ORDER BY r.created_at DESC
         LIMIT $1
        "#
    ))
    .bind(limit)
    .fetch_all(db)
    .await?;
    rows.into_iter().map(Report::try_from).collect()
}

/// Confirmation row plus the author's +1 in one transaction.
pub async fn confirm(
    db: &PgPool,
    user_id: Uuid,
    report_id: Uuid,
    confirmed_at: OffsetDateTime,
) -> sqlx::Result<ConfirmOutcome> {
    let mut tx = db.begin().await?;

    let already = sqlx::query_scalar::<_, i32>(
        "SELECT 1 FROM confirmations WHERE user_id = $1 AND report_id = $2",
    )
    .bind(user_id)
    .bind(report_id)
    .fetch_optional(&mut *tx)
    .await?;
    if already.is_some() {
        return Ok(ConfirmOutcome::AlreadyConfirmed);
    }

    // row lock keeps a concurrent delete or sweep from slipping in between
    let author = sqlx::query_scalar::<_, Option<Uuid>>(
        "SELECT author_id FROM reports WHERE id = $1 FOR UPDATE",
    )
    .bind(report_id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(author_id) = author else {
        return Ok(ConfirmOutcome::ReportMissing);
    };

    let inserted = sqlx::query(
        r#"
        INSERT INTO confirmations (user_id, report_id, confirmed_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, report_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(report_id)
    .bind(confirmed_at)
    .execute(&mut *tx)
    .await?;
    if inserted.rows_affected() == 0 {
        return Ok(ConfirmOutcome::AlreadyConfirmed);
    }

    if let Some(author_id) = author_id {
        adjust_rating(&mut tx, author_id, 1).await?;
    }

    tx.commit().await?;
    Ok(ConfirmOutcome::Confirmed { author_id })
}

/// Deletes a report (confirmations cascade) and takes one point from a live
/// author, however many confirmations the report had.
pub async fn delete_with_penalty(
    db: &PgPool,
    report_id: Uuid,
) -> sqlx::Result<Option<DeletedReport>> {
    let mut tx = db.begin().await?;

    let deleted = sqlx::query_scalar::<_, Option<Uuid>>(
        "DELETE FROM reports WHERE id = $1 RETURNING author_id",
    )
    .bind(report_id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(author_id) = deleted else {
        return Ok(None);
    };

    if let Some(author_id) = author_id {
        adjust_rating(&mut tx, author_id, -1).await?;
    }

    tx.commit().await?;
    Ok(Some(DeletedReport { author_id }))
}

pub async fn delete_created_before(db: &PgPool, cutoff: OffsetDateTime) -> sqlx::Result<u64> {
    let res = sqlx::query("DELETE FROM reports WHERE created_at < $1")
        .bind(cutoff)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}

async fn adjust_rating(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    delta: i32,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET rating = rating + $1 WHERE id = $2")
        .bind(delta)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
