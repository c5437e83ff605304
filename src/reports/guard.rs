//! Duplicate suppression for incoming reports.
//!
//! A candidate is rejected when a report of the same kind already exists in
//! the caller's city inside a 5 minute window and an axis-aligned box of
//! ±0.002° (roughly 200 m at mid latitudes). The check and the later insert
//! are not serialized: two simultaneous submissions for the same spot can
//! both pass and both be stored.

use time::{Duration, OffsetDateTime};

use super::repo_types::ReportKind;
use crate::store::{ProximityQuery, ReportStore};

pub const DUPLICATE_WINDOW: Duration = Duration::minutes(5);
pub const DUPLICATE_BOX_DEGREES: f64 = 0.002;

/// Candidate report as seen by the guard.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub kind: ReportKind,
    pub lat: f64,
    pub lng: f64,
}

pub async fn should_reject(
    store: &dyn ReportStore,
    now: OffsetDateTime,
    candidate: Candidate,
    city: &str,
) -> sqlx::Result<bool> {
    store
        .has_nearby_report(ProximityQuery {
            city,
            kind: candidate.kind,
            lat: candidate.lat,
            lng: candidate.lng,
            max_delta: DUPLICATE_BOX_DEGREES,
            created_after: now - DUPLICATE_WINDOW,
        })
        .await
}
