//! Persistence boundary of the report lifecycle engine.
//!
//! Every method is a single atomic unit against the backing store: the
//! cross-entity mutations (`confirm`, `delete_report`, `delete_user`) either
//! apply completely or not at all.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, Role, User};
use crate::reports::repo_types::{ConfirmOutcome, NewReport, Report, ReportKind};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Axis-aligned proximity query used by the duplicate guard.
#[derive(Debug, Clone, Copy)]
pub struct ProximityQuery<'a> {
    pub city: &'a str,
    pub kind: ReportKind,
    pub lat: f64,
    pub lng: f64,
    pub max_delta: f64,
    pub created_after: OffsetDateTime,
}

impl ProximityQuery<'_> {
    pub fn matches(&self, r: &Report) -> bool {
        r.city == self.city
            && r.kind == self.kind
            && r.created_at > self.created_after
            && (r.lat - self.lat).abs() < self.max_delta
            && (r.lng - self.lng).abs() < self.max_delta
    }
}

/// Result of a moderator deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletedReport {
    pub author_id: Option<Uuid>,
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    // users
    async fn create_user(&self, new: NewUser, created_at: OffsetDateTime) -> sqlx::Result<User>;
    async fn find_user(&self, id: Uuid) -> sqlx::Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> sqlx::Result<Option<User>>;
    async fn count_owners(&self) -> sqlx::Result<i64>;
    async fn list_users(&self, limit: i64) -> sqlx::Result<Vec<User>>;
    async fn set_banned(&self, id: Uuid, banned: bool) -> sqlx::Result<bool>;
    async fn set_role(&self, id: Uuid, role: Role) -> sqlx::Result<bool>;
    async fn set_city(&self, id: Uuid, city: &str) -> sqlx::Result<bool>;
    /// Removes the user; their reports keep living with a null author and
    /// their confirmations go away.
    async fn delete_user(&self, id: Uuid) -> sqlx::Result<bool>;

    // reports
    async fn has_nearby_report(&self, q: ProximityQuery<'_>) -> sqlx::Result<bool>;
    async fn insert_report(&self, new: NewReport) -> sqlx::Result<Report>;
    /// Reports of `city` created strictly after `created_after`, newest first.
    async fn list_reports(&self, city: &str, created_after: OffsetDateTime)
        -> sqlx::Result<Vec<Report>>;
    async fn list_latest_reports(&self, limit: i64) -> sqlx::Result<Vec<Report>>;

    /// Records the confirmation and bumps the author's rating by one.
    async fn confirm(
        &self,
        user_id: Uuid,
        report_id: Uuid,
        confirmed_at: OffsetDateTime,
    ) -> sqlx::Result<ConfirmOutcome>;

    /// Deletes the report with its confirmations and takes one point from a
    /// live author. `None` when the report does not exist.
    async fn delete_report(&self, report_id: Uuid) -> sqlx::Result<Option<DeletedReport>>;

    /// Deletes every report created strictly before `cutoff`. Ratings are
    /// left untouched.
    async fn delete_expired(&self, cutoff: OffsetDateTime) -> sqlx::Result<u64>;
}
