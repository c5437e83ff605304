use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{DeletedReport, ProximityQuery, ReportStore};
use crate::auth::repo_types::{NewUser, Role, User};
use crate::reports::repo as reports_repo;
use crate::reports::repo_types::{ConfirmOutcome, NewReport, Report};

/// Postgres-backed store. Isolation is the server default (read committed);
/// the multi-statement mutations run in explicit transactions.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReportStore for PgStore {
    async fn create_user(&self, new: NewUser, created_at: OffsetDateTime) -> sqlx::Result<User> {
        User::create(&self.db, new, created_at).await
    }

    async fn find_user(&self, id: Uuid) -> sqlx::Result<Option<User>> {
        User::find_by_id(&self.db, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> sqlx::Result<Option<User>> {
        User::find_by_email(&self.db, email).await
    }

    async fn count_owners(&self) -> sqlx::Result<i64> {
        User::count_owners(&self.db).await
    }

    async fn list_users(&self, limit: i64) -> sqlx::Result<Vec<User>> {
        User::list_latest(&self.db, limit).await
    }

    async fn set_banned(&self, id: Uuid, banned: bool) -> sqlx::Result<bool> {
        User::set_banned(&self.db, id, banned).await
    }

    async fn set_role(&self, id: Uuid, role: Role) -> sqlx::Result<bool> {
        User::set_role(&self.db, id, role).await
    }

    async fn set_city(&self, id: Uuid, city: &str) -> sqlx::Result<bool> {
        User::set_city(&self.db, id, city).await
    }

    async fn delete_user(&self, id: Uuid) -> sqlx::Result<bool> {
        User::delete(&self.db, id).await
    }

    async fn has_nearby_report(&self, q: ProximityQuery<'_>) -> sqlx::Result<bool> {
        reports_repo::exists_nearby(&self.db, q).await
    }

    async fn insert_report(&self, new: NewReport) -> sqlx::Result<Report> {
        reports_repo::insert(&self.db, new).await
    }

    async fn list_reports(
        &self,
        city: &str,
        created_after: OffsetDateTime,
    ) -> sqlx::Result<Vec<Report>> {
        reports_repo::list_since(&self.db, city, created_after).await
    }

    async fn list_latest_reports(&self, limit: i64) -> sqlx::Result<Vec<Report>> {
        reports_repo::list_latest(&self.db, limit).await
    }

    async fn confirm(
        &self,
        user_id: Uuid,
        report_id: Uuid,
        confirmed_at: OffsetDateTime,
    ) -> sqlx::Result<ConfirmOutcome> {
        reports_repo::confirm(&self.db, user_id, report_id, confirmed_at).await
    }

    async fn delete_report(&self, report_id: Uuid) -> sqlx::Result<Option<DeletedReport>> {
        reports_repo::delete_with_penalty(&self.db, report_id).await
    }

    async fn delete_expired(&self, cutoff: OffsetDateTime) -> sqlx::Result<u64> {
        reports_repo::delete_created_before(&self.db, cutoff).await
    }
}
