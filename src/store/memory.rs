use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{DeletedReport, ProximityQuery, ReportStore};
use crate::auth::repo_types::{NewUser, Role, User};
use crate::reports::repo_types::{ConfirmOutcome, NewReport, Report};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    reports: HashMap<Uuid, Report>,
    // (user_id, report_id) -> confirmed_at
    confirmations: HashMap<(Uuid, Uuid), OffsetDateTime>,
}

impl Tables {
    fn with_count(&self, r: &Report) -> Report {
        let mut out = r.clone();
        out.confirmation_count = self
            .confirmations
            .keys()
            .filter(|(_, report_id)| *report_id == r.id)
            .count() as i64;
        out
    }

    fn remove_report(&mut self, report_id: Uuid) -> Option<Report> {
        let removed = self.reports.remove(&report_id)?;
        self.confirmations.retain(|(_, rid), _| *rid != report_id);
        Some(removed)
    }

    fn bump_rating(&mut self, user_id: Option<Uuid>, delta: i32) {
        if let Some(user) = user_id.and_then(|id| self.users.get_mut(&id)) {
            user.rating += delta;
        }
    }
}

/// In-process store with the same foreign-key semantics as the Postgres
/// schema. A single lock makes every method atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(reports: &mut [Report]) {
    reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn create_user(&self, new: NewUser, created_at: OffsetDateTime) -> sqlx::Result<User> {
        let mut t = self.tables.lock().await;
        if let Some(email) = &new.email {
            if t.users.values().any(|u| u.email.as_ref() == Some(email)) {
                return Err(sqlx::Error::Protocol(format!("email {email} already exists")));
            }
        }
        let user = User {
            id: Uuid::new_v4(),
            role: new.role,
            email: new.email,
            password_hash: new.password_hash,
            city: new.city,
            rating: 0,
            banned: false,
            created_at,
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> sqlx::Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> sqlx::Result<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t
            .users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn count_owners(&self) -> sqlx::Result<i64> {
        let t = self.tables.lock().await;
        Ok(t.users.values().filter(|u| u.role == Role::Owner).count() as i64)
    }

    async fn list_users(&self, limit: i64) -> sqlx::Result<Vec<User>> {
        let t = self.tables.lock().await;
        let mut users: Vec<User> = t.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        users.truncate(limit.max(0) as usize);
        Ok(users)
    }

    async fn set_banned(&self, id: Uuid, banned: bool) -> sqlx::Result<bool> {
        let mut t = self.tables.lock().await;
        Ok(t.users.get_mut(&id).map(|u| u.banned = banned).is_some())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> sqlx::Result<bool> {
        let mut t = self.tables.lock().await;
        Ok(t.users.get_mut(&id).map(|u| u.role = role).is_some())
    }

    async fn set_city(&self, id: Uuid, city: &str) -> sqlx::Result<bool> {
        let mut t = self.tables.lock().await;
        Ok(t.users.get_mut(&id).map(|u| u.city = city.to_string()).is_some())
    }

    async fn delete_user(&self, id: Uuid) -> sqlx::Result<bool> {
        let mut t = self.tables.lock().await;
        if t.users.remove(&id).is_none() {
            return Ok(false);
        }
        for report in t.reports.values_mut() {
            if report.author_id == Some(id) {
                report.author_id = None;
            }
        }
        t.confirmations.retain(|(uid, _), _| *uid != id);
        Ok(true)
    }

    async fn has_nearby_report(&self, q: ProximityQuery<'_>) -> sqlx::Result<bool> {
        let t = self.tables.lock().await;
        Ok(t.reports.values().any(|r| q.matches(r)))
    }

    async fn insert_report(&self, new: NewReport) -> sqlx::Result<Report> {
        let mut t = self.tables.lock().await;
        // mirrors the author foreign key
        if !t.users.contains_key(&new.author_id) {
            return Err(sqlx::Error::Protocol(format!(
                "author {} does not exist",
                new.author_id
            )));
        }
        let report = new.into_report();
        t.reports.insert(report.id, report.clone());
        Ok(report)
    }

    async fn list_reports(
        &self,
        city: &str,
        created_after: OffsetDateTime,
    ) -> sqlx::Result<Vec<Report>> {
        let t = self.tables.lock().await;
        let mut out: Vec<Report> = t
            .reports
            .values()
            .filter(|r| r.city == city && r.created_at > created_after)
            .map(|r| t.with_count(r))
            .collect();
        newest_first(&mut out);
        Ok(out)
    }

    async fn list_latest_reports(&self, limit: i64) -> sqlx::Result<Vec<Report>> {
        let t = self.tables.lock().await;
        let mut out: Vec<Report> = t.reports.values().map(|r| t.with_count(r)).collect();
        newest_first(&mut out);
        out.truncate(limit.max(0) as usize);
        Ok(out)
    }

    async fn confirm(
        &self,
        user_id: Uuid,
        report_id: Uuid,
        confirmed_at: OffsetDateTime,
    ) -> sqlx::Result<ConfirmOutcome> {
        let mut t = self.tables.lock().await;
        if t.confirmations.contains_key(&(user_id, report_id)) {
            return Ok(ConfirmOutcome::AlreadyConfirmed);
        }
        let Some(author_id) = t.reports.get(&report_id).map(|r| r.author_id) else {
            return Ok(ConfirmOutcome::ReportMissing);
        };
        t.confirmations.insert((user_id, report_id), confirmed_at);
        t.bump_rating(author_id, 1);
        Ok(ConfirmOutcome::Confirmed { author_id })
    }

    async fn delete_report(&self, report_id: Uuid) -> sqlx::Result<Option<DeletedReport>> {
        let mut t = self.tables.lock().await;
        let Some(removed) = t.remove_report(report_id) else {
            return Ok(None);
        };
        t.bump_rating(removed.author_id, -1);
        Ok(Some(DeletedReport {
            author_id: removed.author_id,
        }))
    }

    async fn delete_expired(&self, cutoff: OffsetDateTime) -> sqlx::Result<u64> {
        let mut t = self.tables.lock().await;
        let expired: Vec<Uuid> = t
            .reports
            .values()
            .filter(|r| r.created_at < cutoff)
            .map(|r| r.id)
            .collect();
        for id in &expired {
            t.remove_report(*id);
        }
        Ok(expired.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::reports::repo_types::ReportKind;

    fn report_for(author: Uuid, created_at: OffsetDateTime) -> NewReport {
        NewReport {
            id: Uuid::new_v4(),
            city: "Warszawa".into(),
            kind: ReportKind::TicketInspection,
            location: "Rondo ONZ".into(),
            bus_number: Some("175".into()),
            direction: None,
            lat: 52.2330,
            lng: 20.9980,
            created_at,
            author_id: author,
        }
    }

    async fn user(store: &MemoryStore) -> User {
        store
            .create_user(
                NewUser {
                    role: Role::User,
                    email: None,
                    password_hash: None,
                    city: "Warszawa".into(),
                },
                OffsetDateTime::now_utc(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn deleting_a_user_nulls_authorship_and_drops_their_confirmations() {
        let store = MemoryStore::new();
        let author = user(&store).await;
        let voter = user(&store).await;
        let now = OffsetDateTime::now_utc();

        let report = store.insert_report(report_for(author.id, now)).await.unwrap();
        let theirs = store.insert_report(report_for(voter.id, now)).await.unwrap();
        store.confirm(voter.id, report.id, now).await.unwrap();
        store.confirm(author.id, theirs.id, now).await.unwrap();

        assert!(store.delete_user(author.id).await.unwrap());

        let listed = store
            .list_reports("Warszawa", now - Duration::minutes(1))
            .await
            .unwrap();
        let orphan = listed.iter().find(|r| r.id == report.id).unwrap();
        assert_eq!(orphan.author_id, None);
        assert_eq!(orphan.confirmation_count, 1);
        let other = listed.iter().find(|r| r.id == theirs.id).unwrap();
        assert_eq!(other.confirmation_count, 0);
    }

    #[tokio::test]
    async fn expiry_cascades_confirmations() {
        let store = MemoryStore::new();
        let author = user(&store).await;
        let now = OffsetDateTime::now_utc();
        let old = store
            .insert_report(report_for(author.id, now - Duration::minutes(61)))
            .await
            .unwrap();
        store.confirm(author.id, old.id, now).await.unwrap();

        assert_eq!(store.delete_expired(now - Duration::minutes(60)).await.unwrap(), 1);
        assert_eq!(store.delete_report(old.id).await.unwrap(), None);
        let t = store.tables.lock().await;
        assert!(t.confirmations.is_empty());
    }

    #[tokio::test]
    async fn confirm_keeps_the_first_confirmation_time() {
        let store = MemoryStore::new();
        let author = user(&store).await;
        let voter = user(&store).await;
        let now = OffsetDateTime::now_utc();
        let report = store.insert_report(report_for(author.id, now)).await.unwrap();

        let at = now + Duration::minutes(2);
        store.confirm(voter.id, report.id, at).await.unwrap();
        assert_eq!(
            store
                .confirm(voter.id, report.id, at + Duration::minutes(1))
                .await
                .unwrap(),
            ConfirmOutcome::AlreadyConfirmed
        );

        let t = store.tables.lock().await;
        assert_eq!(t.confirmations.get(&(voter.id, report.id)), Some(&at));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        let new = NewUser {
            role: Role::Moderator,
            email: Some("mod@example.com".into()),
            password_hash: None,
            city: "Kraków".into(),
        };
        store.create_user(new.clone(), OffsetDateTime::now_utc()).await.unwrap();
        assert!(store.create_user(new, OffsetDateTime::now_utc()).await.is_err());
    }
}
