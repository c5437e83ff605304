use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, Role, User, UserRow};

const USER_COLUMNS: &str = "id, role, email, password_hash, city, rating, banned, created_at";

impl User {
    /// Find a user by id.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        row.map(User::try_from).transpose()
    }

    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        row.map(User::try_from).transpose()
    }

    pub async fn create(
        db: &PgPool,
        new: NewUser,
        created_at: OffsetDateTime,
    ) -> sqlx::Result<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, role, email, password_hash, city, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.role.as_str())
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.city)
        .bind(created_at)
        .fetch_one(db)
        .await?;
        User::try_from(row)
    }

    pub async fn count_owners(db: &PgPool) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT count(*) FROM users WHERE role = 'owner'")
            .fetch_one(db)
            .await
    }

    pub async fn list_latest(db: &PgPool, limit: i64) -> sqlx::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(db)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    pub async fn set_banned(db: &PgPool, id: Uuid, banned: bool) -> sqlx::Result<bool> {
        let res = sqlx::query("UPDATE users SET banned = $1 WHERE id = $2")
            .bind(banned)
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn set_role(db: &PgPool, id: Uuid, role: Role) -> sqlx::Result<bool> {
        let res = sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(role.as_str())
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn set_city(db: &PgPool, id: Uuid, city: &str) -> sqlx::Result<bool> {
        let res = sqlx::query("UPDATE users SET city = $1 WHERE id = $2")
            .bind(city)
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Foreign keys null out `reports.author_id` and drop the user's
    /// confirmations.
    pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
