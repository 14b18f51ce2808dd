//! PostgreSQL credential store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    CredentialStore, RefreshTokenWrite, StoreError, admin_not_found, application_not_found,
    refresh_token_exists, user_not_found,
};
use crate::models::{
    Admin, AdminPatch, AdminWithPassword, Application, ApplicationPatch, NewAdmin,
    NewApplication, NewUser, Page, PageRequest, User, UserPatch, UserWithPassword,
};
use crate::uuid::{parse_id, uuidv7};

type AdminRow = (String, String, String, String, String, DateTime<Utc>, DateTime<Utc>);
type ApplicationRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);
type UserRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

const ADMIN_COLUMNS: &str =
    "id::text, email, password_hash, first_name, last_name, created_at, updated_at";
const APPLICATION_COLUMNS: &str =
    "id::text, name, description, admin_id::text, refresh_token, created_at, updated_at";
const USER_COLUMNS: &str = "id::text, email, password_hash, first_name, last_name, \
     application_id::text, created_at, updated_at";

fn admin_from_row(row: AdminRow) -> AdminWithPassword {
    let (id, email, password_hash, first_name, last_name, created_at, updated_at) = row;
    AdminWithPassword {
        admin: Admin {
            id,
            email,
            first_name,
            last_name,
            created_at,
            updated_at,
        },
        password_hash,
    }
}

fn application_from_row(row: ApplicationRow) -> Application {
    let (id, name, description, admin_id, refresh_token, created_at, updated_at) = row;
    Application {
        id,
        name,
        description,
        admin_id,
        refresh_token,
        created_at,
        updated_at,
    }
}

fn user_from_row(row: UserRow) -> UserWithPassword {
    let (id, email, password_hash, first_name, last_name, application_id, created_at, updated_at) =
        row;
    UserWithPassword {
        user: User {
            id,
            email,
            first_name,
            last_name,
            application_id,
            created_at,
            updated_at,
        },
        password_hash,
    }
}

/// Map unique-constraint violations to `Conflict`, everything else to `DbError`.
fn conflict_or(e: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what()),
        _ => StoreError::DbError(e),
    }
}

/// Credential store over a shared `PgPool`.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_application(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(application_from_row))
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn health(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_admin(&self, new_admin: NewAdmin) -> Result<Admin, StoreError> {
        let duplicate = || format!("admin with email {} already exists", new_admin.email);
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM admins WHERE email = $1)",
        )
        .bind(&new_admin.email)
        .fetch_one(&mut *tx)
        .await?;
        if exists {
            return Err(StoreError::Conflict(duplicate()));
        }

        // The unique index still backstops a concurrent insert racing past the check.
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "INSERT INTO admins (id, email, password_hash, first_name, last_name) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(uuidv7())
        .bind(&new_admin.email)
        .bind(&new_admin.password_hash)
        .bind(&new_admin.first_name)
        .bind(&new_admin.last_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_or(e, duplicate))?;

        tx.commit().await?;
        Ok(admin_from_row(row).admin)
    }

    async fn get_admin(&self, id: &str) -> Result<Option<Admin>, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| admin_from_row(r).admin))
    }

    async fn find_admin_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AdminWithPassword>, StoreError> {
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(admin_from_row))
    }

    async fn update_admin(&self, id: &str, patch: AdminPatch) -> Result<Admin, StoreError> {
        let uuid = parse_id(id).ok_or_else(|| admin_not_found(id))?;
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "UPDATE admins SET \
               first_name = COALESCE($2, first_name), \
               last_name = COALESCE($3, last_name), \
               password_hash = COALESCE($4, password_hash), \
               updated_at = now() \
             WHERE id = $1 RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(uuid)
        .bind(patch.first_name)
        .bind(patch.last_name)
        .bind(patch.password_hash)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| admin_from_row(r).admin)
            .ok_or_else(|| admin_not_found(id))
    }

    async fn delete_admin(&self, id: &str) -> Result<(), StoreError> {
        let uuid = parse_id(id).ok_or_else(|| admin_not_found(id))?;
        let result = sqlx::query("DELETE FROM admins WHERE id = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(admin_not_found(id));
        }
        Ok(())
    }

    async fn create_application(
        &self,
        new_application: NewApplication,
    ) -> Result<Application, StoreError> {
        let admin_id = parse_id(&new_application.admin_id)
            .ok_or_else(|| admin_not_found(&new_application.admin_id))?;
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "INSERT INTO applications (id, name, description, admin_id) \
             VALUES ($1, $2, $3, $4) RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(uuidv7())
        .bind(&new_application.name)
        .bind(&new_application.description)
        .bind(admin_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                admin_not_found(&new_application.admin_id)
            }
            _ => StoreError::DbError(e),
        })?;
        Ok(application_from_row(row))
    }

    async fn get_application(&self, id: &str) -> Result<Option<Application>, StoreError> {
        match parse_id(id) {
            Some(uuid) => self.fetch_application(uuid).await,
            None => Ok(None),
        }
    }

    async fn list_applications(
        &self,
        admin_id: &str,
        page: PageRequest,
    ) -> Result<Page<Application>, StoreError> {
        let Some(admin_id) = parse_id(admin_id) else {
            return Ok(Page {
                items: Vec::new(),
                total: 0,
            });
        };
        let total =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM applications WHERE admin_id = $1")
                .bind(admin_id)
                .fetch_one(&self.pool)
                .await?;
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE admin_id = $1 \
             ORDER BY id OFFSET $2 LIMIT $3"
        ))
        .bind(admin_id)
        .bind(i64::from(page.offset))
        .bind(i64::from(page.limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(Page {
            items: rows.into_iter().map(application_from_row).collect(),
            total,
        })
    }

    async fn update_application(
        &self,
        id: &str,
        patch: ApplicationPatch,
    ) -> Result<Application, StoreError> {
        let uuid = parse_id(id).ok_or_else(|| application_not_found(id))?;
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "UPDATE applications SET \
               name = COALESCE($2, name), \
               description = COALESCE($3, description), \
               updated_at = now() \
             WHERE id = $1 RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(uuid)
        .bind(patch.name)
        .bind(patch.description)
        .fetch_optional(&self.pool)
        .await?;
        row.map(application_from_row)
            .ok_or_else(|| application_not_found(id))
    }

    async fn delete_application(&self, id: &str) -> Result<(), StoreError> {
        let uuid = parse_id(id).ok_or_else(|| application_not_found(id))?;
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(application_not_found(id));
        }
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        application_id: &str,
        token: &str,
        mode: RefreshTokenWrite,
    ) -> Result<Application, StoreError> {
        let uuid = parse_id(application_id).ok_or_else(|| application_not_found(application_id))?;
        let mut tx = self.pool.begin().await?;

        // Row lock: concurrent issue/rotate calls for one application serialize here.
        let current = sqlx::query_scalar::<_, Option<String>>(
            "SELECT refresh_token FROM applications WHERE id = $1 FOR UPDATE",
        )
        .bind(uuid)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| application_not_found(application_id))?;

        let live = current.is_some_and(|t| !t.is_empty());
        if mode == RefreshTokenWrite::IssueNew && live {
            return Err(refresh_token_exists(application_id));
        }

        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "UPDATE applications SET refresh_token = $2, updated_at = now() \
             WHERE id = $1 RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(uuid)
        .bind(token)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(application_from_row(row))
    }

    async fn clear_refresh_token(&self, application_id: &str) -> Result<Application, StoreError> {
        let uuid = parse_id(application_id).ok_or_else(|| application_not_found(application_id))?;
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "UPDATE applications SET refresh_token = NULL, updated_at = now() \
             WHERE id = $1 RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        row.map(application_from_row)
            .ok_or_else(|| application_not_found(application_id))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let application_id = parse_id(&new_user.application_id)
            .ok_or_else(|| application_not_found(&new_user.application_id))?;
        let duplicate = || {
            format!(
                "user with email {} already exists in this application",
                new_user.email
            )
        };
        let mut tx = self.pool.begin().await?;

        // Locking the parent application serializes user creation per tenant,
        // so the uniqueness check below cannot be raced.
        sqlx::query_scalar::<_, String>(
            "SELECT id::text FROM applications WHERE id = $1 FOR UPDATE",
        )
        .bind(application_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| application_not_found(&new_user.application_id))?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE application_id = $1 AND email = $2)",
        )
        .bind(application_id)
        .bind(&new_user.email)
        .fetch_one(&mut *tx)
        .await?;
        if exists {
            return Err(StoreError::Conflict(duplicate()));
        }

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, application_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(uuidv7())
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(application_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_or(e, duplicate))?;

        tx.commit().await?;
        Ok(user_from_row(row).user)
    }

    async fn get_user(
        &self,
        application_id: &str,
        user_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let (Some(application_id), Some(user_id)) = (parse_id(application_id), parse_id(user_id))
        else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND application_id = $2"
        ))
        .bind(user_id)
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| user_from_row(r).user))
    }

    async fn find_user_by_email(
        &self,
        application_id: &str,
        email: &str,
    ) -> Result<Option<UserWithPassword>, StoreError> {
        let Some(application_id) = parse_id(application_id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE application_id = $1 AND email = $2"
        ))
        .bind(application_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(user_from_row))
    }

    async fn list_users(
        &self,
        application_id: &str,
        page: PageRequest,
    ) -> Result<Page<User>, StoreError> {
        let Some(application_id) = parse_id(application_id) else {
            return Ok(Page {
                items: Vec::new(),
                total: 0,
            });
        };
        let total =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE application_id = $1")
                .bind(application_id)
                .fetch_one(&self.pool)
                .await?;
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE application_id = $1 \
             ORDER BY id OFFSET $2 LIMIT $3"
        ))
        .bind(application_id)
        .bind(i64::from(page.offset))
        .bind(i64::from(page.limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(Page {
            items: rows.into_iter().map(|r| user_from_row(r).user).collect(),
            total,
        })
    }

    async fn update_user(
        &self,
        application_id: &str,
        user_id: &str,
        patch: UserPatch,
    ) -> Result<User, StoreError> {
        let (Some(app_uuid), Some(user_uuid)) = (parse_id(application_id), parse_id(user_id))
        else {
            return Err(user_not_found(user_id));
        };
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET \
               first_name = COALESCE($3, first_name), \
               last_name = COALESCE($4, last_name), \
               password_hash = COALESCE($5, password_hash), \
               updated_at = now() \
             WHERE id = $1 AND application_id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_uuid)
        .bind(app_uuid)
        .bind(patch.first_name)
        .bind(patch.last_name)
        .bind(patch.password_hash)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| user_from_row(r).user)
            .ok_or_else(|| user_not_found(user_id))
    }

    async fn delete_user(&self, application_id: &str, user_id: &str) -> Result<(), StoreError> {
        let (Some(app_uuid), Some(user_uuid)) = (parse_id(application_id), parse_id(user_id))
        else {
            return Err(user_not_found(user_id));
        };
        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND application_id = $2")
            .bind(user_uuid)
            .bind(app_uuid)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(user_not_found(user_id));
        }
        Ok(())
    }
}
