/// Identity store
///
/// The seam between the session core and the rest of the portal: resident,
/// household, and document CRUD live elsewhere and only the account lookup
/// crosses into this crate. The refresh flow re-reads the record on every
/// rotation so role and active-status changes take effect without waiting
/// for the refresh token to age out.
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::IdentityClaim;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub id: Uuid,
    pub username: String,
    pub role: String,
    /// Resident record this account is linked to, if any
    pub resident_id: Option<Uuid>,
    pub password_hash: String,
    pub is_active: bool,
}

impl AccountRecord {
    /// The sanitized identity a token pair is minted from. Credentials
    /// (the password hash) never cross into the claim set.
    pub fn identity_claim(&self) -> IdentityClaim {
        IdentityClaim::new(self.id, self.role.clone(), self.resident_id)
    }
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountRecord>, AppError>;
    async fn find_by_username(&self, username: &str)
        -> Result<Option<AccountRecord>, AppError>;
}

/// Postgres-backed store over the portal's `accounts` table.
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type AccountRow = (Uuid, String, String, Option<Uuid>, String, bool);

fn record_from_row(row: AccountRow) -> AccountRecord {
    let (id, username, role, resident_id, password_hash, is_active) = row;
    AccountRecord {
        id,
        username,
        role,
        resident_id,
        password_hash,
        is_active,
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountRecord>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, username, role, resident_id, password_hash, is_active
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(record_from_row))
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AccountRecord>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, username, role, resident_id, password_hash, is_active
            FROM accounts
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(record_from_row))
    }
}
