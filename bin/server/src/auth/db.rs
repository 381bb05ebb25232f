//! PostgreSQL identity repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rootcause::prelude::Report;
use social_login_core::IdentityId;
use social_login_identity::{Identity, IdentityStore, NewIdentity, Provider, StoreError};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use tracing::instrument;

/// Row type for identity queries.
#[derive(FromRow)]
struct IdentityRow {
    id: String,
    display_name: String,
    email: String,
    provider_principal: String,
    provider: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl IdentityRow {
    fn try_into_identity(self) -> Result<Identity, StoreError> {
        let id = IdentityId::from_str(&self.id).map_err(|e| StoreError::Unavailable {
            reason: format!("invalid identity id '{}': {}", self.id, e),
        })?;
        let provider = Provider::from_str(&self.provider).map_err(|e| StoreError::Unavailable {
            reason: format!("identity {}: {}", self.id, e),
        })?;
        Ok(Identity::with_all_fields(
            id,
            self.display_name,
            self.email,
            self.provider_principal,
            provider,
            self.created_at,
            self.updated_at,
        ))
    }
}

fn database_error(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable {
        reason: e.to_string(),
    }
}

/// Identity store backed by the `identities` table.
///
/// The table's unique index on `email` is what keeps concurrent first
/// logins from creating duplicate records.
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    /// Creates a new identity repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, Report<StoreError>> {
        let row: Option<IdentityRow> = sqlx::query_as(
            r#"
            SELECT id, display_name, email, provider_principal, provider, created_at, updated_at
            FROM identities
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        match row {
            Some(r) => Ok(Some(r.try_into_identity()?)),
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(provider = %candidate.provider()))]
    async fn create(&self, candidate: NewIdentity) -> Result<Identity, Report<StoreError>> {
        let id = IdentityId::new();
        let row: Option<IdentityRow> = sqlx::query_as(
            r#"
            INSERT INTO identities (id, display_name, email, provider_principal, provider, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, display_name, email, provider_principal, provider, created_at, updated_at
            "#,
        )
        .bind(id.to_string())
        .bind(candidate.display_name())
        .bind(candidate.email())
        .bind(candidate.provider_principal())
        .bind(candidate.provider().as_str())
        .bind(candidate.created_at())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        match row {
            Some(r) => Ok(r.try_into_identity()?),
            None => Err(StoreError::EmailConflict {
                email: candidate.email().to_string(),
            }
            .into()),
        }
    }
}
