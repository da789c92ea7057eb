use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::db::DBClient,
    models::unlockmodel::{GrantOutcome, UnlockGrant},
};

/// The authoritative record of paid access. Uniqueness of (user, property) is
/// enforced by the store itself, never by callers checking first.
#[async_trait]
pub trait UnlockLedger: Send + Sync {
    async fn has_grant(
        &self,
        user_id: Uuid,
        property_id: Uuid,
    ) -> Result<bool, sqlx::Error>;

    /// Atomically insert the grant, or return the one that already exists.
    async fn create_grant_if_absent(
        &self,
        user_id: Uuid,
        property_id: Uuid,
    ) -> Result<GrantOutcome, sqlx::Error>;

    /// Subset of `property_ids` the user holds a grant for.
    async fn granted_property_ids(
        &self,
        user_id: Uuid,
        property_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, sqlx::Error>;
}

#[async_trait]
impl UnlockLedger for DBClient {
    async fn has_grant(
        &self,
        user_id: Uuid,
        property_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM property_unlocks
                WHERE user_id = $1 AND property_id = $2
            )
            "#
        )
        .bind(user_id)
        .bind(property_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create_grant_if_absent(
        &self,
        user_id: Uuid,
        property_id: Uuid,
    ) -> Result<GrantOutcome, sqlx::Error> {
        let inserted = sqlx::query_as::<_, UnlockGrant>(
            r#"
            INSERT INTO property_unlocks (user_id, property_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, property_id) DO NOTHING
            RETURNING user_id, property_id, created_at
            "#
        )
        .bind(user_id)
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(grant) = inserted {
            return Ok(GrantOutcome { created: true, grant });
        }

        // Lost the race (or a replay). A separate statement gets a fresh snapshot
        // that sees the committed winner.
        let existing = sqlx::query_as::<_, UnlockGrant>(
            r#"
            SELECT user_id, property_id, created_at
            FROM property_unlocks
            WHERE user_id = $1 AND property_id = $2
            "#
        )
        .bind(user_id)
        .bind(property_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(GrantOutcome { created: false, grant: existing })
    }

    async fn granted_property_ids(
        &self,
        user_id: Uuid,
        property_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, sqlx::Error> {
        if property_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT property_id FROM property_unlocks
            WHERE user_id = $1 AND property_id = ANY($2)
            "#
        )
        .bind(user_id)
        .bind(property_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }
}
