use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::db::DBClient,
    models::managementmodel::OwnerSubscription,
    service::payment_provider::SubscriptionUpdate,
};

#[async_trait]
pub trait SubscriptionLedger: Send + Sync {
    async fn get_owner_subscription(
        &self,
        user_id: Uuid,
    ) -> Result<Option<OwnerSubscription>, sqlx::Error>;

    /// Record the latest state Stripe reported for the owner's plan.
    async fn upsert_owner_subscription(
        &self,
        user_id: Uuid,
        update: &SubscriptionUpdate,
    ) -> Result<OwnerSubscription, sqlx::Error>;
}

#[async_trait]
impl SubscriptionLedger for DBClient {
    async fn get_owner_subscription(
        &self,
        user_id: Uuid,
    ) -> Result<Option<OwnerSubscription>, sqlx::Error> {
        sqlx::query_as::<_, OwnerSubscription>(
            r#"
            SELECT user_id, stripe_subscription_id, status, current_period_end,
                   cancel_at_period_end, created_at, updated_at
            FROM owner_subscriptions
            WHERE user_id = $1
            "#
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn upsert_owner_subscription(
        &self,
        user_id: Uuid,
        update: &SubscriptionUpdate,
    ) -> Result<OwnerSubscription, sqlx::Error> {
        sqlx::query_as::<_, OwnerSubscription>(
            r#"
            INSERT INTO owner_subscriptions
                (user_id, stripe_subscription_id, status, current_period_end, cancel_at_period_end)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                status = EXCLUDED.status,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                updated_at = NOW()
            RETURNING user_id, stripe_subscription_id, status, current_period_end,
                      cancel_at_period_end, created_at, updated_at
            "#
        )
        .bind(user_id)
        .bind(&update.stripe_subscription_id)
        .bind(update.status)
        .bind(update.current_period_end)
        .bind(update.cancel_at_period_end)
        .fetch_one(&self.pool)
        .await
    }
}
