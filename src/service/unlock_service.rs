use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    config::Config,
    db::{propertydb::PropertyCatalog, unlockdb::UnlockLedger},
    models::unlockmodel::{SessionHandle, UnlockMetadata},
    service::{
        error::ServiceError,
        payment_provider::{CheckoutRequest, PaymentGateway, PaymentOutcome, PaymentStatus},
    },
};

#[derive(Debug, Clone)]
pub struct UnlockPricing {
    pub fee_cents: i64,
    pub currency: String,
    // Origin the checkout page sends the buyer back to
    pub app_url: String,
}

impl UnlockPricing {
    pub fn from_config(config: &Config) -> Self {
        Self {
            fee_cents: config.unlock_fee_cents,
            currency: config.unlock_currency.clone(),
            app_url: config.app_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Granted,
    AlreadyGranted,
    Abandoned,
    Ignored,
}

/// Opens checkout sessions for protected-field unlocks and turns the provider's
/// confirmations into ledger grants.
pub struct UnlockService {
    catalog: Arc<dyn PropertyCatalog>,
    ledger: Arc<dyn UnlockLedger>,
    gateway: Arc<dyn PaymentGateway>,
    pricing: UnlockPricing,
}

impl UnlockService {
    pub fn new(
        catalog: Arc<dyn PropertyCatalog>,
        ledger: Arc<dyn UnlockLedger>,
        gateway: Arc<dyn PaymentGateway>,
        pricing: UnlockPricing,
    ) -> Self {
        Self {
            catalog,
            ledger,
            gateway,
            pricing,
        }
    }

    /// Checks, in order: identity, approved property, no existing grant. Only when all
    /// pass is exactly one checkout session opened. Access is never granted here.
    pub async fn begin_unlock(
        &self,
        viewer: Option<Uuid>,
        property_id: Uuid,
    ) -> Result<SessionHandle, ServiceError> {
        let user_id = viewer.ok_or(ServiceError::Unauthenticated)?;

        let property = self
            .catalog
            .get_property_by_id(property_id)
            .await?
            .filter(|p| p.approved)
            .ok_or(ServiceError::NotFound(property_id))?;

        // Owners already see everything about their own listing.
        if property.is_owned_by(user_id) || self.ledger.has_grant(user_id, property_id).await? {
            tracing::info!("Unlock skipped: user {} already has access to property {}", user_id, property_id);
            return Err(ServiceError::AlreadyUnlocked { user_id, property_id });
        }

        let property_url = format!("{}/properties/{}", self.pricing.app_url, property_id);
        let request = CheckoutRequest {
            amount_cents: self.pricing.fee_cents,
            currency: self.pricing.currency.clone(),
            product_name: format!("Unlock Property: {}", property.title),
            product_description: "Access to property contact details and exact location".to_string(),
            metadata: UnlockMetadata { property_id, user_id },
            success_url: format!("{}?unlock=success", property_url),
            cancel_url: property_url,
        };

        let session = self
            .gateway
            .create_checkout_session(request)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Checkout session creation failed for user {} on property {}: {}",
                    user_id, property_id, e
                );
                ServiceError::Upstream(format!("payment provider: {}", e))
            })?;

        tracing::info!(
            "Opened checkout session {} for user {} on property {}",
            session.id, user_id, property_id
        );

        Ok(SessionHandle {
            session_id: session.id,
            checkout_url: session.url,
        })
    }

    /// Apply one provider confirmation. Replays and duplicates resolve to
    /// `AlreadyGranted`; only storage failures surface as errors so the provider
    /// retries delivery.
    pub async fn reconcile(&self, outcome: PaymentOutcome) -> Result<ReconcileOutcome, ServiceError> {
        let Some(UnlockMetadata { property_id, user_id }) = outcome.metadata else {
            tracing::warn!("Ignoring payment event for session {} without unlock metadata", outcome.session_id);
            return Ok(ReconcileOutcome::Ignored);
        };

        match outcome.status {
            PaymentStatus::Failed => {
                tracing::info!(
                    "Checkout session {} for user {} on property {} was abandoned",
                    outcome.session_id, user_id, property_id
                );
                return Ok(ReconcileOutcome::Abandoned);
            }
            PaymentStatus::Pending => {
                tracing::info!(
                    "Checkout session {} for user {} on property {} awaits settlement",
                    outcome.session_id, user_id, property_id
                );
                return Ok(ReconcileOutcome::Ignored);
            }
            PaymentStatus::Succeeded => {}
        }

        if self.catalog.get_property_by_id(property_id).await?.is_none() {
            tracing::warn!(
                "Payment for session {} references missing property {}; no grant written",
                outcome.session_id, property_id
            );
            return Ok(ReconcileOutcome::Ignored);
        }

        let result = self.ledger.create_grant_if_absent(user_id, property_id).await?;

        if result.created {
            tracing::info!("Granted user {} access to property {}", user_id, property_id);
            Ok(ReconcileOutcome::Granted)
        } else {
            tracing::info!(
                "Duplicate confirmation for user {} on property {} (granted at {})",
                user_id, property_id, result.grant.created_at
            );
            Ok(ReconcileOutcome::AlreadyGranted)
        }
    }

    pub async fn is_unlocked(&self, user_id: Uuid, property_id: Uuid) -> Result<bool, ServiceError> {
        Ok(self.ledger.has_grant(user_id, property_id).await?)
    }
}
