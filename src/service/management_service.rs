use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    db::{
        managementdb::PropertyManagement, propertydb::PropertyCatalog,
        subscriptiondb::SubscriptionLedger,
    },
    dtos::managementdtos::{
        CreateTenantDto, CreateTicketDto, RecordExpenseDto, RecordPaymentDto,
        SubscriptionStatusResponse,
    },
    models::{
        managementmodel::{
            Expense, MaintenanceTicket, OwnerDashboard, OwnerSubscription, RentPayment,
            RentPaymentStatus, Tenant, TenantStatus, TicketStatus,
        },
        propertymodel::Property,
        unlockmodel::SessionHandle,
    },
    service::{
        error::ServiceError,
        payment_provider::{PaymentGateway, SubscriptionCheckoutRequest, SubscriptionUpdate},
    },
};

/// Leases ending within this window count as expiring on the dashboard.
const LEASE_EXPIRY_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone)]
pub struct SubscriptionPricing {
    pub fee_cents: i64,
    pub currency: String,
    pub app_url: String,
}

impl SubscriptionPricing {
    pub fn from_config(config: &Config) -> Self {
        Self {
            fee_cents: config.subscription_fee_cents,
            currency: config.unlock_currency.clone(),
            app_url: config.app_url.clone(),
        }
    }
}

/// Tenants, maintenance, rent and expenses for owners on a paid plan. Every write is
/// scoped to a property the caller owns.
pub struct ManagementService {
    catalog: Arc<dyn PropertyCatalog>,
    store: Arc<dyn PropertyManagement>,
    subscriptions: Arc<dyn SubscriptionLedger>,
    gateway: Arc<dyn PaymentGateway>,
    pricing: SubscriptionPricing,
}

impl ManagementService {
    pub fn new(
        catalog: Arc<dyn PropertyCatalog>,
        store: Arc<dyn PropertyManagement>,
        subscriptions: Arc<dyn SubscriptionLedger>,
        gateway: Arc<dyn PaymentGateway>,
        pricing: SubscriptionPricing,
    ) -> Self {
        Self {
            catalog,
            store,
            subscriptions,
            gateway,
            pricing,
        }
    }

    pub async fn subscription_status(
        &self,
        owner_id: Uuid,
    ) -> Result<SubscriptionStatusResponse, ServiceError> {
        let subscription = self.subscriptions.get_owner_subscription(owner_id).await?;
        Ok(SubscriptionStatusResponse {
            active: subscription.as_ref().map_or(false, |s| s.is_active(Utc::now())),
            subscription,
        })
    }

    pub async fn ensure_active_subscription(&self, owner_id: Uuid) -> Result<(), ServiceError> {
        match self.subscriptions.get_owner_subscription(owner_id).await? {
            Some(subscription) if subscription.is_active(Utc::now()) => Ok(()),
            _ => Err(ServiceError::SubscriptionInactive(owner_id)),
        }
    }

    pub async fn start_subscription_checkout(
        &self,
        owner_id: Uuid,
    ) -> Result<SessionHandle, ServiceError> {
        if self.ensure_active_subscription(owner_id).await.is_ok() {
            return Err(ServiceError::Validation(
                "Subscription is already active".to_string(),
            ));
        }

        let return_url = format!("{}/owner/subscription", self.pricing.app_url);
        let session = self
            .gateway
            .create_subscription_session(SubscriptionCheckoutRequest {
                user_id: owner_id,
                amount_cents: self.pricing.fee_cents,
                currency: self.pricing.currency.clone(),
                product_name: "Property management tools".to_string(),
                success_url: format!("{}?checkout=success", return_url),
                cancel_url: return_url,
            })
            .await
            .map_err(|e| {
                tracing::error!("Subscription checkout failed for owner {}: {}", owner_id, e);
                ServiceError::Upstream(format!("payment provider: {}", e))
            })?;

        tracing::info!("Opened subscription checkout {} for owner {}", session.id, owner_id);
        Ok(SessionHandle {
            session_id: session.id,
            checkout_url: session.url,
        })
    }

    /// Mirror a provider subscription event. Events without an owner id write nothing.
    pub async fn apply_subscription_update(
        &self,
        update: SubscriptionUpdate,
    ) -> Result<Option<OwnerSubscription>, ServiceError> {
        let Some(user_id) = update.user_id else {
            tracing::warn!(
                "Ignoring subscription event for {} without owner metadata",
                update.stripe_subscription_id
            );
            return Ok(None);
        };

        let subscription = self
            .subscriptions
            .upsert_owner_subscription(user_id, &update)
            .await?;
        tracing::info!(
            "Owner {} subscription {} is now {}",
            user_id,
            subscription.stripe_subscription_id,
            subscription.status.to_str()
        );
        Ok(Some(subscription))
    }

    async fn owned_property(&self, owner_id: Uuid, property_id: Uuid) -> Result<Property, ServiceError> {
        let property = self
            .catalog
            .get_property_by_id(property_id)
            .await?
            .ok_or(ServiceError::NotFound(property_id))?;

        if !property.is_owned_by(owner_id) {
            tracing::warn!("Owner {} tried to manage property {} they do not own", owner_id, property_id);
            return Err(ServiceError::Forbidden(owner_id));
        }
        Ok(property)
    }

    async fn owned_tenant(&self, owner_id: Uuid, tenant_id: Uuid) -> Result<Tenant, ServiceError> {
        let tenant = self
            .store
            .get_tenant(tenant_id)
            .await?
            .ok_or(ServiceError::NotFound(tenant_id))?;
        self.owned_property(owner_id, tenant.property_id).await?;
        Ok(tenant)
    }

    pub async fn add_tenant(&self, owner_id: Uuid, body: CreateTenantDto) -> Result<Tenant, ServiceError> {
        body.validate()?;
        self.owned_property(owner_id, body.property_id).await?;
        Ok(self.store.create_tenant(body).await?)
    }

    pub async fn list_tenants(&self, owner_id: Uuid) -> Result<Vec<Tenant>, ServiceError> {
        Ok(self.store.get_tenants_by_owner(owner_id).await?)
    }

    pub async fn open_ticket(
        &self,
        owner_id: Uuid,
        body: CreateTicketDto,
    ) -> Result<MaintenanceTicket, ServiceError> {
        body.validate()?;
        let tenant = self.owned_tenant(owner_id, body.tenant_id).await?;
        if tenant.property_id != body.property_id {
            return Err(ServiceError::Validation(
                "Tenant does not live at this property".to_string(),
            ));
        }
        Ok(self.store.create_ticket(body).await?)
    }

    pub async fn list_tickets(&self, owner_id: Uuid) -> Result<Vec<MaintenanceTicket>, ServiceError> {
        Ok(self.store.get_tickets_by_owner(owner_id).await?)
    }

    pub async fn update_ticket_status(
        &self,
        owner_id: Uuid,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> Result<MaintenanceTicket, ServiceError> {
        let ticket = self
            .store
            .get_ticket(ticket_id)
            .await?
            .ok_or(ServiceError::NotFound(ticket_id))?;
        self.owned_property(owner_id, ticket.property_id).await?;

        self.store
            .update_ticket_status(ticket_id, status)
            .await?
            .ok_or(ServiceError::NotFound(ticket_id))
    }

    pub async fn record_payment(
        &self,
        owner_id: Uuid,
        body: RecordPaymentDto,
    ) -> Result<RentPayment, ServiceError> {
        body.validate()?;
        self.owned_tenant(owner_id, body.tenant_id).await?;
        Ok(self.store.record_payment(body).await?)
    }

    pub async fn list_payments(&self, owner_id: Uuid) -> Result<Vec<RentPayment>, ServiceError> {
        Ok(self.store.get_payments_by_owner(owner_id).await?)
    }

    pub async fn record_expense(
        &self,
        owner_id: Uuid,
        body: RecordExpenseDto,
    ) -> Result<Expense, ServiceError> {
        body.validate()?;
        self.owned_property(owner_id, body.property_id).await?;
        Ok(self.store.record_expense(body).await?)
    }

    pub async fn list_expenses(&self, owner_id: Uuid) -> Result<Vec<Expense>, ServiceError> {
        Ok(self.store.get_expenses_by_owner(owner_id).await?)
    }

    pub async fn dashboard(&self, owner_id: Uuid) -> Result<OwnerDashboard, ServiceError> {
        let tenants = self.store.get_tenants_by_owner(owner_id).await?;
        let tickets = self.store.get_tickets_by_owner(owner_id).await?;
        let payments = self.store.get_payments_by_owner(owner_id).await?;
        let expenses = self.store.get_expenses_by_owner(owner_id).await?;

        let today = Utc::now().date_naive();
        let horizon = today + Duration::days(LEASE_EXPIRY_WINDOW_DAYS);

        let active: Vec<&Tenant> = tenants
            .iter()
            .filter(|t| t.status == TenantStatus::Active)
            .collect();
        let rent_collected: i64 = payments
            .iter()
            .filter(|p| p.status == RentPaymentStatus::Completed)
            .map(|p| p.amount)
            .sum();
        let expenses_total: i64 = expenses.iter().map(|e| e.amount).sum();

        Ok(OwnerDashboard {
            tenants: tenants.len(),
            active_tenants: active.len(),
            open_tickets: tickets.iter().filter(|m| !m.status.is_settled()).count(),
            leases_expiring_soon: active
                .iter()
                .filter(|t| t.lease_end_date >= today && t.lease_end_date <= horizon)
                .count(),
            rent_collected,
            expenses_total,
            net_income: rent_collected - expenses_total,
        })
    }
}
