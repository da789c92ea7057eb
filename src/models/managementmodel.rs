use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    PastDue,
}

impl SubscriptionStatus {
    pub fn to_str(&self) -> &str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::PastDue => "past_due",
        }
    }
}

/// An owner's recurring plan for the management tooling, mirrored from Stripe.
#[derive(Debug, Deserialize, Serialize, FromRow, Clone, PartialEq)]
pub struct OwnerSubscription {
    pub user_id: Uuid,
    pub stripe_subscription_id: String,
    pub status: SubscriptionStatus,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnerSubscription {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.current_period_end > now
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "tenant_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Pending,
    Ended,
}

#[derive(Debug, Deserialize, Serialize, FromRow, Clone, PartialEq)]
pub struct Tenant {
    pub id: Uuid,
    pub property_id: Uuid,
    // Set when the tenant also has an account
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub lease_start_date: NaiveDate,
    pub lease_end_date: NaiveDate,
    pub rent_amount: i64,
    pub security_deposit: i64,
    pub lease_document: Option<String>,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "ticket_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }
}

#[derive(Debug, Deserialize, Serialize, FromRow, Clone, PartialEq)]
pub struct MaintenanceTicket {
    pub id: Uuid,
    pub property_id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "rent_payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RentPaymentMethod {
    MobileMoney,
    BankTransfer,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "rent_payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RentPaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Deserialize, Serialize, FromRow, Clone, PartialEq)]
pub struct RentPayment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub amount: i64,
    pub payment_date: DateTime<Utc>,
    pub payment_method: RentPaymentMethod,
    pub transaction_id: Option<String>,
    pub status: RentPaymentStatus,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, FromRow, Clone, PartialEq)]
pub struct Expense {
    pub id: Uuid,
    pub property_id: Uuid,
    pub category: String,
    pub amount: i64,
    pub description: String,
    pub date: NaiveDate,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Figures shown on the owner dashboard.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OwnerDashboard {
    pub tenants: usize,
    pub active_tenants: usize,
    pub open_tickets: usize,
    pub leases_expiring_soon: usize,
    pub rent_collected: i64,
    pub expenses_total: i64,
    pub net_income: i64,
}
