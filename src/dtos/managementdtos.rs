use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::managementmodel::{
    OwnerSubscription, RentPaymentMethod, RentPaymentStatus, TenantStatus, TicketPriority,
    TicketStatus,
};

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[validate(schema(function = "validate_lease_dates", skip_on_field_errors = false))]
pub struct CreateTenantDto {
    pub property_id: Uuid,
    pub user_id: Option<Uuid>,

    #[validate(length(min = 1, max = 100, message = "Tenant name is required"))]
    pub name: String,

    #[validate(email(message = "Tenant email is invalid"))]
    pub email: String,

    #[validate(length(min = 5, max = 30, message = "Phone must be between 5 and 30 characters"))]
    pub phone: Option<String>,

    pub lease_start_date: NaiveDate,
    pub lease_end_date: NaiveDate,

    #[validate(range(min = 0, message = "Rent cannot be negative"))]
    pub rent_amount: i64,

    #[validate(range(min = 0, message = "Security deposit cannot be negative"))]
    #[serde(default)]
    pub security_deposit: i64,

    #[validate(url(message = "Lease document must be a URL"))]
    pub lease_document: Option<String>,

    #[serde(default = "default_tenant_status")]
    pub status: TenantStatus,
}

fn default_tenant_status() -> TenantStatus {
    TenantStatus::Active
}

fn validate_lease_dates(dto: &CreateTenantDto) -> Result<(), ValidationError> {
    if dto.lease_end_date < dto.lease_start_date {
        let mut error = ValidationError::new("lease_dates");
        error.message = Some("Lease cannot end before it starts".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CreateTicketDto {
    pub property_id: Uuid,
    pub tenant_id: Uuid,

    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    #[serde(default)]
    pub description: String,

    #[serde(default = "default_priority")]
    pub priority: TicketPriority,
}

fn default_priority() -> TicketPriority {
    TicketPriority::Medium
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UpdateTicketStatusDto {
    pub status: TicketStatus,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct RecordPaymentDto {
    pub tenant_id: Uuid,

    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,

    // Defaults to now
    pub payment_date: Option<DateTime<Utc>>,

    pub payment_method: RentPaymentMethod,

    #[validate(length(max = 100))]
    pub transaction_id: Option<String>,

    #[serde(default = "default_payment_status")]
    pub status: RentPaymentStatus,

    #[validate(url(message = "Receipt must be a URL"))]
    pub receipt_url: Option<String>,
}

fn default_payment_status() -> RentPaymentStatus {
    RentPaymentStatus::Completed
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct RecordExpenseDto {
    pub property_id: Uuid,

    #[validate(length(min = 1, max = 50, message = "Category is required"))]
    pub category: String,

    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    #[serde(default)]
    pub description: String,

    pub date: NaiveDate,

    #[validate(url(message = "Receipt must be a URL"))]
    pub receipt_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SubscriptionStatusResponse {
    pub active: bool,
    pub subscription: Option<OwnerSubscription>,
}
