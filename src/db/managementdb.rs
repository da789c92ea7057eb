use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::db::DBClient,
    dtos::managementdtos::{CreateTenantDto, CreateTicketDto, RecordExpenseDto, RecordPaymentDto},
    models::managementmodel::{Expense, MaintenanceTicket, RentPayment, Tenant, TicketStatus},
};

const TENANT_COLUMNS: &str = r#"
    t.id, t.property_id, t.user_id, t.name, t.email, t.phone, t.lease_start_date,
    t.lease_end_date, t.rent_amount, t.security_deposit, t.lease_document, t.status,
    t.created_at, t.updated_at
"#;

const TICKET_COLUMNS: &str = r#"
    m.id, m.property_id, m.tenant_id, m.title, m.description, m.priority, m.status,
    m.created_at, m.updated_at, m.resolved_at
"#;

const PAYMENT_COLUMNS: &str = r#"
    r.id, r.tenant_id, r.amount, r.payment_date, r.payment_method, r.transaction_id,
    r.status, r.receipt_url, r.created_at
"#;

const EXPENSE_COLUMNS: &str = r#"
    e.id, e.property_id, e.category, e.amount, e.description, e.date, e.receipt_url,
    e.created_at, e.updated_at
"#;

/// Owner-side records for managing let properties. Every list is scoped to the
/// properties the owner holds; ownership of a single record is checked by the caller.
#[async_trait]
pub trait PropertyManagement: Send + Sync {
    async fn create_tenant(&self, tenant: CreateTenantDto) -> Result<Tenant, sqlx::Error>;

    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, sqlx::Error>;

    async fn get_tenants_by_owner(&self, owner_id: Uuid) -> Result<Vec<Tenant>, sqlx::Error>;

    async fn create_ticket(&self, ticket: CreateTicketDto) -> Result<MaintenanceTicket, sqlx::Error>;

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<MaintenanceTicket>, sqlx::Error>;

    async fn get_tickets_by_owner(&self, owner_id: Uuid) -> Result<Vec<MaintenanceTicket>, sqlx::Error>;

    /// Settling a ticket stamps `resolved_at` once; reopening clears it.
    async fn update_ticket_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> Result<Option<MaintenanceTicket>, sqlx::Error>;

    async fn record_payment(&self, payment: RecordPaymentDto) -> Result<RentPayment, sqlx::Error>;

    async fn get_payments_by_owner(&self, owner_id: Uuid) -> Result<Vec<RentPayment>, sqlx::Error>;

    async fn record_expense(&self, expense: RecordExpenseDto) -> Result<Expense, sqlx::Error>;

    async fn get_expenses_by_owner(&self, owner_id: Uuid) -> Result<Vec<Expense>, sqlx::Error>;
}

#[async_trait]
impl PropertyManagement for DBClient {
    async fn create_tenant(&self, tenant: CreateTenantDto) -> Result<Tenant, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(&format!(
            r#"
            INSERT INTO tenants AS t (
                property_id, user_id, name, email, phone, lease_start_date, lease_end_date,
                rent_amount, security_deposit, lease_document, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            TENANT_COLUMNS
        ))
        .bind(tenant.property_id)
        .bind(tenant.user_id)
        .bind(tenant.name.trim())
        .bind(tenant.email.trim())
        .bind(tenant.phone)
        .bind(tenant.lease_start_date)
        .bind(tenant.lease_end_date)
        .bind(tenant.rent_amount)
        .bind(tenant.security_deposit)
        .bind(tenant.lease_document)
        .bind(tenant.status)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {} FROM tenants t WHERE t.id = $1",
            TENANT_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_tenants_by_owner(&self, owner_id: Uuid) -> Result<Vec<Tenant>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(&format!(
            r#"
            SELECT {} FROM tenants t
            JOIN properties p ON p.id = t.property_id
            WHERE p.owner_id = $1
            ORDER BY t.created_at DESC, t.id ASC
            "#,
            TENANT_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_ticket(&self, ticket: CreateTicketDto) -> Result<MaintenanceTicket, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceTicket>(&format!(
            r#"
            INSERT INTO maintenance_tickets AS m (property_id, tenant_id, title, description, priority)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(ticket.property_id)
        .bind(ticket.tenant_id)
        .bind(ticket.title.trim())
        .bind(ticket.description)
        .bind(ticket.priority)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<MaintenanceTicket>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceTicket>(&format!(
            "SELECT {} FROM maintenance_tickets m WHERE m.id = $1",
            TICKET_COLUMNS
        ))
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_tickets_by_owner(&self, owner_id: Uuid) -> Result<Vec<MaintenanceTicket>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceTicket>(&format!(
            r#"
            SELECT {} FROM maintenance_tickets m
            JOIN properties p ON p.id = m.property_id
            WHERE p.owner_id = $1
            ORDER BY m.created_at DESC, m.id ASC
            "#,
            TICKET_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_ticket_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> Result<Option<MaintenanceTicket>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceTicket>(&format!(
            r#"
            UPDATE maintenance_tickets AS m
            SET status = $2,
                updated_at = NOW(),
                resolved_at = CASE WHEN $3 THEN COALESCE(m.resolved_at, NOW()) ELSE NULL END
            WHERE m.id = $1
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(ticket_id)
        .bind(status)
        .bind(status.is_settled())
        .fetch_optional(&self.pool)
        .await
    }

    async fn record_payment(&self, payment: RecordPaymentDto) -> Result<RentPayment, sqlx::Error> {
        sqlx::query_as::<_, RentPayment>(&format!(
            r#"
            INSERT INTO rent_payments AS r (
                tenant_id, amount, payment_date, payment_method, transaction_id, status, receipt_url
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(payment.tenant_id)
        .bind(payment.amount)
        .bind(payment.payment_date.unwrap_or_else(Utc::now))
        .bind(payment.payment_method)
        .bind(payment.transaction_id)
        .bind(payment.status)
        .bind(payment.receipt_url)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_payments_by_owner(&self, owner_id: Uuid) -> Result<Vec<RentPayment>, sqlx::Error> {
        sqlx::query_as::<_, RentPayment>(&format!(
            r#"
            SELECT {} FROM rent_payments r
            JOIN tenants t ON t.id = r.tenant_id
            JOIN properties p ON p.id = t.property_id
            WHERE p.owner_id = $1
            ORDER BY r.payment_date DESC, r.id ASC
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn record_expense(&self, expense: RecordExpenseDto) -> Result<Expense, sqlx::Error> {
        sqlx::query_as::<_, Expense>(&format!(
            r#"
            INSERT INTO expenses AS e (property_id, category, amount, description, date, receipt_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            EXPENSE_COLUMNS
        ))
        .bind(expense.property_id)
        .bind(expense.category.trim())
        .bind(expense.amount)
        .bind(expense.description)
        .bind(expense.date)
        .bind(expense.receipt_url)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_expenses_by_owner(&self, owner_id: Uuid) -> Result<Vec<Expense>, sqlx::Error> {
        sqlx::query_as::<_, Expense>(&format!(
            r#"
            SELECT {} FROM expenses e
            JOIN properties p ON p.id = e.property_id
            WHERE p.owner_id = $1
            ORDER BY e.date DESC, e.created_at DESC
            "#,
            EXPENSE_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
    }
}
