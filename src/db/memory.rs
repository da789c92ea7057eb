// In-process catalog and ledger used by the test suites. The grant map is guarded by a
// single mutex so insert-or-return-existing is atomic, mirroring the primary key on
// property_unlocks.
use std::{
    cmp::Ordering as CmpOrdering,
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex, RwLock,
    },
};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    db::{
        managementdb::PropertyManagement, propertydb::PropertyCatalog,
        subscriptiondb::SubscriptionLedger, unlockdb::UnlockLedger,
    },
    dtos::{
        managementdtos::{CreateTenantDto, CreateTicketDto, RecordExpenseDto, RecordPaymentDto},
        propertydtos::CreatePropertyDto,
    },
    models::{
        managementmodel::{
            Expense, MaintenanceTicket, OwnerSubscription, RentPayment, SubscriptionStatus, Tenant,
            TicketStatus,
        },
        propertymodel::{ContactDetails, ListingStatus, Location, Property, PropertyType},
        unlockmodel::{GrantOutcome, UnlockGrant},
    },
    service::{
        filter_compiler::{LocationField, Predicate, QueryPlan, SortKey, SortOrder},
        payment_provider::SubscriptionUpdate,
    },
};

#[derive(Default)]
pub struct MemoryStore {
    properties: RwLock<Vec<Property>>,
    grants: Mutex<HashMap<(Uuid, Uuid), UnlockGrant>>,
    fail_ledger: AtomicBool,
    catalog_queries: AtomicUsize,
    subscriptions: Mutex<HashMap<Uuid, OwnerSubscription>>,
    tenants: RwLock<Vec<Tenant>>,
    tickets: RwLock<Vec<MaintenanceTicket>>,
    payments: RwLock<Vec<RentPayment>>,
    expenses: RwLock<Vec<Expense>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, property: Property) {
        self.properties.write().unwrap().push(property);
    }

    pub fn get(&self, property_id: Uuid) -> Option<Property> {
        self.properties
            .read()
            .unwrap()
            .iter()
            .find(|p| p.id == property_id)
            .cloned()
    }

    pub fn grant_count(&self) -> usize {
        self.grants.lock().unwrap().len()
    }

    pub fn catalog_queries(&self) -> usize {
        self.catalog_queries.load(Ordering::SeqCst)
    }

    /// Give `owner_id` a paid-up plan running for another month.
    pub fn activate_subscription(&self, owner_id: Uuid) {
        let now = Utc::now();
        self.subscriptions.lock().unwrap().insert(
            owner_id,
            OwnerSubscription {
                user_id: owner_id,
                stripe_subscription_id: format!("sub_{}", owner_id.simple()),
                status: SubscriptionStatus::Active,
                current_period_end: now + Duration::days(30),
                cancel_at_period_end: false,
                created_at: now,
                updated_at: now,
            },
        );
    }

    fn owns(&self, owner_id: Uuid, property_id: Uuid) -> bool {
        self.get(property_id).map_or(false, |p| p.owner_id == owner_id)
    }

    /// Make every ledger call fail as if the database were unreachable.
    pub fn fail_ledger(&self, fail: bool) {
        self.fail_ledger.store(fail, Ordering::SeqCst);
    }

    fn check_ledger(&self) -> Result<(), sqlx::Error> {
        if self.fail_ledger.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }
}

fn matches(predicate: &Predicate, property: &Property) -> bool {
    match predicate {
        Predicate::Approved => property.approved,
        Predicate::TypeEquals(t) => property.property_type == *t,
        Predicate::StatusEquals(s) => property.status == *s,
        Predicate::LocationContains(field, value) => {
            let location = &property.location.0;
            let actual = match field {
                LocationField::City => &location.city,
                LocationField::District => &location.district,
                LocationField::Sector => &location.sector,
                LocationField::Neighborhood => &location.neighborhood,
            };
            actual == value
        }
        Predicate::PriceAtLeast(min) => property.price >= *min,
        Predicate::PriceAtMost(max) => property.price <= *max,
    }
}

fn compare(key: SortKey, a: &Property, b: &Property) -> CmpOrdering {
    match key {
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::Views => a.views.cmp(&b.views),
        SortKey::Price => a.price.cmp(&b.price),
    }
}

#[async_trait]
impl PropertyCatalog for MemoryStore {
    async fn query_properties(&self, plan: &QueryPlan) -> Result<Vec<Property>, sqlx::Error> {
        self.catalog_queries.fetch_add(1, Ordering::SeqCst);
        if !plan.is_satisfiable() {
            return Ok(Vec::new());
        }

        let mut rows: Vec<Property> = self
            .properties
            .read()
            .unwrap()
            .iter()
            .filter(|p| plan.predicates.iter().all(|pred| matches(pred, p)))
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            let primary = compare(plan.ordering.key, a, b);
            let primary = match plan.ordering.order {
                SortOrder::Asc => primary,
                SortOrder::Desc => primary.reverse(),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });

        if let Some(page) = plan.page {
            rows = rows
                .into_iter()
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .collect();
        }

        Ok(rows)
    }

    async fn get_property_by_id(&self, property_id: Uuid) -> Result<Option<Property>, sqlx::Error> {
        Ok(self.get(property_id))
    }

    async fn create_property(
        &self,
        owner_id: Uuid,
        property_data: CreatePropertyDto,
    ) -> Result<Property, sqlx::Error> {
        let now = Utc::now();
        let property = Property {
            id: Uuid::new_v4(),
            owner_id,
            title: property_data.title,
            description: property_data.description,
            property_type: property_data.property_type,
            status: property_data.status,
            price: property_data.price,
            size: property_data.size,
            location: Json(property_data.location.into_location()),
            images: Json(property_data.images),
            amenities: Json(property_data.amenities),
            approved: false,
            contact_details: property_data
                .contact_details
                .map(|c| Json(c.into_contact_details())),
            views: 0,
            created_at: now,
            updated_at: now,
        };
        self.insert(property.clone());
        Ok(property)
    }

    async fn get_properties_by_owner(&self, owner_id: Uuid) -> Result<Vec<Property>, sqlx::Error> {
        let mut rows: Vec<Property> = self
            .properties
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn get_pending_properties(&self) -> Result<Vec<Property>, sqlx::Error> {
        let mut rows: Vec<Property> = self
            .properties
            .read()
            .unwrap()
            .iter()
            .filter(|p| !p.approved)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn set_property_approval(
        &self,
        property_id: Uuid,
        approved: bool,
    ) -> Result<Option<Property>, sqlx::Error> {
        let mut properties = self.properties.write().unwrap();
        Ok(properties.iter_mut().find(|p| p.id == property_id).map(|p| {
            p.approved = approved;
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn delete_property(&self, property_id: Uuid) -> Result<bool, sqlx::Error> {
        let mut properties = self.properties.write().unwrap();
        let before = properties.len();
        properties.retain(|p| p.id != property_id);
        let removed = properties.len() < before;
        drop(properties);
        if removed {
            // Same effect as the ON DELETE CASCADE on property_unlocks and the management tables.
            self.grants
                .lock()
                .unwrap()
                .retain(|(_, pid), _| *pid != property_id);
            let mut tenants = self.tenants.write().unwrap();
            let gone: HashSet<Uuid> = tenants
                .iter()
                .filter(|t| t.property_id == property_id)
                .map(|t| t.id)
                .collect();
            tenants.retain(|t| t.property_id != property_id);
            self.tickets.write().unwrap().retain(|m| m.property_id != property_id);
            self.payments.write().unwrap().retain(|r| !gone.contains(&r.tenant_id));
            self.expenses.write().unwrap().retain(|e| e.property_id != property_id);
        }
        Ok(removed)
    }

    async fn increment_views(&self, property_id: Uuid) -> Result<(), sqlx::Error> {
        let mut properties = self.properties.write().unwrap();
        if let Some(p) = properties.iter_mut().find(|p| p.id == property_id) {
            p.views += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl UnlockLedger for MemoryStore {
    async fn has_grant(&self, user_id: Uuid, property_id: Uuid) -> Result<bool, sqlx::Error> {
        self.check_ledger()?;
        Ok(self.grants.lock().unwrap().contains_key(&(user_id, property_id)))
    }

    async fn create_grant_if_absent(
        &self,
        user_id: Uuid,
        property_id: Uuid,
    ) -> Result<GrantOutcome, sqlx::Error> {
        self.check_ledger()?;
        // Give concurrent callers a chance to interleave before the atomic section.
        tokio::task::yield_now().await;

        let mut grants = self.grants.lock().unwrap();
        let mut created = false;
        let grant = grants
            .entry((user_id, property_id))
            .or_insert_with(|| {
                created = true;
                UnlockGrant {
                    user_id,
                    property_id,
                    created_at: Utc::now(),
                }
            })
            .clone();

        Ok(GrantOutcome { created, grant })
    }

    async fn granted_property_ids(
        &self,
        user_id: Uuid,
        property_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, sqlx::Error> {
        self.check_ledger()?;
        let grants = self.grants.lock().unwrap();
        Ok(property_ids
            .iter()
            .filter(|pid| grants.contains_key(&(user_id, **pid)))
            .copied()
            .collect())
    }
}

#[async_trait]
impl SubscriptionLedger for MemoryStore {
    async fn get_owner_subscription(
        &self,
        user_id: Uuid,
    ) -> Result<Option<OwnerSubscription>, sqlx::Error> {
        Ok(self.subscriptions.lock().unwrap().get(&user_id).cloned())
    }

    async fn upsert_owner_subscription(
        &self,
        user_id: Uuid,
        update: &SubscriptionUpdate,
    ) -> Result<OwnerSubscription, sqlx::Error> {
        let now = Utc::now();
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let created_at = subscriptions.get(&user_id).map_or(now, |s| s.created_at);
        let subscription = OwnerSubscription {
            user_id,
            stripe_subscription_id: update.stripe_subscription_id.clone(),
            status: update.status,
            current_period_end: update.current_period_end,
            cancel_at_period_end: update.cancel_at_period_end,
            created_at,
            updated_at: now,
        };
        subscriptions.insert(user_id, subscription.clone());
        Ok(subscription)
    }
}

#[async_trait]
impl PropertyManagement for MemoryStore {
    async fn create_tenant(&self, tenant: CreateTenantDto) -> Result<Tenant, sqlx::Error> {
        let now = Utc::now();
        let row = Tenant {
            id: Uuid::new_v4(),
            property_id: tenant.property_id,
            user_id: tenant.user_id,
            name: tenant.name.trim().to_string(),
            email: tenant.email.trim().to_string(),
            phone: tenant.phone,
            lease_start_date: tenant.lease_start_date,
            lease_end_date: tenant.lease_end_date,
            rent_amount: tenant.rent_amount,
            security_deposit: tenant.security_deposit,
            lease_document: tenant.lease_document,
            status: tenant.status,
            created_at: now,
            updated_at: now,
        };
        self.tenants.write().unwrap().push(row.clone());
        Ok(row)
    }

    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, sqlx::Error> {
        Ok(self.tenants.read().unwrap().iter().find(|t| t.id == tenant_id).cloned())
    }

    async fn get_tenants_by_owner(&self, owner_id: Uuid) -> Result<Vec<Tenant>, sqlx::Error> {
        let mut rows: Vec<Tenant> = self
            .tenants
            .read()
            .unwrap()
            .iter()
            .filter(|t| self.owns(owner_id, t.property_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn create_ticket(&self, ticket: CreateTicketDto) -> Result<MaintenanceTicket, sqlx::Error> {
        let now = Utc::now();
        let row = MaintenanceTicket {
            id: Uuid::new_v4(),
            property_id: ticket.property_id,
            tenant_id: ticket.tenant_id,
            title: ticket.title.trim().to_string(),
            description: ticket.description,
            priority: ticket.priority,
            status: TicketStatus::Open,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        };
        self.tickets.write().unwrap().push(row.clone());
        Ok(row)
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<MaintenanceTicket>, sqlx::Error> {
        Ok(self.tickets.read().unwrap().iter().find(|m| m.id == ticket_id).cloned())
    }

    async fn get_tickets_by_owner(&self, owner_id: Uuid) -> Result<Vec<MaintenanceTicket>, sqlx::Error> {
        let mut rows: Vec<MaintenanceTicket> = self
            .tickets
            .read()
            .unwrap()
            .iter()
            .filter(|m| self.owns(owner_id, m.property_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn update_ticket_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> Result<Option<MaintenanceTicket>, sqlx::Error> {
        let now = Utc::now();
        let mut tickets = self.tickets.write().unwrap();
        Ok(tickets.iter_mut().find(|m| m.id == ticket_id).map(|m| {
            m.status = status;
            m.updated_at = now;
            m.resolved_at = if status.is_settled() {
                m.resolved_at.or(Some(now))
            } else {
                None
            };
            m.clone()
        }))
    }

    async fn record_payment(&self, payment: RecordPaymentDto) -> Result<RentPayment, sqlx::Error> {
        let now = Utc::now();
        let row = RentPayment {
            id: Uuid::new_v4(),
            tenant_id: payment.tenant_id,
            amount: payment.amount,
            payment_date: payment.payment_date.unwrap_or(now),
            payment_method: payment.payment_method,
            transaction_id: payment.transaction_id,
            status: payment.status,
            receipt_url: payment.receipt_url,
            created_at: now,
        };
        self.payments.write().unwrap().push(row.clone());
        Ok(row)
    }

    async fn get_payments_by_owner(&self, owner_id: Uuid) -> Result<Vec<RentPayment>, sqlx::Error> {
        let tenants = self.tenants.read().unwrap();
        let mut rows: Vec<RentPayment> = self
            .payments
            .read()
            .unwrap()
            .iter()
            .filter(|r| {
                tenants
                    .iter()
                    .any(|t| t.id == r.tenant_id && self.owns(owner_id, t.property_id))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.payment_date.cmp(&a.payment_date).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn record_expense(&self, expense: RecordExpenseDto) -> Result<Expense, sqlx::Error> {
        let now = Utc::now();
        let row = Expense {
            id: Uuid::new_v4(),
            property_id: expense.property_id,
            category: expense.category.trim().to_string(),
            amount: expense.amount,
            description: expense.description,
            date: expense.date,
            receipt_url: expense.receipt_url,
            created_at: now,
            updated_at: now,
        };
        self.expenses.write().unwrap().push(row.clone());
        Ok(row)
    }

    async fn get_expenses_by_owner(&self, owner_id: Uuid) -> Result<Vec<Expense>, sqlx::Error> {
        let mut rows: Vec<Expense> = self
            .expenses
            .read()
            .unwrap()
            .iter()
            .filter(|e| self.owns(owner_id, e.property_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }
}

/// An approved Kigali rental with every protected field populated. `age_minutes`
/// pushes `created_at` into the past so orderings are predictable.
pub fn listing(title: &str, price: i64, age_minutes: i64) -> Property {
    let created_at = Utc::now() - Duration::minutes(age_minutes);
    Property {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        title: title.to_string(),
        description: format!("{} description", title),
        property_type: PropertyType::Residential,
        status: ListingStatus::Rent,
        price,
        size: 120.0,
        location: Json(Location {
            city: "Kigali".to_string(),
            district: "Gasabo".to_string(),
            sector: "Kimironko".to_string(),
            neighborhood: "Kibagabaga".to_string(),
            exact_location: Some("KG 123 St, House 7".to_string()),
            coordinates: None,
        }),
        images: Json(vec!["https://cdn.example.com/cover.jpg".to_string()]),
        amenities: Json(vec!["parking".to_string()]),
        approved: true,
        contact_details: Some(Json(ContactDetails {
            name: "Owner".to_string(),
            phone: "+250788000000".to_string(),
            email: "owner@example.com".to_string(),
        })),
        views: 0,
        created_at,
        updated_at: created_at,
    }
}

/// Create payload matching `listing`, for stores that assign ids themselves.
pub fn listing_dto(title: &str, price: i64) -> CreatePropertyDto {
    serde_json::from_value(serde_json::json!({
        "title": title,
        "type": "residential",
        "status": "rent",
        "price": price,
        "size": 120.0,
        "location": {
            "city": "Kigali",
            "district": "Gasabo",
            "sector": "Kimironko",
            "neighborhood": "Kibagabaga",
            "exact_location": "KG 123 St, House 7"
        },
        "contact_details": { "name": "Owner", "phone": "+250788000000", "email": "owner@example.com" }
    }))
    .expect("listing payload is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_grant_writes_create_exactly_one_row() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let property = Uuid::new_v4();

        let (a, b, c) = tokio::join!(
            store.create_grant_if_absent(user, property),
            store.create_grant_if_absent(user, property),
            store.create_grant_if_absent(user, property),
        );
        let outcomes = [a.unwrap(), b.unwrap(), c.unwrap()];

        assert_eq!(outcomes.iter().filter(|o| o.created).count(), 1);
        assert!(outcomes.iter().all(|o| o.grant == outcomes[0].grant));
        assert_eq!(store.grant_count(), 1);
    }

    #[tokio::test]
    async fn delete_cascades_grants() {
        let store = MemoryStore::new();
        let property = listing("Loft", 100_000, 0);
        store.insert(property.clone());
        store.create_grant_if_absent(Uuid::new_v4(), property.id).await.unwrap();

        assert!(store.delete_property(property.id).await.unwrap());
        assert_eq!(store.grant_count(), 0);
        assert!(!store.delete_property(property.id).await.unwrap());
    }
}
