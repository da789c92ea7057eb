// service/filter_compiler.rs
//
// Turns a sparse, already-validated `PropertyFilter` into a `QueryPlan`: a conjunction
// of predicates plus a total ordering. The plan is storage-agnostic; `db::propertydb`
// renders it to SQL.
use serde::{Deserialize, Serialize};

use crate::models::propertymodel::{ListingStatus, PropertyType};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    CreatedAt,
    Views,
    Price,
}

impl SortKey {
    pub fn column(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::Views => "views",
            SortKey::Price => "price",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Search criteria. Every field is independent; `None` places no constraint on that
/// dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilter {
    pub property_type: Option<PropertyType>,
    pub status: Option<ListingStatus>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub sector: Option<String>,
    pub neighborhood: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort_by: Option<SortKey>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationField {
    City,
    District,
    Sector,
    Neighborhood,
}

impl LocationField {
    /// Key inside the stored location document.
    pub fn key(&self) -> &'static str {
        match self {
            LocationField::City => "city",
            LocationField::District => "district",
            LocationField::Sector => "sector",
            LocationField::Neighborhood => "neighborhood",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Approved,
    TypeEquals(PropertyType),
    StatusEquals(ListingStatus),
    LocationContains(LocationField, String),
    PriceAtLeast(i64),
    PriceAtMost(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub key: SortKey,
    pub order: SortOrder,
}

impl Default for Ordering {
    fn default() -> Self {
        Ordering {
            key: SortKey::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub predicates: Vec<Predicate>,
    pub ordering: Ordering,
    pub page: Option<Page>,
}

impl QueryPlan {
    /// False when the price bounds cross; such a plan matches nothing and need not
    /// reach storage.
    pub fn is_satisfiable(&self) -> bool {
        let mut lower = i64::MIN;
        let mut upper = i64::MAX;
        for predicate in &self.predicates {
            match predicate {
                Predicate::PriceAtLeast(min) => lower = lower.max(*min),
                Predicate::PriceAtMost(max) => upper = upper.min(*max),
                _ => {}
            }
        }
        lower <= upper
    }

    pub fn paginate(mut self, page: u32, limit: usize) -> Self {
        let limit = limit.max(1) as i64;
        let offset = (page.saturating_sub(1) as i64) * limit;
        self.page = Some(Page { limit, offset });
        self
    }
}

pub fn compile(filter: &PropertyFilter) -> QueryPlan {
    // Not overridable by anything the caller sends.
    let mut predicates = vec![Predicate::Approved];

    if let Some(property_type) = filter.property_type {
        predicates.push(Predicate::TypeEquals(property_type));
    }
    if let Some(status) = filter.status {
        predicates.push(Predicate::StatusEquals(status));
    }

    let location = [
        (LocationField::City, &filter.city),
        (LocationField::District, &filter.district),
        (LocationField::Sector, &filter.sector),
        (LocationField::Neighborhood, &filter.neighborhood),
    ];
    for (field, value) in location {
        if let Some(value) = value {
            predicates.push(Predicate::LocationContains(field, value.clone()));
        }
    }

    if let Some(min) = filter.min_price {
        predicates.push(Predicate::PriceAtLeast(min));
    }
    if let Some(max) = filter.max_price {
        predicates.push(Predicate::PriceAtMost(max));
    }

    let ordering = match filter.sort_by {
        Some(key) => Ordering {
            key,
            order: filter.sort_order.unwrap_or(SortOrder::Asc),
        },
        None => Ordering::default(),
    };

    QueryPlan {
        predicates,
        ordering,
        page: None,
    }
}
