use chrono::{DateTime, Utc};
use serde::{
    de::{value::{Error as DeError, StrDeserializer}, DeserializeOwned, IntoDeserializer},
    Deserialize, Serialize,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::propertymodel::{ContactDetails, GeoPoint, ListingStatus, Location, PropertyType},
    service::{
        error::ServiceError,
        filter_compiler::PropertyFilter,
    },
};

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct LocationDto {
    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,

    #[validate(length(min = 1, max = 100, message = "District is required"))]
    pub district: String,

    #[validate(length(max = 100, message = "Sector must be at most 100 characters"))]
    pub sector: String,

    #[validate(length(max = 100, message = "Neighborhood must be at most 100 characters"))]
    pub neighborhood: String,

    #[validate(length(max = 500, message = "Exact location must be at most 500 characters"))]
    pub exact_location: Option<String>,

    pub coordinates: Option<GeoPoint>,
}

impl LocationDto {
    pub fn into_location(self) -> Location {
        Location {
            city: self.city.trim().to_string(),
            district: self.district.trim().to_string(),
            sector: self.sector.trim().to_string(),
            neighborhood: self.neighborhood.trim().to_string(),
            exact_location: self.exact_location,
            coordinates: self.coordinates,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ContactDetailsDto {
    #[validate(length(min = 1, max = 100, message = "Contact name is required"))]
    pub name: String,

    #[validate(length(min = 5, max = 30, message = "Phone must be between 5 and 30 characters"))]
    pub phone: String,

    #[validate(email(message = "Contact email is invalid"))]
    pub email: String,
}

impl ContactDetailsDto {
    pub fn into_contact_details(self) -> ContactDetails {
        ContactDetails {
            name: self.name,
            phone: self.phone,
            email: self.email,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CreatePropertyDto {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    #[serde(default)]
    pub description: String,

    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub status: ListingStatus,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: i64,

    #[validate(range(min = 0.0, message = "Size cannot be negative"))]
    pub size: f64,

    #[validate]
    pub location: LocationDto,

    // URLs after upload; the first one is the cover
    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    pub amenities: Vec<String>,

    #[validate]
    pub contact_details: Option<ContactDetailsDto>,
}

/// Raw search parameters exactly as they arrive on the query string. Nothing here is
/// trusted until `TryFrom` has turned it into a `PropertyFilter`.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFilterQuery {
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub status: Option<String>,

    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub district: Option<String>,
    #[validate(length(max = 100))]
    pub sector: Option<String>,
    #[validate(length(max = 100))]
    pub neighborhood: Option<String>,

    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,

    pub page: Option<String>,
    pub limit: Option<String>,
}

// Empty strings are how browsers send untouched form fields; they mean "no constraint".
fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_enum<T: DeserializeOwned>(field: &str, raw: &Option<String>) -> Result<Option<T>, ServiceError> {
    match present(raw) {
        None => Ok(None),
        Some(value) => {
            let de: StrDeserializer<DeError> = value.into_deserializer();
            T::deserialize(de)
                .map(Some)
                .map_err(|_| ServiceError::Validation(format!("{} has an unsupported value '{}'", field, value)))
        }
    }
}

fn parse_amount(field: &str, raw: &Option<String>) -> Result<Option<i64>, ServiceError> {
    match present(raw) {
        None => Ok(None),
        Some(value) => {
            let amount = value
                .parse::<i64>()
                .map_err(|_| ServiceError::Validation(format!("{} must be a whole number", field)))?;
            if amount < 0 {
                return Err(ServiceError::Validation(format!("{} cannot be negative", field)));
            }
            Ok(Some(amount))
        }
    }
}

fn text(raw: &Option<String>) -> Option<String> {
    present(raw).map(str::to_string)
}

impl TryFrom<&PropertyFilterQuery> for PropertyFilter {
    type Error = ServiceError;

    fn try_from(query: &PropertyFilterQuery) -> Result<Self, Self::Error> {
        query.validate()?;

        Ok(PropertyFilter {
            property_type: parse_enum("type", &query.property_type)?,
            status: parse_enum("status", &query.status)?,
            city: text(&query.city),
            district: text(&query.district),
            sector: text(&query.sector),
            neighborhood: text(&query.neighborhood),
            min_price: parse_amount("minPrice", &query.min_price)?,
            max_price: parse_amount("maxPrice", &query.max_price)?,
            sort_by: parse_enum("sortBy", &query.sort_by)?,
            sort_order: parse_enum("sortOrder", &query.sort_order)?,
        })
    }
}

impl PropertyFilterQuery {
    /// `(page, limit)` when the caller asked for a page; limit is capped at 50.
    pub fn pagination(&self) -> Result<Option<(u32, usize)>, ServiceError> {
        let page = parse_amount("page", &self.page)?;
        let limit = parse_amount("limit", &self.limit)?;

        match (page, limit) {
            (None, None) => Ok(None),
            (page, limit) => {
                let page = page.unwrap_or(1);
                let limit = limit.unwrap_or(10);
                if page < 1 {
                    return Err(ServiceError::Validation("page must be at least 1".to_string()));
                }
                let page = u32::try_from(page)
                    .map_err(|_| ServiceError::Validation("page is out of range".to_string()))?;
                if !(1..=50).contains(&limit) {
                    return Err(ServiceError::Validation("limit must be between 1 and 50".to_string()));
                }
                Ok(Some((page, limit as usize)))
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PublicLocation {
    pub city: String,
    pub district: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoPoint>,
}

/// What a viewer is allowed to see of a listing. Redacted fields are omitted from
/// the JSON entirely.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PublicPropertyView {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub status: ListingStatus,
    pub price: i64,
    pub size: f64,
    pub location: PublicLocation,
    pub images: Vec<String>,
    pub cover_image: Option<String>,
    pub amenities: Vec<String>,
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_details: Option<ContactDetails>,
    pub views: i64,
    pub unlocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
