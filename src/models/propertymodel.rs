use sqlx::types::chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "property_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Residential,
    Commercial,
    Land,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "listing_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Sale,
    Rent,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Where a listing is. `sector`, `neighborhood`, `exact_location` and `coordinates`
/// are protected and only leave the service through the access gate.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    pub city: String,
    pub district: String,
    pub sector: String,
    pub neighborhood: String,
    pub exact_location: Option<String>,
    pub coordinates: Option<GeoPoint>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ContactDetails {
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Property {
    pub id: Uuid,
    pub owner_id: Uuid,

    // Basic property info
    pub title: String,
    pub description: String,
    pub property_type: PropertyType,
    pub status: ListingStatus,

    pub price: i64,
    pub size: f64,

    pub location: Json<Location>,

    // First image is the cover
    pub images: Json<Vec<String>>,
    pub amenities: Json<Vec<String>>,

    // Set by moderation; unapproved listings never appear in public search
    pub approved: bool,

    pub contact_details: Option<Json<ContactDetails>>,

    pub views: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    pub fn cover_image(&self) -> Option<&str> {
        self.images.0.first().map(String::as_str)
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}
