use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::unlockdb::UnlockLedger,
    dtos::propertydtos::{PublicLocation, PublicPropertyView},
    models::propertymodel::Property,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Full,
    Redacted,
}

/// Owners always see their own listing. Anyone else needs a grant, and a grant only
/// counts while the listing is approved.
pub fn decide(property: &Property, viewer: Option<Uuid>, has_grant: bool) -> Access {
    match viewer {
        Some(viewer_id) if property.is_owned_by(viewer_id) => Access::Full,
        Some(_) if has_grant && property.approved => Access::Full,
        _ => Access::Redacted,
    }
}

/// Build the outward representation of `property`. Redacted views drop the protected
/// keys entirely rather than blanking them.
pub fn redact(property: &Property, access: Access) -> PublicPropertyView {
    let location = &property.location.0;
    let full = access == Access::Full;

    let public_location = PublicLocation {
        city: location.city.clone(),
        district: location.district.clone(),
        sector: full.then(|| location.sector.clone()),
        neighborhood: full.then(|| location.neighborhood.clone()),
        exact_location: if full { location.exact_location.clone() } else { None },
        coordinates: if full { location.coordinates } else { None },
    };

    PublicPropertyView {
        id: property.id,
        owner_id: property.owner_id,
        title: property.title.clone(),
        description: property.description.clone(),
        property_type: property.property_type,
        status: property.status,
        price: property.price,
        size: property.size,
        location: public_location,
        images: property.images.0.clone(),
        cover_image: property.cover_image().map(str::to_string),
        amenities: property.amenities.0.clone(),
        approved: property.approved,
        contact_details: if full {
            property.contact_details.as_ref().map(|c| c.0.clone())
        } else {
            None
        },
        views: property.views,
        unlocked: full,
        created_at: property.created_at,
        updated_at: property.updated_at,
    }
}

/// Read-time gate in front of every property payload. It only reads the ledger and
/// fails closed: a ledger error produces a redacted view, never an error.
#[derive(Clone)]
pub struct AccessGate {
    ledger: Arc<dyn UnlockLedger>,
}

impl AccessGate {
    pub fn new(ledger: Arc<dyn UnlockLedger>) -> Self {
        Self { ledger }
    }

    pub async fn project(&self, property: &Property, viewer: Option<Uuid>) -> PublicPropertyView {
        let has_grant = match viewer {
            Some(viewer_id) if !property.is_owned_by(viewer_id) => {
                match self.ledger.has_grant(viewer_id, property.id).await {
                    Ok(granted) => granted,
                    Err(e) => {
                        tracing::warn!(
                            "Grant lookup failed for user {} on property {}: {}. Serving redacted view",
                            viewer_id, property.id, e
                        );
                        false
                    }
                }
            }
            _ => false,
        };

        redact(property, decide(property, viewer, has_grant))
    }

    /// Same as `project` for a whole result page, with a single ledger round-trip.
    pub async fn project_many(&self, properties: &[Property], viewer: Option<Uuid>) -> Vec<PublicPropertyView> {
        let granted = match viewer {
            Some(viewer_id) => {
                let ids: Vec<Uuid> = properties
                    .iter()
                    .filter(|p| !p.is_owned_by(viewer_id))
                    .map(|p| p.id)
                    .collect();
                match self.ledger.granted_property_ids(viewer_id, &ids).await {
                    Ok(granted) => granted,
                    Err(e) => {
                        tracing::warn!(
                            "Grant lookup failed for user {} on {} properties: {}. Serving redacted views",
                            viewer_id, ids.len(), e
                        );
                        Default::default()
                    }
                }
            }
            None => Default::default(),
        };

        properties
            .iter()
            .map(|p| redact(p, decide(p, viewer, granted.contains(&p.id))))
            .collect()
    }
}
