use async_trait::async_trait;
use sqlx::{types::Json, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    db::db::DBClient,
    dtos::propertydtos::CreatePropertyDto,
    models::propertymodel::Property,
    service::filter_compiler::{Predicate, QueryPlan},
};

const PROPERTY_COLUMNS: &str = r#"
    id, owner_id, title, description, property_type, status, price, size,
    location, images, amenities, approved, contact_details, views,
    created_at, updated_at
"#;

/// Read/write access to the property catalog. Rows always come back with their
/// protected fields intact; redaction is the access gate's job.
#[async_trait]
pub trait PropertyCatalog: Send + Sync {
    async fn query_properties(
        &self,
        plan: &QueryPlan,
    ) -> Result<Vec<Property>, sqlx::Error>;

    async fn get_property_by_id(
        &self,
        property_id: Uuid,
    ) -> Result<Option<Property>, sqlx::Error>;

    async fn create_property(
        &self,
        owner_id: Uuid,
        property_data: CreatePropertyDto,
    ) -> Result<Property, sqlx::Error>;

    async fn get_properties_by_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<Property>, sqlx::Error>;

    async fn get_pending_properties(&self) -> Result<Vec<Property>, sqlx::Error>;

    async fn set_property_approval(
        &self,
        property_id: Uuid,
        approved: bool,
    ) -> Result<Option<Property>, sqlx::Error>;

    async fn delete_property(
        &self,
        property_id: Uuid,
    ) -> Result<bool, sqlx::Error>;

    async fn increment_views(
        &self,
        property_id: Uuid,
    ) -> Result<(), sqlx::Error>;
}

/// Render a compiled plan as a parameterised SELECT.
pub fn build_search_query(plan: &QueryPlan) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM properties WHERE ", PROPERTY_COLUMNS));

    for (index, predicate) in plan.predicates.iter().enumerate() {
        if index > 0 {
            builder.push(" AND ");
        }
        match predicate {
            Predicate::Approved => {
                builder.push("approved = TRUE");
            }
            Predicate::TypeEquals(property_type) => {
                builder.push("property_type = ").push_bind(*property_type);
            }
            Predicate::StatusEquals(status) => {
                builder.push("status = ").push_bind(*status);
            }
            Predicate::LocationContains(field, value) => {
                let mut fragment = serde_json::Map::new();
                fragment.insert(field.key().to_string(), serde_json::Value::String(value.clone()));
                builder
                    .push("location @> ")
                    .push_bind(Json(serde_json::Value::Object(fragment)));
            }
            Predicate::PriceAtLeast(min) => {
                builder.push("price >= ").push_bind(*min);
            }
            Predicate::PriceAtMost(max) => {
                builder.push("price <= ").push_bind(*max);
            }
        }
    }

    // Plans always carry the approval predicate, but never emit a bare WHERE.
    if plan.predicates.is_empty() {
        builder.push("approved = TRUE");
    }

    builder.push(format!(
        " ORDER BY {} {}, id ASC",
        plan.ordering.key.column(),
        plan.ordering.order.sql()
    ));

    if let Some(page) = plan.page {
        builder.push(" LIMIT ").push_bind(page.limit);
        builder.push(" OFFSET ").push_bind(page.offset);
    }

    builder
}

#[async_trait]
impl PropertyCatalog for DBClient {
    async fn query_properties(
        &self,
        plan: &QueryPlan,
    ) -> Result<Vec<Property>, sqlx::Error> {
        if !plan.is_satisfiable() {
            return Ok(Vec::new());
        }

        let mut builder = build_search_query(plan);
        builder
            .build_query_as::<Property>()
            .fetch_all(&self.pool)
            .await
    }

    async fn get_property_by_id(
        &self,
        property_id: Uuid,
    ) -> Result<Option<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            "SELECT {} FROM properties WHERE id = $1",
            PROPERTY_COLUMNS
        ))
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_property(
        &self,
        owner_id: Uuid,
        property_data: CreatePropertyDto,
    ) -> Result<Property, sqlx::Error> {
        let location = property_data.location.clone().into_location();
        let contact_details = property_data
            .contact_details
            .clone()
            .map(|c| Json(c.into_contact_details()));

        sqlx::query_as::<_, Property>(&format!(
            r#"
            INSERT INTO properties (
                owner_id, title, description, property_type, status, price, size,
                location, images, amenities, contact_details, approved
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, FALSE
            )
            RETURNING {}
            "#,
            PROPERTY_COLUMNS
        ))
        .bind(owner_id)
        .bind(property_data.title)
        .bind(property_data.description)
        .bind(property_data.property_type)
        .bind(property_data.status)
        .bind(property_data.price)
        .bind(property_data.size)
        .bind(Json(location))
        .bind(Json(property_data.images))
        .bind(Json(property_data.amenities))
        .bind(contact_details)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_properties_by_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            "SELECT {} FROM properties WHERE owner_id = $1 ORDER BY created_at DESC, id ASC",
            PROPERTY_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_pending_properties(&self) -> Result<Vec<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            "SELECT {} FROM properties WHERE approved = FALSE ORDER BY created_at DESC, id ASC",
            PROPERTY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn set_property_approval(
        &self,
        property_id: Uuid,
        approved: bool,
    ) -> Result<Option<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            r#"
            UPDATE properties
            SET approved = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROPERTY_COLUMNS
        ))
        .bind(property_id)
        .bind(approved)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_property(
        &self,
        property_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(property_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_views(
        &self,
        property_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        // Single-statement increment; concurrent bumps commute.
        sqlx::query("UPDATE properties SET views = views + 1 WHERE id = $1")
            .bind(property_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
