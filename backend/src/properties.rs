use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDateTime;
use common::PropertyDto;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::QueryBuilder;
use utoipa::{IntoParams, ToSchema};

use crate::db::Db;
use crate::error::AppError;
use crate::extractors::AdminUser;
use crate::response;
use crate::web_server::AppState;

// Sentinel filter values the search UI sends for "no filter".
const ALL_DISTRICTS: &str = "Все районы";
const ALL: &str = "all";

// Fallback coordinates: Yerevan city centre.
const DEFAULT_LATITUDE: f64 = 40.1792;
const DEFAULT_LONGITUDE: f64 = 44.4991;
const DEFAULT_YEAR_BUILT: i64 = 2020;

const SELECT_COLUMNS: &str = "SELECT id, title, description, property_type, transaction_type, \
     price, currency, area, rooms, bedrooms, bathrooms, floor, total_floors, year_built, \
     district, address, street_name, house_number, apartment_number, latitude, longitude, \
     features, images, status, created_at, updated_at FROM properties";

// --- Row & Payload Structs ---

// Database shape of a listing; `features`/`images` are JSON-encoded text
// columns that may be NULL.
#[derive(sqlx::FromRow, Debug)]
struct PropertyRow {
    id: i64,
    title: String,
    description: String,
    property_type: String,
    transaction_type: String,
    price: f64,
    currency: String,
    area: f64,
    rooms: i64,
    bedrooms: i64,
    bathrooms: i64,
    floor: i64,
    total_floors: i64,
    year_built: i64,
    district: String,
    address: String,
    street_name: String,
    house_number: String,
    apartment_number: String,
    latitude: f64,
    longitude: f64,
    features: Option<String>,
    images: Option<String>,
    status: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl From<PropertyRow> for PropertyDto {
    fn from(row: PropertyRow) -> Self {
        PropertyDto {
            id: row.id,
            title: row.title,
            description: row.description,
            property_type: row.property_type,
            transaction_type: row.transaction_type,
            price: row.price,
            currency: row.currency,
            area: row.area,
            rooms: row.rooms,
            bedrooms: row.bedrooms,
            bathrooms: row.bathrooms,
            floor: row.floor,
            total_floors: row.total_floors,
            year_built: row.year_built,
            district: row.district,
            address: row.address,
            street_name: row.street_name,
            house_number: row.house_number,
            apartment_number: row.apartment_number,
            latitude: row.latitude,
            longitude: row.longitude,
            features: decode_list(row.features),
            images: decode_list(row.images),
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn decode_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default()
}

fn encode_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Search filters. Numeric filters arrive as raw strings so an
/// unparseable value degrades to "filter absent" instead of a 400.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchParams {
    pub district: Option<String>,
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub transaction: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub rooms: Option<String>,
    pub query: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePropertyPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub property_type: Option<String>,
    pub transaction_type: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub area: Option<f64>,
    pub rooms: Option<i64>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub floor: Option<i64>,
    pub total_floors: Option<i64>,
    pub year_built: Option<i64>,
    pub district: Option<String>,
    pub address: Option<String>,
    pub street_name: Option<String>,
    pub house_number: Option<String>,
    pub apartment_number: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub features: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub status: Option<String>,
}

/// Partial update: a field is written only when the request body carries
/// it. Absent and present are distinguished by `Option`, not by falsiness.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PropertyPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub property_type: Option<String>,
    pub transaction_type: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub area: Option<f64>,
    pub rooms: Option<i64>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub floor: Option<i64>,
    pub total_floors: Option<i64>,
    pub year_built: Option<i64>,
    pub district: Option<String>,
    pub address: Option<String>,
    pub street_name: Option<String>,
    pub house_number: Option<String>,
    pub apartment_number: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub features: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub status: Option<String>,
}

/// Id taken from the query string when the path variant is not used.
#[derive(Debug, Deserialize)]
pub struct IdSelector {
    pub id: Option<String>,
}

impl IdSelector {
    fn require(&self) -> Result<i64, AppError> {
        self.id
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .ok_or_else(|| AppError::Validation("Property ID is required".to_string()))
    }
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

// --- API Handlers ---

/// ## Search listings
/// Public endpoint. All supplied filters are AND-combined and only
/// `status = 'active'` rows are ever returned, newest first.
#[utoipa::path(
    get,
    path = "/api/properties",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching listings and their count")
    )
)]
pub async fn search_properties(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, AppError> {
    let mut query: QueryBuilder<Db> =
        QueryBuilder::new(format!("{SELECT_COLUMNS} WHERE status = 'active'"));

    if let Some(district) = trimmed(&params.district) {
        if district != ALL_DISTRICTS {
            query.push(" AND district = ").push_bind(district.to_owned());
        }
    }

    if let Some(property_type) = trimmed(&params.property_type) {
        if property_type != ALL {
            query
                .push(" AND property_type = ")
                .push_bind(property_type.to_owned());
        }
    }

    if let Some(transaction_type) = trimmed(&params.transaction) {
        if transaction_type != ALL {
            query
                .push(" AND transaction_type = ")
                .push_bind(transaction_type.to_owned());
        }
    }

    if let Some(min_price) = trimmed(&params.min_price).and_then(|raw| raw.parse::<f64>().ok()) {
        query.push(" AND price >= ").push_bind(min_price);
    }

    if let Some(max_price) = trimmed(&params.max_price).and_then(|raw| raw.parse::<f64>().ok()) {
        query.push(" AND price <= ").push_bind(max_price);
    }

    if let Some(rooms) = trimmed(&params.rooms).and_then(|raw| raw.parse::<i64>().ok()) {
        query.push(" AND rooms = ").push_bind(rooms);
    }

    if let Some(text) = trimmed(&params.query) {
        let pattern = format!("%{}%", text.to_lowercase());
        query
            .push(" AND (LOWER(title) LIKE ")
            .push_bind(pattern.clone());
        query
            .push(" OR LOWER(description) LIKE ")
            .push_bind(pattern.clone());
        query.push(" OR LOWER(address) LIKE ").push_bind(pattern);
        query.push(")");
    }

    query.push(" ORDER BY created_at DESC, id DESC");

    let rows: Vec<PropertyRow> = query.build_query_as().fetch_all(&state.db_pool).await?;
    let properties: Vec<PropertyDto> = rows.into_iter().map(Into::into).collect();
    let count = properties.len();

    Ok(response::ok(json!({
        "properties": properties,
        "count": count,
    })))
}

/// ## Create a listing
/// Admin only. Absent fields fall back to the documented defaults.
#[utoipa::path(
    post,
    path = "/api/properties",
    request_body = CreatePropertyPayload,
    responses(
        (status = 201, description = "Listing created"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Token does not carry the admin role")
    )
)]
pub async fn create_property(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<CreatePropertyPayload>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    tracing::info!("Admin {} creating property", admin.username);

    let features = encode_list(&payload.features.unwrap_or_default());
    let images = encode_list(&payload.images.unwrap_or_default());

    let (property_id,): (i64,) = sqlx::query_as(
        "INSERT INTO properties (title, description, property_type, transaction_type, price, \
         currency, area, rooms, bedrooms, bathrooms, floor, total_floors, year_built, district, \
         address, street_name, house_number, apartment_number, latitude, longitude, features, \
         images, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
         $18, $19, $20, $21, $22, $23) \
         RETURNING id",
    )
    .bind(payload.title.unwrap_or_default())
    .bind(payload.description.unwrap_or_default())
    .bind(payload.property_type.unwrap_or_else(|| "apartment".to_string()))
    .bind(payload.transaction_type.unwrap_or_else(|| "rent".to_string()))
    .bind(payload.price.unwrap_or(0.0))
    .bind(payload.currency.unwrap_or_else(|| "AMD".to_string()))
    .bind(payload.area.unwrap_or(0.0))
    .bind(payload.rooms.unwrap_or(0))
    .bind(payload.bedrooms.unwrap_or(0))
    .bind(payload.bathrooms.unwrap_or(0))
    .bind(payload.floor.unwrap_or(0))
    .bind(payload.total_floors.unwrap_or(0))
    .bind(payload.year_built.unwrap_or(DEFAULT_YEAR_BUILT))
    .bind(payload.district.unwrap_or_default())
    .bind(payload.address.unwrap_or_default())
    .bind(payload.street_name.unwrap_or_default())
    .bind(payload.house_number.unwrap_or_default())
    .bind(payload.apartment_number.unwrap_or_default())
    .bind(payload.latitude.unwrap_or(DEFAULT_LATITUDE))
    .bind(payload.longitude.unwrap_or(DEFAULT_LONGITUDE))
    .bind(features)
    .bind(images)
    .bind(payload.status.unwrap_or_else(|| "active".to_string()))
    .fetch_one(&state.db_pool)
    .await?;

    Ok((
        StatusCode::CREATED,
        response::ok(json!({
            "property_id": property_id,
            "message": "Property created successfully",
        })),
    ))
}

/// ## Update a listing (id in path)
#[utoipa::path(
    put,
    path = "/api/properties/{id}",
    params(("id" = i64, Path, description = "Listing id")),
    request_body = PropertyPatch,
    responses(
        (status = 200, description = "Listing updated"),
        (status = 400, description = "No recognized fields supplied"),
        (status = 404, description = "Unknown listing id")
    )
)]
pub async fn update_property_by_path(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
    Json(patch): Json<PropertyPatch>,
) -> Result<Json<Value>, AppError> {
    apply_update(&state, &admin, id, patch).await
}

/// ## Update a listing (id in query string)
#[utoipa::path(
    put,
    path = "/api/properties",
    request_body = PropertyPatch,
    responses(
        (status = 200, description = "Listing updated"),
        (status = 400, description = "Missing id or no recognized fields"),
        (status = 404, description = "Unknown listing id")
    )
)]
pub async fn update_property(
    State(state): State<AppState>,
    admin: AdminUser,
    Query(selector): Query<IdSelector>,
    Json(patch): Json<PropertyPatch>,
) -> Result<Json<Value>, AppError> {
    let id = selector.require()?;
    apply_update(&state, &admin, id, patch).await
}

async fn apply_update(
    state: &AppState,
    admin: &AdminUser,
    id: i64,
    patch: PropertyPatch,
) -> Result<Json<Value>, AppError> {
    tracing::info!("Admin {} updating property {}", admin.username, id);

    let mut query: QueryBuilder<Db> = QueryBuilder::new("UPDATE properties SET ");
    let mut changed = false;

    {
        let mut fields = query.separated(", ");

        if let Some(title) = patch.title {
            fields.push("title = ").push_bind_unseparated(title);
            changed = true;
        }
        if let Some(description) = patch.description {
            fields
                .push("description = ")
                .push_bind_unseparated(description);
            changed = true;
        }
        if let Some(property_type) = patch.property_type {
            fields
                .push("property_type = ")
                .push_bind_unseparated(property_type);
            changed = true;
        }
        if let Some(transaction_type) = patch.transaction_type {
            fields
                .push("transaction_type = ")
                .push_bind_unseparated(transaction_type);
            changed = true;
        }
        if let Some(price) = patch.price {
            fields.push("price = ").push_bind_unseparated(price);
            changed = true;
        }
        if let Some(currency) = patch.currency {
            fields.push("currency = ").push_bind_unseparated(currency);
            changed = true;
        }
        if let Some(area) = patch.area {
            fields.push("area = ").push_bind_unseparated(area);
            changed = true;
        }
        if let Some(rooms) = patch.rooms {
            fields.push("rooms = ").push_bind_unseparated(rooms);
            changed = true;
        }
        if let Some(bedrooms) = patch.bedrooms {
            fields.push("bedrooms = ").push_bind_unseparated(bedrooms);
            changed = true;
        }
        if let Some(bathrooms) = patch.bathrooms {
            fields.push("bathrooms = ").push_bind_unseparated(bathrooms);
            changed = true;
        }
        if let Some(floor) = patch.floor {
            fields.push("floor = ").push_bind_unseparated(floor);
            changed = true;
        }
        if let Some(total_floors) = patch.total_floors {
            fields
                .push("total_floors = ")
                .push_bind_unseparated(total_floors);
            changed = true;
        }
        if let Some(year_built) = patch.year_built {
            fields
                .push("year_built = ")
                .push_bind_unseparated(year_built);
            changed = true;
        }
        if let Some(district) = patch.district {
            fields.push("district = ").push_bind_unseparated(district);
            changed = true;
        }
        if let Some(address) = patch.address {
            fields.push("address = ").push_bind_unseparated(address);
            changed = true;
        }
        if let Some(street_name) = patch.street_name {
            fields
                .push("street_name = ")
                .push_bind_unseparated(street_name);
            changed = true;
        }
        if let Some(house_number) = patch.house_number {
            fields
                .push("house_number = ")
                .push_bind_unseparated(house_number);
            changed = true;
        }
        if let Some(apartment_number) = patch.apartment_number {
            fields
                .push("apartment_number = ")
                .push_bind_unseparated(apartment_number);
            changed = true;
        }
        if let Some(latitude) = patch.latitude {
            fields.push("latitude = ").push_bind_unseparated(latitude);
            changed = true;
        }
        if let Some(longitude) = patch.longitude {
            fields.push("longitude = ").push_bind_unseparated(longitude);
            changed = true;
        }
        if let Some(features) = patch.features {
            fields
                .push("features = ")
                .push_bind_unseparated(encode_list(&features));
            changed = true;
        }
        if let Some(images) = patch.images {
            fields
                .push("images = ")
                .push_bind_unseparated(encode_list(&images));
            changed = true;
        }
        if let Some(status) = patch.status {
            fields.push("status = ").push_bind_unseparated(status);
            changed = true;
        }

        if !changed {
            return Err(AppError::Validation("No fields to update".to_string()));
        }

        fields.push("updated_at = CURRENT_TIMESTAMP");
    }

    query.push(" WHERE id = ").push_bind(id).push(" RETURNING id");

    let updated = query.build().fetch_optional(&state.db_pool).await?;

    if updated.is_none() {
        return Err(AppError::NotFound("Property not found".to_string()));
    }

    Ok(response::ok(json!({
        "message": "Property updated successfully"
    })))
}

/// ## Delete a listing (id in path)
#[utoipa::path(
    delete,
    path = "/api/properties/{id}",
    params(("id" = i64, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Delete acknowledged"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Token does not carry the admin role")
    )
)]
pub async fn delete_property_by_path(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    apply_delete(&state, &admin, id).await
}

/// ## Delete a listing (id in query string)
#[utoipa::path(
    delete,
    path = "/api/properties",
    responses(
        (status = 200, description = "Delete acknowledged"),
        (status = 400, description = "Missing id")
    )
)]
pub async fn delete_property(
    State(state): State<AppState>,
    admin: AdminUser,
    Query(selector): Query<IdSelector>,
) -> Result<Json<Value>, AppError> {
    let id = selector.require()?;
    apply_delete(&state, &admin, id).await
}

async fn apply_delete(state: &AppState, admin: &AdminUser, id: i64) -> Result<Json<Value>, AppError> {
    tracing::info!("Admin {} deleting property {}", admin.username, id);

    // Deleting an id that is already gone is acknowledged the same way;
    // the admin panel retries deletes freely.
    sqlx::query("DELETE FROM properties WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;

    Ok(response::ok(json!({
        "message": "Property deleted successfully"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_malformed_lists_decode_to_empty() {
        assert_eq!(decode_list(None), Vec::<String>::new());
        assert_eq!(decode_list(Some("not json".to_string())), Vec::<String>::new());
        assert_eq!(
            decode_list(Some(r#"["balcony","parking"]"#.to_string())),
            vec!["balcony".to_string(), "parking".to_string()]
        );
    }

    #[test]
    fn lists_round_trip_through_encoding() {
        let items = vec!["balcony".to_string(), "garden".to_string()];
        assert_eq!(decode_list(Some(encode_list(&items))), items);
    }

    #[test]
    fn id_selector_requires_a_parseable_id() {
        assert!(IdSelector { id: None }.require().is_err());
        assert!(IdSelector {
            id: Some("abc".to_string())
        }
        .require()
        .is_err());
        assert_eq!(
            IdSelector {
                id: Some("42".to_string())
            }
            .require()
            .unwrap(),
            42
        );
    }
}
