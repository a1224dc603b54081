use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[cfg(not(target_arch = "wasm32"))]
use sqlx::FromRow;

/// Login payload for the admin panel. Absent fields deserialize to empty
/// strings so the handler can answer with its own validation message.
#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Admin user fields that are safe to return to clients.
/// The password hash never leaves the backend.
#[cfg_attr(not(target_arch = "wasm32"), derive(FromRow))]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

/// A property listing as served by the search endpoint.
///
/// Decimal columns are surfaced as plain JSON numbers and the
/// `features`/`images` arrays are always present (never null).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct PropertyDto {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub property_type: String,
    pub transaction_type: String,
    pub price: f64,
    pub currency: String,
    pub area: f64,
    pub rooms: i64,
    pub bedrooms: i64,
    pub bathrooms: i64,
    pub floor: i64,
    pub total_floors: i64,
    pub year_built: i64,
    pub district: String,
    pub address: String,
    pub street_name: String,
    pub house_number: String,
    pub apartment_number: String,
    pub latitude: f64,
    pub longitude: f64,
    pub features: Vec<String>,
    pub images: Vec<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Contact form payload forwarded to the agency mailbox.
#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct ContactEmailForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub message: String,
}

/// Contact form payload forwarded to the messaging bot.
#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct ContactTelegramForm {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "contactMethod", default)]
    pub contact_method: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub message: String,
}
