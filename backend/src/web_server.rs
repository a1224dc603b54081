use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::db::DbPool;
use crate::{auth, config::AppConfig, contact, properties, users};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub http_client: reqwest::Client,
    pub config: AppConfig,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::me,
        users::create_user,
        users::reset_password,
        properties::search_properties,
        properties::create_property,
        properties::update_property,
        properties::update_property_by_path,
        properties::delete_property,
        properties::delete_property_by_path,
        contact::submit_email,
        contact::submit_telegram,
    ),
    components(schemas(
        common::Credentials,
        common::LoginResponse,
        common::PublicUser,
        common::PropertyDto,
        common::ContactEmailForm,
        common::ContactTelegramForm,
        users::CreateUserPayload,
        users::ResetPasswordPayload,
        properties::CreatePropertyPayload,
        properties::PropertyPatch,
    )),
    tags(
        (name = "auth", description = "Admin session management"),
        (name = "users", description = "Admin user provisioning"),
        (name = "properties", description = "Listing search and CRUD"),
        (name = "contact", description = "Contact form forwarding")
    )
)]
struct ApiDoc;

pub async fn run_server(app_state: AppState) {
    let addr: SocketAddr = format!("{}:{}", app_state.config.web.addr, app_state.config.web.port)
        .parse()
        .expect("Invalid web.addr/web.port configuration");

    let app = create_router(app_state);

    tracing::info!("Serving API at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server error");
}

pub fn create_router(app_state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me));

    let user_routes = Router::new()
        .route("/users", post(users::create_user))
        .route("/users/reset-password", post(users::reset_password));

    // GET is public; the write handlers gate themselves through the
    // AdminUser extractor.
    let property_routes = Router::new()
        .route(
            "/properties",
            get(properties::search_properties)
                .post(properties::create_property)
                .put(properties::update_property)
                .delete(properties::delete_property),
        )
        .route(
            "/properties/{id}",
            put(properties::update_property_by_path)
                .delete(properties::delete_property_by_path),
        );

    let contact_routes = Router::new()
        .route("/contact/email", post(contact::submit_email))
        .route("/contact/telegram", post(contact::submit_telegram));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-auth-token"),
        ])
        .max_age(Duration::from_secs(86400));

    Router::new()
        .nest(
            "/api",
            auth_routes
                .merge(user_routes)
                .merge(property_routes)
                .merge(contact_routes),
        )
        .route("/api-docs/openapi.json", get(openapi_doc))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn openapi_doc() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "ok": false, "error": "Method not allowed" })),
    )
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "ok": false, "error": "Not found" })),
    )
}
