// Wedding Site - HTTP API + pages (Axum)
//
// Guests browse, claim and contribute; registry edits need an admin session.

use crate::auth::{self, CookieSource};
use crate::config::AppConfig;
use crate::db;
use crate::party::{self, PartyBySide, PartyMember};
use crate::registry::{
    self, ItemEdit, PriceRange, RegistryError, RegistryItem, RegistryItemStatus, RegistryQuery,
};
use crate::weather::{WeatherClient, WeatherReport};
use axum::{
    extract::{Path, Query, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

/// Shared application state, built once in `main` and handed to the router
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: Arc<AppConfig>,
    pub weather: Arc<WeatherClient>,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig) -> anyhow::Result<Self> {
        let weather = WeatherClient::new(&config.weather, &config.event)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            config: Arc::new(config),
            weather: Arc::new(weather),
        })
    }

    fn lock_db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal(anyhow::anyhow!("database lock poisoned")))
    }
}

// ============================================================================
// Responses & Errors
// ============================================================================

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Conflict(String),
    BadRequest(String),
    Unauthorized,
    Upstream(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<RegistryError>() {
            Some(e) => ApiError::from(e.clone()),
            None => ApiError::Internal(err),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) => ApiError::NotFound(err.to_string()),
            RegistryError::AlreadyPurchased(_)
            | RegistryError::GroupGift(_)
            | RegistryError::HasContributions(_) => ApiError::Conflict(err.to_string()),
            RegistryError::NotGroupGift(_)
            | RegistryError::InvalidAmount(_)
            | RegistryError::MissingName
            | RegistryError::InvalidItem(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "admin login required".to_string(),
            ),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(err) => {
                error!(error = %format!("{:#}", err), "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ApiResponse::<()>::err(message))).into_response()
    }
}

// ============================================================================
// Cookies
// ============================================================================

impl CookieSource for HeaderMap {
    fn cookie(&self, name: &str) -> Option<String> {
        self.get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|header| auth::parse_cookie_header(header, name))
    }
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let conn = state.lock_db()?;
    if auth::is_admin(&conn, headers, &state.config.admin.cookie_name, Utc::now())? {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Registry item plus the values derived on every read
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemView {
    #[serde(flatten)]
    item: RegistryItem,
    status: RegistryItemStatus,
    funding_progress: f64,
}

impl From<RegistryItem> for ItemView {
    fn from(item: RegistryItem) -> Self {
        Self {
            status: item.status(),
            funding_progress: item.funding_progress(),
            item,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistryListing {
    items: Vec<ItemView>,
    total: usize,
    /// Every category in the registry, for the filter checkboxes
    categories: Vec<String>,
    /// Full price span, for the slider
    price_bounds: Option<PriceRange>,
}

/// Build the filter from `category=A&category=B&min=..&max=..`.
/// Category labels are taken as sent (commas and spaces included).
/// A blank `min`/`max` counts as absent.
fn registry_query(params: &[(String, String)]) -> Result<RegistryQuery, ApiError> {
    let mut categories = Vec::new();
    let mut range = PriceRange::any();

    for (key, value) in params {
        match key.as_str() {
            "category" if !value.is_empty() => categories.push(value.clone()),
            "min" => {
                if let Some(min) = parse_price(key, value)? {
                    range.min = min;
                }
            }
            "max" => {
                if let Some(max) = parse_price(key, value)? {
                    range.max = max;
                }
            }
            _ => {}
        }
    }

    Ok(RegistryQuery::new(categories.into_iter().collect(), range))
}

fn parse_price(key: &str, value: &str) -> Result<Option<f64>, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    match value.parse::<f64>() {
        Ok(price) if !price.is_nan() => Ok(Some(price)),
        _ => Err(ApiError::BadRequest(format!(
            "{} must be a number, got {:?}",
            key, value
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct ClaimRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ContributeRequest {
    name: String,
    amount: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContributionResult {
    item: ItemView,
    fully_funded: bool,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    password: String,
}

#[derive(Debug, Serialize)]
struct SessionStatus {
    admin: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PartyResponse {
    members: Vec<PartyMember>,
    by_side: PartyBySide,
}

// ============================================================================
// Registry Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/registry?category=A&category=B&min=&max=
async fn list_registry(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<RegistryListing> {
    let query = registry_query(&params)?;
    let items = {
        let conn = state.lock_db()?;
        db::get_all_items(&conn)?
    };

    let filtered: Vec<ItemView> = query.apply(&items).into_iter().map(ItemView::from).collect();

    Ok(Json(ApiResponse::ok(RegistryListing {
        total: filtered.len(),
        items: filtered,
        categories: registry::categories(&items),
        price_bounds: registry::price_bounds(&items),
    })))
}

/// GET /api/registry/categories
async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let conn = state.lock_db()?;
    let items = db::get_all_items(&conn)?;
    Ok(Json(ApiResponse::ok(registry::categories(&items))))
}

/// GET /api/registry/:id
async fn get_registry_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ItemView> {
    let conn = state.lock_db()?;
    let item = db::get_item(&conn, &id)?.ok_or(RegistryError::NotFound(id))?;
    Ok(Json(ApiResponse::ok(item.into())))
}

/// POST /api/registry/:id/claim
async fn claim_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ClaimRequest>,
) -> ApiResult<ItemView> {
    let mut conn = state.lock_db()?;
    let (item, ()) = db::mutate_item(&mut conn, &id, "item_claimed", request.name.trim(), |item| {
        item.claim(&request.name)
    })?;

    info!(item = %item.id, "registry item claimed");
    Ok(Json(ApiResponse::ok(item.into())))
}

/// POST /api/registry/:id/contribute
async fn contribute_to_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ContributeRequest>,
) -> ApiResult<ContributionResult> {
    let mut conn = state.lock_db()?;
    let (item, fully_funded) = db::mutate_item(
        &mut conn,
        &id,
        "item_contribution",
        request.name.trim(),
        |item| item.contribute(&request.name, request.amount),
    )?;

    info!(item = %item.id, amount = request.amount, fully_funded, "contribution recorded");
    Ok(Json(ApiResponse::ok(ContributionResult {
        item: item.into(),
        fully_funded,
    })))
}

/// POST /api/registry - admin
async fn create_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(item): Json<RegistryItem>,
) -> Result<(StatusCode, Json<ApiResponse<ItemView>>), ApiError> {
    require_admin(&state, &headers)?;
    item.validate()?;

    let conn = state.lock_db()?;
    if db::insert_items(&conn, std::slice::from_ref(&item), "admin")? == 0 {
        return Err(ApiError::Conflict(format!(
            "registry item {} already exists",
            item.id
        )));
    }

    info!(item = %item.id, name = %item.name, "registry item created");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(item.into()))))
}

/// PUT /api/registry/:id - admin
async fn update_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(edit): Json<ItemEdit>,
) -> ApiResult<ItemView> {
    require_admin(&state, &headers)?;

    let conn = state.lock_db()?;
    let mut item = db::get_item(&conn, &id)?.ok_or(RegistryError::NotFound(id))?;
    item.apply_edit(edit)?;
    db::save_item(&conn, &item, "admin")?;

    info!(item = %item.id, status = item.status().as_str(), "registry item updated");
    Ok(Json(ApiResponse::ok(item.into())))
}

/// DELETE /api/registry/:id - admin
async fn delete_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<String> {
    require_admin(&state, &headers)?;

    let conn = state.lock_db()?;
    if !db::delete_item(&conn, &id, "admin")? {
        return Err(RegistryError::NotFound(id).into());
    }

    warn!(item = %id, "registry item deleted");
    Ok(Json(ApiResponse::ok(id)))
}

/// POST /api/registry/:id/reset - admin
async fn reset_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<ItemView> {
    require_admin(&state, &headers)?;

    let mut conn = state.lock_db()?;
    let (item, ()) = db::mutate_item(&mut conn, &id, "item_reset", "admin", |item| {
        item.reset();
        Ok(())
    })?;

    Ok(Json(ApiResponse::ok(item.into())))
}

// ============================================================================
// Admin Handlers
// ============================================================================

/// POST /api/admin/login
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let admin = &state.config.admin;
    if !auth::verify_password(&request.password, &admin.password_sha256) {
        warn!("failed admin login");
        return Err(ApiError::Unauthorized);
    }

    let now = Utc::now();
    let expires_at = auth::session_expiry(now, admin.session_ttl_hours)?;
    let session = {
        let conn = state.lock_db()?;
        auth::purge_expired_sessions(&conn, now)?;
        auth::create_session(&conn, now, expires_at)?
    };

    info!(expires_at = %session.expires_at, "admin logged in");
    Ok((
        [(
            SET_COOKIE,
            auth::session_cookie(&admin.cookie_name, &session.token, admin.session_ttl_hours),
        )],
        Json(ApiResponse::ok(SessionStatus { admin: true })),
    ))
}

/// POST /api/admin/logout
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let cookie_name = &state.config.admin.cookie_name;
    if let Some(token) = headers.cookie(cookie_name) {
        let conn = state.lock_db()?;
        auth::revoke_session(&conn, &token)?;
    }

    Ok((
        [(SET_COOKIE, auth::expired_cookie(cookie_name))],
        Json(ApiResponse::ok(SessionStatus { admin: false })),
    ))
}

/// GET /api/admin/session
async fn session_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<SessionStatus> {
    let conn = state.lock_db()?;
    let admin = auth::is_admin(&conn, &headers, &state.config.admin.cookie_name, Utc::now())?;
    Ok(Json(ApiResponse::ok(SessionStatus { admin })))
}

// ============================================================================
// Info Handlers
// ============================================================================

/// GET /api/party
async fn get_party(State(state): State<AppState>) -> ApiResult<PartyResponse> {
    let conn = state.lock_db()?;
    let members = db::get_party_members(&conn)?;
    Ok(Json(ApiResponse::ok(PartyResponse {
        by_side: party::group_by_side(&members),
        members,
    })))
}

/// GET /api/weather
async fn get_weather(State(state): State<AppState>) -> ApiResult<WeatherReport> {
    match state.weather.report().await {
        Ok(report) => Ok(Json(ApiResponse::ok(report))),
        Err(e) => {
            warn!(error = %format!("{:#}", e), "weather unavailable");
            Err(ApiError::Upstream("weather forecast unavailable".to_string()))
        }
    }
}

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

/// GET /registry - Serve registry page
async fn serve_registry() -> impl IntoResponse {
    Html(include_str!("../web/registry.html"))
}

/// GET /party - Serve wedding party page
async fn serve_party() -> impl IntoResponse {
    Html(include_str!("../web/party.html"))
}

// ============================================================================
// Router
// ============================================================================

pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/registry", get(list_registry).post(create_item))
        .route("/registry/categories", get(list_categories))
        .route(
            "/registry/:id",
            get(get_registry_item).put(update_item).delete(delete_item),
        )
        .route("/registry/:id/claim", post(claim_item))
        .route("/registry/:id/contribute", post(contribute_to_item))
        .route("/registry/:id/reset", post(reset_item))
        .route("/admin/login", post(login))
        .route("/admin/logout", post(logout))
        .route("/admin/session", get(session_status))
        .route("/party", get(get_party))
        .route("/weather", get(get_weather))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .route("/registry", get(serve_registry))
        .route("/party", get(serve_party))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const PASSWORD: &str = "first dance";

    fn test_state() -> AppState {
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();

        let mut kitchen = RegistryItem::new("Stand Mixer", "Kitchen", 20.0);
        kitchen.id = "mixer".to_string();
        let mut bedroom = RegistryItem::new("Duvet", "Bedroom", 150.0);
        bedroom.id = "duvet".to_string();
        let mut honeymoon = RegistryItem::group_gift("Honeymoon Dinner", "Experiences", 300.0);
        honeymoon.id = "dinner".to_string();
        db::insert_items(&conn, &[kitchen, bedroom, honeymoon], "test").unwrap();

        db::insert_party_members(
            &conn,
            &[PartyMember::new("Jess", "Maid of Honor", party::Side::Bride)],
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.admin.password_sha256 = auth::sha256_hex(PASSWORD);
        config.weather.base_url = "http://127.0.0.1:9/v1/forecast".to_string();

        AppState::new(conn, config).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: &str, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn login_cookie(app: &Router) -> String {
        let (status, headers, _) = send(
            app,
            json_req("POST", "/api/admin/login", json!({"password": PASSWORD}), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let set_cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state());
        let (status, _, body) = send(&app, get_req("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!("OK"));
    }

    #[tokio::test]
    async fn test_list_registry_filters_by_category_and_price() {
        let app = build_router(test_state());

        let (status, _, body) = send(&app, get_req("/api/registry?category=Kitchen&min=0&max=100")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], json!(1));
        assert_eq!(body["data"]["items"][0]["name"], json!("Stand Mixer"));
        assert_eq!(body["data"]["items"][0]["status"], json!("available"));
        assert_eq!(
            body["data"]["categories"],
            json!(["Bedroom", "Experiences", "Kitchen"])
        );

        let (_, _, body) = send(&app, get_req("/api/registry?min=100&max=200")).await;
        assert_eq!(body["data"]["total"], json!(1));
        assert_eq!(body["data"]["items"][0]["category"], json!("Bedroom"));

        let (_, _, body) = send(&app, get_req("/api/registry")).await;
        assert_eq!(body["data"]["total"], json!(3));
        assert_eq!(body["data"]["priceBounds"], json!({"min": 20.0, "max": 300.0}));
    }

    #[tokio::test]
    async fn test_claim_flow() {
        let app = build_router(test_state());

        let (status, _, body) = send(
            &app,
            json_req("POST", "/api/registry/mixer/claim", json!({"name": "Grandma"}), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], json!("claimed"));

        let (status, _, body) = send(
            &app,
            json_req("POST", "/api/registry/mixer/claim", json!({"name": "Cousin"}), None),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], json!(false));

        let (status, _, _) = send(
            &app,
            json_req("POST", "/api/registry/dinner/claim", json!({"name": "Cousin"}), None),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_contributions_fully_fund_group_gift() {
        let app = build_router(test_state());

        let (status, _, body) = send(
            &app,
            json_req("POST", "/api/registry/dinner/contribute", json!({"name": "Ann", "amount": 100.0}), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["fullyFunded"], json!(false));
        assert_eq!(body["data"]["item"]["status"], json!("available"));

        let (_, _, body) = send(
            &app,
            json_req("POST", "/api/registry/dinner/contribute", json!({"name": "Ben", "amount": 200.0}), None),
        )
        .await;
        assert_eq!(body["data"]["fullyFunded"], json!(true));
        assert_eq!(body["data"]["item"]["status"], json!("fullyFunded"));
        assert_eq!(body["data"]["item"]["fundingProgress"], json!(1.0));

        let (status, _, _) = send(
            &app,
            json_req("POST", "/api/registry/mixer/contribute", json!({"name": "Ann", "amount": 5.0}), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_item_is_404() {
        let app = build_router(test_state());
        let (status, _, _) = send(&app, get_req("/api/registry/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_routes_require_session() {
        let app = build_router(test_state());
        let new_item = json!({"id": "lamp", "name": "Lamp", "category": "Living Room", "price": 60});

        let (status, _, _) = send(&app, json_req("POST", "/api/registry", new_item.clone(), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, _) = send(
            &app,
            json_req("POST", "/api/admin/login", json!({"password": "wrong"}), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let cookie = login_cookie(&app).await;

        let (status, _, body) = send(&app, json_req("POST", "/api/registry", new_item.clone(), Some(&cookie))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["id"], json!("lamp"));

        let (status, _, _) = send(&app, json_req("POST", "/api/registry", new_item, Some(&cookie))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _, body) = send(
            &app,
            json_req(
                "PUT",
                "/api/registry/lamp",
                json!({"name": "Floor Lamp", "category": "Living Room", "price": 75}),
                Some(&cookie),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], json!("Floor Lamp"));

        let (status, _, _) = send(
            &app,
            json_req("DELETE", "/api/registry/lamp", json!({}), Some(&cookie)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = send(&app, get_req("/api/registry/lamp")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_reset_and_logout() {
        let app = build_router(test_state());
        send(
            &app,
            json_req("POST", "/api/registry/mixer/claim", json!({"name": "Grandma"}), None),
        )
        .await;

        let cookie = login_cookie(&app).await;
        let (status, _, body) = send(
            &app,
            json_req("POST", "/api/registry/mixer/reset", json!({}), Some(&cookie)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], json!("available"));

        let (_, _, body) = send(
            &app,
            Request::builder()
                .uri("/api/admin/session")
                .header(COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(body["data"]["admin"], json!(true));

        send(&app, json_req("POST", "/api/admin/logout", json!({}), Some(&cookie))).await;

        let (status, _, _) = send(
            &app,
            json_req("POST", "/api/registry/mixer/reset", json!({}), Some(&cookie)),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_party_grouped_by_side() {
        let app = build_router(test_state());
        let (status, _, body) = send(&app, get_req("/api/party")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["members"][0]["name"], json!("Jess"));
        assert_eq!(body["data"]["bySide"]["bride"][0]["role"], json!("Maid of Honor"));
    }

    #[tokio::test]
    async fn test_list_registry_category_with_comma() {
        let state = test_state();
        {
            let conn = state.db.lock().unwrap();
            let mut towels = RegistryItem::new("Bath Towels", "Bed, Bath", 45.0);
            towels.id = "towels".to_string();
            db::insert_items(&conn, &[towels], "test").unwrap();
        }
        let app = build_router(state);

        let (_, _, body) = send(&app, get_req("/api/registry")).await;
        assert_eq!(
            body["data"]["categories"],
            json!(["Bed, Bath", "Bedroom", "Experiences", "Kitchen"])
        );

        let (status, _, body) = send(&app, get_req("/api/registry?category=Bed%2C%20Bath")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], json!(1));
        assert_eq!(body["data"]["items"][0]["id"], json!("towels"));

        let (_, _, body) = send(
            &app,
            get_req("/api/registry?category=Kitchen&category=Bed%2C+Bath"),
        )
        .await;
        assert_eq!(body["data"]["total"], json!(2));

        // Neither half of the label is a category of its own
        let (_, _, body) = send(&app, get_req("/api/registry?category=Bed&category=Bath")).await;
        assert_eq!(body["data"]["total"], json!(0));
    }

    #[tokio::test]
    async fn test_list_registry_blank_and_bad_prices() {
        let app = build_router(test_state());

        let (status, _, body) = send(&app, get_req("/api/registry?min=&max=")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], json!(3));

        let (status, _, body) = send(&app, get_req("/api/registry?category=&min=&max=100")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], json!(1));

        let (status, _, body) = send(&app, get_req("/api/registry?min=cheap")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));

        let (status, _, _) = send(&app, get_req("/api/registry?max=NaN")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_item_keeps_funding_consistent() {
        let app = build_router(test_state());
        send(
            &app,
            json_req("POST", "/api/registry/dinner/contribute", json!({"name": "Ann", "amount": 200.0}), None),
        )
        .await;
        let cookie = login_cookie(&app).await;

        let (status, _, body) = send(
            &app,
            json_req(
                "PUT",
                "/api/registry/dinner",
                json!({"name": "Honeymoon Dinner", "category": "Experiences", "price": 150, "isGroupGift": true}),
                Some(&cookie),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], json!("fullyFunded"));
        assert_eq!(body["data"]["purchased"], json!(true));
        assert_eq!(body["data"]["fundingProgress"], json!(1.0));

        let (status, _, body) = send(
            &app,
            json_req(
                "PUT",
                "/api/registry/dinner",
                json!({"name": "Honeymoon Dinner", "category": "Experiences", "price": 150, "isGroupGift": false}),
                Some(&cookie),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], json!(false));

        let (_, _, body) = send(&app, get_req("/api/registry/dinner")).await;
        assert_eq!(body["data"]["isGroupGift"], json!(true));
        assert_eq!(body["data"]["contributors"], json!(["Ann"]));
    }

    #[tokio::test]
    async fn test_login_with_out_of_range_ttl_leaves_db_usable() {
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        let mut config = AppConfig::default();
        config.admin.password_sha256 = auth::sha256_hex(PASSWORD);
        config.admin.session_ttl_hours = i64::MAX / 3600;
        let app = build_router(AppState::new(conn, config).unwrap());

        let (status, headers, _) = send(
            &app,
            json_req("POST", "/api/admin/login", json!({"password": PASSWORD}), None),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(headers.get(SET_COOKIE).is_none());

        let (status, _, _) = send(&app, get_req("/api/registry")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn test_header_map_cookie_source() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, "theme=dark".parse().unwrap());
        headers.append(COOKIE, "wedding_admin=tok".parse().unwrap());
        assert_eq!(headers.cookie("wedding_admin"), Some("tok".to_string()));
        assert_eq!(headers.cookie("missing"), None);
    }
}
