use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use super::error::ApiError;
use super::AppState;
use crate::domain::cart::{ItemId, SessionId};
use crate::gateways::Credentials;

// ── Request DTOs ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub item_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i32,
}

/// `?quantity=n` on DELETE; absent removes the whole line
#[derive(Debug, Deserialize)]
pub struct RemoveItemParams {
    pub quantity: Option<i32>,
}

// ── Carts ────────────────────────────────────────────────────────────────────

/// POST /carts/{session}
pub async fn create_cart(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let session_id = SessionId::new(path.into_inner());
    let cart = state.engine.create_cart(&session_id).await?;
    Ok(HttpResponse::Created().json(cart))
}

/// GET /carts/{session}
pub async fn get_cart(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let session_id = SessionId::new(path.into_inner());
    let cart = state.engine.get_cart(&session_id).await?;
    Ok(HttpResponse::Ok().json(cart))
}

/// DELETE /carts/{session}
pub async fn abandon_cart(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let session_id = SessionId::new(path.into_inner());
    state.engine.abandon_cart(&session_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /carts/{session}/reset
pub async fn reset_cart(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let session_id = SessionId::new(path.into_inner());
    let cart = state.engine.reset_cart(&session_id).await?;
    Ok(HttpResponse::Ok().json(cart))
}

/// GET /carts/{session}/total
pub async fn get_total(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let session_id = SessionId::new(path.into_inner());
    let total = state.engine.get_total(&session_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "session_id": session_id,
        "total": total
    })))
}

// ── Line items ───────────────────────────────────────────────────────────────

/// POST /carts/{session}/items
pub async fn add_item(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<AddItemRequest>,
) -> Result<HttpResponse, ApiError> {
    let session_id = SessionId::new(path.into_inner());
    let body = body.into_inner();
    let cart = state
        .engine
        .add_item(&session_id, &ItemId::new(body.item_id), body.quantity)
        .await?;
    Ok(HttpResponse::Ok().json(cart))
}

/// PUT /carts/{session}/items/{item}
pub async fn set_quantity(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<SetQuantityRequest>,
) -> Result<HttpResponse, ApiError> {
    let (session, item) = path.into_inner();
    let cart = state
        .engine
        .set_quantity(&SessionId::new(session), &ItemId::new(item), body.quantity)
        .await?;
    Ok(HttpResponse::Ok().json(cart))
}

/// DELETE /carts/{session}/items/{item}
pub async fn remove_item(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    params: web::Query<RemoveItemParams>,
) -> Result<HttpResponse, ApiError> {
    let (session, item) = path.into_inner();
    let cart = state
        .engine
        .remove_item(&SessionId::new(session), &ItemId::new(item), params.quantity)
        .await?;
    Ok(HttpResponse::Ok().json(cart))
}

// ── Checkout ─────────────────────────────────────────────────────────────────

/// POST /carts/{session}/checkout
///
/// A checkout the gateway refused still produced a receipt, returned with
/// 402 so clients can branch on status alone.
pub async fn checkout(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let session_id = SessionId::new(path.into_inner());
    let result = state.engine.begin_checkout(&session_id).await?;

    if result.outcome.is_success() {
        Ok(HttpResponse::Ok().json(result))
    } else {
        Ok(HttpResponse::PaymentRequired().json(result))
    }
}

/// GET /carts/{session}/checkouts
pub async fn checkout_history(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let session_id = SessionId::new(path.into_inner());
    let history = state.engine.checkout_history(&session_id).await?;
    Ok(HttpResponse::Ok().json(history))
}

// ── Catalog ──────────────────────────────────────────────────────────────────

/// GET /catalog/items
pub async fn list_items(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.engine.list_items())
}

// ── Auth ─────────────────────────────────────────────────────────────────────

/// POST /auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<Credentials>,
) -> Result<HttpResponse, ApiError> {
    let identity = state.auth.login(&body)?;
    tracing::info!(session_id = %identity.session_id, "Login");
    Ok(HttpResponse::Ok().json(identity))
}

/// POST /auth/signup
pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<Credentials>,
) -> Result<HttpResponse, ApiError> {
    let identity = state.auth.signup(&body)?;
    tracing::info!(session_id = %identity.session_id, "Signup");
    Ok(HttpResponse::Created().json(identity))
}
