mod error;
mod handlers;

use std::sync::Arc;

use actix_web::{web, App, HttpServer};

use crate::engine::CartEngine;
use crate::gateways::AuthProvider;
use crate::metrics::{self, Metrics};

pub use error::ApiError;

// ============================================================================
// HTTP API - one endpoint per engine operation
// ============================================================================

/// Shared state handed to every handler
pub struct AppState {
    pub engine: Arc<CartEngine>,
    pub auth: Arc<dyn AuthProvider>,
    pub metrics: Arc<Metrics>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(metrics::health_handler))
        .route("/metrics", web::get().to(metrics::metrics_handler))
        .service(
            web::scope("/auth")
                .route("/login", web::post().to(handlers::login))
                .route("/signup", web::post().to(handlers::signup)),
        )
        .route("/catalog/items", web::get().to(handlers::list_items))
        .service(
            web::scope("/carts/{session}")
                .route("", web::post().to(handlers::create_cart))
                .route("", web::get().to(handlers::get_cart))
                .route("", web::delete().to(handlers::abandon_cart))
                .route("/reset", web::post().to(handlers::reset_cart))
                .route("/total", web::get().to(handlers::get_total))
                .route("/items", web::post().to(handlers::add_item))
                .route("/items/{item}", web::put().to(handlers::set_quantity))
                .route("/items/{item}", web::delete().to(handlers::remove_item))
                .route("/checkout", web::post().to(handlers::checkout))
                .route("/checkouts", web::get().to(handlers::checkout_history)),
        );
}

/// Build an actix-web `Server` bound to `host:port`. The caller awaits it.
pub fn build_server(
    state: web::Data<AppState>,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((host.to_string(), port))?
    .run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    use crate::config::EngineConfig;
    use crate::gateways::{InMemoryCatalog, MockAuthProvider, MockPaymentGateway};

    fn state_with(gateway: MockPaymentGateway) -> web::Data<AppState> {
        let metrics = Arc::new(Metrics::new().unwrap());
        let engine = CartEngine::new(
            Arc::new(InMemoryCatalog::sneakers().unwrap()),
            Arc::new(gateway),
            metrics.clone(),
            EngineConfig::default(),
        );
        web::Data::new(AppState {
            engine: Arc::new(engine),
            auth: Arc::new(MockAuthProvider),
            metrics,
        })
    }

    fn state() -> web::Data<AppState> {
        state_with(MockPaymentGateway::default())
    }

    fn decimal(value: &Value) -> Decimal {
        value.as_str().unwrap().parse().unwrap()
    }

    #[actix_web::test]
    async fn test_cart_flow() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::post().uri("/carts/alice").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        for quantity in [2, 1] {
            let req = test::TestRequest::post()
                .uri("/carts/alice/items")
                .set_json(json!({"item_id": "sneaker-1", "quantity": quantity}))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let req = test::TestRequest::get().uri("/carts/alice/total").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(decimal(&body["total"]), Decimal::new(29997, 2));

        let req = test::TestRequest::put()
            .uri("/carts/alice/items/sneaker-1")
            .set_json(json!({"quantity": 1}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["line_items"][0]["quantity"], 1);

        let req = test::TestRequest::post().uri("/carts/alice/checkout").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["outcome"]["status"], "Success");
        assert_eq!(body["idempotency_token"], "alice:1");

        let req = test::TestRequest::get().uri("/carts/alice").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "Completed");

        let req = test::TestRequest::get().uri("/carts/alice/checkouts").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_error_statuses() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/carts/ghost").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post().uri("/carts/bob").to_request();
        test::call_service(&app, req).await;
        let req = test::TestRequest::post().uri("/carts/bob").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::post()
            .uri("/carts/bob/items")
            .set_json(json!({"item_id": "sneaker-1", "quantity": 0}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "invalid_argument");

        let req = test::TestRequest::post()
            .uri("/carts/bob/items")
            .set_json(json!({"item_id": "sandal"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post().uri("/carts/bob/checkout").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::delete().uri("/carts/bob/items/sneaker-2").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_declined_checkout_is_payment_required() {
        let state = state_with(MockPaymentGateway::declining("card declined"));
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::post().uri("/carts/alice").to_request();
        test::call_service(&app, req).await;
        let req = test::TestRequest::post()
            .uri("/carts/alice/items")
            .set_json(json!({"item_id": "sneaker-2"}))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post().uri("/carts/alice/checkout").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["outcome"]["status"], "Failure");
        assert_eq!(body["outcome"]["reason"]["kind"], "Declined");

        let req = test::TestRequest::get().uri("/carts/alice").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "Open");
        assert_eq!(body["line_items"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_abandon_then_reset() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::post().uri("/carts/alice").to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post().uri("/carts/alice/reset").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::delete().uri("/carts/alice").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::post().uri("/carts/alice/reset").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "Open");
    }

    #[actix_web::test]
    async fn test_catalog_auth_and_ops_routes() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/catalog/items").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 3);

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({"email": "john@example.com", "password": "secret"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["name"], "John Doe");

        let req = test::TestRequest::post()
            .uri("/auth/signup")
            .set_json(json!({"email": "not-an-email", "password": "secret"}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let req = test::TestRequest::get().uri("/health").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert!(String::from_utf8_lossy(&body).contains("cart_sessions"));
    }
}
