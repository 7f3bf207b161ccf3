use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::domain::cart::{CartError, ErrorKind};
use crate::gateways::AuthError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::Cart(e) => match e.kind() {
                ErrorKind::NotFound => "not_found",
                ErrorKind::InvalidState => "invalid_state",
                ErrorKind::InvalidArgument => "invalid_argument",
                ErrorKind::AlreadyExists => "already_exists",
                ErrorKind::Internal => "internal",
            },
            ApiError::Auth(_) => "invalid_credentials",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Cart(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::InvalidState | ErrorKind::AlreadyExists => StatusCode::CONFLICT,
                ErrorKind::InvalidArgument => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Auth(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            return HttpResponse::build(status).json(json!({
                "error": "internal",
                "message": "Internal server error"
            }));
        }

        HttpResponse::build(status).json(json!({
            "error": self.code(),
            "message": self.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::{CartStatus, ItemId, SessionId};
    use crate::event_sourcing::EventStoreError;

    #[test]
    fn test_status_follows_error_kind() {
        let cases = [
            (CartError::CartNotFound(SessionId::new("s")), StatusCode::NOT_FOUND),
            (CartError::ItemNotFound(ItemId::new("i")), StatusCode::NOT_FOUND),
            (CartError::CartNotOpen(CartStatus::Completed), StatusCode::CONFLICT),
            (CartError::EmptyCart, StatusCode::CONFLICT),
            (CartError::AlreadyExists(SessionId::new("s")), StatusCode::CONFLICT),
            (CartError::InvalidQuantity(0), StatusCode::UNPROCESSABLE_ENTITY),
            (CartError::NotInitialized, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).error_response().status(), expected);
        }
    }

    #[test]
    fn test_auth_errors_are_unprocessable() {
        let resp = ApiError::from(AuthError::EmptyPassword).error_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_internal_details_not_leaked() {
        let err = ApiError::from(CartError::Store(EventStoreError::EmptyAppend));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "internal");
    }
}
