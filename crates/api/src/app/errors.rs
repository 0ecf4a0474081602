use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use shoplab_core::DomainError;
use shoplab_infra::{CommandError, StoreError};

pub fn command_error_to_response(err: CommandError) -> axum::response::Response {
    match err {
        CommandError::Validation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg)
        }
        CommandError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        CommandError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        CommandError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        CommandError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        CommandError::Store(e) => store_error_to_response(e),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    tracing::error!(error = %err, "store failure");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "store_error",
        "internal storage error",
    )
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    command_error_to_response(err.into())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_errors_map_to_statuses() {
        let cases = [
            (CommandError::Validation("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (CommandError::InvalidId("x".into()), StatusCode::BAD_REQUEST),
            (CommandError::not_found("x"), StatusCode::NOT_FOUND),
            (CommandError::conflict("cart is empty"), StatusCode::CONFLICT),
            (
                CommandError::Store(StoreError::Open("disk".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(command_error_to_response(err).status(), status);
        }
    }
}
