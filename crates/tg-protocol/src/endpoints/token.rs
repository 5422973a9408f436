//! Token endpoint handler.
//!
//! Implements POST `/connect/token` for the `password` and `refresh_token`
//! grant types.

use axum::{
    extract::{rejection::FormRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use tokio_util::sync::CancellationToken;

use crate::error::TokenError;
use crate::grants::TokenExchange;
use crate::request::TokenRequest;

use super::state::TokenEndpointState;

/// POST `/connect/token`
///
/// Exchanges a grant for tokens.
///
/// # Responses
///
/// - 200 OK: token response JSON
/// - 400 Bad Request: invalid request, invalid grant, unsupported grant type
/// - 500 Internal Server Error: collaborator failure
pub async fn token<T: TokenExchange>(
    State(state): State<TokenEndpointState<T>>,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let request = match form {
        Ok(Form(request)) => request,
        Err(rejection) => {
            return error_response(&TokenError::InvalidRequest(rejection.body_text()));
        }
    };

    // Dropping the handler future (client went away) cancels in-flight work.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match state.exchange.exchange_tokens(&request, &cancel).await {
        Ok(response) => no_store((StatusCode::OK, Json(response)).into_response()),
        Err(ref err) => error_response(err),
    }
}

/// Creates an error response.
fn error_response(err: &TokenError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    no_store((status, Json(err.to_error_response())).into_response())
}

/// Token responses must not be cached (RFC 6749 section 5.1).
fn no_store(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}
