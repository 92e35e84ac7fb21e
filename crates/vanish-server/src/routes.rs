//! HTTP routes.
//!
//! Each handler decodes its JSON/base64 input, makes exactly one
//! [`RelayService`] call and encodes the result. Handlers hold no state of
//! their own; the relay is the axum state and is cloned per request.
//!
//! Every error response carries a JSON `{"detail": ...}` body, including the
//! ones axum produces itself (unknown route, wrong method).

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{
        StatusCode,
        header::{ALLOW, CONTENT_TYPE},
    },
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use tower_http::trace::TraceLayer;
use vanish_core::{Environment, MailboxStore, RelayService, SendRequest};

use crate::{
    error::ApiError,
    wire::{
        HealthResponse, MessageBody, PublicKeyResponse, ReceiveResponse, RegisterRequest,
        RegisterResponse, SendRequestBody, SendResponse, decode_b64,
    },
};

/// Build the relay's HTTP router.
///
/// Request bodies larger than `max_body_bytes` are refused with 413 when the
/// handler reads them.
pub fn router<E, S>(relay: RelayService<E, S>, max_body_bytes: usize) -> Router
where
    E: Environment,
    S: MailboxStore,
{
    Router::new()
        .route("/register", post(register::<E, S>))
        .route("/public_key/:user_id", get(public_key::<E, S>))
        .route("/send", post(send::<E, S>))
        .route("/receive/:user_id", get(receive::<E, S>))
        .route("/health", get(health::<E, S>))
        .fallback(unknown_route)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(map_response(json_error_body))
        .layer(TraceLayer::new_for_http())
        .with_state(relay)
}

async fn register<E, S>(
    State(relay): State<RelayService<E, S>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError>
where
    E: Environment,
    S: MailboxStore,
{
    let Json(body) = body?;
    let public_key = decode_b64("public_key_b64", &body.public_key_b64)?;

    relay.register(&body.user_id, public_key)?;

    Ok(Json(RegisterResponse { status: "ok".to_string(), user_id: body.user_id }))
}

async fn public_key<E, S>(
    State(relay): State<RelayService<E, S>>,
    user_id: Result<Path<String>, PathRejection>,
) -> Result<Json<PublicKeyResponse>, ApiError>
where
    E: Environment,
    S: MailboxStore,
{
    let Path(user_id) = user_id?;
    let credential = relay.lookup(&user_id)?;

    Ok(Json(PublicKeyResponse { user_id, public_key_b64: BASE64.encode(&credential) }))
}

async fn send<E, S>(
    State(relay): State<RelayService<E, S>>,
    body: Result<Json<SendRequestBody>, JsonRejection>,
) -> Result<Json<SendResponse>, ApiError>
where
    E: Environment,
    S: MailboxStore,
{
    let Json(body) = body?;
    let ciphertext = decode_b64("ciphertext_b64", &body.ciphertext_b64)?;
    let ttl_seconds = body.ttl()?;

    let receipt = relay.send(SendRequest {
        sender: body.sender,
        recipient: body.recipient,
        ciphertext,
        ttl_seconds,
    })?;

    Ok(Json(SendResponse { status: receipt.status.as_str().to_string(), id: receipt.id.to_string() }))
}

async fn receive<E, S>(
    State(relay): State<RelayService<E, S>>,
    user_id: Result<Path<String>, PathRejection>,
) -> Result<Json<ReceiveResponse>, ApiError>
where
    E: Environment,
    S: MailboxStore,
{
    let Path(user_id) = user_id?;
    let envelopes = relay.receive(&user_id)?;

    Ok(Json(ReceiveResponse { messages: envelopes.into_iter().map(MessageBody::from).collect() }))
}

async fn health<E, S>(State(relay): State<RelayService<E, S>>) -> Result<Json<HealthResponse>, ApiError>
where
    E: Environment,
    S: MailboxStore,
{
    let pending = relay.pending_count()?;

    Ok(Json(HealthResponse { status: "ok".to_string(), pending }))
}

async fn unknown_route() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Not Found")
}

/// Give bodiless or plain-text error responses a JSON `detail`.
///
/// Responses that are already JSON pass through untouched. An `Allow` header
/// on a 405 is kept.
async fn json_error_body(response: Response) -> Response {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .is_some_and(|value| value.as_bytes().starts_with(b"application/json"));
    if is_json || !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let detail = status.canonical_reason().unwrap_or("Error");
    let mut rendered = ApiError::new(status, detail).into_response();
    if let Some(allow) = response.headers().get(ALLOW) {
        rendered.headers_mut().insert(ALLOW, allow.clone());
    }
    rendered
}
