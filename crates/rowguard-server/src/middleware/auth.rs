use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::error::unauthorized;
use crate::state::AppState;

/// Axum middleware that verifies the bearer credential.
///
/// On success the [`Principal`](rowguard_core::Principal) is inserted into
/// request extensions. Every failure kind gets the same 401 body; no
/// connection is touched before this passes.
pub async fn require_principal<S>(
    State(state): State<Arc<AppState<S>>>,
    mut req: Request,
    next: Next,
) -> Response
where
    S: Send + Sync + 'static,
{
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match state.decoder.decode_authorization(header) {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(e) => {
            tracing::info!(
                reason = %e,
                path = %req.uri().path(),
                "Authentication failed"
            );
            unauthorized()
        }
    }
}
