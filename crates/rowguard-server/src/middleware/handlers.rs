use std::sync::Arc;

use axum::{Extension, Json, extract::State};
use rowguard_core::Principal;
use rowguard_session::{ConnectionSource, run_scoped};
use serde_json::json;

use crate::error::ApiError;
use crate::state::{AppState, SecurityProbe};

pub async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "service": "rowguard-server" }))
}

/// Report the caller's identity and the id the database sees for it.
pub async fn whoami<S>(
    State(state): State<Arc<AppState<S>>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<serde_json::Value>, ApiError>
where
    S: ConnectionSource + 'static,
    S::Connection: SecurityProbe,
{
    let variable = state.binder.variable().to_string();

    let bound = run_scoped(
        &state.source,
        &state.binder,
        &principal,
        state.request_timeout,
        move |conn: &mut S::Connection| {
            Box::pin(async move {
                conn.bound_principal(&variable)
                    .await
                    .map_err(ApiError::Query)
            })
        },
    )
    .await?;

    Ok(Json(json!({
        "id": principal.id,
        "email": principal.email,
        "role": principal.role,
        "expires_at": principal.expires_at,
        "database_principal": bound,
    })))
}
