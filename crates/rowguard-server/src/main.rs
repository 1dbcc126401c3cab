mod config;
mod error;
mod middleware;
mod state;

use std::sync::Arc;

use axum::{Router, routing::get};
use clap::Parser;
use rowguard_adapter_pg::{PgCatalogIntrospector, PgContextPool};
use rowguard_compliance::{ComplianceAuditor, log_findings};
use rowguard_core::ComplianceConfig;
use rowguard_session::ConnectionSource;
use rowguard_token::SigningSecret;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::ServerArgs;
use crate::middleware::{auth, handlers};
use crate::state::{AppState, SecurityProbe};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    let config = args.load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    let secret = SigningSecret::from_config(&config.auth)?;
    let pool = PgContextPool::connect(&config.upstream, &config.session.variable).await?;
    tracing::info!(
        upstream = %config.upstream.display_target(),
        variable = %config.session.variable,
        scope = %config.session.scope,
        "Connected to upstream database"
    );

    if config.compliance.check_on_startup {
        let introspector = PgCatalogIntrospector::new(pool.pool().clone());
        tokio::spawn(startup_audit(introspector, config.compliance.clone()));
    }

    let state = Arc::new(AppState::new(&config, &secret, pool)?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("rowguard-server listening on {}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router<S>(state: Arc<AppState<S>>) -> Router
where
    S: ConnectionSource + 'static,
    S::Connection: SecurityProbe,
{
    let protected = Router::new()
        .route("/v1/whoami", get(handlers::whoami::<S>))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_principal::<S>,
        ));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Audit RLS coverage in the background. Findings are logged, never fatal.
async fn startup_audit(introspector: PgCatalogIntrospector, config: ComplianceConfig) {
    let report = ComplianceAuditor::from_config(&introspector, &config)
        .run()
        .await;
    log_findings(&report);
    if let Err(e) = report.write_artifact(&config.report_path) {
        tracing::warn!(error = %e, "Failed to write compliance report");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header::AUTHORIZATION};
    use rowguard_core::{BindScope, DEFAULT_SECURITY_VARIABLE};
    use rowguard_session::ContextBinder;
    use rowguard_session::testing::MemoryPool;
    use rowguard_token::testing::{sign, test_claims, test_secret};
    use rowguard_token::{DecoderOptions, PrincipalDecoder};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app(pool: MemoryPool) -> Router {
        let state = AppState {
            decoder: PrincipalDecoder::new(&test_secret(), DecoderOptions::default()),
            binder: ContextBinder::new(DEFAULT_SECURITY_VARIABLE, BindScope::Transaction)
                .unwrap(),
            source: pool,
            request_timeout: None,
        };
        router(Arc::new(state))
    }

    fn whoami(authorization: Option<String>) -> Request<Body> {
        let mut builder = Request::builder().uri("/v1/whoami");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn assert_unauthorized(response: axum::response::Response) {
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "unauthorized" })
        );
    }

    #[tokio::test]
    async fn test_healthz_needs_no_credential() {
        let response = app(MemoryPool::new(1))
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["ok"], true);
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let pool = MemoryPool::new(1);
        let response = app(pool.clone()).oneshot(whoami(None)).await.unwrap();
        assert_unauthorized(response).await;
        assert_eq!(pool.stats().opened, 0);
    }

    #[tokio::test]
    async fn test_rejected_credentials_share_one_body() {
        let pool = MemoryPool::new(1);
        let expired = sign(&test_claims("alice", -600), &test_secret());
        let forged = {
            let other = rowguard_token::SigningSecret::new(
                "a-completely-different-secret-of-enough-length",
            )
            .unwrap();
            sign(&test_claims("alice", 600), &other)
        };

        for header in [
            format!("Bearer {}", expired),
            format!("Bearer {}", forged),
            "Bearer not.a.jwt".to_string(),
            "Basic YWxpY2U6cHc=".to_string(),
        ] {
            let response = app(pool.clone()).oneshot(whoami(Some(header))).await.unwrap();
            assert_unauthorized(response).await;
        }
        assert_eq!(pool.stats().opened, 0);
    }

    #[tokio::test]
    async fn test_whoami_reports_bound_principal() {
        let pool = MemoryPool::new(1);
        let token = sign(&test_claims("alice", 600), &test_secret());

        let response = app(pool.clone())
            .oneshot(whoami(Some(format!("Bearer {}", token))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], "alice");
        assert_eq!(body["database_principal"], "alice");
        assert_eq!(body["role"], "member");

        let stats = pool.stats();
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.bound_in_pool, 0);
    }

    #[tokio::test]
    async fn test_binding_failure_is_unauthorized() {
        let pool = MemoryPool::new(1);
        pool.fail_next("SET_CONFIG");
        let token = sign(&test_claims("alice", 600), &test_secret());

        let response = app(pool.clone())
            .oneshot(whoami(Some(format!("Bearer {}", token))))
            .await
            .unwrap();

        assert_unauthorized(response).await;
        assert_eq!(pool.stats().discarded, 1);
    }

    #[tokio::test]
    async fn test_sequential_principals_do_not_leak() {
        let pool = MemoryPool::new(1);
        for id in ["alice", "bob", "alice"] {
            let token = sign(&test_claims(id, 600), &test_secret());
            let response = app(pool.clone())
                .oneshot(whoami(Some(format!("Bearer {}", token))))
                .await
                .unwrap();
            assert_eq!(body_json(response).await["database_principal"], id);
        }
        assert_eq!(pool.stats().opened, 1);
    }
}
