//! Shared test infrastructure for Rowguard Postgres end-to-end tests.
//!
//! This module provides:
//! - Docker container management for PostgreSQL
//! - Schema and seed loading
//! - Principal and pool helpers

use std::process::Command;
use std::time::Duration;

use chrono::Utc;
use rowguard_adapter_pg::{PgCatalogIntrospector, PgContextPool};
use rowguard_core::{BindScope, DEFAULT_SECURITY_VARIABLE, Principal, Role};
use rowguard_session::ContextBinder;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

// =============================================================================
// DOCKER CONTAINER CONFIGURATION
// =============================================================================

pub const CONTAINER_NAME: &str = "rowguard_test_postgres";
pub const POSTGRES_PORT: u16 = 5433;
pub const POSTGRES_PASSWORD: &str = "rowguard_test_password";
pub const DATABASE_NAME: &str = "rowguard_test";
pub const APP_USER: &str = "app_user";
pub const APP_PASSWORD: &str = "app_user_password";

pub fn admin_url() -> String {
    format!(
        "postgres://postgres:{}@localhost:{}/{}",
        POSTGRES_PASSWORD, POSTGRES_PORT, DATABASE_NAME
    )
}

pub fn app_url() -> String {
    format!(
        "postgres://{}:{}@localhost:{}/{}",
        APP_USER, APP_PASSWORD, POSTGRES_PORT, DATABASE_NAME
    )
}

// =============================================================================
// DOCKER CONTAINER MANAGEMENT
// =============================================================================

pub fn start_postgres_container() -> Result<(), String> {
    let output = Command::new("docker")
        .args(["ps", "-a", "-q", "-f", &format!("name={}", CONTAINER_NAME)])
        .output()
        .map_err(|e| format!("Failed to check existing container: {}", e))?;

    if !String::from_utf8_lossy(&output.stdout).trim().is_empty() {
        let _ = Command::new("docker")
            .args(["rm", "-f", CONTAINER_NAME])
            .output();
    }

    let status = Command::new("docker")
        .args([
            "run",
            "-d",
            "--name",
            CONTAINER_NAME,
            "-e",
            &format!("POSTGRES_PASSWORD={}", POSTGRES_PASSWORD),
            "-e",
            &format!("POSTGRES_DB={}", DATABASE_NAME),
            "-p",
            &format!("{}:5432", POSTGRES_PORT),
            "postgres:16-alpine",
        ])
        .status()
        .map_err(|e| format!("Failed to start container: {}", e))?;

    if !status.success() {
        return Err("Failed to start PostgreSQL container".to_string());
    }
    Ok(())
}

pub fn stop_postgres_container() {
    let _ = Command::new("docker")
        .args(["rm", "-f", CONTAINER_NAME])
        .output();
}

pub async fn wait_for_postgres() -> Result<PgPool, String> {
    for attempt in 1..=30 {
        if let Ok(pool) = PgPool::connect(&admin_url()).await
            && sqlx::query("SELECT 1").fetch_one(&pool).await.is_ok()
        {
            println!("✅ PostgreSQL ready after {} attempts", attempt);
            return Ok(pool);
        }
        if attempt % 5 == 0 {
            println!("⏳ Waiting for PostgreSQL... (attempt {})", attempt);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    Err("PostgreSQL did not become ready in time".to_string())
}

// =============================================================================
// DATABASE INITIALIZATION
// =============================================================================

const SCHEMA_SQL: &str = include_str!("../fixtures/schema.sql");

pub async fn initialize_database(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    println!("✅ Database initialized with schema and seed data");
    Ok(())
}

// =============================================================================
// TEST CONTEXT
// =============================================================================

pub struct TestContext {
    pub admin: PgPool,
}

impl TestContext {
    pub async fn setup() -> Result<Self, String> {
        start_postgres_container()?;
        let admin = wait_for_postgres().await?;
        initialize_database(&admin)
            .await
            .map_err(|e| format!("Failed to initialize database: {}", e))?;
        Ok(Self { admin })
    }

    /// A single-connection context pool as the application role, so every
    /// checkout reuses the same physical connection unless it was discarded.
    pub async fn single_connection_pool(&self) -> PgContextPool {
        PgContextPool::connect_with(
            PgPoolOptions::new().max_connections(1),
            &app_url(),
            DEFAULT_SECURITY_VARIABLE,
        )
        .await
        .expect("app pool connects")
    }

    pub async fn app_pool(&self, max: u32) -> PgContextPool {
        PgContextPool::connect_with(
            PgPoolOptions::new().max_connections(max),
            &app_url(),
            DEFAULT_SECURITY_VARIABLE,
        )
        .await
        .expect("app pool connects")
    }

    pub fn admin_introspector(&self) -> PgCatalogIntrospector {
        PgCatalogIntrospector::new(self.admin.clone())
    }

    pub async fn app_introspector(&self) -> PgCatalogIntrospector {
        let pool = PgPool::connect(&app_url()).await.expect("app pool connects");
        PgCatalogIntrospector::new(pool)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        stop_postgres_container();
        println!("🧹 Cleaned up PostgreSQL container");
    }
}

// =============================================================================
// HELPERS
// =============================================================================

pub fn principal(id: &str) -> Principal {
    let now = Utc::now();
    Principal {
        id: id.to_string(),
        role: Role::Member,
        email: format!("{}@example.com", id),
        issued_at: now,
        expires_at: now + chrono::Duration::hours(1),
    }
}

pub fn binder(scope: BindScope) -> ContextBinder {
    ContextBinder::new(DEFAULT_SECURITY_VARIABLE, scope).expect("default variable is valid")
}

pub const SCOPES: [BindScope; 2] = [BindScope::Transaction, BindScope::Session];
