//! End-to-end tests using a Docker PostgreSQL container.
//!
//! Test modules:
//! - `isolation` - binding, cleanup and connection reuse under RLS
//! - `introspection` - catalog reads and the compliance audit
//!
//! Run with:
//!   cargo test -p rowguard-adapter-pg --test e2e -- --nocapture --test-threads=1
//!
//! Requirements:
//!   - Docker must be running
//!   - Port 5433 must be available (uses non-standard port to avoid conflicts)

#[path = "e2e/common/mod.rs"]
mod common;

#[path = "e2e/introspection.rs"]
mod introspection;

#[path = "e2e/isolation.rs"]
mod isolation;

use common::TestContext;

#[tokio::test]
async fn e2e_all_tests() {
    println!("\n🚀 Starting Rowguard Postgres End-to-End Tests\n");

    let ctx = match TestContext::setup().await {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("❌ Failed to setup test context: {}", e);
            eprintln!("   Make sure Docker is running and port 5433 is available");
            return;
        }
    };

    isolation::run_all_tests(&ctx).await;
    introspection::run_all_tests(&ctx).await;

    println!("\n🎉 All E2E test modules passed!\n");
}
