//! Tenant isolation and cleanup tests against a real Postgres.
//!
//! Covers:
//! - Rows visible to a principal are exactly its own
//! - Repeated binding yields the same rows
//! - A reused physical connection carries no residue
//! - Failed work, dropped guards and raw bindings never leak

use super::common::*;
use rowguard_adapter_pg::{PgContextConnection, PgContextPool, backend_pid, current_setting};
use rowguard_core::{BindScope, DEFAULT_SECURITY_VARIABLE};
use rowguard_session::{
    ConnectionSource, ContextBinder, ContextConnection, ContextGuard, ContextStatement,
    SessionError, run_scoped,
};

async fn post_owners(
    pool: &PgContextPool,
    binder: &ContextBinder,
    id: &str,
) -> anyhow::Result<Vec<String>> {
    run_scoped(pool, binder, &principal(id), None, |conn: &mut PgContextConnection| {
        Box::pin(async move {
            let owners: Vec<String> =
                sqlx::query_scalar("SELECT owner_id FROM community.posts ORDER BY id")
                    .fetch_all(conn.pg()?)
                    .await?;
            Ok(owners)
        })
    })
    .await
}

async fn checkout_state(pool: &PgContextPool) -> (i32, Option<String>) {
    let mut conn = pool.acquire().await.unwrap();
    let pg = conn.pg().unwrap();
    let pid = backend_pid(pg).await.unwrap();
    let value = current_setting(pg, DEFAULT_SECURITY_VARIABLE).await.unwrap();
    (pid, value)
}

pub async fn test_isolation_invariant(ctx: &TestContext) {
    println!("  🧪 test_isolation_invariant");

    for scope in SCOPES {
        let pool = ctx.app_pool(4).await;
        let binder = binder(scope);

        let results = futures::future::join_all(
            ["alice", "bob", "carol", "alice", "bob", "carol"]
                .into_iter()
                .map(|id| {
                    let pool = pool.clone();
                    let binder = binder.clone();
                    async move { (id, post_owners(&pool, &binder, id).await) }
                }),
        )
        .await;

        for (id, owners) in results {
            let owners = owners.unwrap();
            assert!(!owners.is_empty(), "{} should see its own posts", id);
            assert!(
                owners.iter().all(|o| o == id),
                "{} saw foreign rows: {:?}",
                id,
                owners
            );
        }
    }
    println!("     ✓ Every principal sees only its own rows");
}

pub async fn test_idempotence(ctx: &TestContext) {
    println!("  🧪 test_idempotence");

    let pool = ctx.single_connection_pool().await;
    let binder = binder(BindScope::Transaction);

    let first = post_owners(&pool, &binder, "alice").await.unwrap();
    let second = post_owners(&pool, &binder, "alice").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, vec!["alice", "alice"]);

    println!("     ✓ Rebinding the same principal is stable");
}

pub async fn test_no_leak_on_reuse(ctx: &TestContext) {
    println!("  🧪 test_no_leak_on_reuse");

    for scope in SCOPES {
        let pool = ctx.single_connection_pool().await;
        let binder = binder(scope);

        let (pid_before, _) = checkout_state(&pool).await;
        post_owners(&pool, &binder, "alice").await.unwrap();
        let bob = post_owners(&pool, &binder, "bob").await.unwrap();
        assert_eq!(bob, vec!["bob"]);

        let (pid_after, value) = checkout_state(&pool).await;
        assert_eq!(pid_before, pid_after, "scope {} should reuse the connection", scope);
        assert_eq!(value, None, "scope {} left a binding behind", scope);
    }
    println!("     ✓ Reused connections carry no previous context");
}

pub async fn test_hostile_id_bound_verbatim(ctx: &TestContext) {
    println!("  🧪 test_hostile_id_bound_verbatim");

    let pool = ctx.single_connection_pool().await;
    let binder = binder(BindScope::Transaction);
    let hostile = "x'; RESET ALL; SELECT '";

    let seen: anyhow::Result<Option<String>> = run_scoped(
        &pool,
        &binder,
        &principal(hostile),
        None,
        |conn: &mut PgContextConnection| {
            Box::pin(async move {
                Ok(current_setting(conn.pg()?, DEFAULT_SECURITY_VARIABLE).await?)
            })
        },
    )
    .await;
    assert_eq!(seen.unwrap().as_deref(), Some(hostile));

    println!("     ✓ Principal id is a bound parameter, never SQL text");
}

pub async fn test_failed_query_clears(ctx: &TestContext) {
    println!("  🧪 test_failed_query_clears");

    for scope in SCOPES {
        let pool = ctx.single_connection_pool().await;
        let binder = binder(scope);

        let result: anyhow::Result<()> = run_scoped(
            &pool,
            &binder,
            &principal("alice"),
            None,
            |conn: &mut PgContextConnection| {
                Box::pin(async move {
                    sqlx::query("SELECT * FROM community.does_not_exist")
                        .execute(conn.pg()?)
                        .await?;
                    Ok(())
                })
            },
        )
        .await;
        assert!(result.is_err());

        let (_, value) = checkout_state(&pool).await;
        assert_eq!(value, None, "scope {} left a binding after failure", scope);
    }
    println!("     ✓ Failed work is rolled back and cleared");
}

pub async fn test_dropped_guard_discards(ctx: &TestContext) {
    println!("  🧪 test_dropped_guard_discards");

    let pool = ctx.single_connection_pool().await;
    let binder = binder(BindScope::Session);
    let (pid_before, _) = checkout_state(&pool).await;

    {
        let guard = ContextGuard::acquire(&pool, &binder, &principal("alice"))
            .await
            .unwrap();
        assert_eq!(guard.context().unwrap().bound_value, "alice");
        // Dropped while bound.
    }

    let (pid_after, value) = checkout_state(&pool).await;
    assert_ne!(pid_before, pid_after, "bound connection must not be reused");
    assert_eq!(value, None);

    println!("     ✓ Guard dropped while bound closes its connection");
}

pub async fn test_uncleared_binding_caught_on_release(ctx: &TestContext) {
    println!("  🧪 test_uncleared_binding_caught_on_release");

    let pool = ctx.single_connection_pool().await;
    let (pid_before, _) = checkout_state(&pool).await;

    // Bypass the guard entirely.
    let mut conn = pool.acquire().await.unwrap();
    conn.execute(ContextStatement::SetConfig {
        name: DEFAULT_SECURITY_VARIABLE,
        value: "alice",
        is_local: false,
    })
    .await
    .unwrap();
    drop(conn);

    let (pid_after, value) = checkout_state(&pool).await;
    assert_ne!(pid_before, pid_after, "leaky connection must be closed on release");
    assert_eq!(value, None);

    println!("     ✓ Pool closes connections returned with a binding");
}

pub async fn test_invalid_principal_rejected(ctx: &TestContext) {
    println!("  🧪 test_invalid_principal_rejected");

    let pool = ctx.single_connection_pool().await;
    let result = post_owners(&pool, &binder(BindScope::Transaction), "").await;
    let err = result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SessionError>(),
        Some(SessionError::InvalidPrincipal(_))
    ));

    println!("     ✓ Empty principal never reaches the database");
}

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n📦 Isolation tests");
    test_isolation_invariant(ctx).await;
    test_idempotence(ctx).await;
    test_no_leak_on_reuse(ctx).await;
    test_hostile_id_bound_verbatim(ctx).await;
    test_failed_query_clears(ctx).await;
    test_dropped_guard_discards(ctx).await;
    test_uncleared_binding_caught_on_release(ctx).await;
    test_invalid_principal_rejected(ctx).await;
}
