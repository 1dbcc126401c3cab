//! `rowguard probe` - check that a released connection carries no identity.
//!
//! Uses a single-connection pool so the second checkout is guaranteed to
//! reuse the physical connection the principal was bound on.

use chrono::{Duration, Utc};
use rowguard_adapter_pg::{PgContextPool, backend_pid, current_setting};
use rowguard_core::{Principal, Role, RowguardConfig};
use rowguard_session::{ContextBinder, ContextGuard};
use sqlx::postgres::PgPoolOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProbeOutcome {
    pub bound: Option<String>,
    pub bound_pid: i32,
    pub after: Option<String>,
    pub after_pid: i32,
}

impl ProbeOutcome {
    pub fn leaked(&self) -> bool {
        self.after.is_some()
    }

    pub fn reused(&self) -> bool {
        self.bound_pid == self.after_pid
    }
}

fn probe_principal(id: &str) -> Principal {
    let now = Utc::now();
    Principal {
        id: id.to_string(),
        role: Role::Member,
        email: String::new(),
        issued_at: now,
        expires_at: now + Duration::minutes(5),
    }
}

pub async fn run(config: &RowguardConfig, principal_id: &str) -> anyhow::Result<()> {
    let variable = config.session.variable.as_str();
    let binder = ContextBinder::from_config(&config.session)?;
    let principal = probe_principal(principal_id);

    let pool = PgContextPool::connect_with(
        PgPoolOptions::new().max_connections(1),
        &config.upstream.connection_string(),
        variable,
    )
    .await?;

    let mut guard = ContextGuard::acquire(&pool, &binder, &principal).await?;
    let conn = guard.connection().pg()?;
    let bound = current_setting(conn, variable).await?;
    let bound_pid = backend_pid(conn).await?;
    guard.release().await?;

    let mut conn = pool.pool().acquire().await?;
    let after = current_setting(&mut conn, variable).await?;
    let after_pid = backend_pid(&mut conn).await?;
    drop(conn);

    let outcome = ProbeOutcome {
        bound,
        bound_pid,
        after,
        after_pid,
    };
    print_outcome(config, &outcome);

    if outcome.leaked() {
        anyhow::bail!("security context leaked across checkout");
    }
    Ok(())
}

fn print_outcome(config: &RowguardConfig, outcome: &ProbeOutcome) {
    println!("🔍 Probing {} ({} scope)", config.session.variable, config.session.scope);
    println!(
        "  While bound:   pid {} sees {}",
        outcome.bound_pid,
        outcome.bound.as_deref().unwrap_or("<unset>")
    );
    println!(
        "  After release: pid {} sees {}",
        outcome.after_pid,
        outcome.after.as_deref().unwrap_or("<unset>")
    );
    println!();

    if outcome.leaked() {
        println!("❌ Identity survived release");
    } else if outcome.reused() {
        println!("✔ Same physical connection came back clean");
    } else {
        println!("✔ Clean, but the connection was replaced (it was discarded on release)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_principal_is_valid_for_binding() {
        let principal = probe_principal("alice");
        let binder = ContextBinder::from_config(&Default::default()).unwrap();
        assert!(binder.check_principal(&principal).is_ok());
        assert!(!principal.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_outcome_flags() {
        let clean = ProbeOutcome {
            bound: Some("alice".into()),
            bound_pid: 41,
            after: None,
            after_pid: 41,
        };
        assert!(!clean.leaked());
        assert!(clean.reused());

        let leaked = ProbeOutcome {
            after: Some("alice".into()),
            ..clean.clone()
        };
        assert!(leaked.leaked());

        let replaced = ProbeOutcome {
            after_pid: 42,
            ..clean
        };
        assert!(!replaced.reused());
    }
}
