//! In-memory connection pool for exercising the lifecycle without a database.
//!
//! Physical connections keep their session settings across checkouts the way
//! a real pool does, so a binding that is never cleared shows up on the next
//! checkout. Rows carry an owner and are filtered by the security variable to
//! mimic a row-filtering policy.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rowguard_core::{DEFAULT_SECURITY_VARIABLE, Principal, Role};

use crate::connection::{
    ConnectionError, ConnectionId, ConnectionSource, ContextConnection, ContextStatement,
};

/// Build a member principal with the given id.
pub fn principal(id: &str) -> Principal {
    let now = chrono::Utc::now();
    Principal {
        id: id.to_string(),
        role: Role::Member,
        email: format!("{id}@example.com"),
        issued_at: now,
        expires_at: now + chrono::Duration::hours(1),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Physical connections ever opened.
    pub opened: usize,
    /// Physical connections closed instead of returned.
    pub discarded: usize,
    /// Connections currently idle in the pool.
    pub idle: usize,
    /// Idle connections that still carry a security variable value.
    pub bound_in_pool: usize,
}

#[derive(Debug, Default)]
struct Physical {
    id: u64,
    session: HashMap<String, String>,
    local: HashMap<String, String>,
    in_transaction: bool,
    transaction_failed: bool,
    snapshot: HashMap<String, String>,
}

impl Physical {
    fn setting(&self, name: &str) -> Option<String> {
        self.local
            .get(name)
            .or_else(|| self.session.get(name))
            .filter(|v| !v.is_empty())
            .cloned()
    }

    fn end_transaction(&mut self, commit: bool) {
        if self.in_transaction && (!commit || self.transaction_failed) {
            self.session = std::mem::take(&mut self.snapshot);
        }
        self.local.clear();
        self.snapshot.clear();
        self.in_transaction = false;
        self.transaction_failed = false;
    }
}

#[derive(Debug)]
struct PoolState {
    max: usize,
    variable: String,
    next_id: u64,
    checked_out: usize,
    idle: Vec<Physical>,
    opened: usize,
    discarded: usize,
    failures: Vec<String>,
    rows: Vec<(String, String)>,
}

impl PoolState {
    fn take_failure(&mut self, kind: &str) -> bool {
        match self.failures.iter().position(|f| f == kind) {
            Some(pos) => {
                self.failures.remove(pos);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryPool {
    state: Arc<Mutex<PoolState>>,
}

impl MemoryPool {
    pub fn new(max: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(PoolState {
                max,
                variable: DEFAULT_SECURITY_VARIABLE.to_string(),
                next_id: 1,
                checked_out: 0,
                idle: Vec::new(),
                opened: 0,
                discarded: 0,
                failures: Vec::new(),
                rows: Vec::new(),
            })),
        }
    }

    /// Add a row visible only when the security variable equals `owner`.
    pub fn insert_row(&self, owner: &str, payload: &str) {
        self.lock()
            .rows
            .push((owner.to_string(), payload.to_string()));
    }

    /// Make the next statement of `kind` fail (`BEGIN`, `SET_CONFIG`, `RESET`,
    /// `COMMIT`, `ROLLBACK` or `QUERY`).
    pub fn fail_next(&self, kind: &str) {
        self.lock().failures.push(kind.to_string());
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            opened: state.opened,
            discarded: state.discarded,
            idle: state.idle.len(),
            bound_in_pool: state
                .idle
                .iter()
                .filter(|p| p.setting(&state.variable).is_some())
                .count(),
        }
    }

    /// The security variable as seen on an idle physical connection.
    pub fn idle_setting(&self, physical_id: u64, name: &str) -> Option<String> {
        self.lock()
            .idle
            .iter()
            .find(|p| p.id == physical_id)
            .and_then(|p| p.setting(name))
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<PoolState>) -> MutexGuard<'_, PoolState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ConnectionSource for MemoryPool {
    type Connection = MemoryConnection;

    async fn acquire(&self) -> Result<MemoryConnection, ConnectionError> {
        let mut state = self.lock();
        if state.checked_out >= state.max {
            return Err(ConnectionError::Acquire("pool exhausted".to_string()));
        }
        // LIFO: the most recently returned connection is handed out first.
        let physical = match state.idle.pop() {
            Some(p) => p,
            None => {
                let id = state.next_id;
                state.next_id += 1;
                state.opened += 1;
                Physical {
                    id,
                    ..Default::default()
                }
            }
        };
        state.checked_out += 1;

        Ok(MemoryConnection {
            id: ConnectionId::new(),
            physical: Some(physical),
            log: Vec::new(),
            pool: Arc::clone(&self.state),
        })
    }
}

#[derive(Debug)]
pub struct MemoryConnection {
    id: ConnectionId,
    physical: Option<Physical>,
    log: Vec<&'static str>,
    pool: Arc<Mutex<PoolState>>,
}

impl MemoryConnection {
    pub fn physical_id(&self) -> u64 {
        self.physical.as_ref().map(|p| p.id).unwrap_or_default()
    }

    /// Statements executed during this checkout, by kind.
    pub fn statement_log(&self) -> Vec<&'static str> {
        self.log.clone()
    }

    pub fn statement_count(&self) -> usize {
        self.log.len()
    }

    /// `current_setting(name, true)`, with empty treated as unset.
    pub fn visible_setting(&self, name: &str) -> Option<String> {
        self.physical.as_ref().and_then(|p| p.setting(name))
    }

    /// Rows the current security context may see.
    pub fn visible_rows(&self) -> Vec<String> {
        let state = lock(&self.pool);
        let Some(current) = self.visible_setting(&state.variable) else {
            return Vec::new();
        };
        state
            .rows
            .iter()
            .filter(|(owner, _)| *owner == current)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// A domain query. A failure inside a transaction aborts it.
    pub async fn query_owned_rows(&mut self) -> Result<Vec<String>, ConnectionError> {
        let failed = lock(&self.pool).take_failure("QUERY");
        let physical = self.physical.as_mut().ok_or(ConnectionError::Closed)?;
        if failed || physical.transaction_failed {
            if physical.in_transaction {
                physical.transaction_failed = true;
            }
            return Err(ConnectionError::Statement {
                statement: "QUERY",
                message: "injected failure".to_string(),
            });
        }
        Ok(self.visible_rows())
    }
}

#[async_trait]
impl ContextConnection for MemoryConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn execute(&mut self, statement: ContextStatement<'_>) -> Result<(), ConnectionError> {
        let kind = statement.kind();
        let failed = lock(&self.pool).take_failure(kind);
        let physical = self.physical.as_mut().ok_or(ConnectionError::Closed)?;
        self.log.push(kind);

        let aborted = physical.transaction_failed
            && !matches!(statement, ContextStatement::Rollback | ContextStatement::Commit);
        if failed || aborted {
            if physical.in_transaction {
                physical.transaction_failed = true;
            }
            return Err(ConnectionError::Statement {
                statement: kind,
                message: "injected failure".to_string(),
            });
        }

        match statement {
            ContextStatement::Begin => {
                if !physical.in_transaction {
                    physical.in_transaction = true;
                    physical.snapshot = physical.session.clone();
                }
            }
            ContextStatement::SetConfig {
                name,
                value,
                is_local,
            } => {
                if is_local {
                    // Outside a transaction a local setting has no effect.
                    if physical.in_transaction {
                        physical.local.insert(name.to_string(), value.to_string());
                    }
                } else {
                    physical.local.remove(name);
                    physical.session.insert(name.to_string(), value.to_string());
                }
            }
            ContextStatement::Reset { name } => {
                physical.local.remove(name);
                physical.session.remove(name);
            }
            ContextStatement::Commit => physical.end_transaction(true),
            ContextStatement::Rollback => physical.end_transaction(false),
        }
        Ok(())
    }

    fn discard(&mut self) {
        if self.physical.take().is_some() {
            let mut state = lock(&self.pool);
            state.discarded += 1;
            state.checked_out = state.checked_out.saturating_sub(1);
        }
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        if let Some(physical) = self.physical.take() {
            let mut state = lock(&self.pool);
            state.checked_out = state.checked_out.saturating_sub(1);
            state.idle.push(physical);
        }
    }
}
