//! # rowguard-session
//!
//! Binds an authenticated principal into a database connection's security
//! context and guarantees the binding never outlives the request.
//!
//! ## Lifecycle
//!
//! ```text
//!            bind ok                release ok
//! UNBOUND ───────────► BOUND ─────────────────► CLEARED  (connection back to pool)
//!    │                   │
//!    │ bind failed       │ clear failed / dropped / timed out / discard()
//!    └───────────────────┴────────────────────► CONNECTION_DISCARDED  (physically closed)
//! ```
//!
//! The security variable is a property of the physical connection, not of a
//! logical session. Binding and clearing are therefore paired with checkout
//! and checkin of one connection, and a guard dropped while `BOUND` closes its
//! connection instead of returning it.
//!
//! ## Example
//!
//! ```ignore
//! let binder = ContextBinder::from_config(&config.session)?;
//! let mut guard = ContextGuard::acquire(&pool, &binder, &principal).await?;
//! let rows = run_domain_query(guard.connection()).await;
//! match rows {
//!     Ok(rows) => { guard.release().await?; Ok(rows) }
//!     Err(e) => { guard.abort().await.ok(); Err(e) }
//! }
//! ```

pub mod binder;
pub mod connection;
pub mod error;
pub mod guard;
pub mod scoped;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use binder::{ContextBinder, MAX_PRINCIPAL_ID_BYTES, SessionContext};
pub use connection::{ConnectionError, ConnectionId, ConnectionSource, ContextConnection, ContextStatement};
pub use error::SessionError;
pub use guard::{ContextGuard, ContextState};
pub use scoped::run_scoped;
