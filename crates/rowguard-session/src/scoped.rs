//! Run one unit of work under a principal's security context.

use std::time::Duration;

use futures::future::BoxFuture;
use rowguard_core::Principal;

use crate::binder::ContextBinder;
use crate::connection::ConnectionSource;
use crate::error::SessionError;
use crate::guard::ContextGuard;

enum Outcome<T, E> {
    Finished(Result<T, E>),
    TimedOut(Duration),
}

/// Acquire, bind, run `work`, then clear on every exit path.
///
/// Success clears with the normal release; an error from `work` aborts the
/// unit of work and clears; exceeding `timeout` discards the connection. A
/// panic inside `work` drops the guard while bound, which also discards.
pub async fn run_scoped<S, T, E, F>(
    source: &S,
    binder: &ContextBinder,
    principal: &Principal,
    timeout: Option<Duration>,
    work: F,
) -> Result<T, E>
where
    S: ConnectionSource + ?Sized,
    E: From<SessionError>,
    F: for<'c> FnOnce(&'c mut S::Connection) -> BoxFuture<'c, Result<T, E>>,
{
    let mut guard = ContextGuard::acquire(source, binder, principal).await?;

    let outcome = {
        let fut = work(guard.connection());
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => Outcome::Finished(result),
                Err(_) => Outcome::TimedOut(limit),
            },
            None => Outcome::Finished(fut.await),
        }
    };

    match outcome {
        Outcome::Finished(Ok(value)) => {
            guard.release().await?;
            Ok(value)
        }
        Outcome::Finished(Err(e)) => {
            if let Err(clear_err) = guard.abort().await {
                tracing::warn!(error = %clear_err, "Failed to clear context after request error");
            }
            Err(e)
        }
        Outcome::TimedOut(limit) => {
            tracing::warn!(
                principal = %principal.id,
                timeout_ms = limit.as_millis() as u64,
                "Request timed out, discarding connection"
            );
            guard.discard();
            Err(SessionError::Timeout(limit).into())
        }
    }
}
