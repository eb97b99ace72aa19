use crate::domain::ports::{Scope, UnitOfWork};
use crate::error::Result;
use futures::future::{BoxFuture, FutureExt};
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, warn};

/// Runs `body` inside a fresh atomic scope.
///
/// The scope is committed when `body` returns `Ok`. When it returns `Err`
/// the scope is rolled back and the body's own error is returned, annotated
/// with `operation` if it is an internal fault. A panic inside `body` rolls
/// back before the panic continues to unwind. If the returned future is
/// dropped before completion the scope is dropped with it, which discards
/// every staged write and releases its row locks.
pub async fn run<T, F>(unit_of_work: &dyn UnitOfWork, operation: &'static str, body: F) -> Result<T>
where
    T: Send,
    F: for<'a> FnOnce(&'a mut dyn Scope) -> BoxFuture<'a, Result<T>> + Send,
{
    let mut scope = unit_of_work
        .begin()
        .await
        .map_err(|e| e.with_scope(operation))?;
    debug!(operation, "unit of work opened");

    let outcome = AssertUnwindSafe(body(scope.as_mut())).catch_unwind().await;

    match outcome {
        Ok(Ok(value)) => {
            scope.commit().await.map_err(|e| e.with_scope(operation))?;
            debug!(operation, "unit of work committed");
            Ok(value)
        }
        Ok(Err(err)) => {
            warn!(operation, error = %err, "unit of work rolled back");
            if let Err(rollback_err) = scope.rollback().await {
                error!(operation, error = %rollback_err, "rollback failed");
            }
            Err(err.with_scope(operation))
        }
        Err(panic) => {
            error!(operation, "unit of work body panicked, rolling back");
            if let Err(rollback_err) = scope.rollback().await {
                error!(operation, error = %rollback_err, "rollback failed");
            }
            std::panic::resume_unwind(panic)
        }
    }
}
