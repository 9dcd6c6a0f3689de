//! Ordered statement execution.
//!
//! Runs declared DDL statements strictly in order, stopping at the first
//! failure.

use tracing::{error, info};

use crate::cluster::QueryExecutor;
use crate::config::StatementSpec;
use crate::error::{ProvisionError, Result};

/// Executes the given statements in declaration order, failing fast.
///
/// The first failure is returned attributed to the statement's declared
/// name; later statements are not attempted. An empty list is a no-op.
/// Result rows are never inspected, only the error signal.
pub async fn run_statements(
    executor: &dyn QueryExecutor,
    statements: &[StatementSpec],
) -> Result<()> {
    for statement in statements {
        match executor.execute_statement(&statement.statement).await {
            Ok(()) => info!("Statement '{}' executed", statement.name),
            Err(e) => {
                error!("Statement '{}' failed: {}", statement.name, e);
                return Err(attribute_to_statement(&statement.name, e));
            }
        }
    }
    Ok(())
}

/// Wraps an execution failure with the statement's declared name. Bare
/// query errors are unwrapped first so their message is not nested twice.
fn attribute_to_statement(name: &str, error: ProvisionError) -> ProvisionError {
    match error {
        ProvisionError::Query(message) => ProvisionError::statement(name, message),
        other => ProvisionError::statement(name, other.to_string()),
    }
}
