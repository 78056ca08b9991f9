use uuid::Uuid;

use thiserror::Error;

/// Errors from conversation store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("conversation not found: {0}")]
    NotFound(Uuid),
}

/// Errors from event logging. Callers treat these as log-only.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("query error: {0}")]
    Query(String),

    #[error("conversation not found: {0}")]
    NotFound(Uuid),
}

/// Errors from budget tracking.
#[derive(Debug, Error)]
pub enum BudgetError {
    #[error("tokens must be non-negative, got {0}")]
    NegativeTokens(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let id = Uuid::now_v7();
        let err = StoreError::NotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
        assert_eq!(
            StoreError::Query("syntax error".to_string()).to_string(),
            "query error: syntax error"
        );
    }

    #[test]
    fn test_budget_error_display() {
        let err = BudgetError::NegativeTokens(-5);
        assert!(err.to_string().contains("-5"));
    }
}
