//! Token budget tracking per (tenant, user).
//!
//! The tracker is independently correct and testable but is not consulted
//! on the engine's request path; it is a surface for an external
//! billing/admission layer. Usage accumulates monotonically -- there is no
//! decrement or reset.

use std::collections::HashMap;
use std::sync::Mutex;

use mentora_types::error::BudgetError;

/// Checks and records token usage against per-(tenant, user) budgets.
pub trait BudgetTracker: Send + Sync {
    /// True if the tenant/user has budget remaining. A key with no
    /// configured budget is unlimited.
    fn check(&self, tenant_id: &str, user_id: &str) -> bool;

    /// Record token usage. Negative values are a caller error and leave
    /// usage untouched.
    fn record(&self, tenant_id: &str, user_id: &str, tokens: i64) -> Result<(), BudgetError>;

    /// Current usage and configured budget (None = unlimited).
    fn usage(&self, tenant_id: &str, user_id: &str) -> (i64, Option<i64>);
}

#[derive(Default)]
struct BudgetState {
    /// key -> budget limit
    budgets: HashMap<String, i64>,
    /// key -> tokens used
    usage: HashMap<String, i64>,
}

/// In-memory budget tracker for development and tests.
///
/// Production deployments would back this with a shared store synced to
/// the billing database; the trait boundary keeps that swappable.
#[derive(Default)]
pub struct InMemoryBudget {
    state: Mutex<BudgetState>,
}

impl InMemoryBudget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the token budget for a tenant/user.
    pub fn set_budget(&self, tenant_id: &str, user_id: &str, tokens: i64) {
        let mut state = self.state.lock().expect("budget lock poisoned");
        state.budgets.insert(budget_key(tenant_id, user_id), tokens);
    }
}

impl BudgetTracker for InMemoryBudget {
    fn check(&self, tenant_id: &str, user_id: &str) -> bool {
        let state = self.state.lock().expect("budget lock poisoned");
        let key = budget_key(tenant_id, user_id);
        match state.budgets.get(&key) {
            // No budget set means unlimited.
            None => true,
            Some(budget) => state.usage.get(&key).copied().unwrap_or(0) < *budget,
        }
    }

    fn record(&self, tenant_id: &str, user_id: &str, tokens: i64) -> Result<(), BudgetError> {
        if tokens < 0 {
            return Err(BudgetError::NegativeTokens(tokens));
        }

        let mut state = self.state.lock().expect("budget lock poisoned");
        *state.usage.entry(budget_key(tenant_id, user_id)).or_insert(0) += tokens;
        Ok(())
    }

    fn usage(&self, tenant_id: &str, user_id: &str) -> (i64, Option<i64>) {
        let state = self.state.lock().expect("budget lock poisoned");
        let key = budget_key(tenant_id, user_id);
        (
            state.usage.get(&key).copied().unwrap_or(0),
            state.budgets.get(&key).copied(),
        )
    }
}

fn budget_key(tenant_id: &str, user_id: &str) -> String {
    format!("{tenant_id}:{user_id}")
}
