//! Governance token balances

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extract::value_as_u64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub total: u64,
    pub locked_ordinary: u64,
    pub locked_tdpos: u64,
}

impl TokenBalance {
    /// Decode a `governToken query` response.
    ///
    /// `total_balance` is required; locked amounts default to zero.
    pub fn from_response(response: &Value) -> Option<Self> {
        let total = value_as_u64(response.get("total_balance")?)?;
        let locked = response.get("locked_balances");
        let locked_amount = |name: &str| {
            locked
                .and_then(|l| l.get(name))
                .and_then(value_as_u64)
                .unwrap_or(0)
        };

        Some(Self {
            total,
            locked_ordinary: locked_amount("ordinary"),
            locked_tdpos: locked_amount("tdpos"),
        })
    }

    pub fn locked(&self) -> u64 {
        self.locked_ordinary.saturating_add(self.locked_tdpos)
    }

    /// Tokens free for voting; zero when locked exceeds total.
    pub fn available(&self) -> u64 {
        self.total.saturating_sub(self.locked())
    }
}
