// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The cost oracle: consulted after every model message completion to
//! decide whether a spend limit has been crossed.

use parking_lot::Mutex;

/// Reports cumulative spend in dollars, scoped to a project and to a
/// single run within that project.
pub trait CostOracle: Send + Sync {
    fn project_cost(&self) -> f64;
    fn run_cost(&self) -> f64;
}

/// A cost oracle whose readings are set directly, for tests that need to
/// arrange a spend-abort scenario without wiring real token pricing.
#[derive(Default)]
pub struct FakeCostOracle {
    project_cost: Mutex<f64>,
    run_cost: Mutex<f64>,
}

impl FakeCostOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_project_cost(&self, cost: f64) {
        *self.project_cost.lock() = cost;
    }

    pub fn set_run_cost(&self, cost: f64) {
        *self.run_cost.lock() = cost;
    }
}

impl CostOracle for FakeCostOracle {
    fn project_cost(&self) -> f64 {
        *self.project_cost.lock()
    }

    fn run_cost(&self) -> f64 {
        *self.run_cost.lock()
    }
}

/// A cost oracle with a fixed per-1k-token price, accumulating cost from
/// token counters as messages are observed. `project_cost` is the running
/// total across every run of the project; `run_cost` resets with each new
/// oracle instance (callers construct one per run).
pub struct TokenCostOracle {
    input_price_per_1k: f64,
    output_price_per_1k: f64,
    project_total: Mutex<f64>,
    run_total: Mutex<f64>,
}

impl TokenCostOracle {
    pub fn new(input_price_per_1k: f64, output_price_per_1k: f64) -> Self {
        Self {
            input_price_per_1k,
            output_price_per_1k,
            project_total: Mutex::new(0.0),
            run_total: Mutex::new(0.0),
        }
    }

    /// Fold one message's token usage into both running totals.
    pub fn record(&self, input_tokens: u64, output_tokens: u64) {
        let cost = (input_tokens as f64 / 1000.0) * self.input_price_per_1k
            + (output_tokens as f64 / 1000.0) * self.output_price_per_1k;
        *self.project_total.lock() += cost;
        *self.run_total.lock() += cost;
    }
}

impl CostOracle for TokenCostOracle {
    fn project_cost(&self) -> f64 {
        *self.project_total.lock()
    }

    fn run_cost(&self) -> f64 {
        *self.run_total.lock()
    }
}

#[cfg(test)]
#[path = "cost_tests.rs"]
mod tests;
