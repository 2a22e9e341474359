// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_cost_oracle_reports_what_it_was_told() {
    let oracle = FakeCostOracle::new();
    oracle.set_project_cost(1.8);
    oracle.set_run_cost(0.4);

    assert_eq!(oracle.project_cost(), 1.8);
    assert_eq!(oracle.run_cost(), 0.4);
}

#[test]
fn token_cost_oracle_accumulates_across_records() {
    let oracle = TokenCostOracle::new(1.0, 2.0);
    oracle.record(1000, 500);
    oracle.record(500, 500);

    assert_eq!(oracle.project_cost(), 1.0 + 1.0 + 0.5 + 1.0);
    assert_eq!(oracle.run_cost(), oracle.project_cost());
}
