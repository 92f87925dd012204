//! Integration tests for the runner: config file in, summary out.

use std::io::Write;
use ticklab_core::engine::LifecycleState;
use ticklab_runner::{run_from_config, write_summary_json, BacktestConfig, SweepGrid};

/// Write a CSV of SPY closes (100.0 rising 1.0 per session) for the first
/// two weeks of 2020 and return the file handle.
fn price_fixture() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let rows = [
        ("2020-01-02", 100.0),
        ("2020-01-03", 101.0),
        ("2020-01-06", 102.0),
        ("2020-01-07", 103.0),
        ("2020-01-08", 104.0),
        ("2020-01-09", 105.0),
        ("2020-01-10", 106.0),
    ];
    writeln!(file, "date,symbol,close").unwrap();
    for (date, close) in rows {
        writeln!(file, "{date},SPY,{close}").unwrap();
    }
    file
}

fn config_toml(csv_path: &str) -> String {
    format!(
        r#"
            start_date = "2020-01-01"
            end_date = "2020-01-10"
            resolution = "daily"
            starting_cash = 100000.0

            [strategy]
            type = "BUY_AND_HOLD"
            symbol = "SPY"
            quantity = 10.0

            [prices]
            csv = "{csv_path}"

            [calendar]
            holidays = ["2020-01-01"]
        "#
    )
}

#[test]
fn config_file_to_completed_summary() {
    let prices = price_fixture();
    let mut config_file = tempfile::NamedTempFile::new().unwrap();
    config_file
        .write_all(config_toml(prices.path().to_str().unwrap()).as_bytes())
        .unwrap();

    let config = BacktestConfig::from_toml_path(config_file.path()).unwrap();
    let summary = run_from_config(&config, None).unwrap();

    assert_eq!(summary.state, LifecycleState::Completed);
    assert_eq!(summary.ticks, 10);
    // Bought 10 @ 100 on Jan 2, held to Jan 10 @ 106.
    assert_eq!(summary.final_cash, 99_000.0);
    assert_eq!(summary.final_valuation, 99_000.0 + 10.0 * 106.0);
    assert_eq!(summary.positions.len(), 1);
    assert_eq!(summary.positions[0].quantity, 10.0);
    assert_eq!(summary.run_id, config.run_id());
}

#[test]
fn missing_symbol_fails_the_run_not_the_runner() {
    let prices = price_fixture();
    let mut config_file = tempfile::NamedTempFile::new().unwrap();
    let toml = config_toml(prices.path().to_str().unwrap())
        .replace("symbol = \"SPY\"", "symbol = \"QQQ\"");
    config_file.write_all(toml.as_bytes()).unwrap();

    let config = BacktestConfig::from_toml_path(config_file.path()).unwrap();
    let summary = run_from_config(&config, None).unwrap();

    // QQQ has no prices: the entry callback raises MissingPrice and the
    // fail-fast policy fails the run.
    assert_eq!(summary.state, LifecycleState::Failed);
    let error = summary.error.unwrap();
    assert!(error.contains("entry"), "error should name the callback: {error}");
    assert!(error.contains("QQQ"), "error should name the symbol: {error}");
}

#[test]
fn summary_export_roundtrip() {
    let prices = price_fixture();
    let mut config_file = tempfile::NamedTempFile::new().unwrap();
    config_file
        .write_all(config_toml(prices.path().to_str().unwrap()).as_bytes())
        .unwrap();

    let config = BacktestConfig::from_toml_path(config_file.path()).unwrap();
    let summary = run_from_config(&config, None).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("summary.json");
    write_summary_json(&out, &summary).unwrap();

    let raw = std::fs::read_to_string(&out).unwrap();
    let back: ticklab_runner::RunSummary = serde_json::from_str(&raw).unwrap();
    assert_eq!(back.run_id, summary.run_id);
    assert_eq!(back.final_valuation, summary.final_valuation);
}

#[test]
fn sweep_over_starting_cash() {
    let prices = price_fixture();
    let mut config_file = tempfile::NamedTempFile::new().unwrap();
    config_file
        .write_all(config_toml(prices.path().to_str().unwrap()).as_bytes())
        .unwrap();
    let config = BacktestConfig::from_toml_path(config_file.path()).unwrap();

    let grid = SweepGrid {
        starting_cash: vec![10_000.0, 100_000.0],
        strategies: Vec::new(),
    };
    let entries = ticklab_runner::run_sweep(&config, &grid).unwrap();
    assert_eq!(entries.len(), 2);
    for entry in &entries {
        let summary = entry.result.as_ref().unwrap();
        assert!(summary.is_completed());
        // Equity gain is the 10-unit position's 6-point rise.
        assert_eq!(
            summary.final_valuation,
            entry.config.starting_cash + 10.0 * 6.0
        );
    }
}
