//! Proptest configuration shared by every property suite.

use proptest::test_runner::Config;

const DEFAULT_CASES: u32 = 64;

/// Case count comes from `PROPTEST_CASES` when set, so CI can run deeper
/// than a local `cargo test`.
pub fn proptest_config() -> Config {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_CASES);

    Config {
        cases,
        failure_persistence: None,
        ..Config::default()
    }
}
