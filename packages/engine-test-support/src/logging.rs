//! Test logging for the engine and the simulator
//!
//! Every engine test binary installs this from a `#[ctor]` hook, so session
//! handles, the registry and the sweeper emit the same `tracing` records
//! under test that they do when driven by the simulator.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Used when neither `TEST_LOG` nor `RUST_LOG` is set.
///
/// Third-party crates stay at `error`; the engine crates keep their warnings,
/// which carry capability failures, deferred turns and cancelled sessions.
const DEFAULT_DIRECTIVES: &str = "error,spellbee_engine=warn,session_simulator=warn";

/// Initialize structured logging for tests.
///
/// This function is idempotent and race-safe: the first caller wins and later
/// calls return immediately. The filter is taken, in order of precedence, from:
///
/// 1. `TEST_LOG` environment variable (e.g. `TEST_LOG=spellbee_engine=debug`
///    to follow every turn a failing test plays)
/// 2. `RUST_LOG` environment variable
/// 3. [`DEFAULT_DIRECTIVES`]
///
/// Output goes through `with_test_writer()` so it is only shown for failing
/// tests, without timestamps since the engine tests run on a manual clock.
pub fn init() {
    INITIALIZED.get_or_init(|| {
        let filter = std::env::var("TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .map(EnvFilter::new)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .without_time()
            .with_target(true)
            .try_init()
            .ok(); // another subscriber may already be installed
    });
}
