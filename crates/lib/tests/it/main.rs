/*! Integration tests for Ulpan.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - session: Tests for the keyed state synchronizer (cache, remote mirror,
 *   observers, auth lifecycle)
 * - progress: Tests for the derived study-tracking operations
 * - billing: Tests for checkout creation and webhook event processing
 * - proxy: Tests for the speech and translation pass-through clients
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("ulpan=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod billing;
mod helpers;
mod progress;
mod proxy;
