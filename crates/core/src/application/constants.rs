// Harness constants (no magic values)
use std::time::Duration;

/// Readiness probe target when INSTANCE_URL is unset or empty
pub const DEFAULT_INSTANCE_URL: &str = "http://0.0.0.0:7159";

/// Services built and launched, in declaration order
pub const DEFAULT_SERVICES: [&str; 3] = ["oprish", "pandemonium", "effis"];

/// Test configuration file handed to launched services
pub const DEFAULT_CONF_PATH: &str = "tests/Eludris.toml";

/// Environment variable carrying the configuration file path
pub const CONF_ENV_VAR: &str = "ELUDRIS_CONF";

/// Log filter variable of the services and test binaries
pub const RUST_LOG_ENV_VAR: &str = "RUST_LOG";

/// RUST_LOG for builds, services and workspace tests when output is streamed
pub const STREAMED_RUST_LOG: &str = "debug";

/// RUST_LOG for the integration test binary
pub const INTEGRATION_RUST_LOG: &str = "integration_tests=debug";

/// Package holding the integration test binary
pub const INTEGRATION_TESTS_PACKAGE: &str = "integration-tests";

/// Fixed interval between readiness probe attempts (1s)
pub const READINESS_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Per-request timeout of a single readiness probe (5s)
pub const PROBE_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Appended to stage failures when subprocess output was suppressed
pub const LOGS_HINT: &str = "Consider running again with `--logs` for more info";
