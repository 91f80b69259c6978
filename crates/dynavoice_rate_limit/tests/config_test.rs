//! Tests for the layered configuration system.

use dynavoice_rate_limit::{DynavoiceConfig, RenameQuotaConfig};
use std::time::Duration;

#[test]
fn test_load_bundled_defaults() {
    let config = DynavoiceConfig::bundled().unwrap();

    assert_eq!(config.lifecycle.rename_debounce_ms, 10_000);
    assert_eq!(config.lifecycle.spawn_coalesce(), Duration::from_millis(1_500));
    assert_eq!(
        config.lifecycle.join_request_timeout(),
        Duration::from_secs(60)
    );
    assert_eq!(config.calls.max_retries, 3);
    assert!(config.rename_quota.is_some());
}

#[test]
fn test_config_from_file() {
    use std::io::Write;
    use tempfile::Builder;

    // Create a temporary config file with .toml extension
    let mut temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        temp_file,
        r#"
[lifecycle]
rename_debounce_ms = 42
spawn_coalesce_ms = 7
join_request_timeout_secs = 3

[calls]
timeout_ms = 100
initial_backoff_ms = 10
max_retries = 1
max_delay_ms = 50

[rename_quota]
burst = 5
period_secs = 60
"#
    )
    .unwrap();

    let config = DynavoiceConfig::from_file(temp_file.path()).unwrap();

    assert_eq!(config.lifecycle.rename_debounce(), Duration::from_millis(42));
    assert_eq!(config.calls.timeout_ms, 100);
    assert_eq!(
        config.rename_quota,
        Some(RenameQuotaConfig {
            burst: 5,
            period_secs: 60
        })
    );
}

#[test]
fn test_invalid_file_is_config_error() {
    use std::io::Write;
    use tempfile::Builder;

    let mut temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(temp_file, "[lifecycle]\nrename_debounce_ms = \"soon\"").unwrap();

    let err = DynavoiceConfig::from_file(temp_file.path()).unwrap_err();
    assert!(format!("{}", err).contains("Configuration Error"));
}
