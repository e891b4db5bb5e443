use std::sync::Mutex;

use binuuid::config::AppConfig;
use binuuid::AppError;

// Environment variables are process-wide; tests in this file take turns.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: [&str; 4] = ["DATABASE_URL", "APP_PORT", "DB_MAX_CONNECTIONS", "SCHEMA_RESET"];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
fn defaults_apply_when_unset() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let config = AppConfig::from_env_with_url("sqlite::memory:").expect("config");
    assert_eq!(config.database_url, "sqlite::memory:");
    assert_eq!(config.port, 8000);
    assert_eq!(config.max_connections, 10);
    assert!(!config.schema_reset);
}

#[test]
fn reads_values_from_env() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    std::env::set_var("DATABASE_URL", "sqlite://data.db");
    std::env::set_var("APP_PORT", " 9100 ");
    std::env::set_var("DB_MAX_CONNECTIONS", "3");
    std::env::set_var("SCHEMA_RESET", "true");

    let config = AppConfig::from_env().expect("config");
    clear_env();

    assert_eq!(config.database_url, "sqlite://data.db");
    assert_eq!(config.port, 9100);
    assert_eq!(config.max_connections, 3);
    assert!(config.schema_reset);
}

#[test]
fn missing_database_url_is_a_configuration_error() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let err = AppConfig::from_env().unwrap_err();
    assert!(matches!(err, AppError::Configuration(ref m) if m.contains("DATABASE_URL")), "got {:?}", err);
}

#[test]
fn malformed_values_are_configuration_errors() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    for (var, raw) in [("APP_PORT", "abc"), ("APP_PORT", "70000"), ("DB_MAX_CONNECTIONS", "-1"), ("SCHEMA_RESET", "yes")] {
        clear_env();
        std::env::set_var(var, raw);

        let err = AppConfig::from_env_with_url("sqlite::memory:").unwrap_err();
        assert!(
            matches!(err, AppError::Configuration(ref m) if m.contains(var) && m.contains(raw)),
            "{}={} gave {:?}",
            var,
            raw,
            err
        );
    }
    clear_env();
}
