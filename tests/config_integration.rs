use std::env;
use std::io::Write as _;

use chatshot::config::AppConfig;
use serial_test::serial;

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("CHATSHOT_SERVER__PORT");
        env::remove_var("CHATSHOT_EXPORT__COMMAND");
        env::remove_var("CONFIG_FILE");
        env::remove_var("PORT");
        env::remove_var("EXPORT_COMMAND");
        env::remove_var("TIMEOUT_DISABLED");
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["chatshot"]).expect("defaults should load");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert!(!config.resilience.timeout_disabled);
    assert_eq!(config.export_command(), None);
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("CHATSHOT_SERVER__PORT", "9090");
    }

    let config = AppConfig::load_from_args(["chatshot"]).expect("Failed to load config");
    assert_eq!(config.server.port, 9090);

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env_vars();
    unsafe {
        env::set_var("CHATSHOT_SERVER__PORT", "9090");
    }

    let config = AppConfig::load_from_args(["chatshot", "--port", "7171"])
        .expect("Failed to load config");
    assert_eq!(config.server.port, 7171);

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("Failed to create temp config");
    writeln!(file, "server:\n  port: 7070").expect("Failed to write temp config");

    unsafe {
        env::set_var("CONFIG_FILE", file.path());
    }

    let config = AppConfig::load_from_args(["chatshot"]).expect("Failed to load config from file");
    assert_eq!(config.server.port, 7070);

    clear_env_vars();
}

#[test]
#[serial]
fn test_export_command_blank_is_unconfigured() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["chatshot", "--export-command", "   "])
        .expect("Failed to load config");
    assert_eq!(config.export_command(), None);

    let config = AppConfig::load_from_args([
        "chatshot",
        "--export-command",
        "chromium --headless --screenshot={out} {url}",
    ])
    .expect("Failed to load config");
    assert_eq!(
        config.export_command(),
        Some("chromium --headless --screenshot={out} {url}")
    );

    clear_env_vars();
}
