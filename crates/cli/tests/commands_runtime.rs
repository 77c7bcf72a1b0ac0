use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use tempfile::TempDir;
use warboard_cli::commands::{reset, view};

#[test]
fn view_reports_empty_registry_with_valid_env() {
    let dir = TempDir::new().expect("tempdir");
    let data_file = dir.path().join("reservations.json");

    with_env(
        &[
            ("WARBOARD_DISCORD_BOT_TOKEN", "test-token"),
            ("WARBOARD_TABLES_DATA_FILE", data_file.to_str().expect("utf-8 path")),
            ("WARBOARD_TABLES_MAX", "4"),
        ],
        || {
            let result = view::run();
            assert_eq!(result.exit_code, 0, "expected successful view run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "view");
            assert_eq!(payload["status"], "ok");
            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.contains("0/4"), "got: {message}");
        },
    );
}

#[test]
fn view_lists_reservations_from_the_snapshot() {
    let dir = TempDir::new().expect("tempdir");
    let data_file = dir.path().join("reservations.json");
    fs::write(
        &data_file,
        r#"[{
            "requester_id": "u1",
            "username": "ann#0001",
            "participant_names": "Ann, Ben",
            "activity_name": "Bolt Action",
            "table_number": 2,
            "created_at": "2026-08-30T18:00:00Z"
        }]"#,
    )
    .expect("seed snapshot");

    with_env(
        &[
            ("WARBOARD_DISCORD_BOT_TOKEN", "test-token"),
            ("WARBOARD_TABLES_DATA_FILE", data_file.to_str().expect("utf-8 path")),
            ("WARBOARD_TABLES_MAX", "4"),
        ],
        || {
            let result = view::run();
            assert_eq!(result.exit_code, 0, "expected successful view run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["status"], "ok");
            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.contains("Table 2: Ann, Ben playing Bolt Action"), "got: {message}");
        },
    );
}

#[test]
fn view_returns_config_failure_without_a_bot_token() {
    with_env(&[], || {
        let result = view::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "view");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn reset_refuses_without_confirmation() {
    with_env(&[], || {
        let result = reset::run(false);
        assert_eq!(result.exit_code, 4, "expected confirmation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "reset");
        assert_eq!(payload["error_class"], "confirmation_required");
    });
}

#[test]
fn reset_clears_the_snapshot_when_confirmed() {
    let dir = TempDir::new().expect("tempdir");
    let data_file = dir.path().join("reservations.json");
    fs::write(
        &data_file,
        r#"[{
            "requester_id": "u1",
            "username": "ann#0001",
            "participant_names": "Ann",
            "activity_name": "Saga",
            "table_number": 1,
            "created_at": "2026-08-30T18:00:00Z"
        }]"#,
    )
    .expect("seed snapshot");

    with_env(
        &[
            ("WARBOARD_DISCORD_BOT_TOKEN", "test-token"),
            ("WARBOARD_TABLES_DATA_FILE", data_file.to_str().expect("utf-8 path")),
        ],
        || {
            let result = reset::run(true);
            assert_eq!(result.exit_code, 0, "expected successful reset");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["status"], "ok");
            assert_eq!(payload["message"], "cleared 1 reservations");
        },
    );

    let raw = fs::read_to_string(&data_file).expect("snapshot still exists");
    let snapshot: Value = serde_json::from_str(&raw).expect("snapshot is valid JSON");
    assert_eq!(snapshot.as_array().map(Vec::len), Some(0));
}

#[test]
fn strict_recovery_surfaces_a_corrupt_snapshot() {
    let dir = TempDir::new().expect("tempdir");
    let data_file = dir.path().join("reservations.json");
    fs::write(&data_file, "not json").expect("corrupt snapshot");

    with_env(
        &[
            ("WARBOARD_DISCORD_BOT_TOKEN", "test-token"),
            ("WARBOARD_TABLES_DATA_FILE", data_file.to_str().expect("utf-8 path")),
            ("WARBOARD_TABLES_STRICT_RECOVERY", "true"),
        ],
        || {
            let result = view::run();
            assert_eq!(result.exit_code, 3, "expected snapshot failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "snapshot");
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "WARBOARD_DISCORD_BOT_TOKEN",
        "DISCORD_TOKEN",
        "WARBOARD_DISCORD_ADMIN_ROLE_ID",
        "WARBOARD_DISCORD_ALLOWED_CHANNEL_IDS",
        "WARBOARD_DISCORD_COMMAND_PREFIX",
        "WARBOARD_TABLES_MAX",
        "WARBOARD_TABLES_DATA_FILE",
        "WARBOARD_TABLES_STRICT_RECOVERY",
        "WARBOARD_SERVER_BIND_ADDRESS",
        "WARBOARD_SERVER_HEALTH_CHECK_PORT",
        "WARBOARD_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "WARBOARD_LOGGING_LEVEL",
        "WARBOARD_LOGGING_FORMAT",
        "WARBOARD_LOG_LEVEL",
        "WARBOARD_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
