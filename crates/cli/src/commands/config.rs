use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use toml::Value;
use warboard_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let bot_token = redact_token(config.discord.bot_token.expose_secret());
    lines.push(render_line(
        "discord.bot_token",
        &bot_token,
        field_source(
            "discord.bot_token",
            Some("WARBOARD_DISCORD_BOT_TOKEN"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "discord.admin_role_id",
        config.discord.admin_role_id.as_deref().unwrap_or("<unset>"),
        field_source(
            "discord.admin_role_id",
            Some("WARBOARD_DISCORD_ADMIN_ROLE_ID"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    let allowed_channels = if config.discord.allowed_channel_ids.is_empty() {
        "<all channels>".to_string()
    } else {
        config.discord.allowed_channel_ids.join(",")
    };
    lines.push(render_line(
        "discord.allowed_channel_ids",
        &allowed_channels,
        field_source(
            "discord.allowed_channel_ids",
            Some("WARBOARD_DISCORD_ALLOWED_CHANNEL_IDS"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "discord.command_prefix",
        &config.discord.command_prefix,
        field_source(
            "discord.command_prefix",
            Some("WARBOARD_DISCORD_COMMAND_PREFIX"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "tables.max_tables",
        &config.tables.max_tables.to_string(),
        field_source(
            "tables.max_tables",
            Some("WARBOARD_TABLES_MAX"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "tables.data_file",
        &config.tables.data_file.display().to_string(),
        field_source(
            "tables.data_file",
            Some("WARBOARD_TABLES_DATA_FILE"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "tables.strict_recovery",
        &config.tables.strict_recovery.to_string(),
        field_source(
            "tables.strict_recovery",
            Some("WARBOARD_TABLES_STRICT_RECOVERY"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        field_source(
            "server.bind_address",
            Some("WARBOARD_SERVER_BIND_ADDRESS"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
        field_source(
            "server.health_check_port",
            Some("WARBOARD_SERVER_HEALTH_CHECK_PORT"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        field_source(
            "logging.level",
            Some("WARBOARD_LOGGING_LEVEL"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        field_source(
            "logging.format",
            Some("WARBOARD_LOGGING_FORMAT"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("warboard.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/warboard.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    if token.trim().is_empty() {
        return "<empty>".to_string();
    }

    "<redacted>".to_string()
}
