use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::DEFAULT_MAX_TABLES;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub tables: TablesConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub bot_token: SecretString,
    /// Role that may run `reset`, `adminreserve` and `canceltable`.
    /// `None` means only members the platform marks as administrators.
    pub admin_role_id: Option<String>,
    /// Channels the bot answers in. Empty means all channels.
    pub allowed_channel_ids: Vec<String>,
    pub command_prefix: String,
}

#[derive(Clone, Debug)]
pub struct TablesConfig {
    pub max_tables: u32,
    pub data_file: PathBuf,
    /// Refuse to start when the durable record exists but cannot be
    /// parsed, instead of discarding it and starting empty.
    pub strict_recovery: bool,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bot_token: Option<String>,
    pub admin_role_id: Option<String>,
    pub data_file: Option<PathBuf>,
    pub max_tables: Option<u32>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig {
                bot_token: String::new().into(),
                admin_role_id: None,
                allowed_channel_ids: Vec::new(),
                command_prefix: "!".to_string(),
            },
            tables: TablesConfig {
                max_tables: DEFAULT_MAX_TABLES,
                data_file: PathBuf::from("data/reservations.json"),
                strict_recovery: false,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 5000,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("warboard.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(discord) = patch.discord {
            if let Some(bot_token_value) = discord.bot_token {
                self.discord.bot_token = bot_token_value.into();
            }
            if let Some(admin_role_id) = discord.admin_role_id {
                self.discord.admin_role_id = Some(admin_role_id);
            }
            if let Some(allowed_channel_ids) = discord.allowed_channel_ids {
                self.discord.allowed_channel_ids = allowed_channel_ids;
            }
            if let Some(command_prefix) = discord.command_prefix {
                self.discord.command_prefix = command_prefix;
            }
        }

        if let Some(tables) = patch.tables {
            if let Some(max_tables) = tables.max_tables {
                self.tables.max_tables = max_tables;
            }
            if let Some(data_file) = tables.data_file {
                self.tables.data_file = data_file;
            }
            if let Some(strict_recovery) = tables.strict_recovery {
                self.tables.strict_recovery = strict_recovery;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // `DISCORD_TOKEN` is the conventional hosting-provider variable;
        // the namespaced form wins when both are set.
        let bot_token =
            read_env("WARBOARD_DISCORD_BOT_TOKEN").or_else(|| read_env("DISCORD_TOKEN"));
        if let Some(value) = bot_token {
            self.discord.bot_token = value.into();
        }
        if let Some(value) = read_env("WARBOARD_DISCORD_ADMIN_ROLE_ID") {
            self.discord.admin_role_id = Some(value);
        }
        if let Some(value) = read_env("WARBOARD_DISCORD_ALLOWED_CHANNEL_IDS") {
            self.discord.allowed_channel_ids = value
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = read_env("WARBOARD_DISCORD_COMMAND_PREFIX") {
            self.discord.command_prefix = value;
        }

        if let Some(value) = read_env("WARBOARD_TABLES_MAX") {
            self.tables.max_tables = parse_u32("WARBOARD_TABLES_MAX", &value)?;
        }
        if let Some(value) = read_env("WARBOARD_TABLES_DATA_FILE") {
            self.tables.data_file = PathBuf::from(value);
        }
        if let Some(value) = read_env("WARBOARD_TABLES_STRICT_RECOVERY") {
            self.tables.strict_recovery = parse_bool("WARBOARD_TABLES_STRICT_RECOVERY", &value)?;
        }

        if let Some(value) = read_env("WARBOARD_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("WARBOARD_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("WARBOARD_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("WARBOARD_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("WARBOARD_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("WARBOARD_LOGGING_LEVEL").or_else(|| read_env("WARBOARD_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("WARBOARD_LOGGING_FORMAT").or_else(|| read_env("WARBOARD_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.bot_token {
            self.discord.bot_token = bot_token.into();
        }
        if let Some(admin_role_id) = overrides.admin_role_id {
            self.discord.admin_role_id = Some(admin_role_id);
        }
        if let Some(data_file) = overrides.data_file {
            self.tables.data_file = data_file;
        }
        if let Some(max_tables) = overrides.max_tables {
            self.tables.max_tables = max_tables;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_discord(&self.discord)?;
        validate_tables(&self.tables)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("warboard.toml"), PathBuf::from("config/warboard.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    if discord.bot_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "discord.bot_token is required. Set WARBOARD_DISCORD_BOT_TOKEN (or DISCORD_TOKEN) \
             from your application's Bot page"
                .to_string(),
        ));
    }

    let prefix = discord.command_prefix.trim();
    if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(
            "discord.command_prefix must be a non-empty token without whitespace".to_string(),
        ));
    }

    if discord.allowed_channel_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "discord.allowed_channel_ids must not contain empty entries".to_string(),
        ));
    }

    Ok(())
}

fn validate_tables(tables: &TablesConfig) -> Result<(), ConfigError> {
    if tables.max_tables == 0 {
        return Err(ConfigError::Validation(
            "tables.max_tables must be greater than zero".to_string(),
        ));
    }

    if tables.data_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation("tables.data_file must not be empty".to_string()));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    discord: Option<DiscordPatch>,
    tables: Option<TablesPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    bot_token: Option<String>,
    admin_role_id: Option<String>,
    allowed_channel_ids: Option<Vec<String>>,
    command_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TablesPatch {
    max_tables: Option<u32>,
    data_file: Option<PathBuf>,
    strict_recovery: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_WARBOARD_BOT_TOKEN", "token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("warboard.toml");
            fs::write(
                &path,
                r#"
[discord]
bot_token = "${TEST_WARBOARD_BOT_TOKEN}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.discord.bot_token.expose_secret() == "token-from-env",
                "bot token should be loaded from environment",
            )
        })();

        clear_vars(&["TEST_WARBOARD_BOT_TOKEN"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("WARBOARD_DISCORD_BOT_TOKEN", "token-from-env");
        env::set_var("WARBOARD_TABLES_MAX", "20");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("warboard.toml");
            fs::write(
                &path,
                r#"
[discord]
bot_token = "token-from-file"

[tables]
max_tables = 8

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    max_tables: Some(4),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.tables.max_tables == 4, "programmatic max_tables override should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.discord.bot_token.expose_secret() == "token-from-env",
                "env bot token should win over file and defaults",
            )
        })();

        clear_vars(&["WARBOARD_DISCORD_BOT_TOKEN", "WARBOARD_TABLES_MAX"]);
        result
    }

    #[test]
    fn discord_token_falls_back_to_hosting_convention() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("DISCORD_TOKEN", "token-from-hosting");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(
                config.discord.bot_token.expose_secret() == "token-from-hosting",
                "DISCORD_TOKEN should be honored when the namespaced var is unset",
            )
        })();

        clear_vars(&["DISCORD_TOKEN"]);
        result
    }

    #[test]
    fn allowed_channel_ids_env_var_is_comma_separated() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("WARBOARD_DISCORD_BOT_TOKEN", "token");
        env::set_var("WARBOARD_DISCORD_ALLOWED_CHANNEL_IDS", "C100, C200 ,C300");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(
                config.discord.allowed_channel_ids == ["C100", "C200", "C300"],
                "channel ids should be split and trimmed",
            )
        })();

        clear_vars(&["WARBOARD_DISCORD_BOT_TOKEN", "WARBOARD_DISCORD_ALLOWED_CHANNEL_IDS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => {
                return Err("expected validation failure but config load succeeded".to_string())
            }
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("discord.bot_token")
        );
        ensure(has_message, "validation failure should mention discord.bot_token")
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("WARBOARD_DISCORD_BOT_TOKEN", "token-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("token-secret-value"), "debug output should not contain token")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )
        })();

        clear_vars(&["WARBOARD_DISCORD_BOT_TOKEN"]);
        result
    }
}
