//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::NonZeroU64,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{
    CliArgs, Command, CompileArgs, CompilerOverrides, NotionOverrides, ServeArgs, ServeOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "jobdesk";
const ENV_PREFIX: &str = "JOBDESK";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024;
const DEFAULT_NOTION_API_BASE: &str = "https://api.notion.com";
const DEFAULT_NOTION_API_VERSION: &str = "2022-06-28";
const DEFAULT_NOTION_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_COMPILER_PROGRAM: &str = "pdflatex";
pub(crate) const DEFAULT_COMPILER_WORK_DIR: &str = "/tmp/jobdesk-resume";
const DEFAULT_COMPILER_TIMEOUT_SECS: u64 = 60;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    /// Present whenever the command needs the record store.
    pub notion: Option<NotionSettings>,
    pub compiler: CompilerSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct NotionSettings {
    pub secret: String,
    pub database_id: String,
    pub api_base: Url,
    pub api_version: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CompilerSettings {
    pub program: PathBuf,
    pub work_dir: PathBuf,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_notion_overrides(&cli.notion);

    let require_notion = match cli.command.as_ref() {
        Some(Command::Serve(args)) => {
            raw.apply_serve_overrides(&args.overrides);
            true
        }
        Some(Command::Compile(args)) => {
            raw.apply_compiler_overrides(&args.compiler);
            false
        }
        None => {
            raw.apply_serve_overrides(&ServeOverrides::default());
            true
        }
    };

    Settings::from_raw(raw, require_notion)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    notion: RawNotionSettings,
    compiler: RawCompilerSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(limit) = overrides.server_max_body_bytes {
            self.server.max_body_bytes = Some(limit);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(base) = overrides.notion_api_base.as_ref() {
            self.notion.api_base = Some(base.clone());
        }
        if let Some(version) = overrides.notion_api_version.as_ref() {
            self.notion.api_version = Some(version.clone());
        }
        if let Some(seconds) = overrides.notion_timeout_seconds {
            self.notion.timeout_seconds = Some(seconds);
        }

        self.apply_compiler_overrides(&overrides.compiler);
    }

    fn apply_notion_overrides(&mut self, overrides: &NotionOverrides) {
        if let Some(secret) = overrides.secret.as_ref() {
            self.notion.secret = Some(secret.clone());
        }
        if let Some(id) = overrides.database_id.as_ref() {
            self.notion.database_id = Some(id.clone());
        }
    }

    fn apply_compiler_overrides(&mut self, overrides: &CompilerOverrides) {
        if let Some(program) = overrides.program.as_ref() {
            self.compiler.program = Some(program.clone());
        }
        if let Some(dir) = overrides.work_dir.as_ref() {
            self.compiler.work_dir = Some(dir.clone());
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.compiler.timeout_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings, require_notion: bool) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            notion,
            compiler,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let notion = build_notion_settings(notion, require_notion)?;
        let compiler = build_compiler_settings(compiler)?;

        Ok(Self {
            server,
            logging,
            notion,
            compiler,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let max_body_value = server.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES);
    let max_body_bytes = NonZeroU64::new(max_body_value)
        .ok_or_else(|| LoadError::invalid("server.max_body_bytes", "must be greater than zero"))?;
    let max_body_bytes = usize::try_from(max_body_bytes.get()).map_err(|_| {
        LoadError::invalid(
            "server.max_body_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    Ok(ServerSettings {
        addr,
        max_body_bytes,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_notion_settings(
    notion: RawNotionSettings,
    required: bool,
) -> Result<Option<NotionSettings>, LoadError> {
    let secret = non_blank(notion.secret);
    let database_id = non_blank(notion.database_id);

    let (secret, database_id) = match (secret, database_id) {
        (Some(secret), Some(database_id)) => (secret, database_id),
        (None, _) if required => {
            return Err(LoadError::invalid(
                "notion.secret",
                "must be set (NOTION_SECRET or JOBDESK__NOTION__SECRET)",
            ));
        }
        (_, None) if required => {
            return Err(LoadError::invalid(
                "notion.database_id",
                "must be set (NOTION_DATABASE_ID or JOBDESK__NOTION__DATABASE_ID)",
            ));
        }
        _ => return Ok(None),
    };

    let api_base_value = notion
        .api_base
        .unwrap_or_else(|| DEFAULT_NOTION_API_BASE.to_string());
    let api_base = Url::parse(&api_base_value)
        .map_err(|err| LoadError::invalid("notion.api_base", format!("invalid url: {err}")))?;
    if !matches!(api_base.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "notion.api_base",
            "scheme must be http or https",
        ));
    }

    let api_version = non_blank(notion.api_version)
        .unwrap_or_else(|| DEFAULT_NOTION_API_VERSION.to_string());
    let timeout = non_zero_seconds(
        notion.timeout_seconds.unwrap_or(DEFAULT_NOTION_TIMEOUT_SECS),
        "notion.timeout_seconds",
    )?;

    Ok(Some(NotionSettings {
        secret,
        database_id,
        api_base,
        api_version,
        timeout,
    }))
}

fn build_compiler_settings(compiler: RawCompilerSettings) -> Result<CompilerSettings, LoadError> {
    let program = compiler
        .program
        .unwrap_or_else(|| PathBuf::from(DEFAULT_COMPILER_PROGRAM));
    if program.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "compiler.program",
            "path must not be empty",
        ));
    }

    let work_dir = compiler
        .work_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_COMPILER_WORK_DIR));
    if work_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "compiler.work_dir",
            "path must not be empty",
        ));
    }

    let timeout = non_zero_seconds(
        compiler
            .timeout_seconds
            .unwrap_or(DEFAULT_COMPILER_TIMEOUT_SECS),
        "compiler.timeout_seconds",
    )?;

    Ok(CompilerSettings {
        program,
        work_dir,
        timeout,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    max_body_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNotionSettings {
    secret: Option<String>,
    database_id: Option<String>,
    api_base: Option<String>,
    api_version: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCompilerSettings {
    program: Option<PathBuf>,
    work_dir: Option<PathBuf>,
    timeout_seconds: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_zero_seconds(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
