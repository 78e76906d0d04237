use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the jobdesk binary.
#[derive(Debug, Parser)]
#[command(name = "jobdesk", version, about = "Job listings and résumé compilation service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "JOBDESK_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub notion: NotionOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Compile a local LaTeX file to PDF without starting the server.
    Compile(CompileArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct NotionOverrides {
    /// Notion integration secret.
    #[arg(
        long = "notion-secret",
        env = "NOTION_SECRET",
        hide_env_values = true,
        value_name = "SECRET",
        global = true
    )]
    pub secret: Option<String>,

    /// Notion database holding the job listings.
    #[arg(
        long = "notion-database-id",
        env = "NOTION_DATABASE_ID",
        value_name = "ID",
        global = true
    )]
    pub database_id: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CompilerOverrides {
    /// Override the LaTeX compiler executable.
    #[arg(long = "compiler-program", value_name = "PATH")]
    pub program: Option<PathBuf>,

    /// Override the directory used for per-request compilation files.
    #[arg(long = "compiler-work-dir", value_name = "PATH")]
    pub work_dir: Option<PathBuf>,

    /// Override the compiler timeout.
    #[arg(long = "compiler-timeout-seconds", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub compiler: CompilerOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the maximum request body size in bytes.
    #[arg(long = "server-max-body-bytes", value_name = "BYTES")]
    pub server_max_body_bytes: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the Notion API base URL.
    #[arg(long = "notion-api-base", value_name = "URL")]
    pub notion_api_base: Option<String>,

    /// Override the Notion API version header.
    #[arg(long = "notion-api-version", value_name = "VERSION")]
    pub notion_api_version: Option<String>,

    /// Override the Notion request timeout.
    #[arg(long = "notion-timeout-seconds", value_name = "SECONDS")]
    pub notion_timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct CompileArgs {
    #[command(flatten)]
    pub compiler: CompilerOverrides,

    /// LaTeX source to compile.
    #[arg(value_name = "INPUT", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Where to write the resulting PDF.
    #[arg(long, short, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub output: PathBuf,
}
