use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the boardcache binary.
#[derive(Debug, Parser)]
#[command(name = "boardcache", version, about = "Imageboard view cache server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BOARDCACHE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Build a single view through the cache and print it.
    Render(RenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

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

    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    #[command(flatten)]
    pub cache: CacheOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CacheOverrides {
    /// Override the view cache capacity in bytes.
    #[arg(long = "cache-capacity-bytes", value_name = "BYTES")]
    pub cache_capacity_bytes: Option<u64>,

    /// Hide threads of NSFW boards from the `all` board index.
    #[arg(
        long = "cache-hide-nsfw",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_hide_nsfw: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[command(flatten)]
    pub cache: CacheOverrides,

    /// Render a thread.
    #[arg(long, value_name = "ID", conflicts_with = "board")]
    pub thread: Option<u64>,

    /// Only include the last N replies of the thread.
    #[arg(long, value_name = "N", default_value_t = 0, requires = "thread")]
    pub last: u32,

    /// Render a board index page, or `all` for every board.
    #[arg(long, value_name = "NAME", required_unless_present = "thread")]
    pub board: Option<String>,

    /// Board index page to render, starting at 0.
    #[arg(long, value_name = "N", default_value_t = 0, requires = "board")]
    pub page: u32,

    /// Render the board catalog instead of an index page.
    #[arg(long, action = clap::ArgAction::SetTrue, requires = "board", conflicts_with = "page")]
    pub catalog: bool,

    /// Print HTML markup instead of JSON.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub html: bool,
}
