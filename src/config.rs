use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Host/interface to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Image export command template ({url} and {out} placeholders)
    #[arg(long, env = "EXPORT_COMMAND")]
    pub export_command: Option<String>,

    /// Disable timeout middleware
    #[arg(long, env = "TIMEOUT_DISABLED")]
    pub timeout_disabled: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub export: ExportConfig,
    pub resilience: ResilienceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    /// External command rendering a view URL to an image file. Export is
    /// reported unavailable when unset or empty.
    pub command: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub timeout_disabled: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Layered load: defaults, then an optional YAML file (explicit path or
    /// `./config.yaml`), then `CHATSHOT_*__*` environment variables, then
    /// CLI flags. Later layers win.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("resilience.timeout_disabled", false)?
            .set_default("export.command", None::<String>)?;

        // Config file: explicit path (flag or CONFIG_FILE), else ./config.yaml.
        let file = cli
            .config
            .clone()
            .unwrap_or_else(|| "config.yaml".to_string());
        builder = builder.add_source(File::with_name(&file).required(false));

        // E.g. CHATSHOT_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("CHATSHOT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(cmd) = cli.export_command {
            builder = builder.set_override("export.command", cmd)?;
        }
        if let Some(td) = cli.timeout_disabled {
            builder = builder.set_override("resilience.timeout_disabled", td)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }

    /// Export command template, if one is configured and non-empty.
    #[must_use]
    pub fn export_command(&self) -> Option<&str> {
        self.export
            .command
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}
