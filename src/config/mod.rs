// Configuration module entry point
// Loads the startup configuration and holds the shared application state

mod state;
mod types;

use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::http::mime;

// Re-export public types
pub use state::AppState;
pub use types::{
    AssetLocations, Config, DeploymentConfig, HttpConfig, LocationConfig, LoggingConfig,
    PerformanceConfig, PostRoutes, RouteSpec, RoutesConfig, ServerConfig,
};

/// Errors raised while building the startup configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] ::config::ConfigError),
    #[error("route '{0}': a guarded target cannot wrap another guarded target")]
    NestedGuard(String),
    #[error("GET routes must define '/'")]
    MissingIndex,
    #[error("the '/' route is the fallback for failed auth and cannot be guarded")]
    GuardedIndex,
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
    #[error("invalid address '{addr}': {source}")]
    Address {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let settings = Self::builder_with_defaults()?
            .add_source(::config::File::with_name(config_path).required(false))
            .add_source(
                ::config::Environment::with_prefix("ZY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut config = settings.try_deserialize::<Self>()?;
        if let Some(source) = read_toml_source(config_path)? {
            config.apply_keyed_tables(KeyedTables::parse(&source)?);
        }
        Ok(config.with_builtin_defaults())
    }

    /// Build configuration from an in-memory TOML document on top of the defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let settings = Self::builder_with_defaults()?
            .add_source(::config::File::from_str(source, ::config::FileFormat::Toml))
            .build()?;

        let mut config = settings.try_deserialize::<Self>()?;
        config.apply_keyed_tables(KeyedTables::parse(source)?);
        Ok(config.with_builtin_defaults())
    }

    /// Tables present in the file replace their case-folded copies
    fn apply_keyed_tables(&mut self, tables: KeyedTables) {
        if let Some(routes) = tables.routes {
            self.routes = routes;
        }
        if let Some(content_type) = tables.content_type {
            self.content_type = content_type;
        }
    }

    fn builder_with_defaults(
    ) -> Result<::config::ConfigBuilder<::config::builder::DefaultState>, ConfigError> {
        Ok(::config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("performance.io_timeout", 30)?
            .set_default("performance.backlog", 128)?
            .set_default("http.server_name", "Zy/0.3")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("deployment.live", false)?
            .set_default("deployment.root", "")?
            .set_default("location.original.style", "/css/")?
            .set_default("location.original.script", "/js/")?
            .set_default("location.original.images", "/img/")?
            .set_default("location.original.templates", "/templates/")?
            .set_default("location.minified.style", "/css/min/")?
            .set_default("location.minified.script", "/js/min/")?
            .set_default("location.minified.images", "/img/")?
            .set_default("location.minified.templates", "/templates/min/")?)
    }

    /// Overlay the map-shaped settings (routes, content types) on their built-in defaults
    #[must_use]
    pub fn with_builtin_defaults(mut self) -> Self {
        self.routes = self.routes.merged_over_defaults();

        let mut content_type = mime::default_content_types();
        content_type.extend(self.content_type);
        self.content_type = content_type;

        self
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| ConfigError::Address { addr, source })
    }

    /// Whether `directory` may serve files that are not in the route table
    pub fn is_safe_directory(&self, directory: &str) -> bool {
        self.safe_directories.as_ref().map_or(true, |allowed| {
            let wanted = directory.trim_end_matches('/');
            allowed
                .iter()
                .any(|dir| dir.trim_end_matches('/') == wanted)
        })
    }

    /// Logical path of the shared structure template
    pub fn structure_template_path(&self) -> String {
        format!(
            "{}/parts/structure.tpl",
            self.location.original.templates.trim_end_matches('/')
        )
    }
}

/// Tables keyed by request paths and file extensions.
///
/// The `config` crate lowercases map keys, so these are read from the TOML
/// source directly.
#[derive(Debug, Default, Deserialize)]
struct KeyedTables {
    routes: Option<RoutesConfig>,
    content_type: Option<HashMap<String, String>>,
}

impl KeyedTables {
    fn parse(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }
}

/// Contents of the TOML file `load_from` picks for `config_path`, if any
fn read_toml_source(config_path: &str) -> Result<Option<String>, ConfigError> {
    let candidates = [
        PathBuf::from(config_path),
        PathBuf::from(format!("{config_path}.toml")),
    ];
    let Some(path) = candidates
        .into_iter()
        .find(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "toml"))
    else {
        return Ok(None);
    };

    std::fs::read_to_string(&path)
        .map(Some)
        .map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })
}
