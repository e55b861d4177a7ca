// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::collections::{HashMap, HashSet};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub deployment: DeploymentConfig,
    pub location: LocationConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    /// File extension (with leading dot) to MIME type
    #[serde(default)]
    pub content_type: HashMap<String, String>,
    /// Parent directories allowed for files outside the route table.
    /// `None` allows every directory.
    #[serde(default)]
    pub safe_directories: Option<HashSet<String>>,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    /// Upper bound in seconds for a single file load or session read
    pub io_timeout: u64,
    pub max_connections: Option<u64>,
    pub backlog: i32,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub max_body_size: u64,
}

/// Deployment environment signal
#[derive(Debug, Deserialize, Clone)]
pub struct DeploymentConfig {
    /// Live deployments resolve files under `root` and prefer minified assets
    pub live: bool,
    pub root: String,
}

/// Asset location prefixes
#[derive(Debug, Deserialize, Clone)]
pub struct LocationConfig {
    pub original: AssetLocations,
    pub minified: AssetLocations,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AssetLocations {
    pub style: String,
    pub script: String,
    pub images: String,
    pub templates: String,
}

/// Routes configuration
///
/// `get` keys are request paths or the status codes `"403"`, `"404"` and `"500"`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RoutesConfig {
    #[serde(default)]
    pub get: HashMap<String, RouteSpec>,
    #[serde(default)]
    pub post: Option<PostRoutes>,
}

/// POST routing is either one common target or a per-path table
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum PostRoutes {
    Common(RouteSpec),
    Paths(HashMap<String, RouteSpec>),
}

/// Route target as written in a config file
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteSpec {
    /// Fixed response body
    Direct { body: String },
    /// HTTP 302 redirect
    Redirect { target: String },
    /// Serve a file
    File { path: String },
    /// Render a single template
    Template { path: String },
    /// Compose several templates into the structure template
    Templates { paths: Vec<String> },
    /// Serve `target` only to authenticated sessions
    Guarded {
        #[serde(default = "default_auth")]
        auth: bool,
        target: Box<RouteSpec>,
    },
}

#[allow(clippy::missing_const_for_fn)]
fn default_auth() -> bool {
    true
}

impl RoutesConfig {
    /// Built-in routes, overridden per key by user configuration
    pub fn defaults() -> Self {
        let get = [
            ("/", "Welcome to Zy!"),
            ("403", "403"),
            ("404", "404"),
            ("500", "500"),
        ]
        .into_iter()
        .map(|(key, body)| {
            (
                key.to_string(),
                RouteSpec::Direct {
                    body: body.to_string(),
                },
            )
        })
        .collect();

        Self {
            get,
            post: Some(PostRoutes::Common(RouteSpec::Direct {
                body: "Welcome to Zy! (POST)".to_string(),
            })),
        }
    }

    /// Overlay `self` on top of the defaults.
    ///
    /// GET entries override per key, a configured POST table replaces the default one.
    #[must_use]
    pub fn merged_over_defaults(self) -> Self {
        let mut merged = Self::defaults();
        merged.get.extend(self.get);
        if self.post.is_some() {
            merged.post = self.post;
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_have_index_and_status_routes() {
        let routes = RoutesConfig::defaults();
        for key in ["/", "403", "404", "500"] {
            assert!(routes.get.contains_key(key), "missing {key}");
        }
        assert!(matches!(routes.post, Some(PostRoutes::Common(_))));
    }

    #[test]
    fn test_merge_overrides_per_key() {
        let mut user = RoutesConfig::default();
        user.get.insert(
            "404".to_string(),
            RouteSpec::Template {
                path: "/templates/404.tpl".to_string(),
            },
        );
        user.get.insert(
            "/about/".to_string(),
            RouteSpec::File {
                path: "/about.html".to_string(),
            },
        );

        let merged = user.merged_over_defaults();
        assert_eq!(
            merged.get["404"],
            RouteSpec::Template {
                path: "/templates/404.tpl".to_string()
            }
        );
        assert!(merged.get.contains_key("/about/"));
        assert_eq!(
            merged.get["/"],
            RouteSpec::Direct {
                body: "Welcome to Zy!".to_string()
            }
        );
        // POST default survives when not configured
        assert!(matches!(merged.post, Some(PostRoutes::Common(_))));
    }

    #[test]
    fn test_merge_replaces_post_table() {
        let mut paths = HashMap::new();
        paths.insert(
            "/login/".to_string(),
            RouteSpec::Direct {
                body: "ok".to_string(),
            },
        );
        let user = RoutesConfig {
            get: HashMap::new(),
            post: Some(PostRoutes::Paths(paths.clone())),
        };

        let merged = user.merged_over_defaults();
        assert_eq!(merged.post, Some(PostRoutes::Paths(paths)));
    }
}
