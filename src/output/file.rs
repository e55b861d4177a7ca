//! File loading: existence check, then read
//!
//! Live deployments prefer the minified variant of HTML assets and fall
//! back to the original when the minified file is missing.

use std::path::{Path, PathBuf};
use tokio::fs;

use super::OutputError;
use crate::config::{AppState, Config};
use crate::logger;
use crate::template::TemplateError;

/// Minified path for `filename`, when the live-deployment rules call for one
pub fn minified_variant(config: &Config, filename: &str) -> Option<String> {
    let original = &config.location.original.templates;
    let minified = &config.location.minified.templates;

    if !config.deployment.live || !filename.contains(".html") || filename.contains(minified.as_str())
    {
        return None;
    }

    let candidate = filename.replacen(original.as_str(), minified, 1);
    (candidate != filename).then_some(candidate)
}

/// Check that `path` exists, then read it
pub async fn read_existing(path: &Path) -> Result<Vec<u8>, OutputError> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(OutputError::NotFound(path.to_path_buf()));
    }

    fs::read(path).await.map_err(|source| OutputError::ReadFailure {
        path: path.to_path_buf(),
        source,
    })
}

/// [`read_existing`] bounded by the configured I/O timeout
pub async fn read_with_timeout(state: &AppState, path: PathBuf) -> Result<Vec<u8>, OutputError> {
    match tokio::time::timeout(state.io_timeout(), read_existing(&path)).await {
        Ok(result) => result,
        Err(_) => Err(OutputError::Timeout(path)),
    }
}

/// Load the file behind a logical path, trying the minified variant first
pub async fn load(state: &AppState, filename: &str) -> Result<Vec<u8>, OutputError> {
    if let Some(minified) = minified_variant(&state.config, filename) {
        match read_with_timeout(state, state.filesystem_path(&minified)).await {
            Err(OutputError::NotFound(path)) => {
                logger::debug(&format!(
                    "[File] Minified '{}' missing, serving '{filename}'",
                    path.display()
                ));
            }
            other => return other,
        }
    }

    read_with_timeout(state, state.filesystem_path(filename)).await
}

/// Load a template source as text. Invalid UTF-8 fails compilation.
pub async fn load_source(state: &AppState, logical: &str) -> Result<String, OutputError> {
    let bytes = read_with_timeout(state, state.filesystem_path(logical)).await?;
    String::from_utf8(bytes).map_err(|e| {
        TemplateError::Compile {
            name: logical.to_string(),
            message: format!("source is not valid UTF-8: {e}"),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Router;
    use crate::session::UnavailableSessionStore;
    use crate::template::MiniJinjaEngine;
    use std::sync::Arc;

    fn live_config() -> Config {
        Config::from_toml_str(
            r#"
            [deployment]
            live = true
            root = "/srv"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_minified_variant_in_live_mode() {
        let cfg = live_config();
        assert_eq!(
            minified_variant(&cfg, "/templates/about.html").as_deref(),
            Some("/templates/min/about.html")
        );
    }

    #[test]
    fn test_no_minified_variant() {
        let cfg = live_config();
        // already minified
        assert_eq!(minified_variant(&cfg, "/templates/min/about.html"), None);
        // not html
        assert_eq!(minified_variant(&cfg, "/templates/site.css"), None);
        // not under the templates location
        assert_eq!(minified_variant(&cfg, "/pages/about.html"), None);

        let testing = Config::from_toml_str("").unwrap();
        assert_eq!(minified_variant(&testing, "/templates/about.html"), None);
    }

    #[tokio::test]
    async fn test_read_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello").unwrap();

        assert_eq!(read_existing(&path).await.unwrap(), b"hello");

        let missing = dir.path().join("missing.txt");
        assert!(matches!(
            read_existing(&missing).await,
            Err(OutputError::NotFound(p)) if p == missing
        ));
    }

    #[tokio::test]
    async fn test_directory_read_is_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_existing(dir.path()).await,
            Err(OutputError::ReadFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_source_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("templates")).unwrap();
        std::fs::write(dir.path().join("templates/ok.tpl"), "caf\u{e9}").unwrap();
        std::fs::write(dir.path().join("templates/latin1.tpl"), b"caf\xe9").unwrap();

        let config = Config::from_toml_str(&format!(
            "[deployment]\nlive = true\nroot = {:?}",
            dir.path().display().to_string()
        ))
        .unwrap();
        let router = Router::from_config(&config.routes).unwrap();
        let state = AppState::new(
            config,
            router,
            Arc::new(MiniJinjaEngine),
            Arc::new(UnavailableSessionStore),
        );

        assert_eq!(
            load_source(&state, "/templates/ok.tpl").await.unwrap(),
            "caf\u{e9}"
        );
        assert!(matches!(
            load_source(&state, "/templates/latin1.tpl").await,
            Err(OutputError::Template(TemplateError::Compile { name, .. }))
                if name == "/templates/latin1.tpl"
        ));
    }
}
