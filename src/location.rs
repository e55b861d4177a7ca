//! Path and URL classification
//!
//! Decides whether a request path names a file or a directory, keeps
//! directory paths slash-terminated so route keys and cache keys are stable,
//! and maps logical paths onto the filesystem for the current deployment.

use hyper::Uri;
use std::collections::HashMap;
use std::path::PathBuf;

/// Shape of a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    File,
    Directory,
}

/// Request URL reduced to what routing needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedUrl {
    /// Path with a trailing `/` enforced for directory-shaped paths
    pub pathname: String,
    /// Decoded query parameters, last occurrence wins
    pub query: HashMap<String, String>,
}

impl ParsedUrl {
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn kind(&self) -> LocationKind {
        classify(&self.pathname)
    }
}

/// Classify a path by its last segment: no `.` means directory.
///
/// This is a naming heuristic, not a filesystem check.
pub fn classify(pathname: &str) -> LocationKind {
    let last = pathname.rsplit('/').next().unwrap_or(pathname);
    if last.contains('.') {
        LocationKind::File
    } else {
        LocationKind::Directory
    }
}

/// Append a trailing `/` to directory-shaped paths
pub fn normalize(url: &mut ParsedUrl) {
    if !url.pathname.ends_with('/') && classify(&url.pathname) == LocationKind::Directory {
        url.pathname.push('/');
    }
}

/// Parse a request URI into a normalized [`ParsedUrl`]
pub fn parse(uri: &Uri) -> ParsedUrl {
    let pathname = match uri.path() {
        "" => "/".to_string(),
        path => path.to_string(),
    };
    let query = uri
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();

    let mut url = ParsedUrl { pathname, query };
    normalize(&mut url);
    url
}

/// Map a logical path onto the filesystem.
///
/// Live deployments prefix `root`; otherwise one leading `/` is dropped and
/// the path resolves against the working directory.
pub fn to_filesystem_path(logical: &str, live: bool, root: &str) -> PathBuf {
    if live {
        PathBuf::from(format!("{root}{logical}"))
    } else {
        PathBuf::from(logical.strip_prefix('/').unwrap_or(logical))
    }
}

/// Drop the last `/`-delimited segment
pub fn parent_directory(pathname: &str) -> &str {
    pathname.rfind('/').map_or("", |idx| &pathname[..idx])
}
