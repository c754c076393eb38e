use std::path::{Component, Path, PathBuf};

/// Transport-level failure reported by whoever performed the fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    NotFound { url: String },
    Status { url: String, status: u16 },
    Network { url: String, reason: String },
}

impl FetchError {
    /// Classifies a non-success HTTP status.
    pub fn from_status(url: impl Into<String>, status: u16) -> Self {
        let url = url.into();
        if status == 404 || status == 410 {
            FetchError::NotFound { url }
        } else {
            FetchError::Status { url, status }
        }
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::NotFound { url }
            | FetchError::Status { url, .. }
            | FetchError::Network { url, .. } => url,
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::NotFound { url } => write!(f, "{url}: not found"),
            FetchError::Status { url, status } => write!(f, "{url}: HTTP {status}"),
            FetchError::Network { url, reason } => write!(f, "{url}: {reason}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Why a requested dataset could not be shown.
///
/// Both kinds look the same to the user ("no data"); they differ in how
/// loudly they are logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    DataUnavailable { url: String, reason: String },
    DecodeFailure { url: String, reason: String },
}

impl LoadError {
    pub fn decode(url: impl Into<String>, reason: impl ToString) -> Self {
        LoadError::DecodeFailure {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn unavailable(url: impl Into<String>, reason: impl ToString) -> Self {
        LoadError::DataUnavailable {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_decode_failure(&self) -> bool {
        matches!(self, LoadError::DecodeFailure { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            LoadError::DataUnavailable { url, .. } | LoadError::DecodeFailure { url, .. } => url,
        }
    }

    /// Logs at the level matching the kind: missing files are expected.
    pub fn log(&self, what: &str) {
        match self {
            LoadError::DataUnavailable { url, reason } => {
                tracing::debug!(%url, %reason, "{what}: data unavailable");
            }
            LoadError::DecodeFailure { url, reason } => {
                tracing::warn!(%url, %reason, "{what}: decode failure");
            }
        }
    }
}

impl From<FetchError> for LoadError {
    fn from(err: FetchError) -> Self {
        let url = err.url().to_string();
        LoadError::DataUnavailable {
            url,
            reason: err.to_string(),
        }
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::DataUnavailable { url, reason } => {
                write!(f, "no data at {url} ({reason})")
            }
            LoadError::DecodeFailure { url, reason } => {
                write!(f, "could not decode {url}: {reason}")
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Joins a base URL (or directory) and a relative data path.
pub fn join_url(base: &str, relative: &str) -> String {
    let relative = relative.trim_start_matches('/');
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        relative.to_string()
    } else {
        format!("{base}/{relative}")
    }
}

/// Blocking byte source for native tools; the browser shell fetches over HTTP.
pub trait DataSource {
    fn fetch(&self, relative: &str) -> Result<Vec<u8>, FetchError>;

    fn exists(&self, relative: &str) -> bool {
        self.fetch(relative).is_ok()
    }
}

/// Reads the data layout from a local directory.
#[derive(Debug, Clone)]
pub struct FsDataSource {
    root: PathBuf,
}

impl FsDataSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a relative path under the root, refusing anything that
    /// would escape it.
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let rel = Path::new(relative.trim_start_matches('/'));
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }
        Some(self.root.join(rel))
    }
}

impl DataSource for FsDataSource {
    fn fetch(&self, relative: &str) -> Result<Vec<u8>, FetchError> {
        let Some(path) = self.resolve(relative) else {
            return Err(FetchError::NotFound {
                url: relative.to_string(),
            });
        };
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FetchError::NotFound {
                url: relative.to_string(),
            },
            _ => FetchError::Network {
                url: relative.to_string(),
                reason: e.to_string(),
            },
        })
    }

    fn exists(&self, relative: &str) -> bool {
        self.resolve(relative).is_some_and(|p| p.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses() {
        assert!(matches!(
            FetchError::from_status("a.tif", 404),
            FetchError::NotFound { .. }
        ));
        assert_eq!(
            FetchError::from_status("a.tif", 500),
            FetchError::Status {
                url: "a.tif".into(),
                status: 500
            }
        );
    }

    #[test]
    fn fetch_errors_become_data_unavailable() {
        let err: LoadError = FetchError::NotFound { url: "x.json".into() }.into();
        assert!(!err.is_decode_failure());
        assert_eq!(err.url(), "x.json");
    }

    #[test]
    fn joins_urls() {
        assert_eq!(join_url("https://h/data/", "/a/b.tif"), "https://h/data/a/b.tif");
        assert_eq!(join_url("data", "a.tif"), "data/a.tif");
        assert_eq!(join_url("", "a.tif"), "a.tif");
    }

    #[test]
    fn fs_source_refuses_escapes() {
        let src = FsDataSource::new("/srv/data");
        assert!(src.resolve("../secret").is_none());
        assert!(src.resolve("a/../../b").is_none());
        assert_eq!(
            src.resolve("aggregates/ndvi/2020.tif").unwrap(),
            PathBuf::from("/srv/data/aggregates/ndvi/2020.tif")
        );
    }

    #[test]
    fn fs_source_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("present.json"), b"[]").unwrap();
        let src = FsDataSource::new(dir.path());
        assert_eq!(src.fetch("present.json").unwrap(), b"[]".to_vec());
        assert!(src.exists("present.json"));
        assert!(matches!(
            src.fetch("absent.json"),
            Err(FetchError::NotFound { .. })
        ));
        assert!(!src.exists("absent.json"));
    }
}
