//! Access rules for serving rendered images
//!
//! The request server itself lives outside this crate. It asks this policy
//! whether a caller may fetch a file and which path to serve.

use crate::Result;
use crate::config::PipelineConfig;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("filename pattern is valid"));

/// Why an image request is refused
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ImageRequestError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ImageRequestError {
    /// HTTP status a server should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Internal(_) => 500,
        }
    }
}

/// Reduce a requested name to a plain file name
///
/// Path separators become word breaks, whitespace runs become `_`, other
/// characters outside `[A-Za-z0-9_.-]` are dropped and leading or trailing
/// `.`/`_` are stripped, so `../../etc/passwd` turns into `etc_passwd`.
pub fn sanitize_filename(name: &str) -> String {
    let separated = name.replace(['/', '\\'], " ");
    let joined = separated.split_whitespace().collect::<Vec<_>>().join("_");
    UNSAFE_CHARS
        .replace_all(&joined, "")
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// Caller and file checks for the image directory
#[derive(Debug, Clone)]
pub struct ImageAccessPolicy {
    image_dir: PathBuf,
    allowed_extensions: HashSet<String>,
    allowed_caller: Option<IpAddr>,
}

impl ImageAccessPolicy {
    pub fn new(
        image_dir: impl Into<PathBuf>,
        allowed_extensions: impl IntoIterator<Item = impl AsRef<str>>,
        allowed_caller: Option<IpAddr>,
    ) -> Self {
        Self {
            image_dir: image_dir.into(),
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim().to_ascii_lowercase())
                .collect(),
            allowed_caller,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(
            config.output.image_dir.clone(),
            &config.output.allowed_extensions,
            config.allowed_caller()?,
        ))
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// True when the name has an allowed extension after its last dot
    pub fn is_allowed_file(&self, name: &str) -> bool {
        name.rsplit_once('.')
            .is_some_and(|(_, ext)| self.allowed_extensions.contains(&ext.to_ascii_lowercase()))
    }

    /// Only the configured caller passes; without one every caller is refused
    pub fn check_caller(&self, caller: IpAddr) -> std::result::Result<(), ImageRequestError> {
        if self.allowed_caller == Some(caller) {
            Ok(())
        } else {
            warn!("Image request from {} refused", caller);
            Err(ImageRequestError::Forbidden(format!("caller {} not permitted", caller)))
        }
    }

    /// Path to serve for `requested`
    pub fn resolve(&self, caller: IpAddr, requested: &str) -> std::result::Result<PathBuf, ImageRequestError> {
        self.check_caller(caller)?;

        let name = sanitize_filename(requested);
        if !self.is_allowed_file(&name) {
            return Err(ImageRequestError::Forbidden(format!(
                "extension of '{}' not allowed",
                name
            )));
        }

        let path = self.image_dir.join(&name);
        if !path.is_file() {
            return Err(ImageRequestError::NotFound(name));
        }
        debug!("Serving {} to {}", path.display(), caller);
        Ok(path)
    }

    /// Sorted names of the entries in the image directory
    pub fn list_images(&self, caller: IpAddr) -> std::result::Result<Vec<String>, ImageRequestError> {
        self.check_caller(caller)?;

        let entries = fs::read_dir(&self.image_dir)
            .map_err(|e| ImageRequestError::Internal(format!("{}: {}", self.image_dir.display(), e)))?;
        let mut names = entries
            .map(|entry| {
                entry
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .map_err(|e| ImageRequestError::Internal(e.to_string()))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        names.sort();
        Ok(names)
    }
}
