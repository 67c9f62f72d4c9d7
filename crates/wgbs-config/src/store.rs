//! Loading and persisting configuration documents.
//!
//! Documents are YAML mappings on disk. A missing file is an error only when
//! the caller says the file is [`Presence::Required`]; optional layers that do
//! not exist simply contribute nothing.
use std::{fs, path::Path};

use tracing::{debug, trace};

use crate::{ConfigDocument, ConfigError, ConfigResult};

/// Whether a layer must exist on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Missing file is [`ConfigError::NotFound`].
    Required,
    /// Missing file yields an empty document.
    Optional,
}

pub struct ConfigStore;

impl ConfigStore {
    /// Parse the document at `path`.
    ///
    /// An empty file or a bare `null` document is an empty layer. A top-level
    /// value that is not a mapping is a parse error.
    pub fn load(path: &Path, presence: Presence) -> ConfigResult<ConfigDocument> {
        if !path.exists() {
            return match presence {
                Presence::Required => Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                }),
                Presence::Optional => {
                    debug!(target: "wgbs.config.store", path = %path.display(), "optional layer absent");
                    Ok(ConfigDocument::new())
                }
            };
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(ConfigDocument::new());
        }

        let doc: Option<ConfigDocument> =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let doc = doc.unwrap_or_default();
        trace!(target: "wgbs.config.store", path = %path.display(), keys = doc.len(), "layer loaded");
        Ok(doc)
    }

    /// `overlay` merged over `base`; see [`ConfigDocument::merged`].
    #[inline]
    pub fn merge(base: &ConfigDocument, overlay: &ConfigDocument) -> ConfigDocument {
        base.merged(overlay)
    }

    /// Keys of `candidate` that differ from `reference`; see [`ConfigDocument::diff`].
    #[inline]
    pub fn diff(candidate: &ConfigDocument, reference: &ConfigDocument) -> ConfigDocument {
        candidate.diff(reference)
    }

    /// Write `doc` to `path` as YAML, replacing any existing file.
    pub fn persist(path: &Path, doc: &ConfigDocument) -> ConfigResult<()> {
        let text = serde_yaml::to_string(doc)?;
        fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(target: "wgbs.config.store", path = %path.display(), keys = doc.len(), "configuration persisted");
        Ok(())
    }
}
