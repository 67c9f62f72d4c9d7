//! Run configuration: defaults, then the user's file, then explicitly changed CLI values.
use std::path::Path;

use tracing::{debug, instrument};

use crate::{ConfigDocument, ConfigResult, ConfigStore, Presence};

/// Resolves the run configuration against one immutable defaults layer.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    defaults: ConfigDocument,
}

impl ConfigResolver {
    pub fn new(defaults: ConfigDocument) -> Self {
        Self { defaults }
    }

    /// Resolver over the defaults file at `path`, which must exist.
    pub fn from_defaults_file(path: &Path) -> ConfigResult<Self> {
        ConfigStore::load(path, Presence::Required).map(Self::new)
    }

    #[inline]
    pub fn defaults(&self) -> &ConfigDocument {
        &self.defaults
    }

    /// CLI values the user actually changed.
    ///
    /// Computed against the defaults, never against the user-merged document:
    /// a flag left at its default must not shadow the user's file.
    pub fn explicit_overrides(&self, cli: &ConfigDocument) -> ConfigDocument {
        ConfigStore::diff(cli, &self.defaults)
    }

    /// Merge defaults, the optional user file and the CLI overrides, in that order.
    ///
    /// `cli` is the full set of CLI-derived values, defaults included.
    /// A given `user_config` that does not exist is [`crate::ConfigError::NotFound`].
    #[instrument(level = "debug", skip(self, cli))]
    pub fn resolve(
        &self,
        user_config: Option<&Path>,
        cli: &ConfigDocument,
    ) -> ConfigResult<ConfigDocument> {
        let mut config = self.defaults.clone();
        if let Some(path) = user_config {
            let user = ConfigStore::load(path, Presence::Required)?;
            debug!(target: "wgbs.config.resolver", keys = user.len(), "user layer merged");
            config = ConfigStore::merge(&config, &user);
        }

        let overrides = self.explicit_overrides(cli);
        debug!(
            target: "wgbs.config.resolver",
            overrides = ?overrides.keys().collect::<Vec<_>>(),
            "cli layer merged"
        );
        Ok(ConfigStore::merge(&config, &overrides))
    }
}
