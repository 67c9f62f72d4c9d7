//! Cluster configuration: shared defaults, workflow defaults, then the user's cluster file.
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::{ConfigDocument, ConfigResult, ConfigStore, Presence};

/// Fixed-precedence resolver for cluster submission settings.
///
/// There is no CLI layer; the bundled layers may be absent, the user's file may not.
#[derive(Debug, Clone)]
pub struct ClusterConfigResolver {
    shared: PathBuf,
    workflow: PathBuf,
}

impl ClusterConfigResolver {
    pub fn new(shared: impl Into<PathBuf>, workflow: impl Into<PathBuf>) -> Self {
        Self {
            shared: shared.into(),
            workflow: workflow.into(),
        }
    }

    #[instrument(level = "debug", skip(self), fields(shared = %self.shared.display(), workflow = %self.workflow.display()))]
    pub fn resolve(&self, user_config: Option<&Path>) -> ConfigResult<ConfigDocument> {
        let shared = ConfigStore::load(&self.shared, Presence::Optional)?;
        let workflow = ConfigStore::load(&self.workflow, Presence::Optional)?;
        let mut config = ConfigStore::merge(&shared, &workflow);

        if let Some(path) = user_config {
            let user = ConfigStore::load(path, Presence::Required)?;
            config = ConfigStore::merge(&config, &user);
        }
        debug!(target: "wgbs.config.cluster", keys = config.len(), "cluster configuration resolved");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::ConfigError;

    struct Layers {
        _dir: tempfile::TempDir,
        shared: PathBuf,
        workflow: PathBuf,
        user: PathBuf,
    }

    fn layers() -> Layers {
        let dir = tempfile::tempdir().unwrap();
        let shared = dir.path().join("shared.yaml");
        let workflow = dir.path().join("workflow.yaml");
        let user = dir.path().join("user.yaml");
        fs::write(
            &shared,
            "snakemake_cluster_cmd: SlurmEasy -t {threads}\ncluster_module_load: slurm\n__default__:\n  memory: 1G\n  time: 1h\n",
        )
        .unwrap();
        fs::write(&workflow, "cluster_module_load: slurm bowtie2\n__default__:\n  memory: 4G\n").unwrap();
        fs::write(&user, "snakemake_cluster_cmd: sbatch -c {threads}\n").unwrap();
        Layers {
            _dir: dir,
            shared,
            workflow,
            user,
        }
    }

    #[test]
    fn workflow_layer_over_shared_layer() {
        let l = layers();
        let resolved = ClusterConfigResolver::new(&l.shared, &l.workflow)
            .resolve(None)
            .unwrap();

        assert_eq!(resolved.get_str("cluster_module_load"), Some("slurm bowtie2"));
        assert_eq!(
            resolved.get_str("snakemake_cluster_cmd"),
            Some("SlurmEasy -t {threads}")
        );
        let rule = resolved.get("__default__").and_then(|v| v.as_map()).unwrap();
        assert_eq!(rule.get_str("memory"), Some("4G"));
        assert_eq!(rule.get_str("time"), Some("1h"));
    }

    #[test]
    fn user_layer_wins() {
        let l = layers();
        let resolved = ClusterConfigResolver::new(&l.shared, &l.workflow)
            .resolve(Some(&l.user))
            .unwrap();

        assert_eq!(resolved.get_str("snakemake_cluster_cmd"), Some("sbatch -c {threads}"));
        assert_eq!(resolved.get_str("cluster_module_load"), Some("slurm bowtie2"));
    }

    #[test]
    fn absent_bundled_layers_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = ClusterConfigResolver::new(dir.path().join("a"), dir.path().join("b"))
            .resolve(None)
            .unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn missing_user_cluster_file_is_not_found() {
        let l = layers();
        let err = ClusterConfigResolver::new(&l.shared, &l.workflow)
            .resolve(Some(&l.user.with_file_name("absent.yaml")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }
}
