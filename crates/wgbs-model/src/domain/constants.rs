/// Environment variable through which the scratch directory is handed to the engine.
pub const ENV_TEMP_DIR: &str = "TMPDIR";

/// Resolved run configuration, written into the working directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolved cluster configuration, written into the working directory.
pub const CLUSTER_CONFIG_FILE_NAME: &str = "cluster_config.yaml";

/// Directory under the working directory receiving scheduler job logs.
pub const CLUSTER_LOGS_DIR_NAME: &str = "cluster_logs";

/// Plain-text run log, appended to across invocations.
pub const RUN_LOG_FILE_NAME: &str = "WGBSpipeline.log";

/// Workflow definition consumed by the engine.
pub const SNAKEFILE_NAME: &str = "Snakefile";

/// Workflow defaults layer.
pub const DEFAULTS_FILE_NAME: &str = "defaults.yaml";

/// Cluster defaults layer (both the shared and the per-workflow one).
pub const CLUSTER_FILE_NAME: &str = "cluster.yaml";

/// Prefix of every scratch directory name.
pub const TEMP_DIR_PREFIX: &str = "tmp.snakemake.";
