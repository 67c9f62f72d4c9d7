/// Where the engine executes its jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Jobs run on local cores; the job limit is a core limit.
    Local,
    /// Jobs are submitted to a scheduler through the cluster submission template.
    Cluster,
}

impl ExecMode {
    #[inline]
    pub fn from_local_flag(local: bool) -> Self {
        if local { ExecMode::Local } else { ExecMode::Cluster }
    }

    #[inline]
    pub fn is_cluster(&self) -> bool {
        matches!(self, ExecMode::Cluster)
    }

    /// Short symbolic name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecMode::Local => "local",
            ExecMode::Cluster => "cluster",
        }
    }
}
