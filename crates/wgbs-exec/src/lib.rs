mod error;
pub use error::{ExecError, ExecResult};

mod util;

pub mod tree;
pub use tree::{ProcessTree, Procfs};

pub mod tempdir;
pub use tempdir::{TempDirHandle, TempDirManager};

pub mod command;
pub use command::{ClusterSettings, CommandBuilder};

pub mod runlog;
pub use runlog::RunLog;

mod tee;

pub mod supervisor;
pub use supervisor::{JobSupervisor, SupervisorConfig, check_outcome};

pub mod signals;
pub use signals::listen_for_shutdown;

pub mod prelude {
    pub use crate::error::{ExecError, ExecResult};
    pub use crate::{
        ClusterSettings, CommandBuilder, JobSupervisor, ProcessTree, Procfs, RunLog,
        SupervisorConfig, TempDirHandle, TempDirManager, check_outcome, listen_for_shutdown,
    };
}
