//! Plain-text run log in the working directory.
//!
//! Opened in append mode every time, so successive invocations in one
//! directory accumulate. Each run records the wrapper's own command line and
//! the exact engine command; the engine's output follows while it runs.
use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::debug;

use wgbs_model::CommandSpec;

use crate::error::ExecResult;

#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the wrapper's own command line and the constructed command.
    pub fn record_invocation(&self, argv: &[String], command: &CommandSpec) -> ExecResult<()> {
        let mut file = self.open_append()?;
        write!(file, "{}\n\n{}\n\n", argv.join(" "), command.to_shell_string())?;
        file.flush()?;
        debug!(target: "wgbs.exec.runlog", path = %self.path.display(), "invocation recorded");
        Ok(())
    }

    pub(crate) fn open_append(&self) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(&self.path)
    }
}
