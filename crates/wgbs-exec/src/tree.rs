//! Descendant enumeration and signalling for the termination cascade.
//!
//! The engine forks its own workers. Stopping only the engine would leave those
//! workers orphaned, so on cancellation the supervisor asks a [`ProcessTree`]
//! for the engine's direct children and terminates each of them before the
//! engine itself.
use std::io;

use tracing::trace;

/// View of the host process table.
pub trait ProcessTree: Send + Sync {
    /// Pids whose parent is `pid`.
    fn children(&self, pid: u32) -> io::Result<Vec<u32>>;

    /// Ask `pid` to terminate (SIGTERM). A process that is already gone is not an error.
    fn terminate(&self, pid: u32) -> io::Result<()>;
}

/// Process table backed by `/proc` and `kill(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Procfs;

impl ProcessTree for Procfs {
    #[cfg(target_os = "linux")]
    fn children(&self, pid: u32) -> io::Result<Vec<u32>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir("/proc")? {
            let Ok(entry) = entry else { continue };
            let Some(candidate) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok())
            else {
                continue;
            };
            // Processes may exit between listing and reading.
            let Ok(stat) = std::fs::read_to_string(entry.path().join("stat")) else {
                continue;
            };
            if parse_ppid(&stat) == Some(pid) {
                out.push(candidate);
            }
        }
        out.sort_unstable();
        trace!(target: "wgbs.exec.tree", pid, children = ?out, "children enumerated");
        Ok(out)
    }

    #[cfg(not(target_os = "linux"))]
    fn children(&self, pid: u32) -> io::Result<Vec<u32>> {
        trace!(target: "wgbs.exec.tree", pid, "no process table on this platform");
        Ok(Vec::new())
    }

    #[cfg(unix)]
    fn terminate(&self, pid: u32) -> io::Result<()> {
        let raw = i32::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        let rc = unsafe { libc::kill(raw, libc::SIGTERM) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            trace!(target: "wgbs.exec.tree", pid, "already gone");
            Ok(())
        } else {
            Err(err)
        }
    }

    #[cfg(not(unix))]
    fn terminate(&self, _pid: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "signals are not supported on this platform",
        ))
    }
}

/// Parent pid from the contents of `/proc/<pid>/stat`.
///
/// The command name is parenthesised and may itself contain spaces or `)`,
/// so fields are read after the last `)`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_ppid(stat: &str) -> Option<u32> {
    let rest = &stat[stat.rfind(')')? + 1..];
    let mut fields = rest.split_whitespace();
    let _state = fields.next()?;
    fields.next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ppid_from_plain_stat() {
        let stat = "4242 (snakemake) S 4200 4242 4200 0 -1 4194560 1 0 0 0";
        assert_eq!(parse_ppid(stat), Some(4200));
    }

    #[test]
    fn ppid_with_parens_in_comm() {
        let stat = "77 (weird) name)) R 12 77 12 0";
        assert_eq!(parse_ppid(stat), Some(12));
    }

    #[test]
    fn ppid_from_garbage() {
        assert_eq!(parse_ppid(""), None);
        assert_eq!(parse_ppid("1 (x)"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn spawned_child_is_listed() {
        let mut child = std::process::Command::new("sleep").arg("5").spawn().unwrap();
        let me = std::process::id();

        let children = Procfs.children(me).unwrap();
        assert!(children.contains(&child.id()));

        Procfs.terminate(child.id()).unwrap();
        let _ = child.wait();
    }
}
