//! Supervision of the engine process.
//!
//! One child per run. The supervisor spawns it, mirrors its output into the
//! run log, and waits for whichever comes first: the child's exit or the
//! cancellation token. On cancellation the child's direct children are sent
//! SIGTERM, then the child itself; a child still alive after the grace period
//! is killed.
use std::{
    process::Stdio,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{process::Child, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use wgbs_model::{CommandSpec, JobOutcome, JobState};

use crate::{
    error::{ExecError, ExecResult},
    runlog::RunLog,
    tee::spawn_tee,
    tree::{ProcessTree, Procfs},
    util::exit_code,
};

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Time the child gets to exit after SIGTERM before it is killed.
    pub grace: Duration,
    /// Time allowed for draining buffered output after the child is gone.
    pub drain_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(10),
            drain_timeout: Duration::from_secs(5),
        }
    }
}

pub struct JobSupervisor {
    cfg: SupervisorConfig,
    tree: Arc<dyn ProcessTree>,
    run_log: Option<RunLog>,
    state: Mutex<JobState>,
}

impl JobSupervisor {
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            tree: Arc::new(Procfs),
            run_log: None,
            state: Mutex::new(JobState::Idle),
        }
    }

    pub fn with_process_tree(mut self, tree: Arc<dyn ProcessTree>) -> Self {
        self.tree = tree;
        self
    }

    /// Mirror the child's stdout and stderr into `log`.
    pub fn with_run_log(mut self, log: RunLog) -> Self {
        self.run_log = Some(log);
        self
    }

    pub fn state(&self) -> JobState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn transition(&self, next: JobState) -> ExecResult<()> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        let from = *state;
        *state = from.advance(next)?;
        debug!(target: "wgbs.exec.supervisor", ?from, to = ?next, "job state transition");
        Ok(())
    }

    /// Run `spec` to completion or until `cancel` fires.
    ///
    /// A token that is already cancelled prevents the spawn and yields
    /// [`ExecError::Interrupted`]. A failing `wait` also runs the termination
    /// cascade, since the child may still be alive, and is reported as
    /// [`ExecError::Wait`].
    #[instrument(level = "debug", skip_all, fields(program = %spec.program))]
    pub async fn run(&self, spec: &CommandSpec, cancel: &CancellationToken) -> ExecResult<JobOutcome> {
        if spec.program.trim().is_empty() {
            return Err(ExecError::MissingProgram);
        }
        if cancel.is_cancelled() {
            warn!(target: "wgbs.exec.supervisor", "cancelled before launch; engine not started");
            return Err(ExecError::Interrupted);
        }
        // One run per supervisor; checked before anything is spawned.
        self.state().advance(JobState::Running)?;

        let mut child = self.spawn(spec)?;
        let pid = child.id().unwrap_or_default();
        self.transition(JobState::Running)?;
        info!(target: "wgbs.exec.supervisor", pid, "engine started");

        let tees = self.attach_output(&mut child);

        let outcome = tokio::select! {
            biased;

            status = child.wait() => match status {
                Ok(status) => {
                    let code = exit_code(status);
                    self.transition(JobState::Exited)?;
                    debug!(target: "wgbs.exec.supervisor", pid, code, "engine exited");
                    Ok(JobOutcome::Exited(code))
                }
                Err(e) => {
                    warn!(target: "wgbs.exec.supervisor", pid, error = %e, "wait failed; terminating engine process tree");
                    self.terminate_tree(&mut child, pid).await;
                    self.transition(JobState::Terminated)?;
                    Err(ExecError::Wait(e.to_string()))
                }
            },
            _ = cancel.cancelled() => {
                warn!(target: "wgbs.exec.supervisor", pid, "engine terminated by interruption");
                let observed = child.try_wait().ok().flatten().map(exit_code);
                if let Some(code) = observed {
                    warn!(target: "wgbs.exec.supervisor", pid, code, "engine return code");
                }
                self.terminate_tree(&mut child, pid).await;
                self.transition(JobState::Terminated)?;
                Ok(JobOutcome::Terminated { observed })
            }
        };

        self.drain(tees).await;
        outcome
    }

    fn spawn(&self, spec: &CommandSpec) -> ExecResult<Child> {
        let mut cmd = match spec.shell_script() {
            Some(script) => {
                let mut cmd = tokio::process::Command::new("sh");
                cmd.arg("-c").arg(script);
                cmd
            }
            None => {
                let mut cmd = tokio::process::Command::new(&spec.program);
                cmd.args(&spec.args);
                cmd
            }
        };

        for kv in spec.env.iter() {
            cmd.env(kv.key(), kv.value());
        }

        // A tty read from a background process group would stop the engine with SIGTTIN.
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        // Own process group: terminal signals reach the wrapper only, which
        // then runs the cascade itself.
        #[cfg(unix)]
        cmd.process_group(0);

        cmd.spawn()
            .map_err(|e| ExecError::Spawn(format!("{}: {e}", spec.program)))
    }

    fn attach_output(&self, child: &mut Child) -> Vec<JoinHandle<()>> {
        let log_file = |stream: &str| {
            let log = self.run_log.as_ref()?;
            match log.open_append() {
                Ok(f) => Some(tokio::fs::File::from_std(f)),
                Err(e) => {
                    warn!(target: "wgbs.exec.supervisor", stream, path = %log.path().display(), error = %e, "cannot open run log");
                    None
                }
            }
        };

        let mut tees = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            tees.push(spawn_tee("stdout", stdout, tokio::io::stdout(), log_file("stdout")));
        }
        if let Some(stderr) = child.stderr.take() {
            tees.push(spawn_tee("stderr", stderr, tokio::io::stderr(), log_file("stderr")));
        }
        tees
    }

    /// SIGTERM to each direct child of `pid`, then to `pid`; kill after the grace period.
    async fn terminate_tree(&self, child: &mut Child, pid: u32) {
        // Children first: once the engine dies they are reparented and can no longer be found.
        match self.tree.children(pid) {
            Ok(children) => {
                for c in children {
                    match self.tree.terminate(c) {
                        Ok(()) => info!(target: "wgbs.exec.supervisor", pid = c, parent = pid, "SIGTERM sent"),
                        Err(e) => warn!(target: "wgbs.exec.supervisor", pid = c, error = %e, "SIGTERM failed"),
                    }
                }
            }
            Err(e) => warn!(target: "wgbs.exec.supervisor", pid, error = %e, "cannot enumerate engine children"),
        }

        match self.tree.terminate(pid) {
            Ok(()) => info!(target: "wgbs.exec.supervisor", pid, "SIGTERM sent to engine"),
            Err(e) => warn!(target: "wgbs.exec.supervisor", pid, error = %e, "SIGTERM to engine failed"),
        }

        if tokio::time::timeout(self.cfg.grace, child.wait()).await.is_err() {
            warn!(target: "wgbs.exec.supervisor", pid, grace_ms = self.cfg.grace.as_millis() as u64, "engine ignored SIGTERM; killing");
            let _ = child.kill().await;
        }
    }

    async fn drain(&self, tees: Vec<JoinHandle<()>>) {
        for handle in tees {
            let abort = handle.abort_handle();
            if tokio::time::timeout(self.cfg.drain_timeout, handle).await.is_err() {
                debug!(target: "wgbs.exec.supervisor", "output still open after drain timeout; detaching");
                abort.abort();
            }
        }
    }
}

/// Map an outcome to the error taxonomy: nonzero exit is [`ExecError::ChildFailed`],
/// termination is [`ExecError::Interrupted`].
pub fn check_outcome(outcome: JobOutcome) -> ExecResult<()> {
    match outcome {
        JobOutcome::Exited(0) => Ok(()),
        JobOutcome::Exited(code) => Err(ExecError::ChildFailed { code }),
        JobOutcome::Terminated { .. } => Err(ExecError::Interrupted),
    }
}
