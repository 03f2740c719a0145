//! Background jobs: one OS process per request, with callbacks keyed by job id.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use crate::OpsError;
use crate::counter::{OpCounter, OpGuard};

/// Identity of a running job, unique within one runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A program invocation. Arguments are passed directly, never through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
}

impl JobCommand {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl fmt::Display for JobCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobExit {
    /// Exit code; `None` when killed by a signal or the wait itself failed.
    pub code: Option<i32>,
}

impl JobExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for JobExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit {code}"),
            None => write!(f, "terminated"),
        }
    }
}

/// An event delivered back to the event loop.
///
/// For one job, output and error chunks always precede its exit. Events of
/// different jobs interleave freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Output { id: JobId, chunk: String },
    Error { id: JobId, chunk: String },
    Exit { id: JobId, exit: JobExit },
}

impl JobEvent {
    pub fn id(&self) -> JobId {
        match self {
            Self::Output { id, .. } | Self::Error { id, .. } | Self::Exit { id, .. } => *id,
        }
    }
}

/// Handler for output or error chunks.
pub type ChunkHandler<H> = Box<dyn FnMut(&mut H, JobId, &str)>;

/// Handler run once when a job exits.
pub type ExitHandler<H> = Box<dyn FnOnce(&mut H, JobId, JobExit)>;

/// The callback triple for one job. Missing handlers discard their events.
pub struct JobCallbacks<H> {
    on_output: Option<ChunkHandler<H>>,
    on_error: Option<ChunkHandler<H>>,
    on_exit: Option<ExitHandler<H>>,
}

impl<H> Default for JobCallbacks<H> {
    fn default() -> Self {
        Self {
            on_output: None,
            on_error: None,
            on_exit: None,
        }
    }
}

impl<H> JobCallbacks<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_output(mut self, f: impl FnMut(&mut H, JobId, &str) + 'static) -> Self {
        self.on_output = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnMut(&mut H, JobId, &str) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_exit(mut self, f: impl FnOnce(&mut H, JobId, JobExit) + 'static) -> Self {
        self.on_exit = Some(Box::new(f));
        self
    }
}

impl<H> fmt::Debug for JobCallbacks<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobCallbacks")
            .field("on_output", &self.on_output.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_exit", &self.on_exit.is_some())
            .finish()
    }
}

#[derive(Debug)]
struct JobRecord<H> {
    command: String,
    terminal: bool,
    callbacks: JobCallbacks<H>,
    counter: OpCounter,
}

/// Starts jobs and owns their callback records until they exit.
///
/// `H` is the host the callbacks run against; it owns the runner and is
/// handed to every callback, so a callback can start follow-up jobs.
pub struct JobRunner<H> {
    next_id: u64,
    jobs: HashMap<JobId, JobRecord<H>>,
    events_tx: mpsc::UnboundedSender<JobEvent>,
    events_rx: mpsc::UnboundedReceiver<JobEvent>,
}

impl<H> Default for JobRunner<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> fmt::Debug for JobRunner<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRunner")
            .field("next_id", &self.next_id)
            .field("running", &self.jobs.len())
            .finish()
    }
}

impl<H> JobRunner<H> {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            next_id: 0,
            jobs: HashMap::new(),
            events_tx,
            events_rx,
        }
    }

    /// Start `command` in the background and count it on `counter`.
    ///
    /// Terminal jobs share the host's stdio and only report their exit.
    /// Must be called from within a tokio runtime.
    pub fn start(
        &mut self,
        command: JobCommand,
        terminal: bool,
        callbacks: JobCallbacks<H>,
        counter: &OpCounter,
    ) -> Result<JobId, OpsError> {
        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args);
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }
        if terminal {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        }

        let label = command.to_string();
        let mut child = cmd.spawn().map_err(|source| OpsError::Spawn {
            command: label.clone(),
            source,
        })?;

        self.next_id += 1;
        let id = JobId(self.next_id);

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let out_task = stdout.map(|s| tokio::spawn(forward_chunks(s, id, tx.clone(), false)));
            let err_task = stderr.map(|s| tokio::spawn(forward_chunks(s, id, tx.clone(), true)));

            let status = child.wait().await;

            // Drain both pipes before reporting the exit.
            if let Some(task) = out_task {
                let _ = task.await;
            }
            if let Some(task) = err_task {
                let _ = task.await;
            }

            let exit = match status {
                Ok(status) => JobExit {
                    code: status.code(),
                },
                Err(e) => {
                    tracing::warn!(job = %id, error = %e, "failed to wait for job");
                    JobExit { code: None }
                }
            };
            let _ = tx.send(JobEvent::Exit { id, exit });
        });

        counter.increment();
        tracing::debug!(job = %id, command = %label, terminal, "job started");
        self.jobs.insert(
            id,
            JobRecord {
                command: label,
                terminal,
                callbacks,
                counter: counter.clone(),
            },
        );
        Ok(id)
    }

    /// Number of jobs that have not delivered their exit yet.
    pub fn running(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_running(&self, id: JobId) -> bool {
        self.jobs.contains_key(&id)
    }

    /// Whether a job shares the host's terminal.
    pub fn is_terminal(&self, id: JobId) -> bool {
        self.jobs.get(&id).is_some_and(|r| r.terminal)
    }

    /// Wait for the next event from any job.
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        self.events_rx.recv().await
    }

    /// Take the next event if one is already queued.
    pub fn try_next_event(&mut self) -> Option<JobEvent> {
        self.events_rx.try_recv().ok()
    }
}

async fn forward_chunks<R: AsyncRead + Unpin>(
    reader: R,
    id: JobId,
    tx: mpsc::UnboundedSender<JobEvent>,
    is_error: bool,
) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let chunk = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\n', '\r'])
                    .to_string();
                let event = if is_error {
                    JobEvent::Error { id, chunk }
                } else {
                    JobEvent::Output { id, chunk }
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(job = %id, error = %e, "job pipe closed with error");
                break;
            }
        }
    }
}

/// Implemented by whatever owns a [`JobRunner`] and receives its callbacks.
pub trait JobHost: Sized {
    fn runner(&mut self) -> &mut JobRunner<Self>;
}

/// Route one event to the handlers of its job.
///
/// The exit handler runs exactly once and its record is removed before it
/// runs; the job's counter is released after it returns, or while unwinding
/// if it panics. Events for unknown jobs are dropped.
pub fn dispatch<H: JobHost>(host: &mut H, event: JobEvent) {
    match event {
        JobEvent::Output { id, chunk } => deliver_chunk(host, id, &chunk, false),
        JobEvent::Error { id, chunk } => deliver_chunk(host, id, &chunk, true),
        JobEvent::Exit { id, exit } => {
            let Some(record) = host.runner().jobs.remove(&id) else {
                tracing::debug!(job = %id, "exit for unknown job");
                return;
            };
            let JobRecord {
                command,
                callbacks,
                counter,
                ..
            } = record;
            let _release = OpGuard::adopt(counter);

            if exit.success() {
                tracing::debug!(job = %id, command = %command, "job finished");
            } else {
                tracing::debug!(job = %id, command = %command, %exit, "job failed");
            }
            if let Some(on_exit) = callbacks.on_exit {
                on_exit(host, id, exit);
            }
        }
    }
}

fn deliver_chunk<H: JobHost>(host: &mut H, id: JobId, chunk: &str, is_error: bool) {
    let handler = host.runner().jobs.get_mut(&id).and_then(|record| {
        if is_error {
            record.callbacks.on_error.take()
        } else {
            record.callbacks.on_output.take()
        }
    });
    let Some(mut handler) = handler else {
        return;
    };

    handler(host, id, chunk);

    if let Some(record) = host.runner().jobs.get_mut(&id) {
        let slot = if is_error {
            &mut record.callbacks.on_error
        } else {
            &mut record.callbacks.on_output
        };
        *slot = Some(handler);
    }
}

/// Dispatch events until `counter` is zero, failing after `timeout`.
pub async fn pump_until_quiescent<H: JobHost>(
    host: &mut H,
    counter: &OpCounter,
    timeout: Duration,
) -> Result<(), OpsError> {
    let deadline = tokio::time::Instant::now() + timeout;
    while !counter.is_quiescent() {
        let event = tokio::time::timeout_at(deadline, host.runner().next_event())
            .await
            .map_err(|_| OpsError::Timeout {
                pending: counter.count(),
            })?;
        match event {
            Some(event) => dispatch(host, event),
            None => break,
        }
    }
    Ok(())
}

/// Dispatch events until every job of the runner has exited.
pub async fn drain<H: JobHost>(host: &mut H, timeout: Duration) -> Result<(), OpsError> {
    let deadline = tokio::time::Instant::now() + timeout;
    while host.runner().running() > 0 {
        let event = match tokio::time::timeout_at(deadline, host.runner().next_event()).await {
            Ok(event) => event,
            Err(_) => {
                return Err(OpsError::Timeout {
                    pending: host.runner().running(),
                });
            }
        };
        match event {
            Some(event) => dispatch(host, event),
            None => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display() {
        let cmd = JobCommand::new("cp").arg("-R").args(["/a", "/b"]);
        assert_eq!(cmd.to_string(), "cp -R /a /b");
    }

    #[test]
    fn test_exit_success() {
        assert!(JobExit { code: Some(0) }.success());
        assert!(!JobExit { code: Some(1) }.success());
        assert!(!JobExit { code: None }.success());
        assert_eq!(JobExit { code: Some(2) }.to_string(), "exit 2");
    }
}
