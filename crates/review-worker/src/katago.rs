//! KataGo analysis engine wrapper (JSON lines over stdin/stdout, async I/O)
//!
//! The process is owned by a single adapter task. Callers hand it one
//! request at a time over a bounded channel and wait for the matching answer
//! before sending the next, so at most one request is ever written without
//! its response having been read.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ProcessError, ReviewError};
use crate::protocol::{AnalysisRequest, AnalysisResponse};
use crate::sequencer::AnalysisExchange;

/// How long a closed engine gets to exit on its own before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type Outcome = Result<AnalysisResponse, ReviewError>;

/// Program and arguments used to launch the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl EngineCommand {
    /// `<program> analysis -config <config> -model <model> [extra...]`
    pub fn katago(program: &str, config_file: &str, model_file: &str, extra_args: &[String]) -> Self {
        let mut args = vec![
            "analysis".to_string(),
            "-config".to_string(),
            config_file.to_string(),
            "-model".to_string(),
            model_file.to_string(),
        ];
        args.extend(extra_args.iter().cloned());
        Self {
            program: program.to_string(),
            args,
        }
    }
}

/// Handle to a running engine adapter.
pub struct EngineSession {
    requests: Option<mpsc::Sender<AnalysisRequest>>,
    responses: mpsc::Receiver<Outcome>,
    adapter: Option<JoinHandle<()>>,
    drain: Option<JoinHandle<()>>,
    pid: Option<u32>,
}

impl EngineSession {
    /// Launch the engine process and start the adapter.
    pub fn spawn(command: &EngineCommand) -> Result<Self, ReviewError> {
        info!(program = %command.program, args = ?command.args, "Starting KataGo");

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let pid = child.id();
        info!(pid = ?pid, "KataGo started");

        let stdin = child.stdin.take().ok_or(ProcessError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(ProcessError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(ProcessError::MissingPipe("stderr"))?;

        let mut session = Self::start(stdin, stdout, Some(child), Some(stderr));
        session.pid = pid;
        Ok(session)
    }

    /// Run the adapter over arbitrary pipes instead of a child process.
    pub fn from_io<W, R>(writer: W, reader: R) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self::start(writer, reader, None, None)
    }

    fn start<W, R>(writer: W, reader: R, child: Option<Child>, stderr: Option<ChildStderr>) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel(1);
        let (response_tx, response_rx) = mpsc::channel(1);

        let adapter = tokio::spawn(async move {
            let exit = run_adapter(writer, reader, request_rx, response_tx).await;
            if let Some(child) = child {
                terminate(child, exit).await;
            }
        });
        let drain = stderr.map(|stderr| tokio::spawn(drain_diagnostics(stderr)));

        Self {
            requests: Some(request_tx),
            responses: response_rx,
            adapter: Some(adapter),
            drain,
            pid: None,
        }
    }

    /// OS process id of the engine, when it was spawned as a child.
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Close the engine's input and wait for the adapter to finish.
    pub async fn shutdown(mut self) {
        self.requests.take();
        if let Some(mut adapter) = self.adapter.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut adapter).await.is_err() {
                warn!("Engine adapter did not stop, aborting");
                adapter.abort();
            }
        }
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }
    }
}

impl AnalysisExchange for EngineSession {
    async fn exchange(&mut self, request: AnalysisRequest) -> Result<AnalysisResponse, ReviewError> {
        let sender = self.requests.as_ref().ok_or(ProcessError::AdapterGone)?;
        sender
            .send(request)
            .await
            .map_err(|_| ProcessError::AdapterGone)?;
        self.responses
            .recv()
            .await
            .unwrap_or_else(|| Err(ProcessError::AdapterGone.into()))
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        // Aborting the adapter drops the child, which kills it.
        if let Some(adapter) = self.adapter.take() {
            adapter.abort();
        }
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }
    }
}

/// Why the adapter stopped serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdapterExit {
    /// The caller closed the request channel.
    Closed,
    /// An exchange failed or its answer could not be delivered.
    Failed,
}

/// Serve requests one at a time until the caller hangs up or an exchange fails.
async fn run_adapter<W, R>(
    mut writer: W,
    reader: R,
    mut requests: mpsc::Receiver<AnalysisRequest>,
    responses: mpsc::Sender<Outcome>,
) -> AdapterExit
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    while let Some(request) = requests.recv().await {
        let outcome = exchange_line(&mut writer, &mut reader, &request).await;
        let failed = outcome.is_err();
        if responses.send(outcome).await.is_err() || failed {
            debug!("Engine adapter stopped after a failure");
            return AdapterExit::Failed;
        }
    }
    debug!("Engine adapter stopped");
    AdapterExit::Closed
}

/// Write one request line and read lines until its answer arrives.
async fn exchange_line<W, R>(
    writer: &mut W,
    reader: &mut R,
    request: &AnalysisRequest,
) -> Result<AnalysisResponse, ReviewError>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    let line = serde_json::to_string(request)?;
    debug!(line, "KG <");
    writer
        .write_all(format!("{line}\n").as_bytes())
        .await
        .map_err(ProcessError::Write)?;
    writer.flush().await.map_err(ProcessError::Write)?;

    let mut line = String::new();
    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(ProcessError::Read)?;
        if read == 0 {
            return Err(ProcessError::Closed.into());
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        debug!(line = trimmed, "KG >");

        let response = AnalysisResponse::parse(trimmed)?;
        if response.is_warning_only() && response.id == request.id {
            warn!(
                id = %response.id,
                warning = response.warning.as_deref().unwrap_or_default(),
                "Engine warning"
            );
            continue;
        }
        return Ok(response);
    }
}

/// Forward engine stderr to the log so the pipe never fills up.
async fn drain_diagnostics(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => debug!(target: "katago", "{line}"),
            Ok(None) => break,
            Err(e) => {
                debug!(target: "katago", error = %e, "stderr read failed");
                break;
            }
        }
    }
}

/// Give the engine a chance to exit after its input closed, then kill it.
/// An engine whose exchange failed is killed straight away.
async fn terminate(mut child: Child, exit: AdapterExit) {
    if exit == AdapterExit::Failed {
        warn!("Killing KataGo after a failed exchange");
        let _ = child.start_kill();
        let _ = child.wait().await;
        return;
    }
    match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
        Ok(Ok(status)) => info!(%status, "KataGo exited"),
        Ok(Err(e)) => warn!(error = %e, "Failed to wait for KataGo"),
        Err(_) => {
            warn!("KataGo did not exit, killing it");
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}
