//! gnuplot backend
//!
//! Commands go to the child's stdin, one per line. Point sets are written
//! to a side data file before the command that reads them is sent. Each
//! write replaces the file by rename, so a renderer still reading an older
//! point set keeps its own copy and never sees a truncated file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{Result, ScopeError};
use crate::export::write_trace_file;
use crate::types::Trace;

use super::RenderBackend;

/// How long a renderer gets to exit on its own once its input is closed
const EXIT_GRACE: Duration = Duration::from_millis(200);

/// Renderer driven over a stdin pipe
pub struct GnuplotBackend {
    program: String,
    args: Vec<String>,
    data_file: PathBuf,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    pipe_broken: bool,
    restarts: u64,
}

impl GnuplotBackend {
    /// Start the renderer named in the config
    ///
    /// `renderer_command` is split on whitespace into program and arguments.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let mut parts = config.renderer_command.split_whitespace().map(String::from);
        let program = parts
            .next()
            .ok_or_else(|| ScopeError::Render("renderer command is empty".to_string()))?;
        Self::spawn(program, parts.collect(), config.data_file.clone())
    }

    /// Start `program args...` as the renderer
    pub fn spawn(program: String, args: Vec<String>, data_file: PathBuf) -> Result<Self> {
        let mut backend = Self {
            program,
            args,
            data_file,
            child: None,
            stdin: None,
            pipe_broken: false,
            restarts: 0,
        };
        backend.start()?;
        Ok(backend)
    }

    /// Side data file the renderer plots from
    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    /// Number of restarts so far
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    /// Whether the renderer process is alive
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut().map(|c| c.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                debug!("Renderer exited with status: {}", status);
                false
            }
            Some(Err(e)) => {
                warn!("Failed to check renderer status: {}", e);
                false
            }
            None => false,
        }
    }

    fn start(&mut self) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                ScopeError::Render(format!("Failed to start renderer '{}': {}", self.program, e))
            })?;

        self.stdin = child.stdin.take();
        self.child = Some(child);
        self.pipe_broken = false;
        debug!("Started renderer '{}'", self.program);
        Ok(())
    }

    fn stop(&mut self) {
        // Closing stdin lets the renderer exit by itself
        self.stdin = None;

        let Some(mut child) = self.child.take() else {
            return;
        };

        let deadline = Instant::now() + EXIT_GRACE;
        loop {
            match child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(5));
                }
                _ => break,
            }
        }

        let _ = child.kill();
        if let Err(e) = child.wait() {
            warn!("Error waiting for renderer to stop: {}", e);
        }
    }

    fn send(&mut self, line: &str) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ScopeError::Render("renderer is not running".to_string()))?;

        let result = stdin
            .write_all(line.as_bytes())
            .and_then(|_| stdin.write_all(b"\n"))
            .and_then(|_| stdin.flush());

        // A dead renderer is replaced at the next restart
        if let Err(e) = result {
            if !self.pipe_broken {
                warn!("Renderer pipe closed: {}", e);
                self.pipe_broken = true;
            }
        }
        Ok(())
    }

    fn publish(&self, trace: &Trace) -> Result<()> {
        write_trace_file(&self.data_file, trace)
            .map(|_| ())
            .map_err(|e| ScopeError::Render(format!("Failed to publish point set: {}", e)))
    }

    /// Start the next renderer on an empty data file
    fn recreate_data_file(&self) -> Result<()> {
        self.remove_data_file();
        self.publish(&Trace::new())
    }

    fn remove_data_file(&self) {
        if let Err(e) = std::fs::remove_file(&self.data_file) {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!("Could not remove {:?}: {}", self.data_file, e);
            }
        }
    }
}

impl RenderBackend for GnuplotBackend {
    fn configure(&mut self, setting: &str) -> Result<()> {
        self.send(&format!("set {}", setting))
    }

    fn unset(&mut self, setting: &str) -> Result<()> {
        self.send(&format!("unset {}", setting))
    }

    fn plot(&mut self, style: &str, trace: &Trace) -> Result<()> {
        self.publish(trace)?;
        let command = format!("plot \"{}\" {}", self.data_file.display(), style);
        self.send(&command)
    }

    fn refresh(&mut self, trace: &Trace) -> Result<()> {
        self.publish(trace)?;
        self.send("rep")
    }

    fn execute(&mut self, command: &str) -> Result<()> {
        self.send(command)
    }

    fn restart(&mut self) -> Result<()> {
        self.stop();
        self.restarts += 1;
        self.recreate_data_file()?;
        self.start()
    }

    fn terminate(&mut self) {
        self.stop();
        self.remove_data_file();
    }
}

impl Drop for GnuplotBackend {
    fn drop(&mut self) {
        self.stop();
    }
}
