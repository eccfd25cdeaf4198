//! Rendering
//!
//! The engine does not draw anything itself. It drives an external plotting
//! program through a small command set and hands it point sets through a
//! side data file.
//!
//! # Main Types
//!
//! - [`RenderBackend`] - The command set a renderer has to support
//! - [`GnuplotBackend`] - Drives a `gnuplot` child process
//! - [`NullBackend`] - Headless backend for `--no-render` runs and tests
//! - [`RenderScheduler`] - Full-redraw / restart / refresh cadence
//! - [`RenderAdapter`] - Turns frames and parameters into backend calls

pub mod adapter;
pub mod axes;
pub mod gnuplot;
pub mod scheduler;

pub use adapter::RenderAdapter;
pub use axes::{axis_setup, plot_style, screen_setup, voltmeter_labels, Setting};
pub use gnuplot::GnuplotBackend;
pub use scheduler::{RenderAction, RenderScheduler};

use std::time::Duration;

use crate::error::Result;
use crate::types::Trace;

/// Operations an external renderer must support
pub trait RenderBackend {
    /// `set <setting>`
    fn configure(&mut self, setting: &str) -> Result<()>;

    /// `unset <setting>`
    fn unset(&mut self, setting: &str) -> Result<()>;

    /// Publish `trace` and draw it with `style`
    fn plot(&mut self, style: &str, trace: &Trace) -> Result<()>;

    /// Publish `trace` and redraw with the last plot command
    fn refresh(&mut self, trace: &Trace) -> Result<()>;

    /// Send a raw command line
    fn execute(&mut self, command: &str) -> Result<()>;

    /// Pause the caller
    fn wait(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }

    /// Throw away the renderer state and start a fresh renderer
    fn restart(&mut self) -> Result<()>;

    /// Stop the renderer for good
    fn terminate(&mut self);
}

/// A backend call, as recorded by [`NullBackend::recording`]
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Set(String),
    Unset(String),
    Plot { style: String, points: usize },
    Refresh { points: usize },
    Execute(String),
    Restart,
    Terminate,
}

/// Backend that draws nothing
///
/// In recording mode every call is kept so the render sequence can be
/// inspected.
#[derive(Debug, Default)]
pub struct NullBackend {
    record: bool,
    commands: Vec<RenderCommand>,
    frames: u64,
}

impl NullBackend {
    /// Discard everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep a log of every call
    pub fn recording() -> Self {
        Self {
            record: true,
            ..Self::default()
        }
    }

    /// Recorded calls, oldest first
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Drain the recorded calls
    pub fn take_commands(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Point sets published so far (plots and refreshes)
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn push(&mut self, command: RenderCommand) {
        if self.record {
            self.commands.push(command);
        }
    }
}

impl RenderBackend for NullBackend {
    fn configure(&mut self, setting: &str) -> Result<()> {
        self.push(RenderCommand::Set(setting.to_string()));
        Ok(())
    }

    fn unset(&mut self, setting: &str) -> Result<()> {
        self.push(RenderCommand::Unset(setting.to_string()));
        Ok(())
    }

    fn plot(&mut self, style: &str, trace: &Trace) -> Result<()> {
        self.frames += 1;
        self.push(RenderCommand::Plot {
            style: style.to_string(),
            points: trace.len(),
        });
        Ok(())
    }

    fn refresh(&mut self, trace: &Trace) -> Result<()> {
        self.frames += 1;
        self.push(RenderCommand::Refresh {
            points: trace.len(),
        });
        Ok(())
    }

    fn execute(&mut self, command: &str) -> Result<()> {
        self.push(RenderCommand::Execute(command.to_string()));
        Ok(())
    }

    fn restart(&mut self) -> Result<()> {
        self.push(RenderCommand::Restart);
        Ok(())
    }

    fn terminate(&mut self) {
        self.push(RenderCommand::Terminate);
    }
}

impl<B: RenderBackend + ?Sized> RenderBackend for Box<B> {
    fn configure(&mut self, setting: &str) -> Result<()> {
        (**self).configure(setting)
    }

    fn unset(&mut self, setting: &str) -> Result<()> {
        (**self).unset(setting)
    }

    fn plot(&mut self, style: &str, trace: &Trace) -> Result<()> {
        (**self).plot(style, trace)
    }

    fn refresh(&mut self, trace: &Trace) -> Result<()> {
        (**self).refresh(trace)
    }

    fn execute(&mut self, command: &str) -> Result<()> {
        (**self).execute(command)
    }

    fn wait(&mut self, duration: Duration) {
        (**self).wait(duration)
    }

    fn restart(&mut self) -> Result<()> {
        (**self).restart()
    }

    fn terminate(&mut self) {
        (**self).terminate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_backend_discards() {
        let mut backend = NullBackend::new();
        backend.configure("key").unwrap();
        backend.refresh(&Trace::new()).unwrap();
        assert!(backend.commands().is_empty());
        assert_eq!(backend.frames(), 1);
    }

    #[test]
    fn test_null_backend_records() {
        let mut backend = NullBackend::recording();
        backend.configure("grid").unwrap();
        backend.unset("key").unwrap();
        backend.execute("q").unwrap();
        backend.terminate();

        assert_eq!(
            backend.take_commands(),
            vec![
                RenderCommand::Set("grid".to_string()),
                RenderCommand::Unset("key".to_string()),
                RenderCommand::Execute("q".to_string()),
                RenderCommand::Terminate,
            ]
        );
        assert!(backend.commands().is_empty());
    }
}
