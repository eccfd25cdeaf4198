//! Frame to renderer translation
//!
//! [`RenderAdapter`] owns a backend and the render cadence. The runner hands
//! it one frame per unpaused cycle and tells it about parameter and mode
//! changes; the adapter decides what to send.

use std::time::Duration;

use crate::config::{EngineConfig, ScopeParameters};
use crate::error::Result;
use crate::types::{Frame, Mode};

use super::axes::{axis_setup, plot_style, screen_setup, voltmeter_labels, Setting};
use super::scheduler::{RenderAction, RenderScheduler};
use super::RenderBackend;

/// Pause after `q` before the renderer is killed
const QUIT_GRACE: Duration = Duration::from_millis(100);

/// Drives a [`RenderBackend`] from acquisition frames
pub struct RenderAdapter<B: RenderBackend> {
    backend: B,
    scheduler: RenderScheduler,
    frame_delay: Duration,
}

impl<B: RenderBackend> RenderAdapter<B> {
    pub fn new(backend: B, config: &EngineConfig) -> Self {
        Self {
            backend,
            scheduler: RenderScheduler::new(config.refresh_cycles, config.voltmeter_refresh_window),
            frame_delay: Duration::from_millis(config.frame_delay_ms),
        }
    }

    /// Configure a freshly started renderer for `mode`
    pub fn initialize(&mut self, mode: Mode, params: &ScopeParameters) -> Result<()> {
        self.apply(screen_setup())?;
        self.apply(axis_setup(mode, params))
    }

    /// Restart the renderer and configure it again
    pub fn reinitialize(&mut self, mode: Mode, params: &ScopeParameters) -> Result<()> {
        self.backend.restart()?;
        self.initialize(mode, params)
    }

    /// Present one frame according to the cadence
    pub fn render(
        &mut self,
        frame: &Frame,
        mode: Mode,
        params: &ScopeParameters,
    ) -> Result<RenderAction> {
        let action = self.scheduler.action();
        match action {
            RenderAction::FullPlot => {
                self.plot(frame, mode)?;
                self.scheduler.full_plot_done();
            }
            RenderAction::Restart => {
                tracing::trace!("Restarting renderer");
                self.reinitialize(mode, params)?;
            }
            RenderAction::Refresh => {
                if let Some(readout) = &frame.readout {
                    self.apply(voltmeter_labels(readout))?;
                    self.scheduler.fast_forward();
                }
                self.backend.refresh(&frame.trace)?;
            }
        }
        self.backend.wait(self.frame_delay);
        Ok(action)
    }

    /// Full plot outside the cadence (after a parameter update)
    pub fn plot_now(&mut self, frame: &Frame, mode: Mode) -> Result<()> {
        self.plot(frame, mode)?;
        self.backend.wait(self.frame_delay);
        Ok(())
    }

    /// Reconfigure for a new mode; the next cycle plots from scratch
    pub fn switch_mode(&mut self, mode: Mode, params: &ScopeParameters) -> Result<()> {
        self.reinitialize(mode, params)?;
        self.scheduler.force_full_plot();
        Ok(())
    }

    /// Sleep one frame delay (paused cycles)
    pub fn idle(&mut self, duration: Duration) {
        self.backend.wait(duration);
    }

    /// End of loop iteration
    pub fn end_cycle(&mut self) {
        self.scheduler.advance();
    }

    /// Ask the renderer to quit, then stop it
    pub fn shutdown(&mut self) {
        if let Err(e) = self.backend.execute("q") {
            tracing::debug!("Renderer did not take the quit command: {}", e);
        }
        self.backend.wait(QUIT_GRACE);
        self.backend.terminate();
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    fn plot(&mut self, frame: &Frame, mode: Mode) -> Result<()> {
        if let Some(readout) = &frame.readout {
            self.apply(voltmeter_labels(readout))?;
        }
        self.backend.plot(plot_style(mode), &frame.trace)
    }

    fn apply(&mut self, settings: impl IntoIterator<Item = Setting>) -> Result<()> {
        for setting in settings {
            match setting {
                Setting::Set(s) => self.backend.configure(&s)?,
                Setting::Unset(s) => self.backend.unset(&s)?,
            }
        }
        Ok(())
    }
}
