//! The acquisition loop
//!
//! [`ScopeRunner`] ties the pieces together on one thread. Each cycle:
//!
//! 1. checks the shutdown token
//! 2. acquires a frame (or only drains the device while paused)
//! 3. hands the frame to the render adapter
//! 4. polls the control peer once and applies its answer
//!
//! Parameters are a plain value replaced between cycles, so a cycle always
//! works on one consistent snapshot.

use std::io::{Read, Write};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::acquisition::AcquisitionEngine;
use crate::capture::CaptureDevice;
use crate::config::{EngineConfig, ScopeParameters};
use crate::control::{ControlChannel, ControlResponse};
use crate::error::{Result, ScopeError};
use crate::export;
use crate::render::{RenderAction, RenderAdapter, RenderBackend};
use crate::shutdown::ShutdownToken;
use crate::types::{CycleStats, Frame, Mode};

/// What is left once the runner has shut down
pub struct RunnerParts<D, S, B> {
    pub device: D,
    pub stream: S,
    pub backend: B,
    pub stats: CycleStats,
}

/// Single-threaded acquire / render / control loop
pub struct ScopeRunner<D, S, B>
where
    D: CaptureDevice,
    S: Read + Write,
    B: RenderBackend,
{
    engine: AcquisitionEngine<D>,
    channel: ControlChannel<S>,
    renderer: RenderAdapter<B>,
    params: ScopeParameters,
    last_frame: Frame,
    paused: bool,
    shutdown: ShutdownToken,
    frame_delay: Duration,
    malformed_backoff: Duration,
    stats: CycleStats,
}

impl<D, S, B> ScopeRunner<D, S, B>
where
    D: CaptureDevice,
    S: Read + Write,
    B: RenderBackend,
{
    /// Assemble a runner and configure the display for the engine's mode
    pub fn new(
        engine: AcquisitionEngine<D>,
        channel: ControlChannel<S>,
        mut renderer: RenderAdapter<B>,
        config: &EngineConfig,
        shutdown: ShutdownToken,
    ) -> Result<Self> {
        let params = ScopeParameters::default();
        renderer.initialize(engine.mode(), &params)?;

        Ok(Self {
            engine,
            channel,
            renderer,
            params,
            last_frame: Frame::default(),
            paused: false,
            shutdown,
            frame_delay: Duration::from_millis(config.frame_delay_ms),
            malformed_backoff: Duration::from_millis(config.malformed_backoff_ms),
            stats: CycleStats::default(),
        })
    }

    /// Run until shutdown is requested or a fatal error occurs
    ///
    /// Returns `Ok` for a requested shutdown. The caller tears down with
    /// [`ScopeRunner::shutdown`] in both cases.
    pub fn run(&mut self) -> Result<()> {
        info!("Oscilloscope running");
        loop {
            if self.shutdown.is_cancelled() {
                debug!("Shutdown requested after {} cycles", self.stats.cycles);
                return Ok(());
            }

            match self.cycle() {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => return Ok(()),
                Err(e) => {
                    error!("{}", e);
                    return Err(e);
                }
            }
        }
    }

    /// One loop iteration
    pub fn cycle(&mut self) -> Result<()> {
        let params = self.params;
        let mode = self.engine.mode();

        if self.paused {
            self.engine.pause_fill(&params)?;
            self.renderer.idle(self.frame_delay);
        } else {
            let frame = self.engine.step(&params)?;
            self.record(mode, &frame);
            let action = self.renderer.render(&frame, mode, &params)?;
            if action == RenderAction::FullPlot {
                self.log_stats();
            }
            self.last_frame = frame;
        }

        if self.shutdown.is_cancelled() {
            return Err(ScopeError::Cancelled);
        }

        match self.channel.poll() {
            Ok(response) => self.apply(response)?,
            Err(e) if !e.is_fatal() => {
                warn!("Communication error! Anomalous message found on socket... ({})", e);
                self.stats.malformed_responses += 1;
                self.renderer.idle(self.malformed_backoff);
                self.paused = false;
            }
            Err(e) => return Err(e),
        }

        self.renderer.end_cycle();
        self.stats.cycles += 1;
        Ok(())
    }

    fn apply(&mut self, response: ControlResponse) -> Result<()> {
        let mode = self.engine.mode();
        match response {
            ControlResponse::Update(params) => {
                debug!("New parameters: {:?}", params);
                self.params = params;
                self.engine.clear_history();
                self.renderer.reinitialize(mode, &self.params)?;
                self.renderer.plot_now(&self.last_frame, mode)?;
                self.paused = false;
            }
            ControlResponse::Pause => {
                self.paused = true;
            }
            ControlResponse::Save(path) => {
                match export::save_trace(&path, &self.last_frame.trace) {
                    Ok(_) => self.stats.saves += 1,
                    Err(e) => warn!("Failed to save trace: {}", e),
                }
                self.paused = false;
            }
            ControlResponse::SetMode(new_mode) => {
                self.engine.set_mode(new_mode);
                self.renderer.switch_mode(new_mode, &self.params)?;
                info!("Mode: {}", new_mode);
            }
            ControlResponse::NoOp => {
                self.paused = false;
            }
        }
        Ok(())
    }

    fn record(&mut self, mode: Mode, frame: &Frame) {
        if !mode.is_triggered() {
            return;
        }
        if frame.triggered {
            self.stats.triggered_frames += 1;
        } else {
            self.stats.untriggered_frames += 1;
        }
    }

    fn log_stats(&self) {
        let capture = self.engine.reader().device().stats();
        debug!(
            "Cycles: {}, trigger rate: {:.1}%, malformed: {}, saves: {}, blocks: {}, overruns: {}, avg wait: {:.0} us, jitter: {} us",
            self.stats.cycles,
            self.stats.trigger_rate(),
            self.stats.malformed_responses,
            self.stats.saves,
            capture.blocks_read,
            capture.overruns,
            capture.avg_wait_us(),
            capture.jitter_us()
        );
    }

    /// Current parameter snapshot
    pub fn params(&self) -> &ScopeParameters {
        &self.params
    }

    /// Active mode
    pub fn mode(&self) -> Mode {
        self.engine.mode()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The most recently rendered frame
    pub fn last_frame(&self) -> &Frame {
        &self.last_frame
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn renderer(&self) -> &RenderAdapter<B> {
        &self.renderer
    }

    /// Release everything in order
    ///
    /// A graceful shutdown asks the renderer to quit first; otherwise it is
    /// terminated straight away.
    pub fn shutdown(self, graceful: bool) -> RunnerParts<D, S, B> {
        let Self {
            engine,
            channel,
            mut renderer,
            stats,
            ..
        } = self;

        let device = engine.into_device();
        let stream = channel.into_inner();
        if graceful {
            renderer.shutdown();
            info!("everything stopped correctly.");
        } else {
            renderer.backend_mut().terminate();
        }
        RunnerParts {
            device,
            stream,
            backend: renderer.into_backend(),
            stats,
        }
    }
}
