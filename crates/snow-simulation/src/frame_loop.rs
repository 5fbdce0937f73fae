//! Frame loop orchestrator
//!
//! Each tick: ask the scheduler how many steps are owed, refresh the uniforms,
//! run and commit the owed steps one at a time, render the settled state exactly
//! once and ask the host for the next tick.
//!
//! Everything here runs on one thread. The only suspension points are inside
//! `ComputeStage::step` and `RenderStage::render`, which return once the device
//! has finished; role bookkeeping and scheduling happen in between and are
//! synchronous. A commit therefore either happened completely or not at all,
//! and the renderer only ever sees the settled slot.

use crate::compute::ComputeStage;
use crate::config::SimulationConfig;
use crate::double_buffer::{PingPong, Slot};
use crate::error::{ConfigError, DeviceError, LoopError, SimulationError};
use crate::host::{FrameHost, TickToken};
use crate::render::{CameraView, PresentationTarget, RenderStage};
use crate::scheduler::{SchedulerState, TimestepScheduler, TimingAnomaly};
use crate::uniforms::Uniforms;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    /// Terminal; a stopped loop never issues device work again.
    Stopped,
}

/// What a call to `FrameLoop::tick` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickReport {
    /// Stale token, or the loop is not running; nothing was issued.
    Skipped,
    Rendered {
        steps: u64,
        catch_up: Option<TimingAnomaly>,
        settled: Slot,
    },
    /// Steps ran but the target had no frame to draw into; the loop keeps going.
    FrameDropped {
        steps: u64,
        catch_up: Option<TimingAnomaly>,
        settled: Slot,
    },
}

pub struct FrameLoop<S, C, R, P, H> {
    state: PingPong<S>,
    compute: C,
    render: R,
    target: P,
    host: H,

    scheduler: TimestepScheduler,
    schedule: SchedulerState,
    timestep_s: f32,
    grid_resolution: u32,
    uniforms: Uniforms,

    lifecycle: LoopState,
    pending: Option<TickToken>,
}

impl<S, C, R, P, H> FrameLoop<S, C, R, P, H>
where
    C: ComputeStage<S>,
    P: PresentationTarget,
    R: RenderStage<S, P::Frame>,
    H: FrameHost,
{
    pub fn new(
        config: &SimulationConfig,
        state: PingPong<S>,
        compute: C,
        render: R,
        target: P,
        host: H,
    ) -> Result<Self, ConfigError> {
        let scheduler = TimestepScheduler::new(config.timestep(), config.max_drift())?;

        Ok(Self {
            state,
            compute,
            render,
            target,
            host,
            scheduler,
            schedule: SchedulerState::default(),
            timestep_s: config.timestep_s(),
            grid_resolution: config.grid_resolution(),
            uniforms: Uniforms::default(),
            lifecycle: LoopState::Idle,
            pending: None,
        })
    }

    /// Begin ticking. Returns the token of the first requested tick.
    pub fn start(&mut self) -> Result<TickToken, LoopError> {
        match self.lifecycle {
            LoopState::Idle => {
                self.schedule = SchedulerState::starting_at(self.host.now());
                self.lifecycle = LoopState::Running;
                let token = self.host.request_tick();
                self.pending = Some(token);
                log::info!(
                    "Frame loop started (timestep {:?}, max drift {:?})",
                    self.scheduler.timestep(),
                    self.scheduler.max_drift()
                );
                Ok(token)
            }
            LoopState::Running => match self.pending {
                Some(token) => Ok(token),
                None => {
                    let token = self.host.request_tick();
                    self.pending = Some(token);
                    Ok(token)
                }
            },
            LoopState::Stopped => Err(LoopError::Terminated),
        }
    }

    /// Stop ticking and cancel the pending tick. No-op unless running.
    pub fn stop(&mut self) {
        if self.lifecycle != LoopState::Running {
            return;
        }
        if let Some(token) = self.pending.take() {
            self.host.cancel_tick(token);
        }
        self.lifecycle = LoopState::Stopped;
        log::info!(
            "Frame loop stopped after {} steps ({} committed)",
            self.schedule.steps,
            self.state.commits()
        );
    }

    /// Run one tick for `token`.
    ///
    /// A device error stops the loop before anything further is committed or
    /// rendered and is returned to the caller.
    pub fn tick(
        &mut self,
        token: TickToken,
        camera: &impl CameraView,
    ) -> Result<TickReport, SimulationError> {
        if self.lifecycle != LoopState::Running || self.pending != Some(token) {
            log::debug!("Ignoring tick {:?} in state {:?}", token, self.lifecycle);
            return Ok(TickReport::Skipped);
        }
        self.pending = None;

        match self.run_tick(camera) {
            Ok(report) => {
                self.pending = Some(self.host.request_tick());
                Ok(report)
            }
            Err(error) => {
                log::error!(
                    "Device error, stopping frame loop at step {}: {}",
                    self.schedule.steps,
                    error
                );
                self.lifecycle = LoopState::Stopped;
                Err(error.into())
            }
        }
    }

    fn run_tick(&mut self, camera: &impl CameraView) -> Result<TickReport, DeviceError> {
        let plan = self.scheduler.steps_owed(self.host.now(), self.schedule);

        // The catch-up jump counts as done; owed steps are counted as they commit.
        let mut schedule = SchedulerState {
            steps: plan.state.steps - plan.steps,
            ..plan.state
        };
        self.schedule = schedule;

        self.uniforms = Uniforms::new(
            camera.view_projection(),
            camera.inverse_view_projection(),
            self.timestep_s,
            self.grid_resolution,
        );
        self.compute.write_uniforms(&self.uniforms)?;

        for _ in 0..plan.steps {
            let (settled, working) = self.state.split_mut();
            self.compute.step(settled, working, &self.uniforms)?;
            self.state.commit();

            schedule.steps += 1;
            self.schedule = schedule;
        }

        let Some(frame) = self.target.acquire()? else {
            log::debug!("No frame available, skipping render");
            return Ok(TickReport::FrameDropped {
                steps: plan.steps,
                catch_up: plan.catch_up,
                settled: self.state.settled_slot(),
            });
        };
        self.render
            .render(self.state.settled(), &self.uniforms, &frame)?;
        self.target.present(frame);

        log::debug!(
            "Tick: {} steps, settled {:?}, total {}",
            plan.steps,
            self.state.settled_slot(),
            self.schedule.steps
        );

        Ok(TickReport::Rendered {
            steps: plan.steps,
            catch_up: plan.catch_up,
            settled: self.state.settled_slot(),
        })
    }

    pub fn lifecycle(&self) -> LoopState {
        self.lifecycle
    }

    pub fn pending_tick(&self) -> Option<TickToken> {
        self.pending
    }

    pub fn state(&self) -> &PingPong<S> {
        &self.state
    }

    pub fn schedule(&self) -> SchedulerState {
        self.schedule
    }

    pub fn uniforms(&self) -> &Uniforms {
        &self.uniforms
    }

    pub fn compute(&self) -> &C {
        &self.compute
    }

    pub fn renderer(&self) -> &R {
        &self.render
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.render
    }

    pub fn target(&self) -> &P {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut P {
        &mut self.target
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}
