//! Time-driven shader animation loop.
//!
//! The driver never loops on its own. The host owns the display-frame
//! callback: `start` asks it for one frame, and every `tick` the host delivers
//! renders exactly once and asks for the next. Stopping drops the pending
//! request, so a callback that fires late finds no matching token and does
//! nothing.
//!
//! ```text
//!   start ──▶ host.request_frame ──▶ (display refresh) ──▶ tick
//!                    ▲                                      │
//!                    └──── clock ▶ uTime ▶ backend.render ◀─┘
//! ```

use tracing::{debug, trace};

use crate::runtime::{BoxedClock, Clock};
use crate::scene::{PerspectiveCamera, Scene};
use crate::uniforms::UniformSet;

/// Identifies one outstanding frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(u64);

impl FrameToken {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Host facility that invokes the driver before the next display repaint.
pub trait FrameHost {
    /// Schedules one callback; the host later hands the token back to `tick`.
    fn request_frame(&mut self) -> FrameToken;
    /// Best-effort cancellation of a scheduled callback.
    fn cancel_frame(&mut self, token: FrameToken);
}

/// Rendering library entry point: draw `scene` as seen from `camera`.
pub trait RenderBackend {
    type Error;

    fn render(
        &mut self,
        scene: &Scene,
        camera: &PerspectiveCamera,
        uniforms: &UniformSet,
    ) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// One frame was rendered at `time` seconds.
    Rendered { time: f32, frame: u64 },
    /// The driver is stopped or the token was stale; nothing was rendered.
    Idle,
}

/// Owns the uniform set, the clock, and the scene/camera pair rendered every
/// frame.
pub struct AnimationDriver<C = BoxedClock> {
    uniforms: UniformSet,
    clock: C,
    scene: Scene,
    camera: PerspectiveCamera,
    pending: Option<FrameToken>,
    running: bool,
    last_time: f32,
    frames: u64,
}

impl<C: Clock> AnimationDriver<C> {
    pub fn new(uniforms: UniformSet, clock: C, scene: Scene, camera: PerspectiveCamera) -> Self {
        Self {
            uniforms,
            clock,
            scene,
            camera,
            pending: None,
            running: false,
            last_time: 0.0,
            frames: 0,
        }
    }

    /// Begins the frame loop. Returns false when it was already running, in
    /// which case no additional frame is requested.
    pub fn start<H: FrameHost + ?Sized>(&mut self, host: &mut H) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        let token = host.request_frame();
        self.pending = Some(token);
        debug!(token = token.id(), "animation driver started");
        true
    }

    /// Cancels the next scheduled frame. Safe to call when not running.
    pub fn stop<H: FrameHost + ?Sized>(&mut self, host: &mut H) {
        if let Some(token) = self.pending.take() {
            host.cancel_frame(token);
        }
        if self.running {
            debug!(frames = self.frames, "animation driver stopped");
        }
        self.running = false;
    }

    /// Handles one scheduled frame callback.
    ///
    /// Writes the clock reading into `uTime`, renders once, then requests the
    /// next frame. A render error stops the loop and is returned unchanged.
    pub fn tick<H, B>(
        &mut self,
        token: FrameToken,
        host: &mut H,
        backend: &mut B,
    ) -> Result<TickOutcome, B::Error>
    where
        H: FrameHost + ?Sized,
        B: RenderBackend + ?Sized,
    {
        if !self.running || self.pending != Some(token) {
            trace!(token = token.id(), "ignoring stale frame callback");
            return Ok(TickOutcome::Idle);
        }
        self.pending = None;

        let time = self.clock.elapsed().max(self.last_time);
        self.last_time = time;
        self.uniforms.set_time(time);

        if let Err(err) = backend.render(&self.scene, &self.camera, &self.uniforms) {
            self.running = false;
            return Err(err);
        }
        let frame = self.frames;
        self.frames += 1;
        trace!(frame, time, "rendered frame");

        self.pending = Some(host.request_frame());
        Ok(TickOutcome::Rendered { time, frame })
    }

    /// Redraws the current state while the loop is stopped, at the last time
    /// rendered. Leaves the clock and frame requests untouched.
    pub fn redraw<B>(&mut self, backend: &mut B) -> Result<TickOutcome, B::Error>
    where
        B: RenderBackend + ?Sized,
    {
        if self.running {
            return Ok(TickOutcome::Idle);
        }
        self.uniforms.set_time(self.last_time);
        backend.render(&self.scene, &self.camera, &self.uniforms)?;
        let frame = self.frames;
        self.frames += 1;
        trace!(frame, time = self.last_time, "redrew stopped frame");
        Ok(TickOutcome::Rendered {
            time: self.last_time,
            frame,
        })
    }

    /// Restarts the clock so the next frame renders at time zero.
    pub fn rewind(&mut self) {
        self.clock.reset();
        self.last_time = 0.0;
        self.uniforms.set_time(0.0);
        debug!("animation clock rewound");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending_frame(&self) -> Option<FrameToken> {
        self.pending
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn last_time(&self) -> f32 {
        self.last_time
    }

    pub fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    pub fn uniforms_mut(&mut self) -> &mut UniformSet {
        &mut self.uniforms
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut PerspectiveCamera {
        &mut self.camera
    }
}
