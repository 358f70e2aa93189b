use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::driver::{FrameHost, FrameToken, TickOutcome};
use crate::gpu::{GpuState, RenderError};
use crate::panel::{PanelCommand, PanelError};
use crate::runtime::FramePacer;
use crate::scene::apply_resize;
use crate::session::Session;
use crate::types::RendererConfig;

#[derive(Debug, Clone, Copy)]
enum UserEvent {
    /// New lines are waiting on the panel command channel.
    PanelInput,
}

/// Token bookkeeping for the single redraw a window can have outstanding.
#[derive(Debug, Default)]
struct FrameRequests {
    next_id: u64,
    outstanding: Option<FrameToken>,
}

impl FrameRequests {
    fn issue(&mut self) -> FrameToken {
        self.next_id += 1;
        let token = FrameToken::new(self.next_id);
        self.outstanding = Some(token);
        token
    }

    fn cancel(&mut self, token: FrameToken) {
        if self.outstanding == Some(token) {
            self.outstanding = None;
        }
    }

    fn outstanding(&self) -> Option<FrameToken> {
        self.outstanding
    }
}

/// Frame host backed by winit redraw requests.
///
/// A request only records a token; the event loop turns it into
/// `Window::request_redraw` once the frame pacer allows another frame.
struct WindowHost {
    window: Arc<Window>,
    requests: FrameRequests,
    refresh: bool,
}

impl WindowHost {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            requests: FrameRequests::default(),
            refresh: false,
        }
    }

    /// Asks for one redraw outside the animation loop, used while paused.
    fn request_refresh(&mut self) {
        self.refresh = true;
        self.window.request_redraw();
    }

    fn take_refresh(&mut self) -> bool {
        std::mem::take(&mut self.refresh)
    }

    fn outstanding(&self) -> Option<FrameToken> {
        self.requests.outstanding()
    }

    fn redraw(&self) {
        self.window.request_redraw();
    }
}

impl FrameHost for WindowHost {
    fn request_frame(&mut self) -> FrameToken {
        self.requests.issue()
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        self.requests.cancel(token);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    TogglePause,
    SelectNext,
    Increase,
    Decrease,
    Rewind,
    Exit,
}

fn key_action(key: &Key) -> Option<KeyAction> {
    match key {
        Key::Named(NamedKey::Space) => Some(KeyAction::TogglePause),
        Key::Character(value) if value.as_str() == " " => Some(KeyAction::TogglePause),
        Key::Named(NamedKey::Tab) => Some(KeyAction::SelectNext),
        Key::Named(NamedKey::ArrowUp) => Some(KeyAction::Increase),
        Key::Named(NamedKey::ArrowDown) => Some(KeyAction::Decrease),
        Key::Character(value) if value.eq_ignore_ascii_case("r") => Some(KeyAction::Rewind),
        Key::Named(NamedKey::Escape) => Some(KeyAction::Exit),
        _ => None,
    }
}

/// Reads panel commands from stdin, one per line, and wakes the event loop
/// for each one.
fn spawn_stdin_reader(
    proxy: EventLoopProxy<UserEvent>,
    sender: Sender<Result<PanelCommand, PanelError>>,
) -> Result<()> {
    thread::Builder::new()
        .name("noisewarp-stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!(error = %err, "stopped reading panel commands");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                if sender.send(line.parse()).is_err() {
                    break;
                }
                if proxy.send_event(UserEvent::PanelInput).is_err() {
                    break;
                }
            }
            debug!("panel command input closed");
        })
        .map_err(|err| anyhow!("failed to spawn stdin reader: {err}"))?;
    Ok(())
}

fn drain_panel_commands(
    receiver: &Receiver<Result<PanelCommand, PanelError>>,
    session: &mut Session,
    host: &mut WindowHost,
) {
    for command in receiver.try_iter() {
        let applied = command.and_then(|command| {
            session
                .panel
                .apply(&command, session.driver.uniforms_mut())
        });
        if let Err(err) = applied {
            warn!(error = %err, "rejected panel command");
        }
    }
    if !session.driver.is_running() {
        host.request_refresh();
    }
}

fn handle_key(action: KeyAction, session: &mut Session, host: &mut WindowHost) -> bool {
    match action {
        KeyAction::TogglePause => {
            if session.driver.is_running() {
                session.driver.stop(host);
                info!(time = session.driver.last_time(), "animation paused");
            } else {
                session.driver.start(host);
                info!("animation resumed");
            }
        }
        KeyAction::SelectNext => {
            if let Some(spec) = session.panel.select_next() {
                info!(param = %spec.name, value = spec.value, "selected parameter");
            }
        }
        KeyAction::Increase | KeyAction::Decrease => {
            let steps = if action == KeyAction::Increase { 1 } else { -1 };
            let Some(name) = session.panel.selected().map(|spec| spec.name.clone()) else {
                return true;
            };
            let command = PanelCommand::Nudge { name, steps };
            if let Err(err) = session
                .panel
                .apply(&command, session.driver.uniforms_mut())
            {
                warn!(error = %err, "failed to nudge parameter");
            }
        }
        KeyAction::Rewind => {
            session.driver.rewind();
            info!("animation rewound");
        }
        KeyAction::Exit => return false,
    }
    if !session.driver.is_running() {
        host.request_refresh();
    }
    true
}

/// Opens the preview window and runs the animation until it closes.
pub(crate) fn run_window(config: RendererConfig) -> Result<()> {
    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let proxy = event_loop.create_proxy();

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let mut session = Session::from_config(&config)?;
    let mut gpu = GpuState::new(
        window.clone(),
        &config,
        session.driver.scene(),
        session.driver.uniforms(),
    )
    .context("failed to initialise GPU renderer")?;
    let size = gpu.size();
    apply_resize(session.driver.camera_mut(), &mut gpu, size.width, size.height);

    let (command_tx, command_rx) = unbounded();
    if config.stdin_control {
        spawn_stdin_reader(proxy, command_tx)?;
        info!("reading panel commands from stdin (set <name> <value>, nudge <name> <steps>, list)");
    } else {
        drop(command_tx);
    }

    let mut pacer = FramePacer::new(&config.policy);
    let mut host = WindowHost::new(window.clone());
    session.driver.start(&mut host);

    let mut failure: Option<anyhow::Error> = None;
    let run_result = event_loop.run(|event, elwt| match event {
        Event::UserEvent(UserEvent::PanelInput) => {
            drain_panel_commands(&command_rx, &mut session, &mut host);
            pacer.reset();
        }
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                if let Some(action) = key_action(&event.logical_key) {
                    if !handle_key(action, &mut session, &mut host) {
                        elwt.exit();
                    }
                    pacer.reset();
                }
            }
            WindowEvent::Resized(new_size) => {
                if apply_resize(
                    session.driver.camera_mut(),
                    &mut gpu,
                    new_size.width,
                    new_size.height,
                ) {
                    pacer.reset();
                    if !session.driver.is_running() {
                        host.request_refresh();
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let Some(token) = host.outstanding() else {
                    if host.take_refresh() {
                        if let Err(err) = session.driver.redraw(&mut gpu) {
                            if let Some(reason) = handle_render_error(err, &mut gpu) {
                                failure = Some(reason);
                                elwt.exit();
                            } else {
                                host.request_refresh();
                            }
                        }
                    }
                    return;
                };
                if !pacer.ready_for_frame(now) {
                    return;
                }
                match session.driver.tick(token, &mut host, &mut gpu) {
                    Ok(TickOutcome::Rendered { .. }) => pacer.mark_rendered(now),
                    Ok(TickOutcome::Idle) => {}
                    Err(err) => {
                        if let Some(reason) = handle_render_error(err, &mut gpu) {
                            failure = Some(reason);
                            elwt.exit();
                        } else {
                            session.driver.start(&mut host);
                        }
                    }
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            if host.outstanding().is_none() {
                elwt.set_control_flow(ControlFlow::Wait);
            } else if pacer.ready_for_frame(now) {
                host.redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = pacer.next_deadline() {
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        _ => {}
    });

    if let Some(err) = failure {
        return Err(err);
    }
    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

/// Recovers from transient surface errors. Returns the error that should end
/// the session, if any.
fn handle_render_error(err: RenderError, gpu: &mut GpuState) -> Option<anyhow::Error> {
    match err.as_surface_error() {
        Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
            debug!(error = %err, "reconfiguring surface");
            gpu.recover_surface();
            None
        }
        Some(wgpu::SurfaceError::Timeout) => {
            warn!("surface timeout; retrying next frame");
            None
        }
        Some(wgpu::SurfaceError::OutOfMemory) => {
            error!("surface out of memory; exiting");
            Some(anyhow!(err))
        }
        Some(other) => {
            warn!(error = ?other, "surface error; retrying next frame");
            None
        }
        None => {
            error!(error = %err, "render failed; stopping animation");
            Some(anyhow!(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_requests_track_only_the_latest_token() {
        let mut requests = FrameRequests::default();
        let first = requests.issue();
        let second = requests.issue();
        assert_ne!(first, second);
        assert_eq!(requests.outstanding(), Some(second));

        requests.cancel(first);
        assert_eq!(requests.outstanding(), Some(second));
        requests.cancel(second);
        assert_eq!(requests.outstanding(), None);
    }

    #[test]
    fn keys_map_to_panel_and_playback_actions() {
        assert_eq!(
            key_action(&Key::Named(NamedKey::Space)),
            Some(KeyAction::TogglePause)
        );
        assert_eq!(
            key_action(&Key::Character(" ".into())),
            Some(KeyAction::TogglePause)
        );
        assert_eq!(key_action(&Key::Named(NamedKey::Tab)), Some(KeyAction::SelectNext));
        assert_eq!(
            key_action(&Key::Named(NamedKey::ArrowUp)),
            Some(KeyAction::Increase)
        );
        assert_eq!(
            key_action(&Key::Named(NamedKey::ArrowDown)),
            Some(KeyAction::Decrease)
        );
        assert_eq!(key_action(&Key::Character("R".into())), Some(KeyAction::Rewind));
        assert_eq!(key_action(&Key::Named(NamedKey::Escape)), Some(KeyAction::Exit));
        assert_eq!(key_action(&Key::Character("q".into())), None);
    }
}
