use std::sync::Arc;

use anyhow::Context;
use glam::{UVec2, Vec2};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{Key, NamedKey},
    window::Window,
};

use crate::{
    asset_loader::{self, AssetLoadResult},
    click_tracker::ClickTracker,
    config::ViewerConfig,
    frame_loop::FrameLoop,
    navigation::PageLocation,
    orbit_controls::DragMode,
    rendering::renderer::Renderer,
    viewer::ViewerContext,
};

/// Pixels per wheel line for devices that report pixel deltas.
const PIXELS_PER_LINE: f32 = 100.0;

pub enum ViewerEvent {
    AssetLoaded(AssetLoadResult),
}

struct App {
    config: ViewerConfig,
    proxy: EventLoopProxy<ViewerEvent>,
    renderer: Option<Renderer>,
    viewer: ViewerContext,
    location: Option<PageLocation>,
    frame_loop: FrameLoop,
    cursor: Vec2,
    clicks: ClickTracker,
}

fn viewport(size: PhysicalSize<u32>) -> UVec2 {
    UVec2::new(size.width, size.height)
}

impl App {
    fn new(config: ViewerConfig, proxy: EventLoopProxy<ViewerEvent>) -> Self {
        let viewer = ViewerContext::new(&config, UVec2::ZERO);
        let frame_loop = FrameLoop::new(config.max_frames);
        let clicks = ClickTracker::new(config.click_tolerance);

        Self {
            config,
            proxy,
            renderer: None,
            viewer,
            location: None,
            frame_loop,
            cursor: Vec2::ZERO,
            clicks,
        }
    }

    fn start_asset_load(&self) {
        let proxy = self.proxy.clone();
        let spawned = asset_loader::spawn_load(self.config.asset_path.clone(), move |result| {
            if proxy.send_event(ViewerEvent::AssetLoaded(result)).is_err() {
                log::warn!("Event loop closed before the model finished loading");
            }
        });

        if let Err(error) = spawned {
            self.report_load_failure(error);
        }
    }

    fn report_load_failure(&self, error: anyhow::Error) {
        if self
            .proxy
            .send_event(ViewerEvent::AssetLoaded(Err(error)))
            .is_err()
        {
            log::warn!("Event loop closed before the load failure was reported");
        }
    }

    fn click(&mut self, cursor: Vec2) {
        let (Some(renderer), Some(location)) = (self.renderer.as_ref(), self.location.as_mut())
        else {
            return;
        };

        let size = viewport(renderer.size);
        if !self.viewer.handle_click(cursor, size, location) {
            log::debug!("Click at {:?} hit no hotpoint", cursor);
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        if !self.frame_loop.begin_frame() {
            log::info!("Stopping after {} frames", self.frame_loop.frames());
            event_loop.exit();
            return;
        }

        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        self.viewer.update();

        match renderer.render(&mut self.viewer) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                renderer.resize(renderer.size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of memory");
                event_loop.exit();
                return;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timeout");
            }
            Err(other) => {
                log::error!("Unexpected error: {:?}", other);
            }
        }

        renderer.window.request_redraw();
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        let window_attributes =
            Window::default_attributes().with_title(self.config.start_location.clone());
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(error) => {
                log::error!("Could not create a window to render into: {}", error);
                event_loop.exit();
                return;
            }
        };

        self.viewer.resize(viewport(window.inner_size()));

        let renderer = match pollster::block_on(Renderer::new(window.clone(), &self.viewer)) {
            Ok(renderer) => renderer,
            Err(error) => {
                log::error!("Could not set up the render surface: {:#}", error);
                event_loop.exit();
                return;
            }
        };

        let title_window = window.clone();
        self.location = Some(
            PageLocation::new(self.config.start_location.clone())
                .with_opener(self.config.open_with.clone())
                .on_change(move |href| title_window.set_title(href)),
        );

        self.renderer = Some(renderer);
        self.start_asset_load();

        window.request_redraw();
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::AssetLoaded(result) => {
                self.viewer.asset_loaded(result);

                if let Some(renderer) = self.renderer.as_ref() {
                    renderer.window.request_redraw();
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.frame_loop.stop_handle().stop();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.logical_key == Key::Named(NamedKey::Escape) =>
            {
                self.frame_loop.stop_handle().stop();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(new_size);
                }
                self.viewer.resize(viewport(new_size));
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);

                if let Some(renderer) = self.renderer.as_ref() {
                    self.viewer.controls.drag_to(
                        self.cursor,
                        &self.viewer.camera,
                        viewport(renderer.size),
                    );
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match (button, state) {
                (MouseButton::Left, ElementState::Pressed) => {
                    self.clicks.press(self.cursor);
                    self.viewer.controls.begin_drag(DragMode::Rotate, self.cursor);
                }
                (MouseButton::Left, ElementState::Released) => {
                    self.viewer.controls.end_drag();

                    if let Some(cursor) = self.clicks.release(self.cursor) {
                        self.click(cursor);
                    }
                }
                (MouseButton::Right, ElementState::Pressed) => {
                    self.viewer.controls.begin_drag(DragMode::Pan, self.cursor);
                }
                (MouseButton::Right, ElementState::Released) => {
                    self.viewer.controls.end_drag();
                }
                _ => (),
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
                };
                self.viewer.controls.zoom(lines);
            }
            _ => (),
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let config = ViewerConfig::from_env().context("Failed to read viewer configuration")?;

    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("Failed to create event loop")?;
    let mut app = App::new(config, event_loop.create_proxy());
    event_loop.run_app(&mut app)?;

    Ok(())
}
