use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::assets::AssetFs;
use crate::config::DemoConfig;
use crate::error::GraphicsError;
use crate::gfx::graphics::INITIAL_SIZE;
use crate::gfx::{Graphics, State, WgpuRenderManager};
use crate::watch::ShaderWatcher;

pub type DemoGraphics = Graphics<WgpuRenderManager>;

/// Everything a demo gets at startup
pub struct DemoContext<'a> {
    pub graphics: &'a mut DemoGraphics,
    pub state: &'a mut State,
    pub data: &'a AssetFs,
    pub shaders: &'a AssetFs,
    pub config: &'a DemoConfig,
}

/// A scene driven by [`DemoApp`]
pub trait Demo: Sized {
    const TITLE: &'static str;

    /// Builds the scene once the pipeline is initialized
    fn build(ctx: DemoContext<'_>) -> Result<Self, GraphicsError>;

    /// Advances the scene by `dt` seconds before the frame is drawn
    fn update(&mut self, graphics: &mut DemoGraphics, state: &mut State, dt: f32);

    fn window_event(&mut self, _event: &WindowEvent, _state: &mut State) {}

    fn device_event(&mut self, _event: &DeviceEvent, _state: &mut State) {}

    /// Called with each watched shader file that changed on disk
    fn reload(&mut self, _graphics: &mut DemoGraphics, _shaders: &AssetFs, _file: &str) {}
}

pub struct DemoApp<D: Demo> {
    config: DemoConfig,
    data: AssetFs,
    shaders: AssetFs,
    state: State,
    watcher: ShaderWatcher,
    last_frame: Instant,

    // Dropped in this order on exit
    demo: Option<D>,
    graphics: Option<DemoGraphics>,
    window: Option<Arc<Window>>,

    error: Option<anyhow::Error>,
}

impl<D: Demo> DemoApp<D> {
    pub fn new(config: DemoConfig) -> Self {
        Self {
            data: config.data_fs(),
            shaders: config.shader_fs(),
            config,
            state: State::default(),
            watcher: ShaderWatcher::new(),
            last_frame: Instant::now(),
            demo: None,
            graphics: None,
            window: None,
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let (width, height) = INITIAL_SIZE;
        let window = event_loop
            .create_window(
                WindowAttributes::default()
                    .with_title(D::TITLE)
                    .with_inner_size(winit::dpi::PhysicalSize::new(width, height))
                    .with_resizable(true),
            )
            .map_err(|e| GraphicsError::Window(e.to_string()))?;
        let window = Arc::new(window);
        self.window = Some(window.clone());

        let rm = pollster::block_on(WgpuRenderManager::new(window))?;
        let graphics = self.graphics.insert(Graphics::new(rm));
        graphics.init(&self.config.flags, &self.data)?;
        log::info!("graphics initialized");

        let demo = D::build(DemoContext {
            graphics,
            state: &mut self.state,
            data: &self.data,
            shaders: &self.shaders,
            config: &self.config,
        })?;
        self.demo = Some(demo);

        if self.config.watch {
            self.watcher.watch(&self.shaders, &self.config.shader)?;
        }
        self.last_frame = Instant::now();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn frame(&mut self) -> Result<(), GraphicsError> {
        let (Some(demo), Some(graphics)) = (self.demo.as_mut(), self.graphics.as_mut()) else {
            return Ok(());
        };

        for file in self.watcher.poll() {
            demo.reload(graphics, &self.shaders, &file);
        }

        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        demo.update(graphics, &mut self.state, dt);
        graphics.draw(&self.state)
    }
}

impl<D: Demo> ApplicationHandler for DemoApp<D> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::KeyG),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.state.mouse_grab = !self.state.mouse_grab,
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::KeyV),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.state.vsync = !self.state.vsync;
                log::info!("vsync {}", if self.state.vsync { "on" } else { "off" });
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.frame() {
                    self.fail(event_loop, e.into());
                }
            }
            _ => {
                if let Some(demo) = self.demo.as_mut() {
                    demo.window_event(&event, &mut self.state);
                }
            }
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let Some(demo) = self.demo.as_mut() {
            demo.device_event(&event, &mut self.state);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.demo = None;
        self.graphics = None;
        self.window = None;
        log::info!("stopped");
    }
}

/// Runs a demo until its window closes; startup and frame errors are returned
pub fn run<D: Demo>(config: DemoConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DemoApp::<D>::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
