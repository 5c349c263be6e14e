//! Application event loop.
//!
//! This module drives the viewer: it owns the window, forwards input to the
//! orbit controls, turns key presses into [`ViewerEvent`]s, runs asset loads
//! and renders the active model every frame.
//!
//! # Lifecycle Flow
//!
//! 1. `resumed` creates the window and the GPU [`Context`], then asks the
//!    [`ViewerState`] for the initial loads
//! 2. Loads run on the platform's executor (a tokio runtime on native,
//!    `spawn_local` on the web) and come back as user events
//! 3. Completed loads are handed to the viewer, which drops stale ones
//! 4. Each redraw syncs dirty materials to the GPU and draws the model
//!
//! Keys `M`, `T` and `C` cycle through the configured models, textures and
//! palette colors.

use std::{fmt::Debug, iter, rc::Rc, sync::Arc};

use image::RgbaImage;
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    camera::{OrbitController, Viewport},
    config::ViewerConfig,
    context::Context,
    data_structures::scene_graph::Model,
    render::ModelRenderer,
    resources::AssetSource,
    session::SessionBridge,
    viewer::{LoadOutcome, LoadRequests, ModelLoadRequest, TextureLoadRequest, ViewerState},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// A selection made by the user, as a UI would report it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewerEvent {
    SelectModel(String),
    SelectTexture(String),
    SelectColor(String),
}

pub(crate) enum FlowEvent {
    #[allow(dead_code)]
    Initialized(Box<Context>),
    ModelLoaded {
        generation: u64,
        result: anyhow::Result<Model>,
    },
    TextureLoaded {
        request: TextureLoadRequest,
        result: anyhow::Result<RgbaImage>,
    },
    Viewer(ViewerEvent),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::ModelLoaded { generation, result } => f
                .debug_struct("ModelLoaded")
                .field("generation", generation)
                .field("ok", &result.is_ok())
                .finish(),
            Self::TextureLoaded { request, result } => f
                .debug_struct("TextureLoaded")
                .field("texture", &request.texture.source())
                .field("ok", &result.is_ok())
                .finish(),
            Self::Viewer(event) => f.debug_tuple("Viewer").field(event).finish(),
        }
    }
}

/// GPU context plus everything the viewer shows in it.
pub struct AppState {
    pub(crate) ctx: Context,
    viewer: ViewerState,
    renderer: ModelRenderer,
    orbit: OrbitController,
    is_surface_configured: bool,
}

impl AppState {
    fn new(ctx: Context, config: ViewerConfig) -> anyhow::Result<Self> {
        let source = asset_source(&config)?;
        let session = SessionBridge::for_platform(&config);
        let orbit = OrbitController::new(config.orbit.clone());
        let viewer = ViewerState::new(config, source, session, ctx.viewport());
        Ok(Self {
            ctx,
            viewer,
            renderer: ModelRenderer::new(),
            orbit,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
            self.viewer.resize(Viewport::new(width, height));
        }
    }

    fn set_title(&self, status: Option<&str>) {
        let title = &self.viewer.config().window_title;
        let mut title = match status {
            Some(status) => format!("{title}: {status}"),
            None => format!("{title}: {}", self.viewer.selection().model),
        };
        if self.viewer.session().fallback().is_some() {
            title.push_str(" (selection not saved)");
        }
        self.ctx.window.set_title(&title);
    }

    fn render(&mut self, dt: instant::Duration) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        if let Some(camera) = self.viewer.camera_mut() {
            self.orbit.update(camera, dt);
            self.ctx.update_camera(camera);
        }
        self.renderer
            .sync(&self.ctx, self.viewer.generation(), self.viewer.model());

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if self.viewer.camera().is_some() {
                self.renderer.draw(&self.ctx, &mut render_pass);
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<FlowEvent>,
    config: ViewerConfig,
    state: Option<AppState>,
    last_time: Instant,
}

impl App {
    fn new(event_loop: &EventLoop<FlowEvent>, config: ViewerConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            state: None,
            last_time: Instant::now(),
        })
    }

    fn install(&mut self, event_loop: &ActiveEventLoop, ctx: Context) {
        let mut state = match AppState::new(ctx, self.config.clone()) {
            Ok(state) => state,
            Err(e) => {
                log::error!("Cannot start the viewer: {e:#}");
                event_loop.exit();
                return;
            }
        };
        let size = state.ctx.window.inner_size();
        state.resize(size.width, size.height);
        let requests = state.viewer.start();
        state.set_title(Some("loading"));
        state.ctx.window.request_redraw();
        self.state = Some(state);
        self.dispatch(requests);
    }

    fn dispatch(&self, requests: LoadRequests) {
        self.dispatch_model(&requests.model);
        self.dispatch_texture(requests.texture);
    }

    fn dispatch_model(&self, request: &ModelLoadRequest) {
        let Some(state) = &self.state else {
            return;
        };
        let fut = state.viewer.load_model(request);
        let generation = request.generation;
        let proxy = self.proxy.clone();
        let deliver = move |result| {
            if proxy
                .send_event(FlowEvent::ModelLoaded { generation, result })
                .is_err()
            {
                log::warn!("Event loop closed before model generation {generation} arrived");
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        deliver(self.async_runtime.block_on(fut));

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(async move { deliver(fut.await) });
    }

    fn dispatch_texture(&self, request: TextureLoadRequest) {
        let Some(state) = &self.state else {
            return;
        };
        let fut = state.viewer.load_texture(&request);
        let proxy = self.proxy.clone();
        let deliver = move |result| {
            if proxy
                .send_event(FlowEvent::TextureLoaded { request, result })
                .is_err()
            {
                log::warn!("Event loop closed before a texture arrived");
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        deliver(self.async_runtime.block_on(fut));

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(async move { deliver(fut.await) });
    }

    fn handle_viewer_event(&mut self, event: ViewerEvent) {
        let Some(state) = &mut self.state else {
            return;
        };
        log::info!("{event:?}");
        match event {
            ViewerEvent::SelectModel(model_ref) => {
                let requests = state.viewer.select_model(&model_ref);
                state.set_title(Some("loading"));
                self.dispatch(requests);
            }
            ViewerEvent::SelectTexture(image_ref) => {
                let request = state.viewer.select_texture(&image_ref);
                self.dispatch_texture(request);
            }
            ViewerEvent::SelectColor(color) => {
                if let Err(e) = state.viewer.select_color(&color) {
                    log::warn!("{e}");
                    state.set_title(Some(&e.to_string()));
                }
            }
        }
    }

    /// Next entry after the current selection in one of the configured lists.
    fn cycle(&self, key: KeyCode) -> Option<ViewerEvent> {
        let state = self.state.as_ref()?;
        let selection = state.viewer.selection();
        let config = &self.config;
        match key {
            KeyCode::KeyM => next_in(&config.models, &selection.model).map(ViewerEvent::SelectModel),
            KeyCode::KeyT => {
                next_in(&config.textures, &selection.texture).map(ViewerEvent::SelectTexture)
            }
            KeyCode::KeyC => {
                next_in(&config.palette, &selection.color.to_hex()).map(ViewerEvent::SelectColor)
            }
            _ => None,
        }
    }
}

fn next_in(options: &[String], current: &str) -> Option<String> {
    let idx = options
        .iter()
        .position(|option| option.eq_ignore_ascii_case(current))
        .map_or(0, |idx| (idx + 1) % options.len());
    options.get(idx).cloned()
}

#[cfg(not(target_arch = "wasm32"))]
fn asset_source(config: &ViewerConfig) -> anyhow::Result<Rc<dyn AssetSource>> {
    let mut root = std::path::PathBuf::from(&config.asset_root);
    if !root.exists() {
        if let Some(bundled) = option_env!("SWATCH_VIEWER_BUNDLED_ASSETS") {
            log::warn!(
                "Asset root {} not found, using the bundled assets",
                root.display()
            );
            root = bundled.into();
        }
    }
    log::info!("Reading assets from {}", root.display());
    Ok(Rc::new(crate::resources::DirectorySource::new(root)))
}

#[cfg(target_arch = "wasm32")]
fn asset_source(config: &ViewerConfig) -> anyhow::Result<Rc<dyn AssetSource>> {
    Ok(Rc::new(crate::resources::HttpSource::from_location(
        &config.asset_root,
    )?))
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes =
            Window::default_attributes().with_title(self.config.window_title.clone());

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID));
            match canvas {
                Some(canvas) => {
                    window_attributes =
                        window_attributes.with_canvas(Some(canvas.unchecked_into()));
                }
                None => log::warn!("No #{CANVAS_ID} element, letting winit create a canvas"),
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(Context::new(window, &self.config)) {
                Ok(ctx) => self.install(event_loop, ctx),
                Err(e) => {
                    log::error!("App initialization failed: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            let config = self.config.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match Context::new(window, &config).await {
                    Ok(ctx) => {
                        if proxy.send_event(FlowEvent::Initialized(Box::new(ctx))).is_err() {
                            log::error!("Event loop closed during initialization");
                        }
                    }
                    Err(e) => log::error!("App initialization failed: {e:#}"),
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            FlowEvent::Initialized(ctx) => self.install(event_loop, *ctx),
            FlowEvent::ModelLoaded { generation, result } => {
                let Some(state) = &mut self.state else {
                    return;
                };
                match state.viewer.finish_model_load(generation, result) {
                    LoadOutcome::Ready => {
                        if let Some(camera) = state.viewer.camera() {
                            state.orbit.reset(camera);
                        }
                        state.set_title(None);
                    }
                    LoadOutcome::Failed(e) => state.set_title(Some(&e.to_string())),
                    LoadOutcome::Framed | LoadOutcome::Stale => {}
                }
            }
            FlowEvent::TextureLoaded { request, result } => {
                let Some(state) = &mut self.state else {
                    return;
                };
                if let LoadOutcome::Failed(e) = state.viewer.finish_texture_load(&request, result) {
                    state.set_title(Some(&e.to_string()));
                }
            }
            FlowEvent::Viewer(event) => self.handle_viewer_event(event),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            state.orbit.handle_mouse(dx, dy);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };

        state.orbit.handle_window_events(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                match state.render(dt) {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if code == KeyCode::Escape {
                    event_loop.exit();
                } else if let Some(event) = self.cycle(code) {
                    if self.proxy.send_event(FlowEvent::Viewer(event)).is_err() {
                        log::warn!("Event loop closed, dropping selection");
                    }
                }
            }
            _ => {}
        }
    }
}

/// Start the viewer and block until its window closes.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {e}").into());
        }
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    run(ViewerConfig::default()).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}

#[cfg(test)]
mod tests {
    use super::next_in;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cycling_wraps_around() {
        let models = list(&["a.glb", "b.glb"]);
        assert_eq!(next_in(&models, "a.glb").as_deref(), Some("b.glb"));
        assert_eq!(next_in(&models, "b.glb").as_deref(), Some("a.glb"));
    }

    #[test]
    fn unknown_selection_starts_at_the_top() {
        let palette = list(&["#FF0000", "#00ff00"]);
        assert_eq!(next_in(&palette, "#123456").as_deref(), Some("#FF0000"));
        assert_eq!(next_in(&palette, "#ff0000").as_deref(), Some("#00ff00"));
        assert_eq!(next_in(&[], "x"), None);
    }
}
