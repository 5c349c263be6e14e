use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::{
    camera::{CameraResources, CameraState, Viewport},
    config::ViewerConfig,
    data_structures::texture::{self, Texture},
    pipelines::{
        basic::{material_layout, mk_basic_pipeline},
        light::{LightResources, LightUniform},
    },
};

/// Window, device and the long-lived GPU resources shared by every frame.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub light: LightResources,
    pub material_layout: wgpu::BindGroupLayout,
    pub pipeline: wgpu::RenderPipeline,
    /// Bound in place of surface images that are not loaded yet.
    pub blank: Texture,
    pub sampler: wgpu::Sampler,
    pub clear_colour: wgpu::Color,
}

impl Context {
    pub async fn new(window: Arc<Window>, viewer_config: &ViewerConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // The instance is a handle to our GPU
        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("creating the window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable graphics adapter")?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("requesting a graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Textures are uploaded as sRGB and the shader works in linear space, so
        // the surface has to be sRGB as well for colors to come out as authored.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface supports no formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let camera = CameraResources::new(&device);
        let light = LightResources::new(LightUniform::from_settings(&viewer_config.light), &device);
        let material_layout = material_layout(&device);
        let pipeline = mk_basic_pipeline(
            &device,
            &config,
            &material_layout,
            &camera.bind_group_layout,
            &light.bind_group_layout,
        );

        let depth_texture = Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );
        let blank = Texture::white(&device, &queue);
        let sampler = texture::create_default_sampler(&device);

        let [r, g, b, a] = viewer_config.clear_tint()?.to_linear();
        let clear_colour = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        };

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            light,
            material_layout,
            pipeline,
            blank,
            sampler,
            clear_colour,
        })
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.config.width, self.config.height)
    }

    /// Reconfigure the surface and depth buffer. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = Texture::create_depth_texture(
            &self.device,
            [self.config.width, self.config.height],
            "depth_texture",
        );
        true
    }

    pub fn update_camera(&mut self, camera: &CameraState) {
        self.camera.update(&self.queue, camera);
    }
}
