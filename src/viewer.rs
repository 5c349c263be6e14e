//! The viewer controller.
//!
//! [`ViewerState`] owns everything the viewer knows: the active model, its
//! framing, the material registry, the active texture and the user's
//! selection. Loads run outside of it; the runtime asks for a load request,
//! drives the returned future and hands the result back. Every mutation here
//! finishes before control returns to the event loop.
//!
//! A model change walks `Idle -> Loading -> Framed -> Ready` (or `Failed`).
//! Each load is stamped with a generation number and completions from older
//! generations are dropped. [`ViewerState::finish_model_load`] takes both of
//! the last steps at once; [`ViewerState::frame_model`] and
//! [`ViewerState::populate`] take them one at a time.

use std::{future::Future, pin::Pin, rc::Rc};

use cgmath::Deg;
use image::RgbaImage;

use crate::{
    camera::{CameraState, Viewport},
    config::ViewerConfig,
    data_structures::{material::Tint, scene_graph::Model},
    error::{AssetKind, ViewerError},
    framer::{self, Framing},
    registry::MaterialRegistry,
    resources::{
        AssetSource, load_model_gltf,
        texture::{ImageFuture, TextureHandle, TextureResolver},
    },
    session::{Selection, SelectionField, SessionBridge},
};

pub type ModelFuture = Pin<Box<dyn Future<Output = anyhow::Result<Model>>>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadPhase {
    /// Nothing requested yet.
    Idle,
    /// A model load is in flight; the registry is empty.
    Loading,
    /// The model is recentered and the camera computed.
    Framed,
    /// Registry populated and the selection applied.
    Ready,
    /// The last model load failed.
    Failed,
}

/// A model load the runtime should perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelLoadRequest {
    pub generation: u64,
    pub model_ref: String,
}

/// A texture load the runtime should perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureLoadRequest {
    pub texture: TextureHandle,
}

/// Loads started by a (re)initialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadRequests {
    pub model: ModelLoadRequest,
    pub texture: TextureLoadRequest,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    /// The model is framed and waits for [`ViewerState::populate`].
    Framed,
    /// The result was spliced in.
    Ready,
    /// The result belongs to a superseded request and was dropped.
    Stale,
    Failed(ViewerError),
}

pub struct ViewerState {
    config: ViewerConfig,
    source: Rc<dyn AssetSource>,
    resolver: TextureResolver,
    session: SessionBridge,
    selection: Selection,
    registry: MaterialRegistry,
    phase: LoadPhase,
    generation: u64,
    model: Option<Model>,
    framing: Option<Framing>,
    camera: Option<CameraState>,
    texture: Option<TextureHandle>,
    viewport: Viewport,
    last_error: Option<ViewerError>,
}

impl ViewerState {
    /// Read the persisted selection and start out idle.
    pub fn new(
        config: ViewerConfig,
        source: Rc<dyn AssetSource>,
        mut session: SessionBridge,
        viewport: Viewport,
    ) -> Self {
        let selection = session.load_selection();
        log::info!(
            "Initial selection: model {}, texture {}, color {}",
            selection.model,
            selection.texture,
            selection.color
        );
        Self {
            config,
            resolver: TextureResolver::new(source.clone()),
            source,
            session,
            selection,
            registry: MaterialRegistry::new(),
            phase: LoadPhase::Idle,
            generation: 0,
            model: None,
            framing: None,
            camera: None,
            texture: None,
            viewport,
            last_error: None,
        }
    }

    /// Load whatever the current selection names.
    pub fn start(&mut self) -> LoadRequests {
        self.begin_load()
    }

    /// Switch to another model. The choice is persisted before reinitializing.
    pub fn select_model(&mut self, model_ref: &str) -> LoadRequests {
        self.selection.model = model_ref.to_string();
        self.session.save(SelectionField::Model, model_ref);
        self.begin_load()
    }

    /// Switch the surface image. It applies to the current registry right away
    /// (rendered blank until the image arrives) and to any model loaded later.
    pub fn select_texture(&mut self, image_ref: &str) -> TextureLoadRequest {
        self.selection.texture = image_ref.to_string();
        self.session.save(SelectionField::Texture, image_ref);
        let texture = self.resolver.resolve(image_ref);
        self.registry.apply_texture(&texture);
        self.texture = Some(texture.clone());
        TextureLoadRequest { texture }
    }

    /// Switch the tint. Invalid input leaves the selection untouched.
    pub fn select_color(&mut self, color: &str) -> Result<Tint, ViewerError> {
        let tint = Tint::from_hex(color)?;
        self.selection.color = tint;
        self.session.save(SelectionField::Color, &tint.to_hex());
        self.registry.apply_color(tint);
        Ok(tint)
    }

    /// Future producing the model named by `request`.
    pub fn load_model(&self, request: &ModelLoadRequest) -> ModelFuture {
        let source = self.source.clone();
        let model_ref = request.model_ref.clone();
        Box::pin(async move { load_model_gltf(source.as_ref(), &model_ref).await })
    }

    /// Future producing the pixels for `request`.
    pub fn load_texture(&self, request: &TextureLoadRequest) -> ImageFuture {
        self.resolver.load(&request.texture)
    }

    /// Splice in a finished model load: frame it, rebuild the registry, and
    /// apply the current texture and color.
    pub fn finish_model_load(
        &mut self,
        generation: u64,
        result: anyhow::Result<Model>,
    ) -> LoadOutcome {
        match self.frame_model(generation, result) {
            LoadOutcome::Framed => self.populate(),
            outcome => outcome,
        }
    }

    /// Recenter a finished model load and compute its camera. The registry
    /// stays empty until [`ViewerState::populate`].
    pub fn frame_model(&mut self, generation: u64, result: anyhow::Result<Model>) -> LoadOutcome {
        if generation != self.generation {
            log::debug!(
                "Dropping model load of generation {generation}, current is {}",
                self.generation
            );
            return LoadOutcome::Stale;
        }

        let mut model = match result {
            Ok(model) => model,
            Err(e) => {
                let error = ViewerError::load_failed(AssetKind::Model, &self.selection.model, &e);
                log::error!("{error}");
                self.phase = LoadPhase::Failed;
                self.last_error = Some(error.clone());
                return LoadOutcome::Failed(error);
            }
        };

        let framing = framer::frame(&mut model, self.viewport, Deg(self.config.fov_y));
        self.camera = Some(framing.camera.clone());
        self.framing = Some(framing);
        self.model = Some(model);
        self.phase = LoadPhase::Framed;
        LoadOutcome::Framed
    }

    /// Rebuild the registry from the framed model and apply the current
    /// texture and color. Does nothing unless the viewer is `Framed`.
    pub fn populate(&mut self) -> LoadOutcome {
        let (LoadPhase::Framed, Some(model)) = (self.phase, &self.model) else {
            log::debug!("Nothing to populate in phase {:?}", self.phase);
            return LoadOutcome::Stale;
        };

        self.registry.rebuild(model);
        if let Some(texture) = &self.texture {
            self.registry.apply_texture(texture);
        }
        self.registry.apply_color(self.selection.color);
        self.phase = LoadPhase::Ready;
        self.last_error = None;

        log::info!(
            "Model {} ready with {} materials",
            model.source,
            self.registry.len()
        );
        LoadOutcome::Ready
    }

    /// Fill a texture once its image is decoded. Results for a texture that is
    /// no longer active are dropped.
    pub fn finish_texture_load(
        &mut self,
        request: &TextureLoadRequest,
        result: anyhow::Result<RgbaImage>,
    ) -> LoadOutcome {
        let Some(active) = self.texture.as_ref().filter(|t| **t == request.texture) else {
            log::debug!("Dropping load of inactive texture {}", request.texture.source());
            return LoadOutcome::Stale;
        };

        match result {
            Ok(image) => {
                active.set_ready(image);
                // Re-flag the materials so the renderer uploads the pixels.
                self.registry.apply_texture(active);
                log::info!("Texture {} ready", active.source());
                LoadOutcome::Ready
            }
            Err(e) => {
                let error = ViewerError::load_failed(AssetKind::Texture, active.source(), &e);
                active.set_failed(error.to_string());
                log::error!("{error}");
                self.last_error = Some(error.clone());
                LoadOutcome::Failed(error)
            }
        }
    }

    /// Follow a viewport change. Only the camera aspect changes.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if let Some(camera) = &mut self.camera {
            camera.resize(viewport);
        }
    }

    fn begin_load(&mut self) -> LoadRequests {
        self.generation += 1;
        self.phase = LoadPhase::Loading;
        // Old materials must not be reachable while the new model loads.
        self.registry.clear();
        self.model = None;
        self.framing = None;

        let texture = self.resolver.resolve(&self.selection.texture);
        self.texture = Some(texture.clone());

        log::info!(
            "Loading model {} (generation {})",
            self.selection.model,
            self.generation
        );
        LoadRequests {
            model: ModelLoadRequest {
                generation: self.generation,
                model_ref: self.selection.model.clone(),
            },
            texture: TextureLoadRequest { texture },
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn registry(&self) -> &MaterialRegistry {
        &self.registry
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn framing(&self) -> Option<&Framing> {
        self.framing.as_ref()
    }

    pub fn camera(&self) -> Option<&CameraState> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut CameraState> {
        self.camera.as_mut()
    }

    pub fn active_texture(&self) -> Option<&TextureHandle> {
        self.texture.as_ref()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn last_error(&self) -> Option<&ViewerError> {
        self.last_error.as_ref()
    }

    pub fn session(&self) -> &SessionBridge {
        &self.session
    }
}
