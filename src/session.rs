//! Persistence of the user's last selections.
//!
//! Three independent keys are kept in a small string store: the model, the
//! texture and the tint color. The store is `sessionStorage` on the web and a
//! JSON file on native builds. If the store fails at any point the bridge
//! switches to an in-memory store for the rest of the session.

use std::{collections::HashMap, fmt};

use crate::{config::ViewerConfig, data_structures::material::Tint, error::ViewerError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SelectionField {
    Model,
    Texture,
    Color,
}

impl SelectionField {
    /// Storage key of the field.
    pub fn key(self) -> &'static str {
        match self {
            SelectionField::Model => "selectedModel",
            SelectionField::Texture => "selectedTexture",
            SelectionField::Color => "selectedColor",
        }
    }
}

impl fmt::Display for SelectionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The model, texture and color the user currently has selected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub model: String,
    pub texture: String,
    pub color: Tint,
}

impl Selection {
    pub fn defaults(config: &ViewerConfig) -> Self {
        Self {
            model: config.default_model.clone(),
            texture: config.default_texture.clone(),
            color: config.default_tint().unwrap_or(Tint::WHITE),
        }
    }
}

/// A string key-value store.
pub trait SelectionStore {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStore for MemoryStore {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A flat JSON object on disk. The whole file is rewritten on every write.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct FileStore {
    path: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStore {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> anyhow::Result<HashMap<String, String>> {
        use anyhow::Context as _;
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl SelectionStore for FileStore {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn write(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        use anyhow::Context as _;
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        let raw = serde_json::to_string_pretty(&values)?;
        std::fs::write(&self.path, raw).with_context(|| format!("writing {}", self.path.display()))
    }
}

/// The browser's `sessionStorage`.
#[cfg(target_arch = "wasm32")]
pub struct WebStore {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl WebStore {
    pub fn session() -> anyhow::Result<Self> {
        let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
        let storage = window
            .session_storage()
            .map_err(|e| anyhow::anyhow!("sessionStorage unavailable: {e:?}"))?
            .ok_or_else(|| anyhow::anyhow!("sessionStorage unavailable"))?;
        Ok(Self { storage })
    }
}

#[cfg(target_arch = "wasm32")]
impl SelectionStore for WebStore {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| anyhow::anyhow!("reading {key}: {e:?}"))
    }

    fn write(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.storage
            .set_item(key, value)
            .map_err(|e| anyhow::anyhow!("writing {key}: {e:?}"))
    }
}

/// Reads and writes the selection through a [`SelectionStore`], falling back
/// to defaults for missing keys and to memory when the store breaks.
pub struct SessionBridge {
    store: Box<dyn SelectionStore>,
    defaults: Selection,
    fallback: Option<ViewerError>,
}

impl SessionBridge {
    pub fn new(store: Box<dyn SelectionStore>, defaults: Selection) -> Self {
        Self {
            store,
            defaults,
            fallback: None,
        }
    }

    /// The platform store for this build: the configured JSON file on native
    /// (memory if it is set to `null`), `sessionStorage` on the web.
    pub fn for_platform(config: &ViewerConfig) -> Self {
        let defaults = Selection::defaults(config);

        #[cfg(not(target_arch = "wasm32"))]
        let store: Box<dyn SelectionStore> = match &config.session_file {
            Some(path) => Box::new(FileStore::new(path)),
            None => Box::new(MemoryStore::new()),
        };

        #[cfg(target_arch = "wasm32")]
        let store: Box<dyn SelectionStore> = match WebStore::session() {
            Ok(store) => Box::new(store),
            Err(e) => {
                log::warn!("Keeping the selection in memory: {e:#}");
                Box::new(MemoryStore::new())
            }
        };

        Self::new(store, defaults)
    }

    /// True once the bridge has given up on its original store.
    pub fn is_degraded(&self) -> bool {
        self.fallback.is_some()
    }

    /// Why the bridge switched to memory, if it did.
    pub fn fallback(&self) -> Option<&ViewerError> {
        self.fallback.as_ref()
    }

    pub fn defaults(&self) -> &Selection {
        &self.defaults
    }

    /// Persisted selection, with defaults for anything missing or unreadable.
    pub fn load_selection(&mut self) -> Selection {
        let model = self.read(SelectionField::Model);
        let texture = self.read(SelectionField::Texture);
        let color = self.read(SelectionField::Color);

        let color = match color {
            None => self.defaults.color,
            Some(raw) => match Tint::from_hex(&raw) {
                Ok(tint) => tint,
                Err(e) => {
                    log::warn!("Ignoring stored {}: {e}", SelectionField::Color);
                    self.defaults.color
                }
            },
        };

        Selection {
            model: model.unwrap_or_else(|| self.defaults.model.clone()),
            texture: texture.unwrap_or_else(|| self.defaults.texture.clone()),
            color,
        }
    }

    /// Persist one field right away.
    pub fn save(&mut self, field: SelectionField, value: &str) {
        if let Err(e) = self.store.write(field.key(), value) {
            self.degrade(&e);
            // The memory store cannot fail.
            let _ = self.store.write(field.key(), value);
        }
    }

    fn read(&mut self, field: SelectionField) -> Option<String> {
        match self.store.read(field.key()) {
            Ok(value) => value,
            Err(e) => {
                self.degrade(&e);
                None
            }
        }
    }

    fn degrade(&mut self, error: &anyhow::Error) {
        if self.fallback.is_some() {
            return;
        }
        let error = ViewerError::Storage(format!("{error:#}"));
        log::warn!("{error}, keeping selections in memory");
        self.store = Box::new(MemoryStore::new());
        self.fallback = Some(error);
    }
}
