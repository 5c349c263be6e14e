//! Texture resolution: image reference in, usable handle out.
//!
//! [`TextureResolver::resolve`] hands out a [`TextureHandle`] right away. The
//! handle starts out pending (rendered as plain white) and is filled once the
//! future from [`TextureResolver::load`] has fetched and decoded the image.
//!
//! Decoding conventions are fixed for every texture: images are treated as
//! sRGB color data, and rows are kept in file order because the glTF UV
//! origin already matches it.

use std::{
    cell::{Ref, RefCell},
    fmt,
    future::Future,
    pin::Pin,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::Context as _;
use image::RgbaImage;

use crate::resources::AssetSource;

/// Every surface image is sRGB color data.
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
/// Whether decoded images are flipped vertically before upload.
pub const TEXTURE_FLIP_Y: bool = false;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Debug)]
pub enum TextureState {
    Pending,
    Ready(Rc<RgbaImage>),
    Failed(String),
}

struct TextureInner {
    id: u64,
    source: String,
    state: RefCell<TextureState>,
}

/// Cheap, clonable reference to one resolved texture. Two handles are equal
/// when they come from the same `resolve` call.
#[derive(Clone)]
pub struct TextureHandle {
    inner: Rc<TextureInner>,
}

impl TextureHandle {
    fn pending(source: &str) -> Self {
        Self {
            inner: Rc::new(TextureInner {
                id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
                source: source.to_string(),
                state: RefCell::new(TextureState::Pending),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn source(&self) -> &str {
        &self.inner.source
    }

    pub fn state(&self) -> Ref<'_, TextureState> {
        self.inner.state.borrow()
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.state(), TextureState::Pending)
    }

    /// The decoded pixels, once available.
    pub fn image(&self) -> Option<Rc<RgbaImage>> {
        match &*self.state() {
            TextureState::Ready(image) => Some(image.clone()),
            TextureState::Pending | TextureState::Failed(_) => None,
        }
    }

    pub(crate) fn set_ready(&self, image: RgbaImage) {
        *self.inner.state.borrow_mut() = TextureState::Ready(Rc::new(image));
    }

    pub(crate) fn set_failed(&self, reason: String) {
        *self.inner.state.borrow_mut() = TextureState::Failed(reason);
    }
}

impl PartialEq for TextureHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for TextureHandle {}

impl fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureHandle")
            .field("id", &self.inner.id)
            .field("source", &self.inner.source)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

pub type ImageFuture = Pin<Box<dyn Future<Output = anyhow::Result<RgbaImage>>>>;

/// Turns image references into texture handles and knows how to fetch them.
pub struct TextureResolver {
    source: Rc<dyn AssetSource>,
}

impl TextureResolver {
    pub fn new(source: Rc<dyn AssetSource>) -> Self {
        Self { source }
    }

    /// A handle for `image_ref` that is usable immediately and still pending.
    pub fn resolve(&self, image_ref: &str) -> TextureHandle {
        TextureHandle::pending(image_ref)
    }

    /// Fetch and decode the image behind `texture`. The handle itself is not
    /// touched; the caller decides whether the result is still wanted.
    pub fn load(&self, texture: &TextureHandle) -> ImageFuture {
        let source = self.source.clone();
        let image_ref = texture.source().to_string();
        Box::pin(async move {
            let bytes = source.load(&image_ref).await?;
            decode_image(&bytes).with_context(|| format!("decoding {image_ref}"))
        })
    }
}

/// Decode any raster format supported by `image` into RGBA8 under the fixed conventions.
pub fn decode_image(bytes: &[u8]) -> anyhow::Result<RgbaImage> {
    let img = image::load_from_memory(bytes)?;
    let mut rgba = img.to_rgba8();
    if TEXTURE_FLIP_Y {
        image::imageops::flip_vertical_in_place(&mut rgba);
    }
    Ok(rgba)
}
