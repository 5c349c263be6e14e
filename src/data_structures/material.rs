//! Per-mesh surface appearance: a surface image slot and a tint.

use std::fmt;

use crate::{error::ViewerError, resources::texture::TextureHandle};

/// An sRGB color as authored in `#rrggbb` notation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tint {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Tint {
    pub const WHITE: Tint = Tint::new(0xff, 0xff, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#rrggbb` string. Hex digits may be upper or lower case.
    pub fn from_hex(hex: &str) -> Result<Self, ViewerError> {
        let invalid = || ViewerError::InvalidColor(hex.to_string());
        let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear-space RGBA used by the shaders; the surface is sRGB so the
    /// authored value has to be decoded first.
    pub fn to_linear(&self) -> [f32; 4] {
        let decode = |c: u8| {
            let c = c as f32 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        [decode(self.r), decode(self.g), decode(self.b), 1.0]
    }

    /// Build a tint from a linear base color factor as found in glTF materials.
    pub fn from_linear(rgba: [f32; 4]) -> Self {
        let encode = |c: f32| {
            let c = c.clamp(0.0, 1.0);
            let srgb = if c <= 0.003_130_8 {
                c * 12.92
            } else {
                1.055 * c.powf(1.0 / 2.4) - 0.055
            };
            (srgb * 255.0).round() as u8
        };
        Self::new(encode(rgba[0]), encode(rgba[1]), encode(rgba[2]))
    }
}

impl Default for Tint {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Tint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Live material state of one mesh.
///
/// Mutations flag the material dirty; the renderer re-uploads the uniform and
/// rebinds the texture on the next frame and clears the flag.
#[derive(Clone, Debug, Default)]
pub struct Material {
    name: String,
    texture: Option<TextureHandle>,
    tint: Tint,
    dirty: bool,
}

impl Material {
    pub fn new(name: impl Into<String>, tint: Tint) -> Self {
        Self {
            name: name.into(),
            texture: None,
            tint,
            dirty: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn texture(&self) -> Option<&TextureHandle> {
        self.texture.as_ref()
    }

    pub fn tint(&self) -> Tint {
        self.tint
    }

    pub fn set_texture(&mut self, texture: TextureHandle) {
        self.texture = Some(texture);
        self.dirty = true;
    }

    pub fn set_tint(&mut self, tint: Tint) {
        self.tint = tint;
        self.dirty = true;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns whether the material was dirty and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}
