use std::fmt;

/// What kind of asset a load was for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    Model,
    Texture,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Model => f.write_str("model"),
            AssetKind::Texture => f.write_str("texture"),
        }
    }
}

/// Outcomes the host has to branch on. I/O and decoding internals stay `anyhow`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewerError {
    #[error("invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),
    #[error("failed to load {kind} {reference}: {reason}")]
    LoadFailed {
        kind: AssetKind,
        reference: String,
        reason: String,
    },
    #[error("selection store unavailable: {0}")]
    Storage(String),
}

impl ViewerError {
    pub fn load_failed(kind: AssetKind, reference: &str, error: &anyhow::Error) -> Self {
        ViewerError::LoadFailed {
            kind,
            reference: reference.to_string(),
            reason: format!("{error:#}"),
        }
    }
}
