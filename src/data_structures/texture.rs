//! Texture handles.
//!
//! Textures are created and uploaded by the graphics backend; the engine only
//! keeps the handle plus the metadata it needs to feed shaders.

use crate::context::TextureId;

/// A texture already living on the GPU.
///
/// Programs of sprite-like renderables carry an optional texture. As long as
/// none is set (for instance while the image is still loading) those
/// renderables are skipped by their render pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub id: TextureId,
    pub size: [u32; 2],
    pub label: String,
}

impl Texture {
    pub fn new(id: TextureId, size: [u32; 2], label: &str) -> Self {
        Self {
            id,
            size,
            label: label.to_string(),
        }
    }

    /// Texture unit every program samples its texture from.
    pub const UNIT: u32 = 0;
}
