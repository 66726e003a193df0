//! CPU-side textures.
//!
//! This module provides [`Texture`], decoded RGBA8 texel data plus the bits
//! the renderer needs to upload it (dimensions, layer count, colour space).
//! Materials hold textures behind an `Arc` and the renderer uploads each one
//! once per [`TextureId`]. A texture's texels never change after construction;
//! build a new texture to change them.

use std::sync::atomic::{AtomicU64, Ordering};

use image::{DynamicImage, GenericImageView, ImageFormat, load_from_memory_with_format};

use crate::error::{RenderError, Result};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Decodes `bytes`, trusting the extension hint when it names a known format.
pub(crate) fn decode_image(bytes: &[u8], format: Option<&str>) -> image::ImageResult<DynamicImage> {
    match format.and_then(ImageFormat::from_extension) {
        Some(format) => load_from_memory_with_format(bytes, format),
        None => image::load_from_memory(bytes),
    }
}

/// Identity of a [`Texture`]; clones of the same `Arc<Texture>` share it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKind {
    D2,
    Cube,
}

impl TextureKind {
    pub fn view_dimension(self) -> wgpu::TextureViewDimension {
        match self {
            TextureKind::D2 => wgpu::TextureViewDimension::D2,
            TextureKind::Cube => wgpu::TextureViewDimension::Cube,
        }
    }
}

/// Decoded RGBA8 texels ready for upload.
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    label: String,
    width: u32,
    height: u32,
    kind: TextureKind,
    srgb: bool,
    data: Vec<u8>,
}

impl Texture {
    /// Wraps raw RGBA8 texels. `data` must hold `width * height * 4` bytes per layer.
    pub fn from_rgba8(
        label: &str,
        width: u32,
        height: u32,
        kind: TextureKind,
        srgb: bool,
        data: Vec<u8>,
    ) -> Result<Self> {
        let layers = match kind {
            TextureKind::D2 => 1,
            TextureKind::Cube => 6,
        };
        let expected = width as usize * height as usize * 4 * layers;
        if data.len() != expected {
            return Err(RenderError::InvalidTexelData {
                label: label.to_string(),
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            id: TextureId::next(),
            label: label.to_string(),
            width,
            height,
            kind,
            srgb,
            data,
        })
    }

    /// Decodes an image file held in memory.
    ///
    /// * `format` is an optional extension hint (e.g. "png"); `None` lets the decoder guess
    /// * `is_normal_map` selects linear (true) instead of sRGB (false) sampling
    ///
    /// Decode failures are reported against `label`, there is no path to name.
    pub fn from_bytes(
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
        is_normal_map: bool,
    ) -> Result<Self> {
        let img = decode_image(bytes, format).map_err(|source| RenderError::TextureDecode {
            path: label.into(),
            source,
        })?;
        Ok(Self::from_image(&img, label, is_normal_map))
    }

    pub fn from_image(img: &DynamicImage, label: &str, is_normal_map: bool) -> Self {
        let (width, height) = img.dimensions();
        Self {
            id: TextureId::next(),
            label: label.to_string(),
            width,
            height,
            kind: TextureKind::D2,
            srgb: !is_normal_map,
            data: img.to_rgba8().into_raw(),
        }
    }

    /// Builds a cube map from six equally sized square faces in +X, -X, +Y, -Y, +Z, -Z order.
    pub fn cube_from_images(faces: &[DynamicImage; 6], label: &str) -> Result<Self> {
        let (width, height) = faces[0].dimensions();
        if width != height {
            return Err(RenderError::InvalidCubeMap(format!(
                "`{label}` faces must be square, got {width}x{height}"
            )));
        }
        let mut data = Vec::with_capacity(width as usize * height as usize * 4 * 6);
        for (i, face) in faces.iter().enumerate() {
            if face.dimensions() != (width, height) {
                return Err(RenderError::InvalidCubeMap(format!(
                    "`{label}` face {i} is {:?}, expected {width}x{height}",
                    face.dimensions()
                )));
            }
            data.extend_from_slice(&face.to_rgba8());
        }
        Self::from_rgba8(label, width, height, TextureKind::Cube, true, data)
    }

    /// A 1x1 texture of a single colour.
    pub fn solid(label: &str, rgba: [u8; 4], srgb: bool) -> Self {
        Self {
            id: TextureId::next(),
            label: label.to_string(),
            width: 1,
            height: 1,
            kind: TextureKind::D2,
            srgb,
            data: rgba.to_vec(),
        }
    }

    /// A 1x1 cube map whose six faces share one colour.
    pub fn solid_cube(label: &str, rgba: [u8; 4]) -> Self {
        Self {
            id: TextureId::next(),
            label: label.to_string(),
            width: 1,
            height: 1,
            kind: TextureKind::Cube,
            srgb: true,
            data: rgba.repeat(6),
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    pub fn layers(&self) -> u32 {
        match self.kind {
            TextureKind::D2 => 1,
            TextureKind::Cube => 6,
        }
    }

    pub fn is_srgb(&self) -> bool {
        self.srgb
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        if self.srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
