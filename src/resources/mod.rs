//! Loading external resources and managing their GPU-side counterparts.
//!
//! - `texture` uploads CPU textures once per identity
//! - `fallback` holds the dummy textures bound to empty material slots
//! - `mesh` caches the buffers and bind groups of every drawable
//!
//! The async loaders in this module read image files and decode them into
//! CPU-side [`Texture`]s. Failures carry the path and the underlying cause.
//! They run on tokio's file system and are unavailable on wasm.

pub mod fallback;
pub mod mesh;
pub mod texture;

use std::path::Path;

use image::DynamicImage;

use crate::{
    data_structures::texture::{Texture, decode_image},
    error::{RenderError, Result},
};

#[cfg(not(target_arch = "wasm32"))]
pub async fn load_binary(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    tokio::fs::read(path)
        .await
        .map_err(|source| RenderError::TextureIo {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(not(target_arch = "wasm32"))]
fn decode(path: &Path, bytes: &[u8]) -> Result<DynamicImage> {
    let hint = path.extension().and_then(|ext| ext.to_str());
    decode_image(bytes, hint).map_err(|source| RenderError::TextureDecode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(not(target_arch = "wasm32"))]
fn label_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(not(target_arch = "wasm32"))]
/// Reads and decodes a 2D texture. Normal maps are sampled linearly, everything else as sRGB.
pub async fn load_texture(path: impl AsRef<Path>, is_normal_map: bool) -> Result<Texture> {
    let path = path.as_ref();
    let bytes = load_binary(path).await?;
    let img = decode(path, &bytes)?;
    Ok(Texture::from_image(&img, &label_of(path), is_normal_map))
}

#[cfg(not(target_arch = "wasm32"))]
/// Reads the six faces of a cube map (+X, -X, +Y, -Y, +Z, -Z) concurrently.
pub async fn load_cube_texture<P: AsRef<Path>>(paths: [P; 6]) -> Result<Texture> {
    let reads = paths.iter().map(|p| async move {
        let path = p.as_ref();
        let bytes = load_binary(path).await?;
        decode(path, &bytes)
    });
    let faces = futures::future::try_join_all(reads).await?;
    let faces: [DynamicImage; 6] = faces
        .try_into()
        .map_err(|_| RenderError::InvalidCubeMap("expected exactly six faces".into()))?;
    Texture::cube_from_images(&faces, &label_of(paths[0].as_ref()))
}
