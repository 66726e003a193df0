//! 1x1 stand-ins for unset optional texture slots.
//!
//! Binding a dummy texture keeps one bind-group layout per material kind,
//! whether or not a given instance sets its optional maps.

use log::warn;

use crate::{
    context::RenderDevice,
    data_structures::texture::Texture,
    materials::{TextureFallback, TextureSlot},
};

use super::texture::{TextureCache, upload_texture};

pub struct FallbackResources<D: RenderDevice> {
    white: D::Texture,
    normal: D::Texture,
    black: D::Texture,
    black_cube: D::Texture,
    sampler: D::Sampler,
}

impl<D: RenderDevice> FallbackResources<D> {
    pub fn new(device: &D) -> Self {
        let upload = |texture: Texture| upload_texture(device, &texture);
        Self {
            white: upload(Texture::solid("fallback white", [255; 4], true)),
            // (0.5, 0.5, 1.0) points straight out of the surface; stored linear
            normal: upload(Texture::solid("fallback normal", [128, 128, 255, 255], false)),
            black: upload(Texture::solid("fallback black", [0, 0, 0, 255], true)),
            black_cube: upload(Texture::solid_cube("fallback black cube", [0, 0, 0, 255])),
            sampler: device.create_sampler("shared sampler"),
        }
    }

    pub fn texture(&self, fallback: TextureFallback) -> &D::Texture {
        match fallback {
            TextureFallback::White => &self.white,
            TextureFallback::Normal => &self.normal,
            TextureFallback::Black => &self.black,
            TextureFallback::BlackCube => &self.black_cube,
        }
    }

    /// The texture bound for `slot`: its own when set and of the right kind, the fallback otherwise.
    pub fn resolve(
        &self,
        device: &D,
        slot: &TextureSlot,
        textures: &mut TextureCache<D>,
    ) -> D::Texture {
        match &slot.texture {
            Some(texture) if texture.kind() == slot.kind() => {
                textures.get_or_upload(device, texture)
            }
            Some(texture) => {
                warn!(
                    "texture `{}` is {:?} but the slot expects {:?}, binding a fallback",
                    texture.label(),
                    texture.kind(),
                    slot.kind()
                );
                self.texture(slot.fallback).clone()
            }
            None => self.texture(slot.fallback).clone(),
        }
    }

    /// Sampler shared by every material binding.
    pub fn sampler(&self) -> &D::Sampler {
        &self.sampler
    }

    pub fn dispose(&self, device: &D) {
        for texture in [&self.white, &self.normal, &self.black, &self.black_cube] {
            device.destroy_texture(texture);
        }
    }
}
