use std::collections::{HashMap, HashSet};

use log::debug;

use crate::{
    context::{RenderDevice, TextureDescriptor},
    data_structures::texture::{Texture, TextureId},
};

/// Uploads a CPU texture through `device`, sampled and copy-writable.
pub fn upload_texture<D: RenderDevice>(device: &D, texture: &Texture) -> D::Texture {
    device.create_texture(&TextureDescriptor {
        label: texture.label(),
        width: texture.width(),
        height: texture.height(),
        layers: texture.layers(),
        dimension: texture.kind().view_dimension(),
        format: texture.format(),
        sample_count: 1,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        data: Some(texture.data()),
    })
}

/// GPU copies of CPU textures, one per [`TextureId`].
pub struct TextureCache<D: RenderDevice> {
    textures: HashMap<TextureId, D::Texture>,
}

impl<D: RenderDevice> Default for TextureCache<D> {
    fn default() -> Self {
        Self {
            textures: HashMap::new(),
        }
    }
}

impl<D: RenderDevice> TextureCache<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_upload(&mut self, device: &D, texture: &Texture) -> D::Texture {
        self.textures
            .entry(texture.id())
            .or_insert_with(|| {
                debug!(
                    "uploading texture `{}` ({}x{}x{})",
                    texture.label(),
                    texture.width(),
                    texture.height(),
                    texture.layers()
                );
                upload_texture(device, texture)
            })
            .clone()
    }

    pub fn contains(&self, id: TextureId) -> bool {
        self.textures.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Destroys every upload whose id is not in `live`. Returns how many went.
    pub fn retain(&mut self, device: &D, live: &HashSet<TextureId>) -> usize {
        let before = self.textures.len();
        self.textures.retain(|id, texture| {
            let keep = live.contains(id);
            if !keep {
                device.destroy_texture(texture);
            }
            keep
        });
        let evicted = before - self.textures.len();
        if evicted > 0 {
            debug!("evicted {evicted} unreferenced textures");
        }
        evicted
    }

    pub fn dispose_all(&mut self, device: &D) {
        for (_, texture) in self.textures.drain() {
            device.destroy_texture(&texture);
        }
    }
}
