//! Drawables: a geometry paired with a material.

use std::{
    cell::Cell,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    data_structures::geometry::{BoundingBox, Geometry},
    error::Result,
    materials::Material,
};

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// Identity the renderer keys a drawable's GPU resources by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u64);

impl MeshId {
    fn next() -> Self {
        Self(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug)]
pub struct Mesh {
    id: MeshId,
    geometry: Arc<Geometry>,
    material: Material,
    bounding_box: Cell<Option<BoundingBox>>,
    needs_update: bool,
}

impl Mesh {
    pub fn new(geometry: impl Into<Arc<Geometry>>, material: impl Into<Material>) -> Self {
        Self {
            id: MeshId::next(),
            geometry: geometry.into(),
            material: material.into(),
            bounding_box: Cell::new(None),
            needs_update: false,
        }
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }

    /// Replaces the geometry. The cached bounding box is dropped and the
    /// renderer re-uploads vertex and index data on the next frame.
    pub fn set_geometry(&mut self, geometry: impl Into<Arc<Geometry>>) {
        self.geometry = geometry.into();
        self.bounding_box.set(None);
        self.needs_update = true;
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn material_mut(&mut self) -> &mut Material {
        &mut self.material
    }

    pub fn set_material(&mut self, material: impl Into<Material>) {
        self.material = material.into();
    }

    /// Computed on first use and cached until the geometry changes.
    pub fn bounding_box(&self) -> BoundingBox {
        if let Some(bbox) = self.bounding_box.get() {
            return bbox;
        }
        let bbox = self.geometry.bounding_box();
        self.bounding_box.set(Some(bbox));
        bbox
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Flags the geometry buffers for re-upload.
    pub fn mark_needs_update(&mut self) {
        self.needs_update = true;
    }

    pub(crate) fn clear_needs_update(&mut self) {
        self.needs_update = false;
    }

    /// Vertex data interleaved in the layout the current material declares.
    pub fn interleaved_vertices(&self) -> Result<Vec<f32>> {
        let contract = self.material.contract();
        self.geometry
            .interleave(&contract.vertex_layout(), contract.kind())
    }
}
