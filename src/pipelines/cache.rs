//! One pipeline per `(material kind, topology)` pair.

use std::{collections::HashMap, sync::Arc};

use log::debug;

use crate::{
    context::RenderDevice,
    error::Result,
    materials::{MaterialContract, pipeline_key},
    pipelines::basic::{PassState, PipelineSettings, mk_material_pipeline},
};

/// Materials of the same kind and topology always share the returned `Arc`,
/// whatever their per-instance uniform values. Entries are never evicted.
pub struct PipelineCache<D: RenderDevice> {
    settings: PipelineSettings,
    pipelines: HashMap<String, Arc<D::Pipeline>>,
}

impl<D: RenderDevice> PipelineCache<D> {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            settings,
            pipelines: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn get_or_create(
        &mut self,
        device: &D,
        material: &dyn MaterialContract,
    ) -> Result<Arc<D::Pipeline>> {
        let key = pipeline_key(material);
        if let Some(pipeline) = self.pipelines.get(&key) {
            return Ok(pipeline.clone());
        }
        debug!("pipeline cache miss for `{key}`");
        let pipeline = Arc::new(mk_material_pipeline(
            device,
            material,
            &self.settings,
            PassState::mesh(material.topology()),
        )?);
        self.pipelines.insert(key, pipeline.clone());
        Ok(pipeline)
    }

    pub fn get(&self, key: &str) -> Option<&Arc<D::Pipeline>> {
        self.pipelines.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pipelines.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn clear(&mut self) {
        self.pipelines.clear();
    }
}
