//! Scene graph and hierarchical scene organization.
//!
//! Nodes live in a [`SlotMap`] arena owned by the [`Scene`] and refer to each
//! other by [`NodeHandle`]: a node owns its list of child handles and keeps
//! its parent as an optional back-reference. The scene has a root node that
//! every renderable node hangs off.
//!
//! World matrices are not kept current automatically. Mutate transforms, then
//! call [`Scene::refresh_all`] (the renderer does this at the start of every
//! frame) or [`Scene::refresh_world_matrix`] for a single branch.
//!
//! Reparenting a node under itself or under one of its descendants is not
//! rejected. Every walk over the graph tracks the nodes it has visited, so
//! such cycles never make a walk run forever; nodes in a detached cycle simply
//! stop being reachable from the root.

use std::collections::HashSet;

use cgmath::{InnerSpace, Matrix4, SquareMatrix, Transform as _};
use slotmap::{SlotMap, new_key_type};

use crate::{
    data_structures::{
        camera::PerspectiveCamera,
        light::{Light, LightInfo},
        mesh::Mesh,
        ray::Ray,
        transform::Transform,
    },
    error::{RenderError, Result},
    materials::SkyboxMaterial,
};

new_key_type! {
    /// Handle of a node inside its [`Scene`].
    pub struct NodeHandle;
}

/// What a node carries besides its transform.
#[derive(Debug)]
pub enum NodeKind {
    Group,
    Mesh(Mesh),
    Light(Light),
    Camera(PerspectiveCamera),
}

/// Discriminant of [`NodeKind`] for type-filtered searches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    Group,
    Mesh,
    Light,
    Camera,
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Group => NodeType::Group,
            NodeKind::Mesh(_) => NodeType::Mesh,
            NodeKind::Light(_) => NodeType::Light,
            NodeKind::Camera(_) => NodeType::Camera,
        }
    }
}

impl From<Mesh> for NodeKind {
    fn from(mesh: Mesh) -> Self {
        NodeKind::Mesh(mesh)
    }
}

impl From<Light> for NodeKind {
    fn from(light: Light) -> Self {
        NodeKind::Light(light)
    }
}

impl From<PerspectiveCamera> for NodeKind {
    fn from(camera: PerspectiveCamera) -> Self {
        NodeKind::Camera(camera)
    }
}

#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    /// Invisible nodes hide their whole subtree from rendering and raycasts.
    pub visible: bool,
    pub kind: NodeKind,
    local_matrix: Matrix4<f32>,
    world_matrix: Matrix4<f32>,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
}

impl Node {
    fn new(name: String, kind: NodeKind) -> Self {
        Self {
            name,
            transform: Transform::default(),
            visible: true,
            kind,
            local_matrix: Matrix4::identity(),
            world_matrix: Matrix4::identity(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// As of the last refresh.
    pub fn local_matrix(&self) -> Matrix4<f32> {
        self.local_matrix
    }

    /// As of the last refresh.
    pub fn world_matrix(&self) -> Matrix4<f32> {
        self.world_matrix
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }
}

/// A hit reported by [`Scene::raycast`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastHit {
    pub node: NodeHandle,
    /// World-space distance from the ray origin.
    pub distance: f32,
    pub point: cgmath::Point3<f32>,
    /// World-space face normal.
    pub normal: cgmath::Vector3<f32>,
}

#[derive(Debug)]
pub struct Scene {
    nodes: SlotMap<NodeHandle, Node>,
    root: NodeHandle,
    skybox: Option<SkyboxMaterial>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new("scene".to_string(), NodeKind::Group));
        Self {
            nodes,
            root,
            skybox: None,
        }
    }

    pub fn root(&self) -> NodeHandle {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes.contains_key(handle)
    }

    /// Creates a detached node with an identity transform.
    pub fn create(&mut self, name: &str, kind: impl Into<NodeKind>) -> NodeHandle {
        self.nodes.insert(Node::new(name.to_string(), kind.into()))
    }

    pub fn create_group(&mut self, name: &str) -> NodeHandle {
        self.create(name, NodeKind::Group)
    }

    /// Creates a node and attaches it to `parent`.
    pub fn spawn(
        &mut self,
        parent: NodeHandle,
        name: &str,
        kind: impl Into<NodeKind>,
    ) -> Result<NodeHandle> {
        self.require(parent)?;
        let handle = self.create(name, kind);
        self.add(parent, handle)?;
        Ok(handle)
    }

    fn require(&self, handle: NodeHandle) -> Result<&Node> {
        self.nodes
            .get(handle)
            .ok_or_else(|| RenderError::UnknownNode(format!("{handle:?}")))
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    pub fn mesh(&self, handle: NodeHandle) -> Option<&Mesh> {
        match &self.nodes.get(handle)?.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn mesh_mut(&mut self, handle: NodeHandle) -> Option<&mut Mesh> {
        match &mut self.nodes.get_mut(handle)?.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn light(&self, handle: NodeHandle) -> Option<&Light> {
        match &self.nodes.get(handle)?.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }

    pub fn camera(&self, handle: NodeHandle) -> Option<&PerspectiveCamera> {
        match &self.nodes.get(handle)?.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn camera_mut(&mut self, handle: NodeHandle) -> Option<&mut PerspectiveCamera> {
        match &mut self.nodes.get_mut(handle)?.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn world_matrix(&self, handle: NodeHandle) -> Option<Matrix4<f32>> {
        self.nodes.get(handle).map(|n| n.world_matrix)
    }

    pub fn set_local_transform(&mut self, handle: NodeHandle, transform: Transform) -> Result<()> {
        let node = self
            .nodes
            .get_mut(handle)
            .ok_or_else(|| RenderError::UnknownNode(format!("{handle:?}")))?;
        node.transform = transform;
        Ok(())
    }

    pub fn set_visible(&mut self, handle: NodeHandle, visible: bool) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.visible = visible;
        }
    }

    /// Attaches `child` to `parent`, detaching it from any previous parent first.
    pub fn add(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<()> {
        self.require(parent)?;
        self.require(child)?;
        self.detach(child);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
        }
        Ok(())
    }

    /// Detaches `child` from `parent`. Returns false when `parent` was not its parent.
    /// The node stays in the arena and can be re-added.
    pub fn remove(&mut self, parent: NodeHandle, child: NodeHandle) -> bool {
        match self.nodes.get(child) {
            Some(node) if node.parent == Some(parent) => {
                self.detach(child);
                true
            }
            _ => false,
        }
    }

    fn detach(&mut self, child: NodeHandle) {
        let Some(old_parent) = self.nodes.get_mut(child).and_then(|c| c.parent.take()) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(old_parent) {
            p.children.retain(|&c| c != child);
        }
    }

    /// Removes a node and its whole subtree from the scene. The root cannot be deleted.
    pub fn delete(&mut self, handle: NodeHandle) -> Option<Node> {
        if handle == self.root || !self.nodes.contains_key(handle) {
            return None;
        }
        self.detach(handle);
        for descendant in self.descendants(handle) {
            self.nodes.remove(descendant);
        }
        self.nodes.remove(handle)
    }

    /// Recomputes the node's local and world matrices.
    ///
    /// With `update_ancestors` the chain above the node is refreshed first,
    /// root to parent. With `update_descendants` the whole subtree below is
    /// refreshed afterwards, parents before children.
    pub fn refresh_world_matrix(
        &mut self,
        handle: NodeHandle,
        update_ancestors: bool,
        update_descendants: bool,
    ) {
        if !self.nodes.contains_key(handle) {
            return;
        }
        if update_ancestors {
            let mut chain = Vec::new();
            let mut seen = HashSet::from([handle]);
            let mut current = self.nodes[handle].parent;
            while let Some(ancestor) = current {
                if !seen.insert(ancestor) {
                    break;
                }
                let Some(node) = self.nodes.get(ancestor) else {
                    break;
                };
                chain.push(ancestor);
                current = node.parent;
            }
            for &ancestor in chain.iter().rev() {
                self.refresh_node(ancestor);
            }
        }

        self.refresh_node(handle);

        if update_descendants {
            for descendant in self.descendants(handle) {
                self.refresh_node(descendant);
            }
        }
    }

    fn refresh_node(&mut self, handle: NodeHandle) {
        let parent_world = self.nodes[handle]
            .parent
            .and_then(|p| self.nodes.get(p))
            .map(|p| p.world_matrix);
        let node = &mut self.nodes[handle];
        node.local_matrix = node.transform.to_matrix();
        node.world_matrix = match parent_world {
            Some(parent) => parent * node.local_matrix,
            None => node.local_matrix,
        };
    }

    /// Refreshes every node reachable from the root.
    pub fn refresh_all(&mut self) {
        self.refresh_world_matrix(self.root, false, true);
    }

    /// Pre-order depth-first visit starting at `start`.
    ///
    /// A node's children are read after the visitor returns, so the visitor may
    /// change the visited node and anything still queued.
    pub fn traverse<F>(&mut self, start: NodeHandle, mut visitor: F)
    where
        F: FnMut(&mut Scene, NodeHandle),
    {
        let mut stack = vec![start];
        let mut seen = HashSet::new();
        while let Some(handle) = stack.pop() {
            if !self.nodes.contains_key(handle) || !seen.insert(handle) {
                continue;
            }
            visitor(self, handle);
            if let Some(node) = self.nodes.get(handle) {
                stack.extend(node.children.iter().rev());
            }
        }
    }

    /// Every node below `start` in pre-order, excluding `start`.
    pub fn descendants(&self, start: NodeHandle) -> Vec<NodeHandle> {
        self.walk(start, |_| true)
            .into_iter()
            .filter(|&h| h != start)
            .collect()
    }

    /// Pre-order walk that only descends into nodes accepted by `enter`.
    fn walk(&self, start: NodeHandle, enter: impl Fn(&Node) -> bool) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        let mut seen = HashSet::new();
        while let Some(handle) = stack.pop() {
            let Some(node) = self.nodes.get(handle) else {
                continue;
            };
            if !seen.insert(handle) || !enter(node) {
                continue;
            }
            out.push(handle);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// First node in pre-order from the root with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<NodeHandle> {
        self.walk(self.root, |_| true)
            .into_iter()
            .find(|&h| self.nodes[h].name == name)
    }

    pub fn find_by_type(&self, node_type: NodeType) -> Vec<NodeHandle> {
        self.walk(self.root, |_| true)
            .into_iter()
            .filter(|&h| self.nodes[h].kind.node_type() == node_type)
            .collect()
    }

    pub fn lights(&self) -> Vec<NodeHandle> {
        self.find_by_type(NodeType::Light)
    }

    /// Visible mesh nodes and resolved lights reachable from the root, in
    /// pre-order. An invisible node hides everything below it.
    pub fn partition_visible(&self) -> (Vec<NodeHandle>, Vec<LightInfo>) {
        let mut drawables = Vec::new();
        let mut lights = Vec::new();
        for handle in self.walk(self.root, |n| n.visible) {
            let node = &self.nodes[handle];
            match &node.kind {
                NodeKind::Mesh(_) => drawables.push(handle),
                NodeKind::Light(light) => {
                    let position = node.world_matrix.transform_point(cgmath::Point3::new(0.0, 0.0, 0.0));
                    lights.push(LightInfo::new(*light, position));
                }
                NodeKind::Group | NodeKind::Camera(_) => {}
            }
        }
        (drawables, lights)
    }

    pub fn skybox(&self) -> Option<&SkyboxMaterial> {
        self.skybox.as_ref()
    }

    pub fn skybox_mut(&mut self) -> Option<&mut SkyboxMaterial> {
        self.skybox.as_mut()
    }

    pub fn set_skybox(&mut self, skybox: Option<SkyboxMaterial>) {
        self.skybox = skybox;
    }

    /// Intersects `ray` (world space) with every visible triangle-list mesh,
    /// nearest hit first. Uses world matrices as of the last refresh.
    pub fn raycast(&self, ray: &Ray) -> Vec<RaycastHit> {
        let mut hits = Vec::new();
        for handle in self.walk(self.root, |n| n.visible) {
            let node = &self.nodes[handle];
            let NodeKind::Mesh(mesh) = &node.kind else {
                continue;
            };
            if mesh.material().contract().topology() != wgpu::PrimitiveTopology::TriangleList {
                continue;
            }
            let Some(inverse) = node.world_matrix.invert() else {
                continue;
            };
            let local_ray = ray.transformed(&inverse);
            if local_ray.intersect_box(&mesh.bounding_box()).is_none() {
                continue;
            }

            let geometry = mesh.geometry();
            let nearest = geometry
                .triangles()
                .into_iter()
                .filter_map(|[a, b, c]| {
                    local_ray.intersect_triangle(
                        geometry.position(a)?,
                        geometry.position(b)?,
                        geometry.position(c)?,
                    )
                })
                .min_by(|x, y| x.distance.total_cmp(&y.distance));

            if let Some(hit) = nearest {
                let point = node.world_matrix.transform_point(hit.point);
                let normal = inverse_transpose(&inverse).transform_vector(hit.normal).normalize();
                hits.push(RaycastHit {
                    node: handle,
                    distance: (point - ray.origin).magnitude(),
                    point,
                    normal,
                });
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

fn inverse_transpose(inverse: &Matrix4<f32>) -> Matrix4<f32> {
    cgmath::Matrix::transpose(inverse)
}

#[cfg(test)]
mod tests {
    use cgmath::{Point3, Vector3, Vector4};

    use super::*;
    use crate::{
        data_structures::geometry::Geometry,
        materials::BasicMaterial,
    };

    fn translated(x: f32, y: f32, z: f32) -> Transform {
        Transform::from_position(Vector3::new(x, y, z))
    }

    #[test]
    fn root_world_equals_local() {
        let mut scene = Scene::new();
        let node = scene.create_group("lonely");
        scene
            .set_local_transform(node, translated(1.0, 2.0, 3.0).with_scale(Vector3::new(2.0, 2.0, 2.0)))
            .unwrap();
        scene.refresh_world_matrix(node, true, false);
        let node = scene.node(node).unwrap();
        assert_eq!(node.world_matrix(), node.local_matrix());
        assert_ne!(node.world_matrix(), Matrix4::identity());
    }

    #[test]
    fn child_world_composes_parent() {
        let mut scene = Scene::new();
        let parent = scene.spawn(scene.root(), "parent", NodeKind::Group).unwrap();
        let child = scene.spawn(parent, "child", NodeKind::Group).unwrap();
        scene.set_local_transform(parent, translated(10.0, 0.0, 0.0)).unwrap();
        scene.set_local_transform(child, translated(5.0, 0.0, 0.0)).unwrap();
        scene.refresh_all();

        let moved = scene.world_matrix(child).unwrap() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!(moved, Vector4::new(15.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn ancestor_refresh_fixes_stale_parents() {
        let mut scene = Scene::new();
        let parent = scene.spawn(scene.root(), "parent", NodeKind::Group).unwrap();
        let child = scene.spawn(parent, "child", NodeKind::Group).unwrap();
        scene.set_local_transform(parent, translated(0.0, 3.0, 0.0)).unwrap();

        scene.refresh_world_matrix(child, false, false);
        assert_eq!(scene.world_matrix(child).unwrap(), Matrix4::identity());

        scene.refresh_world_matrix(child, true, false);
        assert_eq!(
            scene.world_matrix(child).unwrap(),
            Matrix4::from_translation(Vector3::new(0.0, 3.0, 0.0))
        );
    }

    #[test]
    fn traverse_is_pre_order() {
        let mut scene = Scene::new();
        let root = scene.root();
        let c1 = scene.spawn(root, "c1", NodeKind::Group).unwrap();
        let c2 = scene.spawn(root, "c2", NodeKind::Group).unwrap();
        let mut visited = Vec::new();
        scene.traverse(root, |_, h| visited.push(h));
        assert_eq!(visited, vec![root, c1, c2]);
    }

    #[test]
    fn traverse_sees_mutations_of_queued_nodes() {
        let mut scene = Scene::new();
        let root = scene.root();
        let c1 = scene.spawn(root, "c1", NodeKind::Group).unwrap();
        let c2 = scene.spawn(root, "c2", NodeKind::Group).unwrap();
        let mut names = Vec::new();
        scene.traverse(root, |scene, h| {
            if h == c1 {
                scene.node_mut(c2).unwrap().name = "renamed".to_string();
            }
            names.push(scene.node(h).unwrap().name.clone());
        });
        assert_eq!(names, vec!["scene", "c1", "renamed"]);
    }

    #[test]
    fn add_reparents() {
        let mut scene = Scene::new();
        let a = scene.spawn(scene.root(), "a", NodeKind::Group).unwrap();
        let b = scene.spawn(scene.root(), "b", NodeKind::Group).unwrap();
        let child = scene.spawn(a, "child", NodeKind::Group).unwrap();
        assert_eq!(scene.node(a).unwrap().children().len(), 1);

        scene.add(b, child).unwrap();
        assert_eq!(scene.node(a).unwrap().children().len(), 0);
        assert_eq!(scene.node(b).unwrap().children(), &[child]);
        assert_eq!(scene.node(child).unwrap().parent(), Some(b));
    }

    #[test]
    fn remove_only_detaches_from_actual_parent() {
        let mut scene = Scene::new();
        let a = scene.spawn(scene.root(), "a", NodeKind::Group).unwrap();
        let child = scene.spawn(a, "child", NodeKind::Group).unwrap();
        assert!(!scene.remove(scene.root(), child));
        assert!(scene.remove(a, child));
        assert_eq!(scene.node(child).unwrap().parent(), None);
        assert!(scene.contains(child));
    }

    #[test]
    fn cycles_do_not_hang_walks() {
        let mut scene = Scene::new();
        let a = scene.spawn(scene.root(), "a", NodeKind::Group).unwrap();
        let b = scene.spawn(a, "b", NodeKind::Group).unwrap();
        scene.add(b, a).unwrap();
        scene.add(a, a).unwrap();

        scene.refresh_world_matrix(b, true, true);
        scene.refresh_all();
        let mut count = 0;
        scene.traverse(a, |_, _| count += 1);
        assert_eq!(count, 2);
        assert_eq!(scene.find_by_name("b"), None);
    }

    #[test]
    fn delete_removes_subtree() {
        let mut scene = Scene::new();
        let a = scene.spawn(scene.root(), "a", NodeKind::Group).unwrap();
        let b = scene.spawn(a, "b", NodeKind::Group).unwrap();
        let before = scene.len();
        assert!(scene.delete(a).is_some());
        assert_eq!(scene.len(), before - 2);
        assert!(!scene.contains(b));
        assert!(scene.node(scene.root()).unwrap().children().is_empty());
        assert!(scene.delete(scene.root()).is_none());
    }

    #[test]
    fn queries() {
        let mut scene = Scene::new();
        let root = scene.root();
        let sun = scene
            .spawn(root, "sun", Light::directional(Vector3::new(1.0, 1.0, 1.0), 1.0))
            .unwrap();
        let group = scene.spawn(root, "group", NodeKind::Group).unwrap();
        let lamp = scene
            .spawn(group, "lamp", Light::point(Vector3::new(1.0, 0.5, 0.0), 2.0, 0.0, 2.0))
            .unwrap();
        let cam = scene.spawn(group, "cam", PerspectiveCamera::default()).unwrap();

        assert_eq!(scene.find_by_name("lamp"), Some(lamp));
        assert_eq!(scene.lights(), vec![sun, lamp]);
        assert_eq!(scene.find_by_type(NodeType::Camera), vec![cam]);
        assert_eq!(scene.descendants(group), vec![lamp, cam]);
        assert!(scene.camera(cam).is_some());
        assert!(scene.light(cam).is_none());
    }

    #[test]
    fn invisible_nodes_hide_their_subtree() {
        let mut scene = Scene::new();
        let root = scene.root();
        let geometry = Geometry::from_positions(vec![0.0; 9]);
        let shown = scene
            .spawn(root, "shown", Mesh::new(geometry.clone(), BasicMaterial::default()))
            .unwrap();
        let hidden_group = scene.spawn(root, "hidden", NodeKind::Group).unwrap();
        scene
            .spawn(hidden_group, "inner", Mesh::new(geometry, BasicMaterial::default()))
            .unwrap();
        scene
            .spawn(hidden_group, "light", Light::ambient(Vector3::new(1.0, 1.0, 1.0), 1.0))
            .unwrap();
        scene.set_visible(hidden_group, false);

        let (drawables, lights) = scene.partition_visible();
        assert_eq!(drawables, vec![shown]);
        assert!(lights.is_empty());
    }

    #[test]
    fn raycast_hits_nearest_mesh_first() {
        let mut scene = Scene::new();
        let root = scene.root();
        let triangle = Geometry::from_positions(vec![
            -1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0,
        ]);
        let far = scene
            .spawn(root, "far", Mesh::new(triangle.clone(), BasicMaterial::default()))
            .unwrap();
        let near = scene
            .spawn(root, "near", Mesh::new(triangle, BasicMaterial::default()))
            .unwrap();
        scene.set_local_transform(far, translated(0.0, 0.0, -2.0)).unwrap();
        scene.set_local_transform(near, translated(0.0, 0.0, 1.0)).unwrap();
        scene.refresh_all();

        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let hits = scene.raycast(&ray);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node, near);
        assert!((hits[0].distance - 4.0).abs() < 1e-5);
        assert!((hits[1].distance - 7.0).abs() < 1e-5);
        assert!(hits[0].normal.z > 0.0);
    }
}
