//! Scene graph and hierarchical scene organization.
//!
//! A [`SceneNode`] is a shared handle to one node of the hierarchy. Parents own
//! their children, children only keep a weak reference to their parent, so
//! dropping the last handle of a detached subtree frees it.
//!
//! Transforms are propagated top-down: every node keeps a local matrix built
//! from its [`Instance`] and a world matrix equal to the parent's world matrix
//! times the local matrix. Updating the world matrix of a node always
//! re-derives its whole subtree.
//!
//! Do not attach or detach nodes from within a traversal callback. No borrow
//! is held while the callback runs, but the traversal reads each child list
//! before visiting it and will not see the change.

use std::{
    cell::{Ref, RefCell, RefMut},
    rc::{Rc, Weak},
};

use cgmath::{EuclideanSpace, Matrix4, Point3, Quaternion, SquareMatrix, Vector3};
use log::{debug, warn};

use crate::{
    camera::{Camera, look_at_rotation},
    data_structures::{
        batched_sprite::BatchedSprite,
        instance::Instance,
        mesh::Mesh,
        sprite::{QUAD_INDICES, QUAD_UVS, QUAD_VERTICES, Sprite},
    },
    render::{RenderError, RenderPlugins, RenderState, RenderType},
};

#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneGraphError {
    #[error("a node cannot be attached to itself")]
    SelfAttach,
    #[error("the node is an ancestor of its new parent")]
    Cycle,
}

/// What a node is, besides being a transform in the hierarchy.
#[derive(Debug)]
pub enum NodeKind {
    Group,
    Camera(Camera),
    Mesh(Mesh),
    Sprite(Sprite),
    BatchedSprite(BatchedSprite),
}

impl NodeKind {
    /// The pass drawing this kind, `None` for nodes that are never drawn.
    pub fn render_type(&self) -> Option<RenderType> {
        match self {
            NodeKind::Group | NodeKind::Camera(_) => None,
            NodeKind::Mesh(mesh) if mesh.program.borrow().is_transparent() => {
                Some(RenderType::Transparent)
            }
            NodeKind::Mesh(_) => Some(RenderType::Mesh),
            NodeKind::Sprite(_) => Some(RenderType::Sprite),
            NodeKind::BatchedSprite(_) => Some(RenderType::BatchedSprite),
        }
    }
}

#[derive(Debug)]
struct Node {
    name: String,
    transform: Instance,
    local_matrix: Matrix4<f32>,
    world_matrix: Matrix4<f32>,
    world_matrix_dirty: bool,
    visible: bool,
    world_updates: u64,
    children: Vec<SceneNode>,
    parent: Weak<RefCell<Node>>,
    kind: NodeKind,
}

#[derive(Clone, Debug)]
pub struct SceneNode(Rc<RefCell<Node>>);

impl SceneNode {
    /// A visible node with identity transform, no parent and no children.
    pub fn new(kind: NodeKind) -> Self {
        Self(Rc::new(RefCell::new(Node {
            name: String::new(),
            transform: Instance::new(),
            local_matrix: Matrix4::identity(),
            world_matrix: Matrix4::identity(),
            world_matrix_dirty: false,
            visible: true,
            world_updates: 0,
            children: Vec::new(),
            parent: Weak::new(),
            kind,
        })))
    }

    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    pub fn with_name(self, name: &str) -> Self {
        self.0.borrow_mut().name = name.to_string();
        self
    }

    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    /// Whether both handles point to the same node.
    pub fn ptr_eq(&self, other: &SceneNode) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn kind(&self) -> Ref<'_, NodeKind> {
        Ref::map(self.0.borrow(), |node| &node.kind)
    }

    pub fn kind_mut(&self) -> RefMut<'_, NodeKind> {
        RefMut::map(self.0.borrow_mut(), |node| &mut node.kind)
    }

    pub fn render_type(&self) -> Option<RenderType> {
        self.0.borrow().kind.render_type()
    }

    pub fn camera(&self) -> Option<Ref<'_, Camera>> {
        Ref::filter_map(self.0.borrow(), |node| match &node.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        })
        .ok()
    }

    /// Changes to the projection are picked up immediately, the view on the
    /// next world matrix update.
    pub fn camera_mut(&self) -> Option<RefMut<'_, Camera>> {
        RefMut::filter_map(self.0.borrow_mut(), |node| match &mut node.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        })
        .ok()
    }

    pub fn batched_sprite_mut(&self) -> Option<RefMut<'_, BatchedSprite>> {
        RefMut::filter_map(self.0.borrow_mut(), |node| match &mut node.kind {
            NodeKind::BatchedSprite(batch) => Some(batch),
            _ => None,
        })
        .ok()
    }

    /// Offset and size of a sprite node.
    pub fn sprite_params(&self) -> Option<([f32; 2], [f32; 2])> {
        match &self.0.borrow().kind {
            NodeKind::Sprite(sprite) => Some((sprite.offset.into(), sprite.size.into())),
            _ => None,
        }
    }

    /// Draw order among transparent meshes. Zero for every other kind.
    pub fn render_order(&self) -> i32 {
        match &self.0.borrow().kind {
            NodeKind::Mesh(mesh) => mesh.render_order,
            _ => 0,
        }
    }

    pub fn parent(&self) -> Option<SceneNode> {
        self.0.borrow().parent.upgrade().map(SceneNode)
    }

    pub fn children(&self) -> Vec<SceneNode> {
        self.0.borrow().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    pub fn is_ancestor_of(&self, other: &SceneNode) -> bool {
        let mut current = other.parent();
        while let Some(node) = current {
            if node.ptr_eq(self) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Appends `child` to the children of `self`.
    ///
    /// A child that already has a parent is detached from it first. Its world
    /// matrix is marked dirty since it is now relative to a new parent.
    pub fn attach(&self, child: &SceneNode) -> Result<(), SceneGraphError> {
        if self.ptr_eq(child) {
            return Err(SceneGraphError::SelfAttach);
        }
        if child.is_ancestor_of(self) {
            return Err(SceneGraphError::Cycle);
        }
        if let Some(previous) = child.parent() {
            previous.detach(child);
        }
        {
            let mut node = child.0.borrow_mut();
            node.parent = Rc::downgrade(&self.0);
            node.world_matrix_dirty = true;
        }
        self.0.borrow_mut().children.push(child.clone());
        Ok(())
    }

    /// Removes `child` from the children of `self`.
    ///
    /// Returns false, changing nothing, if `child` is not a child of `self`.
    /// The detached subtree is kept alive by any remaining handle. Its world
    /// matrix is marked dirty since the node is now a root.
    pub fn detach(&self, child: &SceneNode) -> bool {
        let removed = {
            let mut node = self.0.borrow_mut();
            match node.children.iter().position(|c| c.ptr_eq(child)) {
                Some(index) => {
                    node.children.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            let mut node = child.0.borrow_mut();
            node.parent = Weak::new();
            node.world_matrix_dirty = true;
        }
        removed
    }

    pub fn is_visible(&self) -> bool {
        self.0.borrow().visible
    }

    pub fn set_visible(&self, visible: bool) {
        self.0.borrow_mut().visible = visible;
    }

    pub fn transform(&self) -> Instance {
        self.0.borrow().transform
    }

    pub fn position(&self) -> Vector3<f32> {
        self.0.borrow().transform.position
    }

    pub fn rotation(&self) -> Quaternion<f32> {
        self.0.borrow().transform.rotation
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.0.borrow().transform.scale
    }

    pub fn set_position(&self, position: Vector3<f32>) {
        self.update_transform(|transform| transform.position = position);
    }

    pub fn set_rotation(&self, rotation: Quaternion<f32>) {
        self.update_transform(|transform| transform.rotation = rotation);
    }

    pub fn set_scale(&self, scale: Vector3<f32>) {
        self.update_transform(|transform| transform.scale = scale);
    }

    /// Mutates the local transform and refreshes the local matrix.
    pub fn update_transform(&self, mutation: impl FnOnce(&mut Instance)) {
        mutation(&mut self.0.borrow_mut().transform);
        self.mark_local_dirty();
    }

    /// Recomputes the local matrix and flags the world matrix as stale.
    pub fn mark_local_dirty(&self) {
        let mut node = self.0.borrow_mut();
        node.local_matrix = node.transform.to_matrix();
        node.world_matrix_dirty = true;
    }

    pub fn local_matrix(&self) -> Matrix4<f32> {
        self.0.borrow().local_matrix
    }

    pub fn world_matrix(&self) -> Matrix4<f32> {
        self.0.borrow().world_matrix
    }

    pub fn is_world_matrix_dirty(&self) -> bool {
        self.0.borrow().world_matrix_dirty
    }

    /// How often the world matrix of this node was recomputed.
    pub fn world_update_count(&self) -> u64 {
        self.0.borrow().world_updates
    }

    /// Re-derives the world matrix of this node from its parent's current
    /// world matrix, then of every node below it, dirty or not.
    pub fn update_world_matrix(&self) {
        let parent_world = self.parent().map(|parent| parent.world_matrix());
        self.update_world_matrix_from(parent_world);
    }

    fn update_world_matrix_from(&self, parent_world: Option<Matrix4<f32>>) {
        let (world, children) = {
            let mut node = self.0.borrow_mut();
            let world = match parent_world {
                Some(parent_world) => parent_world * node.local_matrix,
                None => node.local_matrix,
            };
            node.world_matrix = world;
            node.world_matrix_dirty = false;
            node.world_updates += 1;
            if let NodeKind::Camera(camera) = &mut node.kind {
                camera.update_view(world);
            }
            (world, node.children.clone())
        };
        for child in &children {
            child.update_world_matrix_from(Some(world));
        }
    }

    /// Translation of the world matrix. Only current if the node is not dirty.
    pub fn world_position(&self) -> Point3<f32> {
        Point3::from_vec(self.0.borrow().world_matrix.w.truncate())
    }

    /// Rotates the node so its -Z axis points at `target`, given in the
    /// parent's space, and refreshes the local matrix.
    ///
    /// Cameras use their `up` axis as reference, every other node +Y.
    pub fn look_at(&self, target: Point3<f32>) {
        let (rotation, name) = {
            let node = self.0.borrow();
            let up = match &node.kind {
                NodeKind::Camera(camera) => camera.up,
                _ => Vector3::unit_y(),
            };
            let eye = Point3::from_vec(node.transform.position);
            (look_at_rotation(eye, target, up), node.name.clone())
        };
        match rotation {
            Some(rotation) => self.set_rotation(rotation),
            None => warn!("{name}: cannot look at {target:?}, orientation left unchanged"),
        }
    }

    /// Visits `self`, then every descendant depth-first in child order.
    pub fn traverse(&self, visitor: &mut impl FnMut(&SceneNode)) {
        visitor(self);
        for child in self.children() {
            child.traverse(visitor);
        }
    }

    /// Like [`SceneNode::traverse`], but skips invisible nodes together with
    /// their whole subtree.
    pub fn traverse_visible(&self, visitor: &mut impl FnMut(&SceneNode)) {
        if !self.is_visible() {
            return;
        }
        visitor(self);
        for child in self.children() {
            child.traverse_visible(visitor);
        }
    }

    /// Registers every visible renderable of this subtree with its pass.
    pub fn classify(&self, plugins: &mut RenderPlugins) {
        self.traverse_visible(&mut |node| {
            if let Some(render_type) = node.render_type() {
                plugins.add_object(render_type, node.clone());
            }
        });
    }

    /// Draws this node with one draw call, children are not drawn.
    ///
    /// Returns whether a draw call was issued. Invisible nodes, nodes without
    /// geometry and sprites whose texture is not set yet are skipped without
    /// touching the world matrix or the context. An empty batch binds and
    /// unbinds its program but draws nothing.
    pub fn render(&self, state: &mut RenderState<'_>) -> Result<bool, RenderError> {
        let program = {
            let node = self.0.borrow();
            if !node.visible {
                return Ok(false);
            }
            match &node.kind {
                NodeKind::Group | NodeKind::Camera(_) => return Ok(false),
                NodeKind::Mesh(mesh) => {
                    if mesh.vertex_count().is_none() {
                        warn!("{}: mesh geometry has no position buffer", node.name);
                        return Ok(false);
                    }
                    mesh.program.clone()
                }
                NodeKind::Sprite(sprite) => {
                    if !sprite.has_texture() {
                        debug!("{}: sprite texture is not set yet", node.name);
                        return Ok(false);
                    }
                    sprite.program.clone()
                }
                NodeKind::BatchedSprite(batch) => {
                    if !batch.has_texture() {
                        debug!("{}: sprite texture is not set yet", node.name);
                        return Ok(false);
                    }
                    batch.program.clone()
                }
            }
        };

        if self.is_world_matrix_dirty() {
            self.update_world_matrix();
        }
        state.object = Some(self.clone());

        let mut program = program.borrow_mut();
        let mut bound = program.enable(state)?;
        let node = self.0.borrow();
        let topology = wgpu::PrimitiveTopology::TriangleList;
        match &node.kind {
            NodeKind::Mesh(mesh) => {
                for (name, buffer) in mesh.geometry.buffers() {
                    bound.attribute_data(name, buffer.format(), buffer.bytes());
                }
                let vertices = mesh.vertex_count().unwrap_or_default();
                let Some(count) = draw_count(&node.name, vertices) else {
                    return Ok(false);
                };
                bound.ctx().draw_arrays(topology, 0, count);
            }
            NodeKind::Sprite(_) => {
                let format = wgpu::VertexFormat::Float32x2;
                bound.attribute_data("position", format, bytemuck::cast_slice(QUAD_VERTICES.as_slice()));
                bound.attribute_data("texture", format, bytemuck::cast_slice(QUAD_UVS.as_slice()));
                let ctx = bound.ctx();
                ctx.index_data(wgpu::IndexFormat::Uint16, bytemuck::cast_slice(QUAD_INDICES.as_slice()));
                ctx.draw_elements(topology, QUAD_INDICES.len() as u32, wgpu::IndexFormat::Uint16, 0);
            }
            NodeKind::BatchedSprite(batch) => {
                if batch.is_empty() {
                    debug!("{}: batched sprite has no instances", node.name);
                    return Ok(false);
                }
                let Some(count) = draw_count(&node.name, batch.vertex_count()) else {
                    return Ok(false);
                };
                let pairs = wgpu::VertexFormat::Float32x2;
                bound.attribute_data("disposition", pairs, bytemuck::cast_slice(batch.dispositions()));
                bound.attribute_data(
                    "position",
                    wgpu::VertexFormat::Float32x3,
                    bytemuck::cast_slice(batch.positions()),
                );
                bound.attribute_data("scale", pairs, bytemuck::cast_slice(batch.scales()));
                bound.attribute_data("offset", pairs, bytemuck::cast_slice(batch.offsets()));
                bound.attribute_data("texture", pairs, bytemuck::cast_slice(batch.uvs()));
                bound.attribute_data(
                    "colorAlpha",
                    wgpu::VertexFormat::Float32,
                    bytemuck::cast_slice(batch.opacities()),
                );
                bound.ctx().draw_arrays(topology, 0, count);
            }
            NodeKind::Group | NodeKind::Camera(_) => return Ok(false),
        }
        Ok(true)
    }
}

/// Vertex count of a draw call, `None` if the context cannot address it.
fn draw_count(name: &str, vertices: usize) -> Option<u32> {
    match u32::try_from(vertices) {
        Ok(count) => Some(count),
        Err(_) => {
            warn!("{name}: {vertices} vertices exceed a single draw call, skipped");
            None
        }
    }
}

impl From<Camera> for SceneNode {
    fn from(camera: Camera) -> Self {
        Self::new(NodeKind::Camera(camera))
    }
}

impl From<Mesh> for SceneNode {
    fn from(mesh: Mesh) -> Self {
        Self::new(NodeKind::Mesh(mesh))
    }
}

impl From<Sprite> for SceneNode {
    fn from(sprite: Sprite) -> Self {
        Self::new(NodeKind::Sprite(sprite))
    }
}

impl From<BatchedSprite> for SceneNode {
    fn from(batch: BatchedSprite) -> Self {
        Self::new(NodeKind::BatchedSprite(batch))
    }
}

#[cfg(test)]
mod tests {
    use super::draw_count;

    #[test]
    fn draw_count_rejects_counts_beyond_u32() {
        assert_eq!(draw_count("mesh", 6), Some(6));
        assert_eq!(draw_count("mesh", u32::MAX as usize), Some(u32::MAX));
        #[cfg(target_pointer_width = "64")]
        assert_eq!(draw_count("mesh", u32::MAX as usize + 1), None);
    }
}
