//! Engine data structures: scene graph, renderables, geometry and textures.
//!
//! - `scene_graph` holds the node hierarchy and transform propagation
//! - `instance` holds the local position, rotation and scale of a node
//! - `geometry` contains named vertex attribute buffers
//! - `mesh`, `sprite` and `batched_sprite` are the renderable node payloads
//! - `texture` wraps texture handles owned by the graphics backend

pub mod batched_sprite;
pub mod geometry;
pub mod instance;
pub mod mesh;
pub mod scene_graph;
pub mod sprite;
pub mod texture;
