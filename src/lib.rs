//! lumen-ngin
//!
//! A small scene-graph renderer. Nodes carry a local transform, world
//! transforms are propagated down the hierarchy, and every frame the visible
//! renderables are classified into passes that draw them through lazily
//! compiled shader programs. All GPU access goes through the GL-style
//! [`context::GraphicsContext`] trait, so the engine runs against any backend
//! implementing it, including the recording [`context::HeadlessContext`].
//!
//! High-level modules
//! - `camera`: perspective/orthographic cameras, projection and unprojection
//! - `context`: the graphics context trait and a headless implementation
//! - `data_structures`: scene graph, transforms, geometry and renderables
//! - `flow`: high level flow control (scenes / update loops)
//! - `pick`: rays, bounding boxes and object picking
//! - `pipelines`: shader programs and the render passes using them
//! - `render`: render classification and pass composition
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pick;
pub mod pipelines;
pub mod render;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu::{BlendState, CompareFunction, IndexFormat, PrimitiveTopology, ShaderStages, VertexFormat};
