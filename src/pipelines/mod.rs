//! Programs and render passes.
//!
//! Every renderable kind has a program constructor (`mk_*_program`) and a pass
//! that draws the bucket of objects the classifier collected for it:
//!
//! - `basic`: opaque meshes
//! - `transparent`: meshes whose program is flagged transparent, drawn after
//!   the opaque ones sorted by render order
//! - `sprite`: single textured billboards
//! - `batched_sprite`: many billboards sharing one program and one draw call
//! - `program`: lazy shader compilation and scoped program binding

pub mod basic;
pub mod batched_sprite;
pub mod program;
pub mod sprite;
pub mod transparent;

use log::warn;

use crate::{
    data_structures::scene_graph::SceneNode,
    render::{RenderError, RenderState},
};

/// Renders `objects` in order and returns how many of them issued a draw call.
///
/// An object whose program is broken is skipped and its error is kept in
/// `state.errors`; the remaining objects are still drawn.
pub(crate) fn render_objects(
    state: &mut RenderState<'_>,
    objects: &[SceneNode],
) -> Result<usize, RenderError> {
    let mut drawn = 0;
    for object in objects {
        match object.render(state) {
            Ok(true) => drawn += 1,
            Ok(false) => {}
            Err(e) => {
                warn!("{}: not drawn, {e}", object.name());
                state.errors.push(e);
            }
        }
    }
    Ok(drawn)
}
