use approx::assert_relative_eq;
use lumen_ngin::{
    camera::{Camera, Projection},
    cgmath::{Deg, Matrix4, Point3, Rad, SquareMatrix, Transform, Vector3},
    context::HeadlessContext,
    data_structures::scene_graph::SceneNode,
    render::{RenderConfig, Renderer},
};

use crate::common::test_utils::{camera_node, init_logger, matrix4_uniforms, mesh_node};

mod common;

#[test]
fn world_update_derives_view_and_model_view() {
    let camera = camera_node();
    let node_world = camera.world_matrix();

    let camera = camera.camera().unwrap();
    assert_relative_eq!(camera.world_inverse_matrix(), node_world.invert().unwrap());
    assert_relative_eq!(
        camera.model_view_matrix(),
        camera.projection_matrix() * camera.world_inverse_matrix()
    );
}

#[test]
fn camera_follows_its_parent() {
    let rig = SceneNode::group();
    let camera = camera_node();
    rig.attach(&camera).unwrap();
    rig.set_position(Vector3::new(10.0, 0.0, 0.0));

    rig.update_world_matrix();

    let inverse = camera.camera().unwrap().world_inverse_matrix();
    // the camera sits at (10, 0, 5), which maps to the view origin
    let origin = inverse.transform_point(Point3::new(10.0, 0.0, 5.0));
    assert_relative_eq!(origin, Point3::new(0.0, 0.0, 0.0), epsilon = 1e-5);
}

#[test]
fn project_and_unproject_are_inverse() {
    let camera = camera_node();
    let camera = camera.camera().unwrap();
    let point = Point3::new(0.5, -0.25, -2.0);

    let projected = camera.project(point);
    let unprojected = camera.unproject(projected).unwrap();

    assert_relative_eq!(unprojected, point, epsilon = 1e-4);
}

#[test]
fn point_in_front_of_camera_projects_to_the_center() {
    let camera = camera_node();
    let projected = camera.camera().unwrap().project(Point3::new(0.0, 0.0, 0.0));

    assert_relative_eq!(projected.x, 0.0);
    assert_relative_eq!(projected.y, 0.0);
    assert!(projected.z > -1.0 && projected.z < 1.0);
}

#[test]
fn custom_projection_is_kept_on_update() {
    let projection = Matrix4::from_nonuniform_scale(2.0, 3.0, 1.0);
    let mut camera = Camera::new(projection);

    camera.update_projection_matrix();

    assert_eq!(camera.projection(), Projection::Custom);
    assert_eq!(camera.projection_matrix(), projection);
}

#[test]
fn aspect_change_recomputes_perspective_projection() {
    let mut camera = Camera::perspective(Deg(60.0), 1.0, 0.1, 10.0);
    let square = camera.projection_matrix();

    camera.set_aspect(2.0);

    assert_relative_eq!(camera.projection_matrix().x.x, square.x.x / 2.0);
    assert_relative_eq!(camera.model_view_matrix(), camera.projection_matrix());
    assert!(matches!(
        camera.projection(),
        Projection::Perspective { aspect, .. } if aspect == 2.0
    ));
}

#[test]
fn orthographic_projection_maps_bounds_to_clip_space() {
    let camera = Camera::orthographic(-4.0, 4.0, -2.0, 2.0, 0.0, 10.0);

    let corner = camera.project(Point3::new(4.0, 2.0, -5.0));

    assert_relative_eq!(corner.x, 1.0);
    assert_relative_eq!(corner.y, 1.0);
}

#[test]
fn set_projection_switches_kind() {
    let mut camera = Camera::orthographic(-1.0, 1.0, -1.0, 1.0, 0.1, 10.0);
    let orthographic = camera.projection_matrix();

    camera.set_projection(Projection::Perspective {
        fovy: Rad(1.0),
        aspect: 1.0,
        near: 0.1,
        far: 10.0,
    });

    assert_ne!(camera.projection_matrix(), orthographic);
}

#[test]
fn look_at_then_render_uses_the_new_orientation() {
    init_logger();
    let scene = SceneNode::group();
    let camera = camera_node();
    scene.attach(&camera).unwrap();
    let target = mesh_node("target");
    scene.attach(&target).unwrap();
    camera.set_position(Vector3::new(5.0, 0.0, 5.0));
    scene.update_world_matrix();
    // still looking down -Z, the target is off to the side
    let before = camera.camera().unwrap().project(Point3::new(0.0, 0.0, 0.0));
    assert!(before.x.abs() > 1.0);

    camera.look_at(Point3::new(0.0, 0.0, 0.0));
    let mut ctx = HeadlessContext::new();
    let mut renderer = Renderer::new(RenderConfig::default());
    renderer.render(&mut ctx, &scene, &camera);

    let location = match &*target.kind() {
        lumen_ngin::data_structures::scene_graph::NodeKind::Mesh(mesh) => {
            mesh.program.borrow().uniform("uCamera").unwrap()
        }
        _ => unreachable!(),
    };
    let recorded = matrix4_uniforms(&ctx, location);
    assert_eq!(recorded.len(), 1);
    let center = Matrix4::from(recorded[0]).transform_point(Point3::new(0.0, 0.0, 0.0));
    assert_relative_eq!(center.x, 0.0, epsilon = 1e-5);
    assert_relative_eq!(center.y, 0.0, epsilon = 1e-5);
}

#[test]
fn look_at_respects_the_camera_up_axis() {
    let camera = camera_node();
    camera.camera_mut().unwrap().up = Vector3::new(1.0, 0.0, 0.0);
    camera.set_position(Vector3::new(0.0, 5.0, 0.0));

    camera.look_at(Point3::new(0.0, 0.0, 0.0));
    camera.update_world_matrix();

    let world = camera.world_matrix();
    let up = world.transform_vector(Vector3::unit_y());
    let forward = world.transform_vector(-Vector3::unit_z());
    assert_relative_eq!(forward, Vector3::new(0.0, -1.0, 0.0), epsilon = 1e-5);
    assert_relative_eq!(up, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
}
