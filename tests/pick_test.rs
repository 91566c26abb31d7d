use approx::assert_relative_eq;
use lumen_ngin::{
    cgmath::{Matrix4, Point3, Vector3},
    data_structures::{geometry::Geometry, scene_graph::SceneNode},
    pick::{Aabb, Ray, pick, screen_ray},
};

use crate::common::test_utils::{camera_node, mesh_node, square_geometry};

mod common;

fn unit_box() -> Aabb {
    Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0))
}

#[test]
fn bounding_box_of_geometry() {
    let bounds = square_geometry().bounding_box().unwrap();

    assert_eq!(bounds.min, Point3::new(-0.5, -0.5, 0.0));
    assert_eq!(bounds.max, Point3::new(0.5, 0.5, 0.0));
    assert_eq!(bounds.center(), Point3::new(0.0, 0.0, 0.0));
    assert!(Geometry::new().bounding_box().is_none());
}

#[test]
fn ray_hits_the_near_side_of_a_box() {
    let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -2.0));

    let hit = ray.intersect_box(&unit_box()).unwrap();

    assert_relative_eq!(hit, Point3::new(0.0, 0.0, 1.0));
    assert_relative_eq!(ray.direction, Vector3::new(0.0, 0.0, -1.0));
}

#[test]
fn ray_starting_inside_a_box_hits_where_it_leaves() {
    let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));

    let hit = ray.intersect_box(&unit_box()).unwrap();

    assert_relative_eq!(hit, Point3::new(1.0, 0.0, 0.0));
}

#[test]
fn ray_misses_boxes_beside_or_behind_it() {
    let beside = Ray::new(Point3::new(3.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
    let away = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, 1.0));

    assert!(beside.intersect_box(&unit_box()).is_none());
    assert!(away.intersect_box(&unit_box()).is_none());
}

#[test]
fn ray_hits_a_triangle() {
    let ray = Ray::new(Point3::new(0.25, 0.25, 1.0), Vector3::new(0.0, 0.0, -1.0));
    let (a, b, c) = (
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    );

    let hit = ray.intersect_triangle(a, b, c, true).unwrap();

    assert_relative_eq!(hit, Point3::new(0.25, 0.25, 0.0));
}

#[test]
fn back_faces_are_culled_on_request() {
    let ray = Ray::new(Point3::new(0.25, 0.25, 1.0), Vector3::new(0.0, 0.0, -1.0));
    let (a, b, c) = (
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
    );

    assert!(ray.intersect_triangle(a, b, c, true).is_none());
    assert!(ray.intersect_triangle(a, b, c, false).is_some());
}

#[test]
fn ray_misses_triangles_outside_parallel_or_behind() {
    let (a, b, c) = (
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    );
    let outside = Ray::new(Point3::new(0.75, 0.75, 1.0), Vector3::new(0.0, 0.0, -1.0));
    let parallel = Ray::new(Point3::new(0.25, 0.25, 1.0), Vector3::new(1.0, 0.0, 0.0));
    let behind = Ray::new(Point3::new(0.25, 0.25, -1.0), Vector3::new(0.0, 0.0, -1.0));

    assert!(outside.intersect_triangle(a, b, c, false).is_none());
    assert!(parallel.intersect_triangle(a, b, c, false).is_none());
    assert!(behind.intersect_triangle(a, b, c, false).is_none());
}

#[test]
fn apply_matrix4_moves_origin_and_turns_direction() {
    let ray = Ray::new(Point3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, -1.0));
    let matrix = Matrix4::from_translation(Vector3::new(0.0, 2.0, 0.0)) * Matrix4::from_scale(3.0);

    let moved = ray.apply_matrix4(matrix);

    assert_relative_eq!(moved.origin, Point3::new(3.0, 2.0, 0.0));
    assert_relative_eq!(moved.direction, Vector3::new(0.0, 0.0, -1.0));
    assert_relative_eq!(moved.at(2.0), Point3::new(3.0, 2.0, -2.0));
}

#[test]
fn screen_ray_through_the_center_follows_the_view_axis() {
    let camera = camera_node();

    let ray = screen_ray(&camera.camera().unwrap(), [0.0, 0.0]).unwrap();

    assert_relative_eq!(ray.direction, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
    assert_relative_eq!(ray.origin.x, 0.0, epsilon = 1e-5);
    assert_relative_eq!(ray.origin.y, 0.0, epsilon = 1e-5);
}

#[test]
fn pick_returns_the_closest_visible_mesh() {
    let scene = SceneNode::group();
    let camera = camera_node();
    let near = mesh_node("near");
    let far = mesh_node("far");
    let aside = mesh_node("aside");
    near.set_position(Vector3::new(0.0, 0.0, 1.0));
    far.set_position(Vector3::new(0.0, 0.0, -3.0));
    aside.set_position(Vector3::new(4.0, 0.0, 0.0));
    for node in [&far, &near, &aside] {
        scene.attach(node).unwrap();
    }
    scene.update_world_matrix();

    let picked = pick(&scene, &camera, [0.0, 0.0]).unwrap();
    assert_eq!(picked.name(), "near");

    near.set_visible(false);
    let picked = pick(&scene, &camera, [0.0, 0.0]).unwrap();
    assert_eq!(picked.name(), "far");

    far.set_visible(false);
    assert!(pick(&scene, &camera, [0.0, 0.0]).is_none());
}
