//! Ray casting for object picking.
//!
//! A click position in normalized device coordinates is turned into a world
//! space ray through the camera. Meshes are hit tested against the bounding
//! box of their geometry; [`Ray::intersect_triangle`] allows exact tests.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, MetricSpace, Point3, SquareMatrix, Transform, Vector3};

use crate::{
    camera::Camera,
    data_structures::scene_graph::{NodeKind, SceneNode},
};

/// Axis aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Smallest box containing all `points`, `None` if there are none.
    pub fn from_points(points: impl IntoIterator<Item = Point3<f32>>) -> Option<Self> {
        points.into_iter().fold(None, |aabb, point| {
            Some(match aabb {
                None => Self::new(point, point),
                Some(Self { min, max }) => Self::new(
                    Point3::new(min.x.min(point.x), min.y.min(point.y), min.z.min(point.z)),
                    Point3::new(max.x.max(point.x), max.y.max(point.y), max.z.max(point.z)),
                ),
            })
        })
    }

    pub fn center(&self) -> Point3<f32> {
        self.min.midpoint(self.max)
    }

    pub fn contains(&self, point: Point3<f32>) -> bool {
        (self.min.x..=self.max.x).contains(&point.x)
            && (self.min.y..=self.max.y).contains(&point.y)
            && (self.min.z..=self.max.z).contains(&point.z)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    /// Unit length.
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    pub fn apply_matrix4(&self, matrix: Matrix4<f32>) -> Self {
        Self::new(
            matrix.transform_point(self.origin),
            matrix.transform_vector(self.direction),
        )
    }

    /// Closest point of `aabb` hit by the ray, slab method.
    ///
    /// A ray starting inside the box hits where it leaves the box.
    pub fn intersect_box(&self, aabb: &Aabb) -> Option<Point3<f32>> {
        let (mut t_min, mut t_max) = slab(self.origin.x, self.direction.x, aabb.min.x, aabb.max.x);

        let (ty_min, ty_max) = slab(self.origin.y, self.direction.y, aabb.min.y, aabb.max.y);
        if t_min > ty_max || ty_min > t_max {
            return None;
        }
        // comparisons with NaN are false, so NaN bounds are replaced
        if ty_min > t_min || t_min.is_nan() {
            t_min = ty_min;
        }
        if ty_max < t_max || t_max.is_nan() {
            t_max = ty_max;
        }

        let (tz_min, tz_max) = slab(self.origin.z, self.direction.z, aabb.min.z, aabb.max.z);
        if t_min > tz_max || tz_min > t_max {
            return None;
        }
        if tz_min > t_min || t_min.is_nan() {
            t_min = tz_min;
        }
        if tz_max < t_max || t_max.is_nan() {
            t_max = tz_max;
        }

        if t_max < 0.0 {
            return None;
        }
        Some(self.at(if t_min >= 0.0 { t_min } else { t_max }))
    }

    /// Möller–Trumbore ray/triangle intersection.
    ///
    /// With `backface_culling` only triangles wound counter-clockwise as seen
    /// from the ray origin are hit.
    pub fn intersect_triangle(
        &self,
        a: Point3<f32>,
        b: Point3<f32>,
        c: Point3<f32>,
        backface_culling: bool,
    ) -> Option<Point3<f32>> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if backface_culling {
            if det < f32::EPSILON {
                return None;
            }
        } else if det.abs() < f32::EPSILON {
            return None;
        }
        let inverse_det = 1.0 / det;

        let s = self.origin - a;
        let u = s.dot(p) * inverse_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inverse_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = edge2.dot(q) * inverse_det;
        if t < 0.0 {
            return None;
        }
        Some(self.at(t))
    }
}

fn slab(origin: f32, direction: f32, min: f32, max: f32) -> (f32, f32) {
    let inverse = 1.0 / direction;
    if inverse >= 0.0 {
        ((min - origin) * inverse, (max - origin) * inverse)
    } else {
        ((max - origin) * inverse, (min - origin) * inverse)
    }
}

/// World space ray through `ndc` (x and y in -1..1) from the near to the far plane.
pub fn screen_ray(camera: &Camera, ndc: [f32; 2]) -> Option<Ray> {
    let near = camera.unproject(Point3::new(ndc[0], ndc[1], -1.0))?;
    let far = camera.unproject(Point3::new(ndc[0], ndc[1], 1.0))?;
    let direction = far - near;
    if direction.magnitude2() <= f32::EPSILON {
        return None;
    }
    Some(Ray::new(near, direction))
}

/// The visible mesh closest to the camera under `ndc`.
///
/// Meshes are tested against the bounding box of their geometry.
pub fn pick(scene: &SceneNode, camera: &SceneNode, ndc: [f32; 2]) -> Option<SceneNode> {
    if camera.is_world_matrix_dirty() {
        camera.update_world_matrix();
    }
    let ray = screen_ray(&*camera.camera()?, ndc)?;

    let mut closest: Option<(f32, SceneNode)> = None;
    scene.traverse_visible(&mut |node| {
        let Some(bounds) = (match &*node.kind() {
            NodeKind::Mesh(mesh) => mesh.geometry.bounding_box(),
            _ => None,
        }) else {
            return;
        };
        if node.is_world_matrix_dirty() {
            node.update_world_matrix();
        }
        let world = node.world_matrix();
        let Some(inverse) = world.invert() else {
            return;
        };
        let Some(hit) = ray.apply_matrix4(inverse).intersect_box(&bounds) else {
            return;
        };
        let distance = world.transform_point(hit).distance(ray.origin);
        if closest.as_ref().is_none_or(|(best, _)| distance < *best) {
            closest = Some((distance, node.clone()));
        }
    });
    closest.map(|(_, node)| node)
}
