//! Cameras and projections.
//!
//! A camera is the payload of a scene node. Whenever the node's world matrix
//! is recomputed, the camera derives its inverse world (view) matrix and the
//! combined `projection * view` matrix that shaders receive as `uCamera`.

use cgmath::{
    InnerSpace, Matrix, Matrix3, Matrix4, Point3, Quaternion, Rad, SquareMatrix, Transform,
    Vector3,
};
use log::warn;

/// How the projection matrix is produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    /// The projection matrix is set explicitly and never recomputed.
    Custom,
    Perspective {
        fovy: Rad<f32>,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    fn matrix(&self) -> Option<Matrix4<f32>> {
        match *self {
            Projection::Custom => None,
            Projection::Perspective {
                fovy,
                aspect,
                near,
                far,
            } => Some(cgmath::perspective(fovy, aspect, near, far)),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Some(cgmath::ortho(left, right, bottom, top, near, far)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    /// Reference up axis used by `look_at`.
    pub up: Vector3<f32>,
    projection: Projection,
    projection_matrix: Matrix4<f32>,
    world_matrix: Matrix4<f32>,
    world_inverse_matrix: Matrix4<f32>,
    model_view_matrix: Matrix4<f32>,
}

impl Camera {
    pub fn new(projection_matrix: Matrix4<f32>) -> Self {
        Self {
            up: Vector3::unit_y(),
            projection: Projection::Custom,
            projection_matrix,
            world_matrix: Matrix4::identity(),
            world_inverse_matrix: Matrix4::identity(),
            model_view_matrix: projection_matrix,
        }
    }

    pub fn perspective<F: Into<Rad<f32>>>(fovy: F, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self::new(Matrix4::identity());
        camera.set_projection(Projection::Perspective {
            fovy: fovy.into(),
            aspect,
            near,
            far,
        });
        camera
    }

    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let mut camera = Self::new(Matrix4::identity());
        camera.set_projection(Projection::Orthographic {
            left,
            right,
            bottom,
            top,
            near,
            far,
        });
        camera
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
        self.update_projection_matrix();
    }

    /// Only affects perspective cameras, e.g. after the viewport was resized.
    pub fn set_aspect(&mut self, aspect: f32) {
        if let Projection::Perspective { aspect: current, .. } = &mut self.projection {
            *current = aspect;
            self.update_projection_matrix();
        }
    }

    pub fn set_projection_matrix(&mut self, projection_matrix: Matrix4<f32>) {
        self.projection = Projection::Custom;
        self.projection_matrix = projection_matrix;
        self.model_view_matrix = self.projection_matrix * self.world_inverse_matrix;
    }

    /// Recomputes the projection matrix from the projection parameters.
    ///
    /// Custom projections keep their matrix.
    pub fn update_projection_matrix(&mut self) {
        if let Some(projection_matrix) = self.projection.matrix() {
            self.projection_matrix = projection_matrix;
        }
        self.model_view_matrix = self.projection_matrix * self.world_inverse_matrix;
    }

    /// Called with the new world matrix of the camera's node.
    pub(crate) fn update_view(&mut self, world_matrix: Matrix4<f32>) {
        self.world_matrix = world_matrix;
        match world_matrix.invert() {
            Some(inverse) => self.world_inverse_matrix = inverse,
            None => warn!("camera world matrix is not invertible, keeping the previous view"),
        }
        self.model_view_matrix = self.projection_matrix * self.world_inverse_matrix;
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection_matrix
    }

    pub fn world_inverse_matrix(&self) -> Matrix4<f32> {
        self.world_inverse_matrix
    }

    pub fn model_view_matrix(&self) -> Matrix4<f32> {
        self.model_view_matrix
    }

    /// World space to normalized device coordinates.
    pub fn project(&self, point: Point3<f32>) -> Point3<f32> {
        self.model_view_matrix.transform_point(point)
    }

    /// Normalized device coordinates to world space.
    pub fn unproject(&self, point: Point3<f32>) -> Option<Point3<f32>> {
        let inverse_projection = self.projection_matrix.invert()?;
        Some((self.world_matrix * inverse_projection).transform_point(point))
    }
}

/// Rotation turning the -Z axis at `eye` towards `target`.
///
/// Returns `None` if `eye` and `target` coincide or the view direction is
/// parallel to `up`.
pub fn look_at_rotation(
    eye: Point3<f32>,
    target: Point3<f32>,
    up: Vector3<f32>,
) -> Option<Quaternion<f32>> {
    let forward = target - eye;
    if forward.magnitude2() <= f32::EPSILON || forward.cross(up).magnitude2() <= f32::EPSILON {
        return None;
    }
    let view = Matrix4::look_at_rh(eye, target, up);
    let rotation =
        Matrix3::from_cols(view.x.truncate(), view.y.truncate(), view.z.truncate()).transpose();
    Some(Quaternion::from(rotation).normalize())
}
