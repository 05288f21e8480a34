//! Object poses and the composition function shared by every transform space

use cgmath::{Array, Matrix, Matrix4, One, Quaternion, SquareMatrix, Vector3, Vector4};

use super::request::MatrixRequest;

/// Position, orientation and scale of one object (or of the camera)
///
/// Positions are kept in `f64`: the camera-relative offset is formed at full
/// precision and only then narrowed to the `f32` the GPU consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Pose {
    /// Origin, no rotation, unit scale
    pub fn identity() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn at(position: Vector3<f64>) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

fn narrow(v: Vector3<f64>) -> Vector3<f32> {
    Vector3::new(v.x as f32, v.y as f32, v.z as f32)
}

/// Composes the requested terms for one object
///
/// Terms are multiplied left to right in the fixed order
/// projection, view rotation, view translation, model translation,
/// model rotation, model scale. `INVERSE` is applied to the finished
/// product, then `TRANSPOSE`.
///
/// When both translations are requested they are folded into a single
/// translation by `object - camera`, computed in `f64`. This is the same
/// product as the two separate terms but keeps precision when both
/// positions are far from the world origin.
///
/// A singular product (zero scale, for instance) inverts to a matrix of NaN
/// instead of failing.
///
/// # Arguments
/// * `request` - Terms to compose
/// * `projection` - Camera projection matrix
/// * `camera` - Camera pose (scale is ignored)
/// * `object` - Object pose
pub fn compose(
    request: MatrixRequest,
    projection: &Matrix4<f32>,
    camera: &Pose,
    object: &Pose,
) -> Matrix4<f32> {
    let mut m = if request.contains(MatrixRequest::PROJECTION) {
        *projection
    } else {
        Matrix4::identity()
    };

    if request.contains(MatrixRequest::VIEW_R) {
        m = m * Matrix4::from(camera.rotation.conjugate());
    }

    let view_t = request.contains(MatrixRequest::VIEW_T);
    let model_t = request.contains(MatrixRequest::MODEL_T);
    let translation = match (view_t, model_t) {
        (true, true) => Some(object.position - camera.position),
        (true, false) => Some(-camera.position),
        (false, true) => Some(object.position),
        (false, false) => None,
    };
    if let Some(offset) = translation {
        m = m * Matrix4::from_translation(narrow(offset));
    }

    if request.contains(MatrixRequest::MODEL_R) {
        m = m * Matrix4::from(object.rotation);
    }
    if request.contains(MatrixRequest::MODEL_S) {
        let s = object.scale;
        m = m * Matrix4::from_nonuniform_scale(s.x, s.y, s.z);
    }

    if request.contains(MatrixRequest::INVERSE) {
        m = m.invert().unwrap_or_else(|| {
            let nan = Vector4::from_value(f32::NAN);
            Matrix4::from_cols(nan, nan, nan, nan)
        });
    }
    if request.contains(MatrixRequest::TRANSPOSE) {
        m = m.transpose();
    }
    m
}
