//! Floating-origin transform space
//!
//! Holds one camera and a table of object poses addressed by [`ObjectId`].
//! Matrices are always formed relative to the camera, so objects near a
//! camera that is far from the world origin keep their precision.

use cgmath::{Matrix4, Quaternion, SquareMatrix, Vector3};

use super::pose::{compose, Pose};
use super::request::MatrixRequest;

/// Handle to an object pose inside a [`FloatSpace`]
///
/// Handles of removed objects are handed out again by later `add` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(u32);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Right-handed perspective projection with wgpu's `[0, 1]` clip depth
///
/// `fov` is the vertical field of view in radians. Inputs are not checked: a
/// zero field of view or `near == far` yields infinite or NaN entries.
pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    let f = 1.0 / (fov / 2.0).tan();
    let depth = near - far;
    #[rustfmt::skip]
    let m = Matrix4::new(
        f / aspect, 0.0, 0.0, 0.0,
        0.0, f, 0.0, 0.0,
        0.0, 0.0, far / depth, -1.0,
        0.0, 0.0, near * far / depth, 0.0,
    );
    m
}

/// Camera plus object table with free-list handle reuse
#[derive(Debug, Clone)]
pub struct FloatSpace {
    camera: Pose,
    projection: Matrix4<f32>,
    objects: Vec<Pose>,
    free: Vec<u32>,
}

impl Default for FloatSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl FloatSpace {
    pub fn new() -> Self {
        Self {
            camera: Pose::identity(),
            projection: Matrix4::identity(),
            objects: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Sets a perspective projection for the given viewport
    ///
    /// A zero height is treated as an aspect ratio of 1.
    pub fn build(&mut self, width: u32, height: u32, fov: f32, near: f32, far: f32) {
        let aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        self.set_perspective(fov, aspect, near, far);
    }

    pub fn set_perspective(&mut self, fov: f32, aspect: f32, near: f32, far: f32) {
        self.projection = perspective(fov, aspect, near, far);
    }

    pub fn set_projection(&mut self, projection: Matrix4<f32>) {
        self.projection = projection;
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn camera(&self) -> &Pose {
        &self.camera
    }

    pub fn set_camera_position(&mut self, position: Vector3<f64>) {
        self.camera.position = position;
    }

    pub fn set_camera_rotation(&mut self, rotation: Quaternion<f32>) {
        self.camera.rotation = rotation;
    }

    /// Registers a new object at the identity pose
    pub fn add(&mut self) -> ObjectId {
        match self.free.pop() {
            Some(index) => ObjectId(index),
            None => {
                self.objects.push(Pose::identity());
                ObjectId((self.objects.len() - 1) as u32)
            }
        }
    }

    /// Returns the handle to the free list and resets its pose
    ///
    /// Removing a handle that is already free is a no-op.
    pub fn remove(&mut self, id: ObjectId) {
        let Some(pose) = self.objects.get_mut(id.index()) else {
            log::warn!("FloatSpace: remove of unknown object {}", id.0);
            return;
        };
        if self.free.contains(&id.0) {
            return;
        }
        *pose = Pose::identity();
        self.free.push(id.0);
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pose of an object; unknown handles read as the identity pose
    pub fn pose(&self, id: ObjectId) -> Pose {
        self.objects
            .get(id.index())
            .copied()
            .unwrap_or_else(Pose::identity)
    }

    fn pose_mut(&mut self, id: ObjectId) -> Option<&mut Pose> {
        let pose = self.objects.get_mut(id.index());
        if pose.is_none() {
            log::warn!("FloatSpace: write to unknown object {}", id.0);
        }
        pose
    }

    pub fn set_position(&mut self, id: ObjectId, position: Vector3<f64>) {
        if let Some(pose) = self.pose_mut(id) {
            pose.position = position;
        }
    }

    pub fn set_rotation(&mut self, id: ObjectId, rotation: Quaternion<f32>) {
        if let Some(pose) = self.pose_mut(id) {
            pose.rotation = rotation;
        }
    }

    pub fn set_scale(&mut self, id: ObjectId, scale: Vector3<f32>) {
        if let Some(pose) = self.pose_mut(id) {
            pose.scale = scale;
        }
    }

    /// Camera-only matrix; model terms in the request are ignored
    pub fn view_matrix(&self, request: MatrixRequest) -> Matrix4<f32> {
        compose(
            request.camera_only(),
            &self.projection,
            &self.camera,
            &Pose::identity(),
        )
    }

    /// Matrix for a single object
    pub fn object_matrix(&self, id: ObjectId, request: MatrixRequest) -> Matrix4<f32> {
        compose(request, &self.projection, &self.camera, &self.pose(id))
    }

    /// One matrix per handle, in input order
    pub fn object_matrices(&self, ids: &[ObjectId], request: MatrixRequest) -> Vec<Matrix4<f32>> {
        let mut out = Vec::with_capacity(ids.len());
        self.object_matrices_into(&mut out, ids, request);
        out
    }

    /// Same as [`Self::object_matrices`] but reuses `out`'s allocation
    pub fn object_matrices_into(
        &self,
        out: &mut Vec<Matrix4<f32>>,
        ids: &[ObjectId],
        request: MatrixRequest,
    ) {
        out.clear();
        out.extend(ids.iter().map(|id| self.object_matrix(*id, request)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Matrix, Rotation3, Vector4};

    fn assert_matrix_eq(a: &Matrix4<f32>, b: &Matrix4<f32>, eps: f32) {
        for c in 0..4 {
            for r in 0..4 {
                assert!(
                    (a[c][r] - b[c][r]).abs() <= eps,
                    "mismatch at [{c}][{r}]: {} vs {}",
                    a[c][r],
                    b[c][r]
                );
            }
        }
    }

    #[test]
    fn test_translation_only() {
        let mut space = FloatSpace::new();
        let id = space.add();
        space.set_position(id, Vector3::new(1.0, 2.0, 3.0));
        space.set_scale(id, Vector3::new(4.0, 4.0, 4.0));

        let m = space.object_matrix(id, MatrixRequest::MODEL_T);
        assert_eq!(m, Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_empty_request_is_identity() {
        let mut space = FloatSpace::new();
        space.set_perspective(1.0, 1.5, 0.5, 100.0);
        space.set_camera_position(Vector3::new(5.0, 5.0, 5.0));
        let id = space.add();
        assert_eq!(
            space.object_matrix(id, MatrixRequest::empty()),
            Matrix4::identity()
        );
    }

    #[test]
    fn test_translations_fold_at_double_precision() {
        let mut space = FloatSpace::new();
        space.set_camera_position(Vector3::new(1.0e9, 0.0, 0.0));
        let id = space.add();
        space.set_position(id, Vector3::new(1.0e9 + 1.5, 0.0, -2.0));

        let m = space.object_matrix(id, MatrixRequest::VIEW_T | MatrixRequest::MODEL_T);
        assert_eq!(m.w, Vector4::new(1.5, 0.0, -2.0, 1.0));
    }

    #[test]
    fn test_folded_translation_matches_separate_terms() {
        let mut space = FloatSpace::new();
        space.set_camera_position(Vector3::new(3.0, -1.0, 2.0));
        space.set_camera_rotation(Quaternion::from_angle_y(Deg(30.0)));
        let id = space.add();
        space.set_position(id, Vector3::new(-4.0, 2.0, 8.0));
        space.set_rotation(id, Quaternion::from_angle_x(Deg(45.0)));

        let mv = space.object_matrix(id, MatrixRequest::MV);
        let view = space.view_matrix(MatrixRequest::VIEW);
        let model = space.object_matrix(id, MatrixRequest::MODEL);
        assert_matrix_eq(&mv, &(view * model), 1e-5);
    }

    #[test]
    fn test_inverse_then_transpose() {
        let mut space = FloatSpace::new();
        let id = space.add();
        space.set_position(id, Vector3::new(1.0, -2.0, 0.5));
        space.set_rotation(id, Quaternion::from_angle_z(Deg(60.0)));
        space.set_scale(id, Vector3::new(2.0, 3.0, 0.5));

        let model = space.object_matrix(id, MatrixRequest::MODEL);
        let expected = model.invert().unwrap().transpose();
        let imt = space.object_matrix(id, MatrixRequest::IMT);
        assert_matrix_eq(&imt, &expected, 1e-5);
    }

    #[test]
    fn test_singular_inverse_is_nan() {
        let mut space = FloatSpace::new();
        let id = space.add();
        space.set_scale(id, Vector3::new(0.0, 1.0, 1.0));

        let m = space.object_matrix(id, MatrixRequest::MODEL | MatrixRequest::INVERSE);
        assert!(m.x.x.is_nan());
        assert!(m.w.w.is_nan());
    }

    #[test]
    fn test_composition_is_repeatable() {
        let mut space = FloatSpace::new();
        space.set_perspective(0.8, 4.0 / 3.0, 0.5, 1024.0);
        space.set_camera_position(Vector3::new(12.5, 0.25, -7.0));
        space.set_camera_rotation(Quaternion::from_angle_y(Deg(12.0)));
        let id = space.add();
        space.set_position(id, Vector3::new(1.0, 2.0, 3.0));

        let request = MatrixRequest::MVP | MatrixRequest::INVERSE;
        let a = space.object_matrix(id, request);
        let b = space.object_matrix(id, request);
        for c in 0..4 {
            for r in 0..4 {
                assert_eq!(a[c][r].to_bits(), b[c][r].to_bits());
            }
        }
    }

    #[test]
    fn test_view_matrix_ignores_model_terms() {
        let mut space = FloatSpace::new();
        space.set_camera_position(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(
            space.view_matrix(MatrixRequest::MVP),
            space.view_matrix(MatrixRequest::VP)
        );
    }

    #[test]
    fn test_object_in_front_projects_inside_clip_volume() {
        let mut space = FloatSpace::new();
        space.build(800, 600, std::f32::consts::FRAC_PI_4, 0.5, 1024.0);
        space.set_camera_position(Vector3::new(0.0, 0.0, 20.0));
        let id = space.add();

        let clip = space.object_matrix(id, MatrixRequest::MVP) * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_perspective_maps_near_and_far_to_unit_depth() {
        let p = perspective(std::f32::consts::FRAC_PI_2, 2.0, 0.5, 100.0);
        let near = p * Vector4::new(0.0, 0.0, -0.5, 1.0);
        let far = p * Vector4::new(0.0, 0.0, -100.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-6);
        assert!((far.z / far.w - 1.0).abs() < 1e-6);

        // 90 degrees vertical: the top of the frustum at depth 1 is y = 1
        let edge = p * Vector4::new(0.0, 1.0, -1.0, 1.0);
        assert!((edge.y / edge.w - 1.0).abs() < 1e-6);
        assert!((p.x.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_perspective_does_not_panic() {
        let mut space = FloatSpace::new();
        space.set_perspective(0.0, 4.0 / 3.0, 0.5, 1024.0);
        assert!(!space.projection().y.y.is_finite());

        space.set_perspective(std::f32::consts::FRAC_PI_4, 1.0, 1.0, 1.0);
        assert!(!space.projection().z.z.is_finite());

        space.set_perspective(-1.0, 0.0, 2.0, 1.0);
        let id = space.add();
        let _ = space.object_matrix(id, MatrixRequest::MVP | MatrixRequest::INVERSE);
    }

    #[test]
    fn test_handles_are_recycled() {
        let mut space = FloatSpace::new();
        let a = space.add();
        let b = space.add();
        space.set_position(b, Vector3::new(9.0, 9.0, 9.0));
        assert_eq!(space.len(), 2);

        space.remove(b);
        space.remove(b);
        assert_eq!(space.len(), 1);

        let c = space.add();
        assert_eq!(c, b);
        assert_ne!(c, a);
        assert_eq!(space.pose(c), Pose::identity());
    }

    #[test]
    fn test_unknown_handle_reads_identity() {
        let space = FloatSpace::new();
        assert_eq!(space.pose(ObjectId(42)), Pose::identity());
    }

    #[test]
    fn test_object_matrices_keeps_input_order() {
        let mut space = FloatSpace::new();
        let ids: Vec<_> = (0..3).map(|_| space.add()).collect();
        for (i, id) in ids.iter().enumerate() {
            space.set_position(*id, Vector3::new(i as f64, 0.0, 0.0));
        }

        let mut reversed = ids.clone();
        reversed.reverse();
        let matrices = space.object_matrices(&reversed, MatrixRequest::MODEL_T);
        assert_eq!(matrices[0].w.x, 2.0);
        assert_eq!(matrices[2].w.x, 0.0);

        let mut out = vec![Matrix4::identity(); 8];
        space.object_matrices_into(&mut out, &ids, MatrixRequest::MODEL_T);
        assert_eq!(out.len(), 3);
    }
}
