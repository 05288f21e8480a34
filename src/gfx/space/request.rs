//! Matrix composition requests
//!
//! A [`MatrixRequest`] names which transform terms get folded into a 4x4
//! matrix. The terms are always multiplied in the same order, so a request
//! only decides which of them take part:
//!
//! `PROJECTION · VIEW_R · VIEW_T · MODEL_T · MODEL_R · MODEL_S`
//!
//! followed by the `INVERSE` and then the `TRANSPOSE` post-steps.

use bitflags::bitflags;

bitflags! {
    /// Set of transform terms to compose into one matrix
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MatrixRequest: u32 {
        /// Camera projection; when absent the composition starts from identity
        const PROJECTION = 1 << 0;
        /// Inverse camera orientation
        const VIEW_R = 1 << 1;
        /// Translation by the negated camera position
        const VIEW_T = 1 << 2;
        /// Translation by the object position
        const MODEL_T = 1 << 3;
        /// Object orientation
        const MODEL_R = 1 << 4;
        /// Object scale
        const MODEL_S = 1 << 5;
        /// Invert the composed matrix
        const INVERSE = 1 << 6;
        /// Transpose the composed matrix, after inversion
        const TRANSPOSE = 1 << 7;

        const VIEW = Self::VIEW_R.bits() | Self::VIEW_T.bits();
        const MODEL = Self::MODEL_T.bits() | Self::MODEL_R.bits() | Self::MODEL_S.bits();
        const VP = Self::PROJECTION.bits() | Self::VIEW.bits();
        const MV = Self::VIEW.bits() | Self::MODEL.bits();
        const MVP = Self::PROJECTION.bits() | Self::MV.bits();
        /// Inverse-transpose of the model matrix, used to carry normals
        const IMT = Self::MODEL.bits() | Self::INVERSE.bits() | Self::TRANSPOSE.bits();
    }
}

impl MatrixRequest {
    /// Terms that only depend on the camera
    pub const CAMERA_TERMS: MatrixRequest = MatrixRequest::PROJECTION
        .union(MatrixRequest::VIEW)
        .union(MatrixRequest::INVERSE)
        .union(MatrixRequest::TRANSPOSE);

    /// Returns the request with every per-object term removed
    pub fn camera_only(self) -> Self {
        self & Self::CAMERA_TERMS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composites() {
        assert!(MatrixRequest::MVP.contains(MatrixRequest::VP));
        assert!(MatrixRequest::MVP.contains(MatrixRequest::MODEL));
        assert!(!MatrixRequest::MVP.contains(MatrixRequest::INVERSE));
        assert!(MatrixRequest::IMT.contains(MatrixRequest::TRANSPOSE));
        assert!(!MatrixRequest::IMT.contains(MatrixRequest::VIEW_R));
    }

    #[test]
    fn test_camera_only_strips_model_terms() {
        let request = MatrixRequest::MVP | MatrixRequest::INVERSE;
        assert_eq!(
            request.camera_only(),
            MatrixRequest::VP | MatrixRequest::INVERSE
        );
    }
}
