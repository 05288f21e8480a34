//! Transform space
//!
//! Poses, matrix requests and the floating-origin object table.

pub mod floatspace;
pub mod pose;
pub mod request;

pub use floatspace::{perspective, FloatSpace, ObjectId};
pub use pose::{compose, Pose};
pub use request::MatrixRequest;
