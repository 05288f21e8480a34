//! Rigid-body physics collaborator
//!
//! The renderer does not simulate anything itself. A physics engine is
//! plugged in through [`PhysicsWorld`], and [`BodySpace`] turns the poses it
//! reports into matrices with the same composition rules as
//! [`crate::gfx::space::FloatSpace`].

use cgmath::{Quaternion, Vector3};

mod body_space;

pub use body_space::{BodyHandle, BodySpace};

/// Opaque body handle issued by a [`PhysicsWorld`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(pub u64);

/// Collision shape of a rigid body
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere { radius: f32 },
    Box { half_extents: Vector3<f32> },
    /// Infinite plane `dot(normal, p) = constant`
    Plane { normal: Vector3<f32>, constant: f32 },
}

/// Construction parameters of a rigid body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub shape: Shape,
    /// Zero mass makes the body static
    pub mass: f32,
    pub position: Vector3<f64>,
    pub rotation: Quaternion<f32>,
    pub restitution: f32,
}

impl BodyDesc {
    pub fn new(shape: Shape, mass: f32, position: Vector3<f64>) -> Self {
        Self {
            shape,
            mass,
            position,
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            restitution: 0.0,
        }
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }
}

/// What the renderer needs from a physics engine
pub trait PhysicsWorld {
    fn add_body(&mut self, desc: &BodyDesc) -> BodyId;

    fn remove_body(&mut self, body: BodyId);

    fn set_restitution(&mut self, body: BodyId, restitution: f32);

    /// Advances the simulation by `dt` seconds in steps of `fixed_step`,
    /// taking at most `max_substeps`; returns the number of steps taken
    fn step(&mut self, dt: f32, max_substeps: u32, fixed_step: f32) -> u32;

    /// World-space position and orientation of a body
    fn body_pose(&self, body: BodyId) -> (Vector3<f64>, Quaternion<f32>);
}
