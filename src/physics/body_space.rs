use cgmath::{Matrix4, SquareMatrix, Vector3};

use super::{BodyDesc, BodyId, PhysicsWorld};
use crate::gfx::space::{compose, MatrixRequest, Pose};

/// Handle to a body slot inside a [`BodySpace`]
///
/// Like [`crate::gfx::space::ObjectId`], handles of removed bodies are
/// reused by later `add` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(u32);

impl BodyHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Transform space whose object poses come from a physics world
///
/// Poses are cached and only refreshed by [`BodySpace::step`], so every
/// matrix requested between two steps sees the same state.
pub struct BodySpace<W: PhysicsWorld> {
    world: W,
    camera: Pose,
    projection: Matrix4<f32>,
    bodies: Vec<Option<BodyId>>,
    poses: Vec<Pose>,
    free: Vec<u32>,
}

impl<W: PhysicsWorld> BodySpace<W> {
    pub fn new(world: W) -> Self {
        Self {
            world,
            camera: Pose::identity(),
            projection: Matrix4::identity(),
            bodies: Vec::new(),
            poses: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn camera(&self) -> &Pose {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: Pose) {
        self.camera = camera;
    }

    pub fn set_projection(&mut self, projection: Matrix4<f32>) {
        self.projection = projection;
    }

    pub fn add(&mut self, desc: &BodyDesc) -> BodyHandle {
        let body = self.world.add_body(desc);
        let pose = Pose {
            position: desc.position,
            rotation: desc.rotation,
            scale: Vector3::new(1.0, 1.0, 1.0),
        };
        match self.free.pop() {
            Some(index) => {
                self.bodies[index as usize] = Some(body);
                self.poses[index as usize] = pose;
                BodyHandle(index)
            }
            None => {
                self.bodies.push(Some(body));
                self.poses.push(pose);
                BodyHandle((self.bodies.len() - 1) as u32)
            }
        }
    }

    /// Removes the body from the world and resets its slot to identity
    pub fn remove(&mut self, handle: BodyHandle) {
        let Some(body) = self.bodies.get_mut(handle.index()).and_then(Option::take) else {
            log::warn!("BodySpace: remove of unknown body {}", handle.0);
            return;
        };
        self.world.remove_body(body);
        self.poses[handle.index()] = Pose::identity();
        self.free.push(handle.0);
    }

    pub fn len(&self) -> usize {
        self.bodies.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn body(&self, handle: BodyHandle) -> Option<BodyId> {
        self.bodies.get(handle.index()).copied().flatten()
    }

    pub fn set_restitution(&mut self, handle: BodyHandle, restitution: f32) {
        if let Some(body) = self.body(handle) {
            self.world.set_restitution(body, restitution);
        }
    }

    /// Render-only scale; the collision shape is unaffected
    pub fn set_scale(&mut self, handle: BodyHandle, scale: Vector3<f32>) {
        if let Some(pose) = self.poses.get_mut(handle.index()) {
            pose.scale = scale;
        }
    }

    /// Cached pose; unknown handles read as the identity pose
    pub fn pose(&self, handle: BodyHandle) -> Pose {
        self.poses
            .get(handle.index())
            .copied()
            .unwrap_or_else(Pose::identity)
    }

    /// Steps the world and refreshes every cached pose
    pub fn step(&mut self, dt: f32, max_substeps: u32, fixed_step: f32) -> u32 {
        let steps = self.world.step(dt, max_substeps, fixed_step);
        for (body, pose) in self.bodies.iter().zip(self.poses.iter_mut()) {
            if let Some(body) = body {
                let (position, rotation) = self.world.body_pose(*body);
                pose.position = position;
                pose.rotation = rotation;
            }
        }
        steps
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

    pub fn object_matrices(&self, handles: &[BodyHandle], request: MatrixRequest) -> Vec<Matrix4<f32>> {
        handles
            .iter()
            .map(|handle| compose(request, &self.projection, &self.camera, &self.pose(*handle)))
            .collect()
    }
}
