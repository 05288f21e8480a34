//! Light descriptions
//!
//! A light's position is not stored here: each light is paired with the
//! [`ObjectId`] of an object in the transform space, and the lighting passes
//! ask the space for that object's matrices.

use cgmath::Vector3;

use crate::gfx::space::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// Linear RGB intensity; values above 1 are meaningful with HDR accumulation
    pub color: Vector3<f32>,
    /// Point lights fall off to zero at this distance; suns ignore it
    pub radius: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            color: Vector3::new(1.0, 1.0, 1.0),
            radius: 1.0,
        }
    }
}

impl Light {
    pub fn new(color: Vector3<f32>, radius: f32) -> Self {
        Self { color, radius }
    }
}

/// Lights of one kind, each paired with the object that positions it
#[derive(Debug, Clone, Default)]
pub struct LightSet {
    objects: Vec<ObjectId>,
    lights: Vec<Light>,
}

impl LightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, object: ObjectId, light: Light) {
        self.objects.push(object);
        self.lights.push(light);
    }

    /// Removes every light positioned by `object`
    pub fn remove(&mut self, object: ObjectId) {
        let mut i = 0;
        while i < self.objects.len() {
            if self.objects[i] == object {
                self.objects.swap_remove(i);
                self.lights.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.lights.clear();
    }

    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut [Light] {
        &mut self.lights
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::space::FloatSpace;

    #[test]
    fn test_remove_keeps_pairs_aligned() {
        let mut space = FloatSpace::new();
        let a = space.add();
        let b = space.add();
        let mut set = LightSet::new();
        set.push(a, Light::new(Vector3::new(1.0, 0.0, 0.0), 5.0));
        set.push(b, Light::new(Vector3::new(0.0, 1.0, 0.0), 6.0));
        set.push(a, Light::new(Vector3::new(0.0, 0.0, 1.0), 7.0));

        set.remove(a);
        assert_eq!(set.len(), 1);
        assert_eq!(set.objects(), &[b]);
        assert_eq!(set.lights()[0].radius, 6.0);
    }
}
