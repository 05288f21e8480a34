//! GPU debug channel
//!
//! Tracks the stack of debug groups pushed by the frame pipeline and routes
//! wgpu errors to `log`, tagged with the group they were raised in.
//!
//! Command encoder errors only surface when the encoder is finished, after
//! the group stack has unwound. The render manager therefore finishes one
//! encoder per outermost group and names errors with [`DebugChannel::describe_in`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default)]
pub struct DebugChannel {
    enabled: bool,
    groups: Arc<Mutex<Vec<String>>>,
}

impl DebugChannel {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            groups: Arc::default(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    fn groups(&self) -> MutexGuard<'_, Vec<String>> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a group, returning true when it is the outermost one
    pub fn push(&self, label: &str) -> bool {
        let mut groups = self.groups();
        groups.push(label.to_owned());
        groups.len() == 1
    }

    /// Closes the innermost group, returning its label when it was the
    /// outermost one
    pub fn pop(&self) -> Option<String> {
        let mut groups = self.groups();
        match groups.pop() {
            Some(label) if groups.is_empty() => Some(label),
            Some(_) => None,
            None => {
                log::warn!("debug group stack underflow");
                None
            }
        }
    }

    pub fn clear(&self) {
        self.groups().clear();
    }

    /// Current group path, outermost first, e.g. `Geometry/computer`
    pub fn path(&self) -> String {
        self.groups().join("/")
    }

    /// Formats a GPU message the way it is logged
    pub fn describe(&self, message: &str) -> String {
        self.describe_in(&self.path(), message)
    }

    /// Formats a GPU message raised under an already closed group path
    pub fn describe_in(&self, path: &str, message: &str) -> String {
        if self.enabled {
            if path.is_empty() {
                format!("[gpu] {message}")
            } else {
                format!("[gpu {path}] {message}")
            }
        } else {
            message.to_owned()
        }
    }

    /// Routes uncaptured device errors through this channel
    pub fn install(&self, device: &wgpu::Device) {
        if !self.enabled {
            log::info!("GPU debug channel disabled, run with --debug to enable it");
        }
        let channel = self.clone();
        device.on_uncaptured_error(Box::new(move |error| {
            log::error!("{}", channel.describe(&error.to_string()));
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_path() {
        let channel = DebugChannel::new(true);
        assert_eq!(channel.path(), "");
        channel.push("Geometry");
        channel.push("computer");
        assert_eq!(channel.path(), "Geometry/computer");
        channel.pop();
        assert_eq!(channel.path(), "Geometry");
        assert_eq!(channel.describe("bad"), "[gpu Geometry] bad");
    }

    #[test]
    fn test_push_and_pop_report_outermost_group() {
        let channel = DebugChannel::new(true);
        assert!(channel.push("Geometry"));
        assert!(!channel.push("Computer"));
        assert_eq!(channel.pop(), None);
        assert_eq!(channel.pop(), Some("Geometry".to_owned()));
        assert_eq!(channel.pop(), None);
        assert!(channel.push("Skybox"));
    }

    #[test]
    fn test_describe_in_closed_group() {
        let channel = DebugChannel::new(true);
        channel.push("Tone Mapping");
        let label = channel.pop().unwrap();
        assert_eq!(channel.path(), "");
        assert_eq!(channel.describe("late"), "[gpu] late");
        assert_eq!(
            channel.describe_in(&label, "invalid bind group"),
            "[gpu Tone Mapping] invalid bind group"
        );
        assert_eq!(DebugChannel::new(false).describe_in("Skybox", "oops"), "oops");
    }

    #[test]
    fn test_clones_share_groups() {
        let channel = DebugChannel::new(true);
        let handler_side = channel.clone();
        channel.push("Tone Mapping");
        assert_eq!(handler_side.path(), "Tone Mapping");
        channel.clear();
        assert_eq!(handler_side.path(), "");
    }

    #[test]
    fn test_disabled_channel_passes_messages_through() {
        let channel = DebugChannel::new(false);
        channel.push("Skybox");
        assert_eq!(channel.describe("oops"), "oops");
        channel.pop();
        channel.pop();
        assert_eq!(channel.path(), "");
    }
}
