//! Drawables
//!
//! Anything that writes into the geometry buffer implements [`Drawable`] and
//! registers itself with [`crate::gfx::graphics::Graphics::add_drawable`].
//! Registration is non-owning: the pipeline keeps a weak handle and the
//! caller decides how long the drawable lives.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::gfx::space::FloatSpace;

/// What a drawable gets to work with during the geometry pass
pub struct DrawContext<'a, R> {
    pub rm: &'a mut R,
    pub space: &'a FloatSpace,
}

pub trait Drawable<R> {
    fn draw(&mut self, ctx: &mut DrawContext<'_, R>);

    /// Debug group label for this drawable's draws
    fn name(&self) -> &str {
        "Untitled"
    }
}

/// Registration handle returned by `add_drawable`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawableId(u64);

type Entry<R> = (DrawableId, Weak<RefCell<dyn Drawable<R>>>);

/// Registered drawables, in registration order
pub(crate) struct DrawableList<R> {
    next: u64,
    entries: Vec<Entry<R>>,
}

impl<R> Default for DrawableList<R> {
    fn default() -> Self {
        Self {
            next: 0,
            entries: Vec::new(),
        }
    }
}

impl<R> DrawableList<R> {
    pub fn add<D: Drawable<R> + 'static>(&mut self, drawable: &Rc<RefCell<D>>) -> DrawableId {
        let id = DrawableId(self.next);
        self.next += 1;
        let shared: Rc<RefCell<dyn Drawable<R>>> = drawable.clone();
        self.entries.push((id, Rc::downgrade(&shared)));
        id
    }

    /// Returns `false` when `id` was not registered
    pub fn remove(&mut self, id: DrawableId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Draws every live drawable inside a debug group named after it
    ///
    /// Drawables dropped without being removed are skipped and pruned.
    pub fn draw_all(&mut self, ctx: &mut DrawContext<'_, R>)
    where
        R: crate::gfx::render_manager::RenderManager,
    {
        self.entries.retain(|(id, weak)| {
            let Some(drawable) = weak.upgrade() else {
                log::warn!("drawable {id:?} was dropped without being removed");
                return false;
            };
            let Ok(mut drawable) = drawable.try_borrow_mut() else {
                log::warn!("drawable {id:?} is borrowed elsewhere, skipping it");
                return true;
            };
            let name = drawable.name().to_owned();
            ctx.rm.push_debug_group(&name);
            drawable.draw(ctx);
            ctx.rm.pop_debug_group();
            true
        });
    }
}
