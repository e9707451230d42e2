//! Call-order addressed hook storage for one component instance.
//!
//! Hooks form a forward chain of slab entries linked by `next` handles. The
//! chain only grows while the instance mounts; afterwards every pass must walk
//! it with the cursor in exactly the same order and length.

use std::any::Any;

use crate::error::OrderViolation;

/// Handle to a hook inside its instance's store.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct HookId(usize);

impl HookId {
    pub(crate) fn index(&self) -> usize {
        self.0
    }
}

/// Type-erased view of a hook record used by the store and the pass
/// lifecycle.
pub(crate) trait HookSlot: Any {
    /// Updates waiting in this hook's queue.
    fn pending_updates(&self) -> usize;

    /// Applies the result staged during the current pass. Returns how many
    /// updates were consumed.
    fn commit(&mut self) -> usize;

    /// Drops any result staged during an unfinished pass.
    fn discard_staged(&mut self);

    /// Called when the hook is torn down together with its instance.
    fn release(&mut self);

    fn state_type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct HookEntry {
    slot: Box<dyn HookSlot>,
    next: Option<HookId>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Cursor {
    BeforeHead,
    At(HookId),
}

/// Debug view of one hook: `(position, state type, pending updates)`.
pub type HookDebugEntry = (usize, &'static str, usize);

pub(crate) struct HookStore {
    entries: Vec<HookEntry>,
    head: Option<HookId>,
    tail: Option<HookId>,
    cursor: Cursor,
    visited: usize,
    sealed: bool,
}

impl HookStore {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            head: None,
            tail: None,
            cursor: Cursor::BeforeHead,
            visited: 0,
            sealed: false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the first pass completed and the chain length is fixed.
    pub(crate) fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Rewinds the cursor before the head. Runs before every invocation of
    /// the body.
    pub(crate) fn begin_pass(&mut self) {
        self.cursor = Cursor::BeforeHead;
        self.visited = 0;
        for entry in self.entries.iter_mut() {
            entry.slot.discard_staged();
        }
    }

    /// Appends a freshly built hook at the tail while the instance mounts and
    /// moves the cursor onto it.
    pub(crate) fn mount_hook(
        &mut self,
        slot: Box<dyn HookSlot>,
    ) -> Result<HookId, OrderViolation> {
        if self.sealed {
            return Err(OrderViolation::MountAfterFirstPass {
                position: self.visited,
            });
        }
        let id = HookId(self.entries.len());
        self.entries.push(HookEntry { slot, next: None });
        match self.tail {
            Some(tail) => self.entries[tail.index()].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.cursor = Cursor::At(id);
        self.visited += 1;
        Ok(id)
    }

    /// Advances the cursor to the next recorded hook.
    pub(crate) fn next_hook(&mut self) -> Result<HookId, OrderViolation> {
        if !self.sealed {
            return Err(OrderViolation::UpdateBeforeMount {
                position: self.visited,
            });
        }
        let next = match self.cursor {
            Cursor::BeforeHead => self.head,
            Cursor::At(current) => self.entries[current.index()].next,
        };
        let id = next.ok_or(OrderViolation::MoreHooksThanMounted {
            mounted: self.entries.len(),
        })?;
        self.cursor = Cursor::At(id);
        self.visited += 1;
        Ok(id)
    }

    /// Position of the hook the next `mount_hook`/`next_hook` call returns.
    pub(crate) fn position(&self) -> usize {
        self.visited
    }

    /// Verifies the body walked the whole chain, and fixes the chain length
    /// after the mounting pass.
    pub(crate) fn finish_pass(&mut self) -> Result<(), OrderViolation> {
        if !self.sealed {
            self.sealed = true;
            return Ok(());
        }
        if self.visited != self.entries.len() {
            return Err(OrderViolation::FewerHooksThanMounted {
                mounted: self.entries.len(),
                called: self.visited,
            });
        }
        Ok(())
    }

    /// Commits every staged result. Returns the number of consumed updates.
    pub(crate) fn commit(&mut self) -> usize {
        self.entries
            .iter_mut()
            .map(|entry| entry.slot.commit())
            .sum()
    }

    pub(crate) fn discard_staged(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.slot.discard_staged();
        }
    }

    /// Releases every hook at once and returns the store to its unmounted
    /// state.
    pub(crate) fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.slot.release();
        }
        self.entries.clear();
        self.head = None;
        self.tail = None;
        self.cursor = Cursor::BeforeHead;
        self.visited = 0;
        self.sealed = false;
    }

    pub(crate) fn hook<T: 'static>(&self, id: HookId) -> Option<&T> {
        self.entries
            .get(id.index())
            .and_then(|entry| entry.slot.as_any().downcast_ref::<T>())
    }

    pub(crate) fn hook_mut<T: 'static>(&mut self, id: HookId) -> Option<&mut T> {
        self.entries
            .get_mut(id.index())
            .and_then(|entry| entry.slot.as_any_mut().downcast_mut::<T>())
    }

    /// Hook at call-order `position`, walking the chain from the head.
    pub(crate) fn hook_at<T: 'static>(&self, position: usize) -> Option<&T> {
        self.chain()
            .nth(position)
            .and_then(|id| self.hook::<T>(id))
    }

    pub(crate) fn pending_updates(&self) -> usize {
        self.chain()
            .map(|id| self.entries[id.index()].slot.pending_updates())
            .sum()
    }

    pub(crate) fn debug_dump(&self) -> Vec<HookDebugEntry> {
        self.chain()
            .enumerate()
            .map(|(position, id)| {
                let slot = &self.entries[id.index()].slot;
                (position, slot.state_type_name(), slot.pending_updates())
            })
            .collect()
    }

    fn chain(&self) -> impl Iterator<Item = HookId> + '_ {
        std::iter::successors(self.head, move |id| self.entries[id.index()].next)
    }
}

impl Default for HookStore {
    fn default() -> Self {
        Self::new()
    }
}
