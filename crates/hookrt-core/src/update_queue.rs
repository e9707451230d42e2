//! Per-hook queue of pending updates.
//!
//! Updates live in a slab and form a circular singly-linked list through
//! their `next` handles. The queue only remembers the newest update
//! (`pending`); the oldest one is always `pending.next`, so appending is a
//! constant-time splice behind the tail and resolution walks from
//! `pending.next` around to `pending` exactly once.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::action::{Action, Reducer};
use crate::policy::EquivalencePolicy;

pub(crate) type SharedQueue<S> = Rc<RefCell<UpdateQueue<S>>>;

/// Handle to an update inside its queue's slab.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct UpdateId(usize);

impl UpdateId {
    pub(crate) fn index(&self) -> usize {
        self.0
    }
}

/// Next state computed by the setter before the update was enqueued.
pub(crate) struct EagerState<S> {
    pub(crate) state: S,
    pub(crate) reducer: Reducer,
}

pub struct Update<S> {
    action: Action<S>,
    eager: Option<EagerState<S>>,
    next: UpdateId,
}

impl<S> Update<S> {
    pub fn action(&self) -> &Action<S> {
        &self.action
    }

    pub fn eager_state(&self) -> Option<&S> {
        self.eager.as_ref().map(|eager| &eager.state)
    }

    pub fn eager_reducer(&self) -> Option<Reducer> {
        self.eager.as_ref().map(|eager| eager.reducer)
    }

    pub fn next(&self) -> UpdateId {
        self.next
    }
}

pub struct UpdateQueue<S> {
    slots: Vec<Option<Update<S>>>,
    free: Vec<usize>,
    pending: Option<UpdateId>,
    len: usize,
    last_rendered_reducer: Reducer,
    last_rendered_state: S,
    policy: Rc<dyn EquivalencePolicy<S>>,
    detached: bool,
}

impl<S> UpdateQueue<S> {
    pub fn new(initial: S, policy: Rc<dyn EquivalencePolicy<S>>) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            pending: None,
            len: 0,
            last_rendered_reducer: Reducer::Basic,
            last_rendered_state: initial,
            policy,
            detached: false,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }

    /// The newest update, i.e. the tail of the circular list.
    pub fn pending(&self) -> Option<UpdateId> {
        self.pending
    }

    /// The oldest update still waiting for resolution.
    pub fn head(&self) -> Option<UpdateId> {
        self.pending.map(|tail| self.update(tail).next)
    }

    pub fn get(&self, id: UpdateId) -> Option<&Update<S>> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn last_rendered_reducer(&self) -> Reducer {
        self.last_rendered_reducer
    }

    pub fn last_rendered_state(&self) -> &S {
        &self.last_rendered_state
    }

    pub(crate) fn set_last_rendered_reducer(&mut self, reducer: Reducer) {
        self.last_rendered_reducer = reducer;
    }

    pub(crate) fn set_last_rendered_state(&mut self, state: S) {
        self.last_rendered_state = state;
    }

    pub(crate) fn policy(&self) -> Rc<dyn EquivalencePolicy<S>> {
        Rc::clone(&self.policy)
    }

    /// Set once the owning hook is released; setters drop updates aimed at a
    /// detached queue.
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub(crate) fn detach(&mut self) {
        self.detached = true;
        self.clear();
    }

    /// Appends `action` as the newest update.
    pub fn enqueue(&mut self, action: Action<S>) -> UpdateId {
        self.enqueue_with_eager(action, None)
    }

    pub(crate) fn enqueue_with_eager(
        &mut self,
        action: Action<S>,
        eager: Option<EagerState<S>>,
    ) -> UpdateId {
        let id = self.alloc(Update {
            action,
            eager,
            next: UpdateId(usize::MAX),
        });
        let next = match self.pending {
            None => id,
            Some(tail) => {
                let tail_update = self.update_mut(tail);
                let head = tail_update.next;
                tail_update.next = id;
                head
            }
        };
        self.update_mut(id).next = next;
        self.pending = Some(id);
        self.len += 1;
        id
    }

    /// Iterates pending updates from oldest to newest.
    pub fn iter(&self) -> Iter<'_, S> {
        Iter {
            queue: self,
            cursor: self.head(),
        }
    }

    /// Unlinks every update from the oldest through `through` (inclusive) and
    /// returns how many were removed. Updates appended after `through` stay
    /// queued.
    pub(crate) fn consume_through(&mut self, through: UpdateId) -> usize {
        let Some(tail) = self.pending else {
            return 0;
        };
        let mut removed = 0;
        let mut cursor = self.update(tail).next;
        loop {
            let next = self.update(cursor).next;
            self.release(cursor);
            removed += 1;
            if cursor == tail {
                self.pending = None;
                break;
            }
            if cursor == through {
                self.update_mut(tail).next = next;
                break;
            }
            cursor = next;
        }
        self.len -= removed;
        if self.pending.is_none() {
            self.clear();
        }
        removed
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.pending = None;
        self.len = 0;
    }

    fn alloc(&mut self, update: Update<S>) -> UpdateId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(update);
                UpdateId(index)
            }
            None => {
                self.slots.push(Some(update));
                UpdateId(self.slots.len() - 1)
            }
        }
    }

    fn release(&mut self, id: UpdateId) {
        self.slots[id.index()] = None;
        self.free.push(id.index());
    }

    // Ids reachable from `pending` always point at occupied slots; a vacant
    // one means the ring was corrupted.
    fn update(&self, id: UpdateId) -> &Update<S> {
        self.slots[id.index()]
            .as_ref()
            .expect("linked update slot is vacant")
    }

    fn update_mut(&mut self, id: UpdateId) -> &mut Update<S> {
        self.slots[id.index()]
            .as_mut()
            .expect("linked update slot is vacant")
    }
}

impl<S: Clone> UpdateQueue<S> {
    /// Copies out the pending updates so they can be folded without holding a
    /// borrow on the queue while user actions run.
    pub(crate) fn snapshot(&self) -> PendingUpdates<S> {
        let updates = self
            .iter()
            .map(|update| PendingUpdate {
                action: update.action.clone(),
                eager: update.eager.as_ref().map(|eager| EagerState {
                    state: eager.state.clone(),
                    reducer: eager.reducer,
                }),
            })
            .collect();
        PendingUpdates {
            updates,
            through: self.pending,
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for UpdateQueue<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateQueue")
            .field("len", &self.len)
            .field("last_rendered_reducer", &self.last_rendered_reducer)
            .field("last_rendered_state", &self.last_rendered_state)
            .field("detached", &self.detached)
            .finish()
    }
}

pub struct Iter<'a, S> {
    queue: &'a UpdateQueue<S>,
    cursor: Option<UpdateId>,
}

impl<'a, S> Iterator for Iter<'a, S> {
    type Item = &'a Update<S>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let update = self.queue.update(id);
        self.cursor = if Some(id) == self.queue.pending {
            None
        } else {
            Some(update.next)
        };
        Some(update)
    }
}

pub(crate) struct PendingUpdate<S> {
    action: Action<S>,
    eager: Option<EagerState<S>>,
}

/// Updates captured for one resolution, plus the newest one they cover.
pub(crate) struct PendingUpdates<S> {
    updates: SmallVec<[PendingUpdate<S>; 4]>,
    through: Option<UpdateId>,
}

impl<S: Clone> PendingUpdates<S> {
    pub(crate) fn through(&self) -> Option<UpdateId> {
        self.through
    }

    /// Left fold of the updates, oldest first, starting from `base`.
    ///
    /// A lone update whose eager state was computed with `reducer` already
    /// holds the answer.
    pub(crate) fn resolve(&self, base: &S, reducer: Reducer) -> S {
        if let [PendingUpdate {
            eager: Some(eager), ..
        }] = self.updates.as_slice()
        {
            if eager.reducer == reducer {
                return eager.state.clone();
            }
        }
        self.updates
            .iter()
            .fold(base.clone(), |state, update| {
                reducer.reduce(&state, &update.action)
            })
    }
}
