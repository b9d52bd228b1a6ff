use std::collections::VecDeque;
use std::mem;

use slotmap::SlotMap;

use super::handle::ObjectKey;
use super::state::{ObjectState, Stage};

/// Result of a request against the queues.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Request {
    /// A new entry was appended.
    Queued,
    /// An equivalent entry was already pending.
    Coalesced,
    /// Update requested before the first init; scheduled for the drain after it.
    Deferred,
    /// Update on a failed object; re-queued for init.
    Retried,
    /// Release replaced a pending entry of the given stage.
    Superseded(Stage),
    /// The request does not apply in the object's current state.
    Ignored(ObjectState),
    /// The key no longer refers to a live object.
    Stale,
}

struct Slot<T> {
    state: ObjectState,
    update_after_init: bool,
    /// Stamp of the slot's live queue entry. Entries carrying an older stamp
    /// were superseded and are skipped by `take`.
    ticket: u32,
    object: T,
}

impl<T> Slot<T> {
    fn stamp(&mut self) -> u32 {
        self.ticket = self.ticket.wrapping_add(1);
        self.ticket
    }
}

type Entry = (ObjectKey, u32);

/// Entries taken out of the queues for one drain.
pub(crate) struct Batch<T> {
    pub(crate) init: Vec<(ObjectKey, T)>,
    pub(crate) update: Vec<(ObjectKey, T)>,
    pub(crate) release: Vec<(ObjectKey, T)>,
    /// Updates moved into the next drain because their init is in this one.
    pub(crate) deferred: usize,
}

/// Object arena plus the three stage queues.
///
/// Always accessed under the renderer's lock. Requests are O(1); superseded
/// entries stay in their queue and are dropped by the next `take`. Nothing
/// here calls into device code.
pub(crate) struct Queues<T> {
    slots: SlotMap<ObjectKey, Slot<T>>,
    init: VecDeque<Entry>,
    update: VecDeque<Entry>,
    release: VecDeque<Entry>,
    /// Live (not superseded) entries across the three queues.
    pending: usize,
    closed: bool,
}

impl<T: Clone> Queues<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: SlotMap::with_capacity_and_key(capacity),
            init: VecDeque::with_capacity(capacity),
            update: VecDeque::new(),
            release: VecDeque::new(),
            pending: 0,
            closed: false,
        }
    }

    /// Inserts a constructed object and queues it for init.
    ///
    /// Returns `None` once the queues have been closed by shutdown.
    pub(crate) fn insert(&mut self, object: T) -> Option<ObjectKey> {
        if self.closed {
            return None;
        }

        let key = self.slots.insert(Slot {
            state: ObjectState::Constructed,
            update_after_init: false,
            ticket: 0,
            object,
        });

        let outcome = self.enqueue_init(key);
        debug_assert_eq!(outcome, Request::Queued);
        Some(key)
    }

    pub(crate) fn state(&self, key: ObjectKey) -> ObjectState {
        self.slots
            .get(key)
            .map_or(ObjectState::Released, |slot| slot.state)
    }

    pub(crate) fn enqueue_init(&mut self, key: ObjectKey) -> Request {
        let Some(slot) = self.slots.get_mut(key) else {
            return Request::Stale;
        };

        match slot.state {
            ObjectState::Constructed | ObjectState::Failed => {
                slot.state = ObjectState::InitQueued;
                self.init.push_back((key, slot.stamp()));
                self.pending += 1;
                Request::Queued
            }
            ObjectState::InitQueued => Request::Coalesced,
            other => Request::Ignored(other),
        }
    }

    pub(crate) fn enqueue_update(&mut self, key: ObjectKey) -> Request {
        let Some(slot) = self.slots.get_mut(key) else {
            return Request::Stale;
        };

        match slot.state {
            ObjectState::Initialized => {
                slot.state = ObjectState::UpdateQueued;
                self.update.push_back((key, slot.stamp()));
                self.pending += 1;
                Request::Queued
            }
            ObjectState::UpdateQueued => Request::Coalesced,
            ObjectState::InitQueued if slot.update_after_init => Request::Coalesced,
            ObjectState::InitQueued => {
                slot.update_after_init = true;
                Request::Deferred
            }
            ObjectState::Failed => {
                slot.state = ObjectState::InitQueued;
                self.init.push_back((key, slot.stamp()));
                self.pending += 1;
                Request::Retried
            }
            other => Request::Ignored(other),
        }
    }

    pub(crate) fn enqueue_release(&mut self, key: ObjectKey) -> Request {
        let Some(slot) = self.slots.get_mut(key) else {
            return Request::Stale;
        };

        let previous = slot.state;
        match previous {
            ObjectState::ReleaseQueued => return Request::Coalesced,
            ObjectState::Released => return Request::Ignored(previous),
            _ => {}
        }

        // The new stamp invalidates a pending init or update entry in place.
        slot.state = ObjectState::ReleaseQueued;
        slot.update_after_init = false;
        self.release.push_back((key, slot.stamp()));

        match previous.queued_stage() {
            Some(stage) => Request::Superseded(stage),
            None => {
                self.pending += 1;
                Request::Queued
            }
        }
    }

    /// Takes every queued entry and records the transitions they lead to.
    ///
    /// Released slots leave the arena here; the returned batch owns them.
    /// Requests made after this call observe the post-drain state and queue
    /// into the next drain.
    pub(crate) fn take(&mut self) -> Batch<T> {
        let init = mem::take(&mut self.init);
        let update = mem::take(&mut self.update);
        let release = mem::take(&mut self.release);
        self.pending = 0;

        let mut batch = Batch {
            init: Vec::with_capacity(init.len()),
            update: Vec::with_capacity(update.len()),
            release: Vec::with_capacity(release.len()),
            deferred: 0,
        };

        for (key, ticket) in init {
            let Some(slot) = live_slot(&mut self.slots, key, ticket) else { continue };
            if mem::take(&mut slot.update_after_init) {
                slot.state = ObjectState::UpdateQueued;
                let ticket = slot.stamp();
                self.update.push_back((key, ticket));
                self.pending += 1;
                batch.deferred += 1;
            } else {
                slot.state = ObjectState::Initialized;
            }
            batch.init.push((key, slot.object.clone()));
        }

        for (key, ticket) in update {
            let Some(slot) = live_slot(&mut self.slots, key, ticket) else { continue };
            slot.state = ObjectState::Initialized;
            batch.update.push((key, slot.object.clone()));
        }

        for (key, ticket) in release {
            if live_slot(&mut self.slots, key, ticket).is_none() {
                continue;
            }
            if let Some(slot) = self.slots.remove(key) {
                batch.release.push((key, slot.object));
            }
        }

        batch
    }

    /// Records a failed `device_init`.
    pub(crate) fn mark_failed(&mut self, key: ObjectKey) {
        let Some(slot) = self.slots.get_mut(key) else { return };

        match slot.state {
            ObjectState::Initialized => slot.state = ObjectState::Failed,
            ObjectState::UpdateQueued => {
                // Invalidates the deferred update entry.
                slot.stamp();
                slot.state = ObjectState::Failed;
                self.pending -= 1;
            }
            // A release requested meanwhile still runs.
            _ => {}
        }
    }

    /// Queues every live object for release. Returns how many were newly queued.
    pub(crate) fn release_all(&mut self) -> usize {
        let keys: Vec<ObjectKey> = self.slots.keys().collect();
        keys.into_iter()
            .filter(|&key| {
                matches!(
                    self.enqueue_release(key),
                    Request::Queued | Request::Superseded(_)
                )
            })
            .count()
    }

    /// Stops accepting new objects.
    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    /// Closes the queues and hands back every remaining object.
    pub(crate) fn close_and_take(&mut self) -> Vec<T> {
        self.closed = true;
        self.init.clear();
        self.update.clear();
        self.release.clear();
        self.pending = 0;
        self.slots.drain().map(|(_, slot)| slot.object).collect()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn live(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending
    }

    #[cfg(test)]
    fn queued(&self, stage: Stage) -> Vec<ObjectKey> {
        let queue = match stage {
            Stage::Init => &self.init,
            Stage::Update => &self.update,
            Stage::Release => &self.release,
        };
        queue
            .iter()
            .filter(|&&(key, ticket)| self.slots.get(key).is_some_and(|slot| slot.ticket == ticket))
            .map(|&(key, _)| key)
            .collect()
    }
}

fn live_slot<T>(slots: &mut SlotMap<ObjectKey, Slot<T>>, key: ObjectKey, ticket: u32) -> Option<&mut Slot<T>> {
    slots.get_mut(key).filter(|slot| slot.ticket == ticket)
}
