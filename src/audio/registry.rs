//! Registry of active sounds keyed by generated id.
//!
//! Ids come from a monotonic counter, so iterating the map in key order is
//! insertion order. Entries may own the `ActiveVoice` that renders them; the
//! voice is released in the same call that removes the entry.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use super::events::{EventBus, SoundEvent};
use super::sound::{Category, SoundDescriptor, SoundHandle, SoundId, SoundPatch};
use super::voice::ActiveVoice;

struct Entry {
    handle: SoundHandle,
    voice: Option<ActiveVoice>,
}

#[derive(Default)]
pub struct SoundRegistry {
    next_id: Cell<u64>,
    entries: RefCell<BTreeMap<SoundId, Entry>>,
    events: EventBus<SoundEvent>,
}

impl SoundRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &EventBus<SoundEvent> {
        &self.events
    }

    /// Store a sound whose nodes the caller manages.
    pub fn register_sound(&self, descriptor: SoundDescriptor) -> SoundId {
        self.insert(descriptor, None)
    }

    /// Store a sound together with the voice that renders it.
    pub(crate) fn register_voice(&self, descriptor: SoundDescriptor, voice: ActiveVoice) -> SoundId {
        self.insert(descriptor, Some(voice))
    }

    fn insert(&self, descriptor: SoundDescriptor, voice: Option<ActiveVoice>) -> SoundId {
        let id = SoundId(self.next_id.get() + 1);
        self.next_id.set(id.0);

        let handle = descriptor.into_handle(id);
        log::debug!("registered {id} '{}' ({})", handle.name, handle.category);
        self.entries.borrow_mut().insert(
            id,
            Entry {
                handle: handle.clone(),
                voice,
            },
        );
        self.events.emit(&SoundEvent::Registered(handle));
        id
    }

    /// Merge `patch` into the stored handle and retune its voice. Returns
    /// `false` for an unknown id.
    pub fn update_sound(&self, id: SoundId, patch: &SoundPatch) -> bool {
        let updated = {
            let mut entries = self.entries.borrow_mut();
            let Some(entry) = entries.get_mut(&id) else {
                log::warn!("update_sound: unknown sound {id}");
                return false;
            };
            patch.apply(&mut entry.handle);
            if let Some(voice) = &entry.voice {
                if patch.volume.is_some() {
                    voice.set_volume(entry.handle.volume);
                }
                if let Some(frequency) = patch.frequency {
                    voice.set_frequency(frequency);
                }
            }
            entry.handle.clone()
        };
        self.events.emit(&SoundEvent::Updated(updated));
        true
    }

    /// Remove the entry, release its voice and emit `Stopped` then
    /// `Unregistered`. Unknown ids are ignored.
    pub fn stop_sound(&self, id: SoundId) -> bool {
        let removed = self.entries.borrow_mut().remove(&id);
        let Some(entry) = removed else {
            log::debug!("stop_sound: {id} is not active");
            return false;
        };
        if let Some(voice) = entry.voice {
            voice.stop();
        }
        log::debug!("stopped {id} '{}'", entry.handle.name);
        self.events.emit(&SoundEvent::Stopped(entry.handle));
        self.events.emit(&SoundEvent::Unregistered(id));
        true
    }

    /// Stop every sound. Returns how many were stopped.
    pub fn stop_all(&self) -> usize {
        let ids: Vec<SoundId> = self.entries.borrow().keys().copied().collect();
        ids.into_iter().filter(|&id| self.stop_sound(id)).count()
    }

    /// Stop every sound started by `source`.
    pub fn stop_by_source(&self, source: &str) -> usize {
        let ids: Vec<SoundId> = self
            .entries
            .borrow()
            .values()
            .filter(|e| e.handle.source == source)
            .map(|e| e.handle.id)
            .collect();
        ids.into_iter().filter(|&id| self.stop_sound(id)).count()
    }

    pub fn get(&self, id: SoundId) -> Option<SoundHandle> {
        self.entries.borrow().get(&id).map(|e| e.handle.clone())
    }

    pub fn contains(&self, id: SoundId) -> bool {
        self.entries.borrow().contains_key(&id)
    }

    /// Snapshot of all handles in insertion order.
    pub fn get_all_active_sounds(&self) -> Vec<SoundHandle> {
        self.collect(|_| true)
    }

    pub fn sounds_by_category(&self, category: Category) -> Vec<SoundHandle> {
        self.collect(|h| h.category == category)
    }

    pub fn sounds_by_source(&self, source: &str) -> Vec<SoundHandle> {
        self.collect(|h| h.source == source)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn collect(&self, keep: impl Fn(&SoundHandle) -> bool) -> Vec<SoundHandle> {
        self.entries
            .borrow()
            .values()
            .map(|e| &e.handle)
            .filter(|h| keep(h))
            .cloned()
            .collect()
    }
}
