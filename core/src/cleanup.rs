//! Entities a mission created and must get rid of at teardown.

use crate::{
    host::{EntityKind, Host},
    types::Handle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Deleted from the world at cleanup.
    Owned,
    /// Left in the world, marked as no longer needed by the mission.
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedEntity {
    pub handle:    Handle,
    pub kind:      EntityKind,
    pub ownership: Ownership,
}

#[derive(Debug, Clone, Default)]
pub struct CleanupList {
    entries: Vec<TrackedEntity>,
}

impl CleanupList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a handle. Tracking the same handle twice keeps the latest tag.
    pub fn track(&mut self, handle: Handle, kind: EntityKind, ownership: Ownership) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.handle == handle) {
            existing.kind = kind;
            existing.ownership = ownership;
            return;
        }
        self.entries.push(TrackedEntity { handle, kind, ownership });
    }

    pub fn forget(&mut self, handle: Handle) {
        self.entries.retain(|e| e.handle != handle);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedEntity> {
        self.entries.iter()
    }

    /// Remove everything, newest first, so occupants go before their vehicles.
    pub fn release_all(&mut self, host: &mut dyn Host) -> usize {
        let count = self.entries.len();
        for entry in self.entries.drain(..).rev() {
            if !host.exists(entry.handle) {
                continue;
            }
            match entry.ownership {
                Ownership::Owned    => host.destroy(entry.handle),
                Ownership::Released => host.release(entry.handle),
            }
        }
        count
    }
}
