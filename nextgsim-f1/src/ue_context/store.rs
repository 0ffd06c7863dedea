//! UE context store
//!
//! Contexts are kept in slots of an arena. A `UeContextRef` names a slot and
//! the generation the slot had when the context was inserted; once the context
//! is removed the slot generation moves on and the old reference resolves to
//! nothing. Three indexes are kept consistent with the arena: UE index,
//! local UE F1AP ID and peer UE F1AP ID.

use std::collections::HashMap;

use nextgsim_f1ap::UeF1apId;
use tracing::{debug, error, warn};

use super::{IdAllocator, UeContext, UeIndex};
use crate::error::F1Error;

/// Generation-checked reference to a stored UE context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UeContextRef {
    slot: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Store of the UE contexts of one F1-C association
#[derive(Debug)]
pub struct UeContextStore<L, P> {
    slots: Vec<Slot<UeContext<L, P>>>,
    free_slots: Vec<u32>,
    by_index: HashMap<UeIndex, UeContextRef>,
    by_local_id: HashMap<L, UeIndex>,
    by_peer_id: HashMap<P, UeIndex>,
    id_allocator: IdAllocator,
    max_ues: usize,
}

impl<L: UeF1apId, P: UeF1apId> UeContextStore<L, P> {
    pub fn new(max_ues: usize, id_min: u32, id_max: u32) -> Self {
        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            by_index: HashMap::new(),
            by_local_id: HashMap::new(),
            by_peer_id: HashMap::new(),
            id_allocator: IdAllocator::new(id_min, id_max),
            max_ues,
        }
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.max_ues
    }

    /// Allocates a local UE F1AP ID not held by any context
    pub fn allocate_local_id(&mut self) -> Option<L> {
        let by_local_id = &self.by_local_id;
        self.id_allocator
            .allocate(
                |id| by_local_id.contains_key(&L::from_u32(id)),
                by_local_id.len(),
                self.max_ues,
            )
            .map(L::from_u32)
    }

    /// Inserts a new context.
    ///
    /// Both the UE index and the local ID must be unused; anything else is a
    /// caller bug and is reported as an error without touching the store.
    pub fn add(&mut self, ue_index: UeIndex, local_id: L) -> Result<UeContextRef, F1Error> {
        if self.by_index.contains_key(&ue_index) {
            error!("UE context already exists: ue={}", ue_index);
            return Err(F1Error::UeAlreadyExists(ue_index));
        }
        if self.by_local_id.contains_key(&local_id) {
            error!("UE F1AP ID already in use: ue={}, local_id={}", ue_index, local_id);
            return Err(F1Error::UeAlreadyExists(ue_index));
        }

        let ctx = UeContext::new(ue_index, local_id);
        let ue_ref = match self.free_slots.pop() {
            Some(slot) => {
                let entry = &mut self.slots[slot as usize];
                entry.value = Some(ctx);
                UeContextRef {
                    slot,
                    generation: entry.generation,
                }
            }
            None => {
                let slot = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(ctx),
                });
                UeContextRef {
                    slot,
                    generation: 0,
                }
            }
        };

        self.by_index.insert(ue_index, ue_ref);
        self.by_local_id.insert(local_id, ue_index);
        debug!("UE context added: ue={}, local_id={}", ue_index, local_id);
        Ok(ue_ref)
    }

    /// Resolves a reference, `None` if the context was removed meanwhile
    pub fn get(&self, ue_ref: UeContextRef) -> Option<&UeContext<L, P>> {
        self.slots
            .get(ue_ref.slot as usize)
            .filter(|s| s.generation == ue_ref.generation)
            .and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, ue_ref: UeContextRef) -> Option<&mut UeContext<L, P>> {
        self.slots
            .get_mut(ue_ref.slot as usize)
            .filter(|s| s.generation == ue_ref.generation)
            .and_then(|s| s.value.as_mut())
    }

    pub fn get_ref(&self, ue_index: UeIndex) -> Option<UeContextRef> {
        self.by_index.get(&ue_index).copied()
    }

    pub fn find(&self, ue_index: UeIndex) -> Option<&UeContext<L, P>> {
        self.get_ref(ue_index).and_then(|r| self.get(r))
    }

    pub fn find_mut(&mut self, ue_index: UeIndex) -> Option<&mut UeContext<L, P>> {
        let ue_ref = self.get_ref(ue_index)?;
        self.get_mut(ue_ref)
    }

    pub fn find_by_local_id(&self, local_id: L) -> Option<&UeContext<L, P>> {
        self.by_local_id
            .get(&local_id)
            .and_then(|ue_index| self.find(*ue_index))
    }

    pub fn find_by_peer_id(&self, peer_id: P) -> Option<&UeContext<L, P>> {
        self.by_peer_id
            .get(&peer_id)
            .and_then(|ue_index| self.find(*ue_index))
    }

    pub fn ue_index_by_local_id(&self, local_id: L) -> Option<UeIndex> {
        self.by_local_id.get(&local_id).copied()
    }

    pub fn ue_index_by_peer_id(&self, peer_id: P) -> Option<UeIndex> {
        self.by_peer_id.get(&peer_id).copied()
    }

    pub fn contains(&self, ue_index: UeIndex) -> bool {
        self.by_index.contains_key(&ue_index)
    }

    /// Binds the peer UE F1AP ID of a context that has none.
    ///
    /// Returns false if the UE is unknown, already bound, or the peer ID is
    /// used by another context.
    pub fn bind_peer_id(&mut self, ue_index: UeIndex, peer_id: P) -> bool {
        if self.by_peer_id.contains_key(&peer_id) {
            return false;
        }
        let Some(ctx) = self.find_mut(ue_index) else {
            return false;
        };
        if ctx.peer_id().is_some() {
            return false;
        }
        ctx.set_peer_id(Some(peer_id));
        self.by_peer_id.insert(peer_id, ue_index);
        true
    }

    /// Replaces the peer UE F1AP ID of a context.
    ///
    /// Only used by the reestablishment flow, where the peer moves the UE to a
    /// new ID. Fails if the new ID belongs to another context.
    pub fn rebind_peer_id(&mut self, ue_index: UeIndex, peer_id: P) -> bool {
        match self.by_peer_id.get(&peer_id) {
            Some(owner) if *owner == ue_index => return true,
            Some(_) => return false,
            None => {}
        }
        let Some(ctx) = self.find_mut(ue_index) else {
            return false;
        };
        let old = ctx.peer_id();
        ctx.set_peer_id(Some(peer_id));
        if let Some(old) = old {
            self.by_peer_id.remove(&old);
        }
        self.by_peer_id.insert(peer_id, ue_index);
        true
    }

    /// Removes a context and all its index entries.
    ///
    /// Looks the context up through the UE index first, so no scan of the ID
    /// indexes is needed.
    pub fn remove(&mut self, ue_index: UeIndex) -> Option<UeContext<L, P>> {
        let Some(ue_ref) = self.by_index.remove(&ue_index) else {
            warn!("Removing unknown UE context: ue={}", ue_index);
            return None;
        };

        let entry = &mut self.slots[ue_ref.slot as usize];
        let ctx = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free_slots.push(ue_ref.slot);

        self.by_local_id.remove(&ctx.local_id);
        if let Some(peer_id) = ctx.peer_id() {
            if self.by_peer_id.get(&peer_id) == Some(&ue_index) {
                self.by_peer_id.remove(&peer_id);
            }
        }

        debug!("UE context removed: ue={}, local_id={}", ue_index, ctx.local_id);
        Some(ctx)
    }

    /// UE indexes currently stored. Computed on every call.
    pub fn ue_indexes(&self) -> Vec<UeIndex> {
        let mut ues: Vec<UeIndex> = self.by_index.keys().copied().collect();
        ues.sort();
        ues
    }

    pub fn iter(&self) -> impl Iterator<Item = &UeContext<L, P>> {
        self.slots.iter().filter_map(|s| s.value.as_ref())
    }
}
