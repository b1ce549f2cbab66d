use std::collections::VecDeque;
use std::fmt;

pub const INDEX_BITS: u32 = 20;
pub const GENERATION_BITS: u32 = 32 - INDEX_BITS;
pub const MAX_INDEX: u32 = (1 << INDEX_BITS) - 1;
const GENERATION_MASK: u32 = (1 << GENERATION_BITS) - 1;

pub const MAX_LOAD_FACTOR: f32 = 0.7;
const INITIAL_CAPACITY: usize = 64;

/// Wire handle for an actor or sector thinker. Zero means "no object".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NetId(u32);

impl NetId {
    pub const NONE: NetId = NetId(0);

    pub fn new(index: u32, generation: u32) -> Self {
        Self(((generation & GENERATION_MASK) << INDEX_BITS) | (index & MAX_INDEX))
    }

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn index(self) -> u32 {
        self.0 & MAX_INDEX
    }

    pub fn generation(self) -> u32 {
        self.0 >> INDEX_BITS
    }

    pub fn is_none(self) -> bool {
        self.index() == 0
    }
}

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation() == 0 {
            write!(f, "{}", self.index())
        } else {
            write!(f, "{}#{}", self.index(), self.generation())
        }
    }
}

impl From<u32> for NetId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetIdError {
    #[error("net id {0} is already owned by a live object")]
    Duplicate(NetId),
    #[error("net id space exhausted")]
    Exhausted,
    #[error("net id zero is reserved")]
    Reserved,
}

pub trait NetIdentified {
    fn net_id(&self) -> NetId;
    fn set_net_id(&mut self, id: NetId);
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            value: None,
        }
    }
}

/// Arena of objects addressed by generational net ids. Slot zero is never used.
#[derive(Debug, Clone)]
pub struct NetIdRegistry<T> {
    slots: Vec<Slot<T>>,
    free: VecDeque<u32>,
    assigned: u32,
    live: usize,
    capacity: usize,
}

impl<T> Default for NetIdRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NetIdRegistry<T> {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity + 1),
            free: VecDeque::new(),
            assigned: 0,
            live: 0,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn load_factor(&self) -> f32 {
        self.live as f32 / self.capacity as f32
    }

    pub fn assigned_count(&self) -> u32 {
        self.assigned
    }

    pub fn get(&self, id: NetId) -> Option<&T> {
        if id.is_none() {
            return None;
        }
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, id: NetId) -> Option<&mut T> {
        if id.is_none() {
            return None;
        }
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, id: NetId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: NetId) -> Option<T>
    where
        T: NetIdentified,
    {
        if id.is_none() {
            return None;
        }
        let index = id.index();
        let slot = self
            .slots
            .get_mut(index as usize)
            .filter(|slot| slot.generation == id.generation())?;
        let mut value = slot.value.take()?;
        slot.generation = (slot.generation + 1) & GENERATION_MASK;
        self.free.push_back(index);
        self.live -= 1;
        value.set_net_id(NetId::NONE);
        Some(value)
    }

    /// Registers `object`, honoring an id it already carries.
    pub fn add(&mut self, mut object: T) -> Result<NetId, NetIdError>
    where
        T: NetIdentified,
    {
        let existing = object.net_id();
        if !existing.is_none() {
            self.insert_at(existing, object)?;
            return Ok(existing);
        }

        let index = match self.free.pop_front() {
            Some(index) => index,
            None => {
                if self.assigned >= MAX_INDEX {
                    return Err(NetIdError::Exhausted);
                }
                self.assigned += 1;
                self.assigned
            }
        };

        self.ensure_slot(index);
        let slot = &mut self.slots[index as usize];
        let id = NetId::new(index, slot.generation);
        object.set_net_id(id);
        slot.value = Some(object);
        self.live += 1;
        self.grow_if_needed();
        Ok(id)
    }

    /// Registers `object` under an id chosen elsewhere, typically by the server.
    pub fn insert_at(&mut self, id: NetId, mut object: T) -> Result<(), NetIdError>
    where
        T: NetIdentified,
    {
        if id.is_none() {
            return Err(NetIdError::Reserved);
        }
        let index = id.index();
        self.ensure_slot(index);

        let slot = &mut self.slots[index as usize];
        if slot.value.is_some() {
            return Err(NetIdError::Duplicate(id));
        }
        slot.generation = id.generation();
        object.set_net_id(id);
        slot.value = Some(object);

        self.free.retain(|&free| free != index);
        self.assigned = self.assigned.max(index);
        self.live += 1;
        self.grow_if_needed();
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (NetId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (NetId::new(index as u32, slot.generation), value))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NetId, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value
                .as_mut()
                .map(|value| (NetId::new(index as u32, generation), value))
        })
    }

    pub fn ids(&self) -> Vec<NetId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.assigned = 0;
        self.live = 0;
    }

    fn ensure_slot(&mut self, index: u32) {
        let needed = index as usize + 1;
        if self.slots.len() < needed {
            self.slots.resize_with(needed, Slot::default);
        }
    }

    fn grow_if_needed(&mut self) {
        while self.load_factor() > MAX_LOAD_FACTOR {
            self.capacity *= 2;
            let additional = (self.capacity + 1).saturating_sub(self.slots.len());
            self.slots.reserve(additional);
            log::trace!("net id registry grown to {} slots", self.capacity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Thing {
        id: NetId,
        name: &'static str,
    }

    impl Thing {
        fn new(name: &'static str) -> Self {
            Self {
                id: NetId::NONE,
                name,
            }
        }
    }

    impl NetIdentified for Thing {
        fn net_id(&self) -> NetId {
            self.id
        }

        fn set_net_id(&mut self, id: NetId) {
            self.id = id;
        }
    }

    #[test]
    fn add_mints_sequential_ids() {
        let mut registry = NetIdRegistry::new();
        let a = registry.add(Thing::new("a")).unwrap();
        let b = registry.add(Thing::new("b")).unwrap();
        assert_eq!(a.index(), 1);
        assert_eq!(b.index(), 2);
        assert_eq!(registry.get(a).unwrap().name, "a");
        assert_eq!(registry.get(a).unwrap().id, a);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn remove_then_lookup_misses() {
        let mut registry = NetIdRegistry::new();
        let a = registry.add(Thing::new("a")).unwrap();
        let removed = registry.remove(a).unwrap();
        assert_eq!(removed.id, NetId::NONE);
        assert!(registry.get(a).is_none());
        assert!(registry.remove(a).is_none());
        assert!(registry.remove(NetId::NONE).is_none());
    }

    #[test]
    fn recycled_ids_are_fifo_with_new_generation() {
        let mut registry = NetIdRegistry::new();
        let a = registry.add(Thing::new("a")).unwrap();
        let b = registry.add(Thing::new("b")).unwrap();
        registry.remove(a);
        registry.remove(b);

        let c = registry.add(Thing::new("c")).unwrap();
        let d = registry.add(Thing::new("d")).unwrap();
        assert_eq!(c.index(), a.index());
        assert_eq!(d.index(), b.index());
        assert_eq!(c.generation(), a.generation() + 1);

        // stale handle to the previous occupant does not resolve
        assert!(registry.get(a).is_none());
        assert_eq!(registry.get(c).unwrap().name, "c");
    }

    #[test]
    fn duplicate_server_id_is_rejected() {
        let mut registry = NetIdRegistry::new();
        let id = NetId::from_raw(42);
        registry.insert_at(id, Thing::new("door")).unwrap();
        let err = registry.insert_at(id, Thing::new("other")).unwrap_err();
        assert_eq!(err, NetIdError::Duplicate(id));

        let mut carried = Thing::new("carried");
        carried.id = id;
        assert_eq!(registry.add(carried), Err(NetIdError::Duplicate(id)));
        assert_eq!(registry.get(id).unwrap().name, "door");
    }

    #[test]
    fn insert_at_claims_free_slot() {
        let mut registry = NetIdRegistry::new();
        let a = registry.add(Thing::new("a")).unwrap();
        registry.remove(a);
        registry.insert_at(NetId::new(1, 5), Thing::new("server")).unwrap();

        let minted = registry.add(Thing::new("local")).unwrap();
        assert_eq!(minted.index(), 2);
    }

    #[test]
    fn growth_preserves_associations() {
        let mut registry = NetIdRegistry::with_capacity(4);
        let ids: Vec<NetId> = (0..100)
            .map(|_| registry.add(Thing::new("x")).unwrap())
            .collect();
        assert!(registry.capacity() >= 128);
        assert!(registry.load_factor() <= MAX_LOAD_FACTOR);
        for id in ids {
            assert_eq!(registry.get(id).unwrap().id, id);
        }
    }

    #[test]
    fn iteration_is_in_index_order() {
        let mut registry = NetIdRegistry::new();
        registry.insert_at(NetId::from_raw(7), Thing::new("seven")).unwrap();
        registry.insert_at(NetId::from_raw(3), Thing::new("three")).unwrap();
        let names: Vec<_> = registry.iter().map(|(_, t)| t.name).collect();
        assert_eq!(names, vec!["three", "seven"]);
    }
}
