//! Durable template storage abstraction.
//!
//! The store maps template slot identifiers to opaque template blobs. The
//! session distinguishes an empty slot from actual storage damage: an empty
//! slot is an expected state on a partially enrolled device, while a damaged
//! slot aborts identification outright.

use core::fmt;

/// Identifier for one template slot.
#[derive(Copy, Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct TemplateId(u8);

impl TemplateId {
    /// Sentinel reported when no template matched.
    pub const INVALID: TemplateId = TemplateId(u8::MAX);

    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Returns `true` for the invalid sentinel.
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.0 == u8::MAX
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            f.write_str("invalid")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Failures reported by the template store.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StoreError {
    /// Nothing is enrolled at the requested slot.
    MissingSlot,
    /// The slot exists but its contents could not be read back intact.
    Corrupted,
}

impl StoreError {
    /// Encodes the error into a compact code for telemetry tagging.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            StoreError::MissingSlot => 0x0101,
            StoreError::Corrupted => 0x0102,
        }
    }
}

/// Abstraction over persistent template storage.
pub trait TemplateStore {
    /// Opaque template blob, matching the sensor adapter's template type.
    type Template;

    /// Retrieves the template stored at `id`.
    fn retrieve(&mut self, id: TemplateId) -> Result<Self::Template, StoreError>;

    /// Persists `template` at `id`, replacing any previous contents.
    fn save(&mut self, id: TemplateId, template: &Self::Template) -> Result<(), StoreError>;

    /// Best-effort refresh of the template at `id` with newer sample data.
    fn update(
        &mut self,
        id: TemplateId,
        template: &Self::Template,
        timestamp: u32,
    ) -> Result<(), StoreError>;
}

/// Volatile template store backed by fixed slots.
///
/// Useful for host tests and for bring-up before the flash-backed store is
/// wired in. Slots start empty and report [`StoreError::MissingSlot`].
#[derive(Clone, Debug)]
pub struct RamTemplateStore<T, const SLOTS: usize> {
    slots: [Option<T>; SLOTS],
}

impl<T, const SLOTS: usize> RamTemplateStore<T, SLOTS> {
    /// Creates a store with every slot empty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
        }
    }

    /// Returns the number of occupied slots.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    fn slot_mut(&mut self, id: TemplateId) -> Result<&mut Option<T>, StoreError> {
        self.slots
            .get_mut(usize::from(id.as_u8()))
            .ok_or(StoreError::MissingSlot)
    }
}

impl<T, const SLOTS: usize> Default for RamTemplateStore<T, SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, const SLOTS: usize> TemplateStore for RamTemplateStore<T, SLOTS> {
    type Template = T;

    fn retrieve(&mut self, id: TemplateId) -> Result<Self::Template, StoreError> {
        self.slots
            .get(usize::from(id.as_u8()))
            .and_then(Option::as_ref)
            .cloned()
            .ok_or(StoreError::MissingSlot)
    }

    fn save(&mut self, id: TemplateId, template: &Self::Template) -> Result<(), StoreError> {
        *self.slot_mut(id)? = Some(template.clone());
        Ok(())
    }

    fn update(
        &mut self,
        id: TemplateId,
        template: &Self::Template,
        _timestamp: u32,
    ) -> Result<(), StoreError> {
        let slot = self.slot_mut(id)?;
        if slot.is_none() {
            return Err(StoreError::MissingSlot);
        }
        *slot = Some(template.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_sentinel_is_distinct_from_real_slots() {
        assert!(TemplateId::INVALID.is_invalid());
        assert!(!TemplateId::new(0).is_invalid());
        assert_ne!(TemplateId::new(0), TemplateId::INVALID);
    }

    #[test]
    fn ram_store_round_trips_templates() {
        let mut store: RamTemplateStore<u32, 3> = RamTemplateStore::new();
        let id = TemplateId::new(1);

        assert_eq!(store.retrieve(id), Err(StoreError::MissingSlot));
        store.save(id, &0xBEEF).expect("save");
        assert_eq!(store.retrieve(id), Ok(0xBEEF));
        assert_eq!(store.occupied(), 1);
    }

    #[test]
    fn ram_store_update_requires_existing_slot() {
        let mut store: RamTemplateStore<u32, 3> = RamTemplateStore::new();
        let id = TemplateId::new(2);

        assert_eq!(store.update(id, &7, 0), Err(StoreError::MissingSlot));
        store.save(id, &7).expect("save");
        assert_eq!(store.update(id, &9, 100), Ok(()));
        assert_eq!(store.retrieve(id), Ok(9));
    }

    #[test]
    fn out_of_range_slot_reports_missing() {
        let mut store: RamTemplateStore<u32, 2> = RamTemplateStore::new();
        assert_eq!(
            store.save(TemplateId::new(5), &1),
            Err(StoreError::MissingSlot)
        );
    }
}
