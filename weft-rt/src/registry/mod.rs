//! Name registry: bounded `name → actor id` table.
//!
//! Names are borrowed `&'static str`s (never copied), unique while
//! registered, and removed on explicit unregister or owner death.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use tracing::trace;

// Layer 3: Internal module imports
use crate::error::{Error, Result};
use crate::util::ActorId;

#[derive(Debug, Clone, Copy)]
struct RegEntry {
    name: &'static str,
    owner: ActorId,
}

/// Fixed-capacity name table.
pub(crate) struct NameRegistry {
    entries: Box<[Option<RegEntry>]>,
}

impl NameRegistry {
    pub fn new(capacity: usize) -> Self {
        let mut entries = Vec::with_capacity(capacity);
        entries.resize_with(capacity, || None);
        Self {
            entries: entries.into_boxed_slice(),
        }
    }

    /// Bind `name` to `owner`. Duplicates fail with `Exists`, a full table
    /// with `Nomem`.
    pub fn register(&mut self, name: &'static str, owner: ActorId) -> Result<()> {
        if self.whereis(name).is_some() {
            return Err(Error::exists("name already registered"));
        }
        let slot = self
            .entries
            .iter()
            .position(Option::is_none)
            .ok_or(Error::nomem("name registry full"))?;
        self.entries[slot] = Some(RegEntry { name, owner });
        trace!(name, %owner, "name registered");
        Ok(())
    }

    /// Exact-match lookup.
    pub fn whereis(&self, name: &str) -> Option<ActorId> {
        self.entries
            .iter()
            .flatten()
            .find(|e| e.name == name)
            .map(|e| e.owner)
    }

    /// Remove a binding; only its owner may do so.
    pub fn unregister(&mut self, name: &str, caller: ActorId) -> Result<()> {
        let slot = self
            .entries
            .iter()
            .position(|e| e.is_some_and(|e| e.name == name))
            .ok_or(Error::invalid("name not registered"))?;
        let entry = self.entries[slot].ok_or(Error::invalid("name not registered"))?;
        if entry.owner != caller {
            return Err(Error::invalid("name owned by another actor"));
        }
        self.entries[slot] = None;
        trace!(name, "name unregistered");
        Ok(())
    }

    /// Drop every binding owned by a dying actor.
    pub fn remove_owned_by(&mut self, owner: ActorId) {
        for entry in self.entries.iter_mut() {
            if entry.is_some_and(|e| e.owner == owner) {
                *entry = None;
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_whereis() {
        let mut reg = NameRegistry::new(4);
        let a = ActorId::from_raw(1);
        reg.register("logger", a).unwrap();
        assert_eq!(reg.whereis("logger"), Some(a));
        assert_eq!(reg.whereis("nobody"), None);
    }

    #[test]
    fn test_duplicate_is_exists() {
        let mut reg = NameRegistry::new(4);
        reg.register("logger", ActorId::from_raw(1)).unwrap();
        let err = reg.register("logger", ActorId::from_raw(2)).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::Exists);
    }

    #[test]
    fn test_capacity_is_nomem() {
        let mut reg = NameRegistry::new(1);
        reg.register("a", ActorId::from_raw(1)).unwrap();
        let err = reg.register("b", ActorId::from_raw(2)).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::Nomem);
    }

    #[test]
    fn test_unregister_requires_owner() {
        let mut reg = NameRegistry::new(4);
        let owner = ActorId::from_raw(1);
        reg.register("svc", owner).unwrap();
        assert!(reg.unregister("svc", ActorId::from_raw(2)).is_err());
        reg.unregister("svc", owner).unwrap();
        assert_eq!(reg.whereis("svc"), None);
    }

    #[test]
    fn test_owner_death_sweeps_entries() {
        let mut reg = NameRegistry::new(4);
        let dying = ActorId::from_raw(1);
        reg.register("one", dying).unwrap();
        reg.register("two", dying).unwrap();
        reg.register("other", ActorId::from_raw(2)).unwrap();
        reg.remove_owned_by(dying);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.whereis("other"), Some(ActorId::from_raw(2)));
    }
}
