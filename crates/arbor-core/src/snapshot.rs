//! The immutable program snapshot.
//!
//! A snapshot is a persistent value: `replace_unit`, `add_unit` and
//! `remove_unit` produce a new snapshot sharing unaffected structure with
//! the old one, so the transformer pipeline can thread successive snapshots
//! through a run without ever mutating in place.

use crate::error::{Error, Result};
use crate::options::{CompileOptions, TreeConfig};
use crate::source::{SourceUnit, UnitId};
use im::{HashMap as ImHashMap, Vector};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ProgramSnapshot {
    name: String,
    units: Vector<SourceUnit>,
    ordinals: ImHashMap<UnitId, usize>,
    options: Arc<CompileOptions>,
    tree_configs: ImHashMap<UnitId, Arc<TreeConfig>>,
}

impl ProgramSnapshot {
    /// Build a snapshot from units in listing order. Fails on a duplicate
    /// identity.
    pub fn new(
        name: impl Into<String>,
        units: impl IntoIterator<Item = SourceUnit>,
        options: Arc<CompileOptions>,
    ) -> Result<ProgramSnapshot> {
        let mut ordered = Vector::new();
        let mut ordinals = ImHashMap::new();
        for unit in units {
            if ordinals.insert(unit.id(), ordered.len()).is_some() {
                return Err(Error::DuplicateUnit { id: unit.id() });
            }
            ordered.push_back(unit);
        }
        Ok(ProgramSnapshot {
            name: name.into(),
            units: ordered,
            ordinals,
            options,
            tree_configs: ImHashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &Arc<CompileOptions> {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units in listing order. The order is significant: the first unit
    /// decides the default output name.
    pub fn units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.units.iter()
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.ordinals.contains_key(&id)
    }

    pub fn ordinal_of(&self, id: UnitId) -> Option<usize> {
        self.ordinals.get(&id).copied()
    }

    pub fn unit(&self, id: UnitId) -> Option<&SourceUnit> {
        self.ordinals.get(&id).and_then(|&i| self.units.get(i))
    }

    /// Output name derived from the first listed unit, falling back to the
    /// option default for empty compilations.
    pub fn default_output_name(&self) -> String {
        self.units
            .front()
            .and_then(|unit| unit.path().file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.options.fallback_output_name.clone())
    }

    /// New snapshot with `new` in the slot `old` occupied. Replacing a unit
    /// with itself is a no-op.
    pub fn replace_unit(&self, old: UnitId, new: SourceUnit) -> Result<ProgramSnapshot> {
        if new.id() == old {
            return Ok(self.clone());
        }
        let ordinal = self
            .ordinal_of(old)
            .ok_or(Error::UnknownUnit { id: old })?;
        if self.contains(new.id()) {
            return Err(Error::DuplicateUnit { id: new.id() });
        }
        tracing::trace!(%old, new = %new.id(), ordinal, "replacing unit");
        let new_id = new.id();
        Ok(ProgramSnapshot {
            name: self.name.clone(),
            units: self.units.update(ordinal, new),
            ordinals: self.ordinals.without(&old).update(new_id, ordinal),
            options: self.options.clone(),
            tree_configs: self.tree_configs.clone(),
        })
    }

    /// New snapshot with `unit` appended after the existing units.
    pub fn add_unit(&self, unit: SourceUnit) -> Result<ProgramSnapshot> {
        if self.contains(unit.id()) {
            return Err(Error::DuplicateUnit { id: unit.id() });
        }
        tracing::trace!(id = %unit.id(), "adding unit");
        let mut units = self.units.clone();
        let ordinals = self.ordinals.update(unit.id(), units.len());
        units.push_back(unit);
        Ok(ProgramSnapshot {
            name: self.name.clone(),
            units,
            ordinals,
            options: self.options.clone(),
            tree_configs: self.tree_configs.clone(),
        })
    }

    /// New snapshot without `id`. Later ordinals shift down.
    pub fn remove_unit(&self, id: UnitId) -> Result<ProgramSnapshot> {
        let ordinal = self.ordinal_of(id).ok_or(Error::UnknownUnit { id })?;
        let mut units = self.units.clone();
        units.remove(ordinal);
        let mut ordinals = ImHashMap::new();
        for (i, unit) in units.iter().enumerate() {
            ordinals.insert(unit.id(), i);
        }
        Ok(ProgramSnapshot {
            name: self.name.clone(),
            units,
            ordinals,
            options: self.options.clone(),
            tree_configs: self.tree_configs.without(&id),
        })
    }

    /// Associate analyzer configuration with a unit of this snapshot.
    pub fn with_tree_config(&self, id: UnitId, config: Arc<TreeConfig>) -> Result<ProgramSnapshot> {
        if !self.contains(id) {
            return Err(Error::UnknownUnit { id });
        }
        Ok(ProgramSnapshot {
            name: self.name.clone(),
            units: self.units.clone(),
            ordinals: self.ordinals.clone(),
            options: self.options.clone(),
            tree_configs: self.tree_configs.update(id, config),
        })
    }

    pub fn tree_config(&self, id: UnitId) -> Option<Arc<TreeConfig>> {
        self.tree_configs.get(&id).cloned()
    }

    /// True when both snapshots share the same underlying unit storage,
    /// i.e. no replace/add/remove separates them.
    pub fn shares_units_with(&self, other: &ProgramSnapshot) -> bool {
        self.units.ptr_eq(&other.units)
    }
}
