use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use tilestream_common::{GridKey, TileId};

/// Live entries keyed by lattice cell, with a reverse index by tile id.
///
/// At most one entry per [`GridKey`]. Occupancy check and insertion happen
/// in a single step in [`LiveTiles::spawn_with`], so an entry inserted
/// earlier in a batch is seen by every later spawn in that batch.
#[derive(Debug)]
pub struct LiveTiles<T> {
    cells: BTreeMap<GridKey, T>,
    ids: HashMap<TileId, GridKey>,
}

impl<T> Default for LiveTiles<T> {
    fn default() -> Self {
        Self {
            cells: BTreeMap::new(),
            ids: HashMap::new(),
        }
    }
}

impl<T> LiveTiles<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and insert an entry if `key` is free.
    ///
    /// Returns `Ok(None)` without calling `build` when the cell is taken.
    pub fn spawn_with<E>(
        &mut self,
        key: GridKey,
        build: impl FnOnce() -> Result<(TileId, T), E>,
    ) -> Result<Option<TileId>, E> {
        match self.cells.entry(key) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(slot) => {
                let (id, value) = build()?;
                slot.insert(value);
                self.ids.insert(id, key);
                Ok(Some(id))
            }
        }
    }

    /// Remove by id. Unknown ids are ignored.
    pub fn remove(&mut self, id: TileId) -> Option<(GridKey, T)> {
        let key = self.ids.remove(&id)?;
        self.cells.remove(&key).map(|value| (key, value))
    }

    pub fn is_occupied(&self, key: GridKey) -> bool {
        self.cells.contains_key(&key)
    }

    pub fn get(&self, key: GridKey) -> Option<&T> {
        self.cells.get(&key)
    }

    pub fn key_of(&self, id: TileId) -> Option<GridKey> {
        self.ids.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Entries in lattice order.
    pub fn iter(&self) -> impl Iterator<Item = (GridKey, &T)> {
        self.cells.iter().map(|(k, v)| (*k, v))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.cells.values_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = GridKey> + '_ {
        self.cells.keys().copied()
    }
}
