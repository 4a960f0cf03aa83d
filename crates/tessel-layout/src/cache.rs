//! Layout caches.
//!
//! - [`DispositionCache`]: per item, the last disposition and extent, valid
//!   until the item is invalidated.
//! - [`LayoutCache`]: per container, the last [`Placement`] keyed by area,
//!   scale, and a fingerprint of the container and its children's sizing.
//! - [`CoherenceCache`]: previous track allocations used to break rounding
//!   ties, bounded by [`LayoutConfig::coherence_capacity`].
//!
//! [`LayoutConfig::coherence_capacity`]: crate::LayoutConfig::coherence_capacity

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use tessel_core::geometry::{Rect, Size};
use tessel_core::scale::ScaleFactor;

use crate::Direction;
use crate::container::{Allocation, ChildSpec, Container, Placement};
use crate::item::{ItemId, SizeHint};
use crate::solver::Disposition;

/// Identity of one container solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutCacheKey {
    pub container: ItemId,
    pub area: Rect,
    scale_bits: u32,
    fingerprint: u64,
}

impl LayoutCacheKey {
    pub fn new(
        container: ItemId,
        area: Rect,
        scale: ScaleFactor,
        spec: &Container,
        children: &[ChildSpec],
    ) -> Self {
        let mut hasher = DefaultHasher::new();
        spec.hash(&mut hasher);
        children.len().hash(&mut hasher);
        for child in children {
            hash_hint(&child.sizing.width, &mut hasher);
            hash_hint(&child.sizing.height, &mut hasher);
            child.sizing.weight.horizontal.to_bits().hash(&mut hasher);
            child.sizing.weight.vertical.to_bits().hash(&mut hasher);
            child.flags.bits().hash(&mut hasher);
        }
        Self {
            container,
            area,
            scale_bits: scale.get().to_bits(),
            fingerprint: hasher.finish(),
        }
    }
}

fn hash_hint(hint: &SizeHint, hasher: &mut DefaultHasher) {
    hint.min.hash(hasher);
    hint.preferred.hash(hasher);
    hint.max.hash(hasher);
}

/// Hit/miss counters for [`LayoutCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped by explicit invalidation.
    pub invalidations: u64,
    /// `hits / (hits + misses)`, 0 when nothing was looked up.
    pub hit_rate: f64,
}

#[derive(Debug, Clone)]
struct LayoutEntry {
    key: LayoutCacheKey,
    placement: Placement,
}

/// Per-container memo of the last arrangement.
///
/// One entry per container; a lookup with a different key is a miss and the
/// next [`store`](Self::store) replaces the entry.
#[derive(Debug, Default)]
pub struct LayoutCache {
    entries: HashMap<ItemId, LayoutEntry>,
    hits: u64,
    misses: u64,
    invalidations: u64,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &LayoutCacheKey) -> Option<&Placement> {
        match self.entries.get(&key.container) {
            Some(entry) if entry.key == *key => {
                self.hits += 1;
                Some(&entry.placement)
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn store(&mut self, key: LayoutCacheKey, placement: Placement) {
        self.entries
            .insert(key.container, LayoutEntry { key, placement });
    }

    /// Drop the entry for `container`, if any.
    pub fn invalidate(&mut self, container: ItemId) {
        if self.entries.remove(&container).is_some() {
            self.invalidations += 1;
        }
    }

    pub fn clear(&mut self) {
        self.invalidations += self.entries.len() as u64;
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> LayoutCacheStats {
        let total = self.hits + self.misses;
        LayoutCacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            invalidations: self.invalidations,
            hit_rate: if total > 0 {
                self.hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.invalidations = 0;
    }
}

/// Last solver outcome of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispositionEntry {
    /// `None` for hidden items and the root.
    pub disposition: Option<Disposition>,
    pub extent: Size,
}

/// Per-item disposition memo.
#[derive(Debug, Clone, Default)]
pub struct DispositionCache {
    entries: HashMap<ItemId, DispositionEntry>,
}

impl DispositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ItemId) -> Option<DispositionEntry> {
        self.entries.get(&id).copied()
    }

    pub fn record(&mut self, id: ItemId, disposition: Option<Disposition>, extent: Size) {
        self.entries.insert(
            id,
            DispositionEntry {
                disposition,
                extent,
            },
        );
    }

    pub fn invalidate(&mut self, id: ItemId) {
        self.entries.remove(&id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
struct CoherenceEntry {
    sizes: Vec<u32>,
    last_used: u64,
}

/// Previous track allocations, keyed by container and axis.
///
/// Evicts the least recently stored or read entry once `capacity` is
/// reached. A capacity of 0 disables the store.
#[derive(Debug, Clone)]
pub struct CoherenceCache {
    entries: HashMap<(ItemId, Direction), CoherenceEntry>,
    capacity: usize,
    tick: u64,
}

impl CoherenceCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            tick: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity, evicting as needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.entries.len() > self.capacity {
            self.evict_lru();
        }
    }

    pub fn get(&mut self, id: ItemId, direction: Direction) -> Option<&[u32]> {
        self.tick += 1;
        let tick = self.tick;
        self.entries.get_mut(&(id, direction)).map(|entry| {
            entry.last_used = tick;
            entry.sizes.as_slice()
        })
    }

    /// Both axes for `id`, as a container expects them.
    pub fn allocation(&mut self, id: ItemId) -> Allocation {
        Allocation {
            horizontal: self.get(id, Direction::Horizontal).map(<[u32]>::to_vec),
            vertical: self.get(id, Direction::Vertical).map(<[u32]>::to_vec),
        }
    }

    pub fn store(&mut self, id: ItemId, direction: Direction, sizes: Vec<u32>) {
        if self.capacity == 0 {
            return;
        }
        self.tick += 1;
        let key = (id, direction);
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_lru();
        }
        self.entries.insert(
            key,
            CoherenceEntry {
                sizes,
                last_used: self.tick,
            },
        );
    }

    pub fn store_allocation(&mut self, id: ItemId, allocation: &Allocation) {
        for direction in [Direction::Horizontal, Direction::Vertical] {
            if let Some(sizes) = allocation.get(direction) {
                self.store(id, direction, sizes.to_vec());
            }
        }
    }

    /// Sum and maximum of absolute per-track change against the stored
    /// allocation. `None` when nothing is stored or the track count changed.
    pub fn displacement(&self, id: ItemId, direction: Direction, sizes: &[u32]) -> Option<(u64, u32)> {
        let prev = &self.entries.get(&(id, direction))?.sizes;
        if prev.len() != sizes.len() {
            return None;
        }
        Some(prev.iter().zip(sizes).fold((0u64, 0u32), |(sum, max), (&a, &b)| {
            let d = a.abs_diff(b);
            (sum + u64::from(d), max.max(d))
        }))
    }

    /// Forget both axes of `id`.
    pub fn remove(&mut self, id: ItemId) {
        self.entries.remove(&(id, Direction::Horizontal));
        self.entries.remove(&(id, Direction::Vertical));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_lru(&mut self) {
        if let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_used)
            .map(|(k, _)| *k)
        {
            self.entries.remove(&key);
        }
    }
}

impl Default for CoherenceCache {
    fn default() -> Self {
        Self::new(crate::LayoutConfig::default().coherence_capacity)
    }
}
