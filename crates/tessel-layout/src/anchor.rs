//! Anchors: named edge constraints between items.
//!
//! An anchor binds an edge of its source item to an edge of a target item,
//! plus an offset. Anchors run after base layout. Positional edges move the
//! source (and its subtree) without resizing it; `Width`/`Height` resize it.
//!
//! Sources are resolved in dependency order: a source waits for the sources
//! it reads from, for their ancestors, and for its own ancestors, since any
//! of those moving would move what it reads or what it is.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tessel_core::geometry::Rect;
use tessel_core::scale::ScaleFactor;

use crate::Direction;
use crate::error::LayoutError;
use crate::item::ItemId;

/// An anchorable edge, center line, or extent of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AnchorEdge {
    Left,
    Right,
    Top,
    Bottom,
    CenterX,
    CenterY,
    Width,
    Height,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeKind {
    Position(Direction),
    Extent(Direction),
}

impl AnchorEdge {
    const fn kind(self) -> EdgeKind {
        match self {
            Self::Left | Self::Right | Self::CenterX => EdgeKind::Position(Direction::Horizontal),
            Self::Top | Self::Bottom | Self::CenterY => EdgeKind::Position(Direction::Vertical),
            Self::Width => EdgeKind::Extent(Direction::Horizontal),
            Self::Height => EdgeKind::Extent(Direction::Vertical),
        }
    }

    /// Axis this edge measures along.
    pub const fn direction(self) -> Direction {
        match self.kind() {
            EdgeKind::Position(d) | EdgeKind::Extent(d) => d,
        }
    }

    /// `Width` or `Height`.
    pub const fn is_extent(self) -> bool {
        matches!(self.kind(), EdgeKind::Extent(_))
    }

    /// Positions bind to positions on the same axis; extents to the same extent.
    pub fn is_compatible(self, other: AnchorEdge) -> bool {
        self.kind() == other.kind()
    }

    /// Coordinate or extent of this edge on `rect`.
    pub fn value(self, rect: Rect) -> i64 {
        let (x, y) = (i64::from(rect.x), i64::from(rect.y));
        let (w, h) = (i64::from(rect.width), i64::from(rect.height));
        match self {
            Self::Left => x,
            Self::Right => x + w,
            Self::Top => y,
            Self::Bottom => y + h,
            Self::CenterX => x + w / 2,
            Self::CenterY => y + h / 2,
            Self::Width => w,
            Self::Height => h,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::CenterX => "center_x",
            Self::CenterY => "center_y",
            Self::Width => "width",
            Self::Height => "height",
        }
    }
}

impl fmt::Display for AnchorEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the source edge relates to the target edge plus offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AnchorRelation {
    #[default]
    Equal,
    AtLeast,
    AtMost,
}

impl AnchorRelation {
    /// Value the source edge must take, given its current value.
    pub fn resolve(self, current: i64, required: i64) -> i64 {
        match self {
            Self::Equal => required,
            Self::AtLeast => current.max(required),
            Self::AtMost => current.min(required),
        }
    }
}

/// A named constraint: `source.source_edge <relation> target.target_edge + offset`.
///
/// `offset` is in logical units.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Anchor {
    pub name: String,
    pub source: ItemId,
    pub source_edge: AnchorEdge,
    pub target: ItemId,
    pub target_edge: AnchorEdge,
    pub relation: AnchorRelation,
    pub offset: i32,
}

/// What applying an anchor does to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorEffect {
    /// Move the source and its subtree.
    Translate { dx: i64, dy: i64 },
    /// Set the source's extent along `direction`.
    Resize { direction: Direction, extent: i64 },
}

impl Anchor {
    /// `source.source_edge == target.target_edge`, offset 0.
    pub fn new(
        name: impl Into<String>,
        source: ItemId,
        source_edge: AnchorEdge,
        target: ItemId,
        target_edge: AnchorEdge,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            source_edge,
            target,
            target_edge,
            relation: AnchorRelation::Equal,
            offset: 0,
        }
    }

    #[must_use]
    pub fn with_relation(mut self, relation: AnchorRelation) -> Self {
        self.relation = relation;
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: i32) -> Self {
        self.offset = offset;
        self
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if !self.source_edge.is_compatible(self.target_edge) {
            return Err(LayoutError::IncompatibleEdges {
                name: self.name.clone(),
                source_edge: self.source_edge,
                target_edge: self.target_edge,
            });
        }
        Ok(())
    }

    pub fn mentions(&self, id: ItemId) -> bool {
        self.source == id || self.target == id
    }

    /// Change needed for `source` to satisfy this anchor against `target`,
    /// or `None` if it already does.
    pub fn effect(&self, source: Rect, target: Rect, scale: ScaleFactor) -> Option<AnchorEffect> {
        let required =
            self.target_edge.value(target) + i64::from(scale.apply_offset(self.offset));
        let current = self.source_edge.value(source);
        let wanted = self.relation.resolve(current, required);
        if wanted == current {
            return None;
        }
        let direction = self.source_edge.direction();
        if self.source_edge.is_extent() {
            return Some(AnchorEffect::Resize {
                direction,
                extent: wanted,
            });
        }
        let delta = wanted - current;
        Some(match direction {
            Direction::Horizontal => AnchorEffect::Translate { dx: delta, dy: 0 },
            Direction::Vertical => AnchorEffect::Translate { dx: 0, dy: delta },
        })
    }
}

/// Anchors registered per source item, unique by name per source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorSet {
    by_source: BTreeMap<ItemId, BTreeMap<String, Anchor>>,
}

impl AnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an anchor. Edges must be compatible and the name unused on
    /// the source.
    pub fn insert(&mut self, anchor: Anchor) -> Result<(), LayoutError> {
        anchor.validate()?;
        let named = self.by_source.entry(anchor.source).or_default();
        if named.contains_key(&anchor.name) {
            return Err(LayoutError::DuplicateAnchor {
                source: anchor.source,
                name: anchor.name,
            });
        }
        named.insert(anchor.name.clone(), anchor);
        Ok(())
    }

    pub fn remove(&mut self, source: ItemId, name: &str) -> Option<Anchor> {
        let named = self.by_source.get_mut(&source)?;
        let removed = named.remove(name);
        if named.is_empty() {
            self.by_source.remove(&source);
        }
        removed
    }

    pub fn get(&self, source: ItemId, name: &str) -> Option<&Anchor> {
        self.by_source.get(&source)?.get(name)
    }

    /// Anchors whose source is `source`, in name order.
    pub fn anchors_of(&self, source: ItemId) -> impl Iterator<Item = &Anchor> {
        self.by_source
            .get(&source)
            .into_iter()
            .flat_map(|named| named.values())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Anchor> {
        self.by_source.values().flat_map(|named| named.values())
    }

    pub fn len(&self) -> usize {
        self.by_source.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }

    /// Drop every anchor whose source or target is `id`. Returns how many
    /// were dropped.
    pub fn remove_item(&mut self, id: ItemId) -> usize {
        let before = self.len();
        self.by_source.remove(&id);
        for named in self.by_source.values_mut() {
            named.retain(|_, anchor| anchor.target != id);
        }
        self.by_source.retain(|_, named| !named.is_empty());
        before - self.len()
    }

    /// Source items in the order their anchors must be applied.
    ///
    /// `parent` maps an item to its parent container. Ties are broken by
    /// item id. A cycle fails with the names of the anchors on it, sorted.
    /// An anchor whose target lies inside its source's subtree moves along
    /// with the source and counts as a cycle of its own.
    pub fn resolution_order(
        &self,
        parent: impl Fn(ItemId) -> Option<ItemId>,
    ) -> Result<Vec<ItemId>, LayoutError> {
        let mut contained: Vec<String> = self
            .iter()
            .filter(|anchor| {
                anchor.target != anchor.source
                    && ancestors(anchor.target, &parent).contains(&anchor.source)
            })
            .map(|anchor| anchor.name.clone())
            .collect();
        if !contained.is_empty() {
            contained.sort();
            contained.dedup();
            return Err(LayoutError::CyclicAnchors { names: contained });
        }

        let deps = self.dependencies(&parent);

        let mut pending: BTreeMap<ItemId, usize> =
            deps.iter().map(|(&s, d)| (s, d.len())).collect();
        let mut dependents: BTreeMap<ItemId, Vec<ItemId>> = BTreeMap::new();
        for (&source, on) in &deps {
            for &dep in on {
                dependents.entry(dep).or_default().push(source);
            }
        }

        let mut ready: BTreeSet<ItemId> = pending
            .iter()
            .filter(|&(_, &n)| n == 0)
            .map(|(&s, _)| s)
            .collect();
        let mut order = Vec::with_capacity(deps.len());
        while let Some(source) = ready.pop_first() {
            pending.remove(&source);
            order.push(source);
            for &next in dependents.get(&source).into_iter().flatten() {
                if let Some(n) = pending.get_mut(&next) {
                    *n -= 1;
                    if *n == 0 {
                        ready.insert(next);
                    }
                }
            }
        }

        if pending.is_empty() {
            return Ok(order);
        }
        Err(LayoutError::CyclicAnchors {
            names: self.cycle_names(&deps, pending.into_keys().collect(), &parent),
        })
    }

    /// For each source, the other sources it must wait for.
    fn dependencies(
        &self,
        parent: &impl Fn(ItemId) -> Option<ItemId>,
    ) -> BTreeMap<ItemId, BTreeSet<ItemId>> {
        self.by_source
            .iter()
            .map(|(&source, named)| {
                let mut on: BTreeSet<ItemId> = BTreeSet::new();
                for anchor in named.values() {
                    on.insert(anchor.target);
                    on.extend(ancestors(anchor.target, parent));
                }
                on.extend(ancestors(source, parent));
                on.retain(|dep| *dep != source && self.by_source.contains_key(dep));
                (source, on)
            })
            .collect()
    }

    /// Names of anchors on a cycle among `stuck` sources.
    ///
    /// Kahn's pass leaves both the cycle members and everything downstream
    /// of them; peel off sources nothing stuck depends on until only cycle
    /// members remain. An anchor is named when its target (or an ancestor of
    /// it) is a member; a member held only through its own ancestors names
    /// all of its anchors.
    fn cycle_names(
        &self,
        deps: &BTreeMap<ItemId, BTreeSet<ItemId>>,
        mut stuck: BTreeSet<ItemId>,
        parent: &impl Fn(ItemId) -> Option<ItemId>,
    ) -> Vec<String> {
        loop {
            let needed: BTreeSet<ItemId> = stuck
                .iter()
                .filter_map(|s| deps.get(s))
                .flatten()
                .copied()
                .filter(|d| stuck.contains(d))
                .collect();
            let before = stuck.len();
            stuck.retain(|s| needed.contains(s));
            if stuck.len() == before {
                break;
            }
        }

        let mut names = Vec::new();
        for &source in &stuck {
            let on_cycle: Vec<&Anchor> = self
                .anchors_of(source)
                .filter(|anchor| {
                    anchor.target != source
                        && (stuck.contains(&anchor.target)
                            || ancestors(anchor.target, parent)
                                .iter()
                                .any(|a| *a != source && stuck.contains(a)))
                })
                .collect();
            if on_cycle.is_empty() {
                names.extend(self.anchors_of(source).map(|anchor| anchor.name.clone()));
            } else {
                names.extend(on_cycle.into_iter().map(|anchor| anchor.name.clone()));
            }
        }
        names.sort();
        names.dedup();
        names
    }
}

fn ancestors(id: ItemId, parent: &impl Fn(ItemId) -> Option<ItemId>) -> Vec<ItemId> {
    let mut out = Vec::new();
    let mut cursor = parent(id);
    while let Some(p) = cursor {
        out.push(p);
        cursor = parent(p);
    }
    out
}
