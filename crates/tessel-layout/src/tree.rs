//! Layout tree: an arena of items under one root container.
//!
//! Mutations only mark the tree invalid. Geometry is recomputed on the next
//! query or explicit [`LayoutTree::validate`]; a failed pass keeps the
//! previous geometry and leaves the tree invalid.

use std::collections::{BTreeMap, BTreeSet};

use tessel_core::geometry::{Rect, Size};
#[cfg(feature = "tracing")]
use tessel_core::logging::LAYOUT_TARGET;

use crate::anchor::{Anchor, AnchorEffect, AnchorSet};
use crate::cache::{CoherenceCache, DispositionCache, LayoutCache, LayoutCacheKey, LayoutCacheStats};
use crate::config::LayoutContext;
use crate::container::{ChildSpec, Container, ContainerMetrics};
use crate::error::LayoutError;
use crate::item::{ItemFlags, ItemId, ItemIdAllocator, ItemKind, ItemSizing, LayoutItem, Measure, Weight};
use crate::solver::Disposition;
use crate::Direction;

/// One item whose resolved rectangle changed in a validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeometryChange {
    pub id: ItemId,
    /// `None` the first time the item is resolved.
    pub old: Option<Rect>,
    pub new: Rect,
}

#[derive(Debug, Clone)]
struct Node {
    item: LayoutItem,
    parent: Option<ItemId>,
    children: Vec<ItemId>,
    rect: Option<Rect>,
}

impl Node {
    fn new(item: LayoutItem, parent: Option<ItemId>) -> Self {
        Self {
            item,
            parent,
            children: Vec::new(),
            rect: None,
        }
    }
}

/// Arena owning every item of one layout.
#[derive(Debug)]
pub struct LayoutTree {
    root: ItemId,
    ids: ItemIdAllocator,
    nodes: BTreeMap<ItemId, Node>,
    anchors: AnchorSet,
    context: LayoutContext,
    area: Rect,
    valid: bool,
    layout_cache: LayoutCache,
    dispositions: DispositionCache,
    coherence: CoherenceCache,
    metrics: BTreeMap<ItemId, ContainerMetrics>,
    changes: Vec<GeometryChange>,
}

impl LayoutTree {
    /// A tree whose root is `container`. The area starts empty.
    pub fn new(container: Container, context: LayoutContext) -> Self {
        let root = ItemId::MIN;
        let mut nodes = BTreeMap::new();
        nodes.insert(root, Node::new(LayoutItem::container(container), None));
        Self {
            root,
            ids: ItemIdAllocator::with_next(root.checked_next().unwrap_or(root)),
            nodes,
            anchors: AnchorSet::new(),
            context,
            area: Rect::default(),
            valid: false,
            layout_cache: LayoutCache::new(),
            dispositions: DispositionCache::new(),
            coherence: CoherenceCache::new(context.config.coherence_capacity),
            metrics: BTreeMap::new(),
            changes: Vec::new(),
        }
    }

    #[must_use]
    pub const fn root(&self) -> ItemId {
        self.root
    }

    /// Number of items, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root is never removed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn item(&self, id: ItemId) -> Option<&LayoutItem> {
        self.nodes.get(&id).map(|node| &node.item)
    }

    /// Items in id order.
    pub fn items(&self) -> impl Iterator<Item = (ItemId, &LayoutItem)> {
        self.nodes.iter().map(|(&id, node)| (id, &node.item))
    }

    pub fn children(&self, id: ItemId) -> Result<&[ItemId], LayoutError> {
        Ok(&self.node(id)?.children)
    }

    pub fn parent(&self, id: ItemId) -> Result<Option<ItemId>, LayoutError> {
        Ok(self.node(id)?.parent)
    }

    // --- Structure ---

    /// Append `item` to the container `parent`.
    pub fn add_item(&mut self, parent: ItemId, item: LayoutItem) -> Result<ItemId, LayoutError> {
        let len = self.children(parent)?.len();
        self.insert_item(parent, len, item)
    }

    /// Insert `item` at `index` among `parent`'s children (clamped to the end).
    pub fn insert_item(
        &mut self,
        parent: ItemId,
        index: usize,
        item: LayoutItem,
    ) -> Result<ItemId, LayoutError> {
        item.sizing.validate(None)?;
        self.container_of(parent)?;
        let id = self.ids.allocate()?;
        self.nodes.insert(id, Node::new(item, Some(parent)));
        let siblings = &mut self.node_mut(parent)?.children;
        let index = index.min(siblings.len());
        siblings.insert(index, id);
        self.invalidate(parent)?;
        Ok(id)
    }

    /// Append a widget, snapshotting its measured sizing.
    pub fn add_widget(&mut self, parent: ItemId, widget: &impl Measure) -> Result<ItemId, LayoutError> {
        self.add_item(parent, LayoutItem::widget(widget.measure()))
    }

    /// Append an empty nested container.
    pub fn add_container(&mut self, parent: ItemId, container: Container) -> Result<ItemId, LayoutError> {
        self.add_item(parent, LayoutItem::container(container))
    }

    /// Remove `id` and its subtree, along with every anchor that mentions a
    /// removed item. Returns the removed ids in id order.
    pub fn remove(&mut self, id: ItemId) -> Result<Vec<ItemId>, LayoutError> {
        if id == self.root {
            return Err(LayoutError::RootRemoval);
        }
        let parent = self.node(id)?.parent;
        let removed = self.subtree(id);
        if let Some(parent) = parent {
            self.invalidate(parent)?;
            self.node_mut(parent)?.children.retain(|&child| child != id);
        }
        for &gone in &removed {
            self.nodes.remove(&gone);
            self.anchors.remove_item(gone);
            self.layout_cache.invalidate(gone);
            self.dispositions.invalidate(gone);
            self.coherence.remove(gone);
            self.metrics.remove(&gone);
        }
        tessel_core::debug!(
            target: LAYOUT_TARGET,
            item = %id,
            removed = removed.len(),
            "removed subtree"
        );
        Ok(removed.into_iter().collect())
    }

    // --- Item properties ---

    /// Replace an item's sizing (logical units). For containers only the
    /// weight is used; a non-zero weight overrides the aggregated one.
    pub fn set_sizing(&mut self, id: ItemId, sizing: ItemSizing) -> Result<(), LayoutError> {
        sizing.validate(Some(id))?;
        let node = self.node_mut(id)?;
        if node.item.sizing != sizing {
            node.item.sizing = sizing;
            self.invalidate(id)?;
        }
        Ok(())
    }

    /// Re-query a widget's sizing.
    pub fn remeasure(&mut self, id: ItemId, widget: &impl Measure) -> Result<(), LayoutError> {
        self.set_sizing(id, widget.measure())
    }

    pub fn set_visible(&mut self, id: ItemId, visible: bool) -> Result<(), LayoutError> {
        self.set_flags(id, ItemFlags::VISIBLE, visible)
    }

    /// Pin (or release) both axes to the preferred size.
    pub fn set_fixed(&mut self, id: ItemId, fixed: bool) -> Result<(), LayoutError> {
        self.set_flags(id, ItemFlags::FIXED, fixed)
    }

    pub fn set_flags(&mut self, id: ItemId, flags: ItemFlags, enabled: bool) -> Result<(), LayoutError> {
        let node = self.node_mut(id)?;
        let before = node.item.flags;
        node.item.flags.set(flags, enabled);
        if node.item.flags != before {
            self.invalidate(id)?;
        }
        Ok(())
    }

    /// Replace the arrangement properties of a container item.
    pub fn set_container(&mut self, id: ItemId, container: Container) -> Result<(), LayoutError> {
        let node = self.node_mut(id)?;
        match &mut node.item.kind {
            ItemKind::Container(current) => {
                if *current != container {
                    *current = container;
                    self.invalidate(id)?;
                }
                Ok(())
            }
            _ => Err(LayoutError::NotAContainer { id }),
        }
    }

    // --- Anchors ---

    /// Register an anchor. Both items must exist.
    pub fn add_anchor(&mut self, anchor: Anchor) -> Result<(), LayoutError> {
        self.node(anchor.source)?;
        self.node(anchor.target)?;
        self.anchors.insert(anchor)?;
        self.valid = false;
        Ok(())
    }

    pub fn remove_anchor(&mut self, source: ItemId, name: &str) -> Option<Anchor> {
        let removed = self.anchors.remove(source, name);
        if removed.is_some() {
            self.valid = false;
        }
        removed
    }

    pub fn anchor(&self, source: ItemId, name: &str) -> Option<&Anchor> {
        self.anchors.get(source, name)
    }

    pub fn anchors_of(&self, source: ItemId) -> impl Iterator<Item = &Anchor> {
        self.anchors.anchors_of(source)
    }

    pub fn anchors(&self) -> &AnchorSet {
        &self.anchors
    }

    // --- Invalidation ---

    /// Mark `id` changed: drops its cached disposition and the cached solves
    /// of it and every ancestor.
    pub fn invalidate(&mut self, id: ItemId) -> Result<(), LayoutError> {
        self.node(id)?;
        self.valid = false;
        self.dispositions.invalidate(id);
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            self.layout_cache.invalidate(current);
            cursor = self.nodes.get(&current).and_then(|node| node.parent);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Area the root is laid out in (device pixels).
    pub fn set_area(&mut self, area: Rect) {
        if self.area != area {
            self.area = area;
            self.valid = false;
        }
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    /// Replace the scale factor and configuration.
    pub fn set_context(&mut self, context: LayoutContext) {
        if self.context != context {
            self.context = context;
            self.coherence.set_capacity(context.config.coherence_capacity);
            self.layout_cache.clear();
            self.dispositions.clear();
            self.valid = false;
        }
    }

    pub fn context(&self) -> &LayoutContext {
        &self.context
    }

    // --- Resolution ---

    /// Recompute geometry if anything changed since the last pass.
    pub fn validate(&mut self) -> Result<(), LayoutError> {
        if self.valid {
            return Ok(());
        }
        let span = tessel_core::debug_span!(
            target: LAYOUT_TARGET,
            "layout.validate",
            items = self.nodes.len(),
            anchors = self.anchors.len()
        );
        let _guard = span.enter();

        let order = self
            .anchors
            .resolution_order(|id| self.nodes.get(&id).and_then(|node| node.parent))?;

        let mut pass = Pass {
            nodes: &self.nodes,
            ctx: &self.context,
            layout_cache: &mut self.layout_cache,
            coherence: &mut self.coherence,
            sizing: BTreeMap::new(),
            rects: BTreeMap::new(),
            dispositions: BTreeMap::new(),
            metrics: BTreeMap::new(),
            collapsed: BTreeSet::new(),
        };
        pass.dispositions.insert(self.root, None);
        pass.arrange(self.root, self.area)?;
        pass.apply_anchors(&self.anchors, &order)?;

        let Pass {
            rects,
            dispositions,
            metrics,
            ..
        } = pass;

        #[cfg(feature = "tracing")]
        let before = self.changes.len();
        for (id, rect) in rects {
            if let Some(node) = self.nodes.get_mut(&id) {
                if node.rect != Some(rect) {
                    self.changes.push(GeometryChange {
                        id,
                        old: node.rect,
                        new: rect,
                    });
                    node.rect = Some(rect);
                }
                let disposition = dispositions.get(&id).copied().flatten();
                self.dispositions.record(id, disposition, rect.size());
            }
        }
        self.metrics = metrics;
        self.valid = true;
        tessel_core::debug!(
            target: LAYOUT_TARGET,
            changed = self.changes.len() - before,
            "layout validated"
        );
        Ok(())
    }

    /// Resolved rectangle of `id`, validating first if needed.
    pub fn geometry(&mut self, id: ItemId) -> Result<Rect, LayoutError> {
        self.node(id)?;
        self.validate()?;
        Ok(self.cached_geometry(id).unwrap_or_default())
    }

    /// Last resolved rectangle without validating.
    pub fn cached_geometry(&self, id: ItemId) -> Option<Rect> {
        self.nodes.get(&id).and_then(|node| node.rect)
    }

    /// Union of `id`'s rectangle and those of its shown descendants.
    ///
    /// Differs from [`geometry`](Self::geometry) when anchors move children
    /// outside their container.
    pub fn bounding_box(&mut self, id: ItemId) -> Result<Rect, LayoutError> {
        let own = self.geometry(id)?;
        Ok(self
            .subtree(id)
            .into_iter()
            .filter(|&d| d != id)
            .filter_map(|d| self.cached_geometry(d))
            .filter(|r| !r.is_empty())
            .fold(own, |acc, r| if acc.is_empty() { r } else { acc.union(&r) }))
    }

    /// How the solver treated `id` on the last pass. `None` for the root and
    /// hidden items.
    pub fn disposition(&mut self, id: ItemId) -> Result<Option<Disposition>, LayoutError> {
        self.node(id)?;
        self.validate()?;
        Ok(self.dispositions.get(id).and_then(|entry| entry.disposition))
    }

    /// Inner area, content extent, and slack of a container.
    pub fn container_metrics(&mut self, id: ItemId) -> Result<ContainerMetrics, LayoutError> {
        self.container_of(id)?;
        self.validate()?;
        Ok(self.metrics.get(&id).copied().unwrap_or_default())
    }

    pub fn cache_stats(&self) -> LayoutCacheStats {
        self.layout_cache.stats()
    }

    /// Zero the layout cache counters. Entries are kept.
    pub fn reset_cache_stats(&mut self) {
        self.layout_cache.reset_stats();
    }

    /// Extent recorded for `id` by the last successful pass, without
    /// validating. `None` once the item has been invalidated.
    pub fn resolved_extent(&self, id: ItemId) -> Option<Size> {
        self.dispositions.get(id).map(|entry| entry.extent)
    }

    /// Take the geometry changes recorded since the last drain.
    pub fn drain_changes(&mut self) -> Vec<GeometryChange> {
        std::mem::take(&mut self.changes)
    }

    // --- Internals ---

    fn node(&self, id: ItemId) -> Result<&Node, LayoutError> {
        self.nodes.get(&id).ok_or(LayoutError::UnknownItem { id })
    }

    fn node_mut(&mut self, id: ItemId) -> Result<&mut Node, LayoutError> {
        self.nodes
            .get_mut(&id)
            .ok_or(LayoutError::UnknownItem { id })
    }

    fn container_of(&self, id: ItemId) -> Result<&Container, LayoutError> {
        self.node(id)?
            .item
            .container_spec()
            .ok_or(LayoutError::NotAContainer { id })
    }

    /// `id` and all its descendants.
    fn subtree(&self, id: ItemId) -> BTreeSet<ItemId> {
        let mut out = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                out.insert(current);
                stack.extend(node.children.iter().copied());
            }
        }
        out
    }
}

/// Scratch state of one validation pass. Nothing reaches the tree unless the
/// whole pass succeeds.
struct Pass<'a> {
    nodes: &'a BTreeMap<ItemId, Node>,
    ctx: &'a LayoutContext,
    layout_cache: &'a mut LayoutCache,
    coherence: &'a mut CoherenceCache,
    /// Device-pixel sizing, aggregated for containers.
    sizing: BTreeMap<ItemId, ItemSizing>,
    rects: BTreeMap<ItemId, Rect>,
    dispositions: BTreeMap<ItemId, Option<Disposition>>,
    metrics: BTreeMap<ItemId, ContainerMetrics>,
    /// Items inside a hidden subtree.
    collapsed: BTreeSet<ItemId>,
}

impl Pass<'_> {
    fn node(&self, id: ItemId) -> Result<&Node, LayoutError> {
        self.nodes.get(&id).ok_or(LayoutError::UnknownItem { id })
    }

    fn sizing(&mut self, id: ItemId) -> Result<ItemSizing, LayoutError> {
        if let Some(sizing) = self.sizing.get(&id) {
            return Ok(*sizing);
        }
        let nodes = self.nodes;
        let node = nodes.get(&id).ok_or(LayoutError::UnknownItem { id })?;
        let sizing = match node.item.container_spec() {
            None => node.item.sizing.scaled(self.ctx.scale),
            Some(container) => {
                let specs = self.child_specs(&node.children)?;
                let mut aggregate = container.aggregate(&specs, self.ctx);
                if node.item.sizing.weight != Weight::NONE {
                    aggregate.weight = node.item.sizing.weight;
                }
                aggregate
            }
        };
        self.sizing.insert(id, sizing);
        Ok(sizing)
    }

    fn child_specs(&mut self, children: &[ItemId]) -> Result<Vec<ChildSpec>, LayoutError> {
        children
            .iter()
            .map(|&child| -> Result<ChildSpec, LayoutError> {
                let flags = self.node(child)?.item.flags;
                Ok(ChildSpec::new(self.sizing(child)?, flags))
            })
            .collect()
    }

    /// Place `id` at `rect` and lay out its subtree.
    fn arrange(&mut self, id: ItemId, rect: Rect) -> Result<(), LayoutError> {
        self.rects.insert(id, rect);
        let nodes = self.nodes;
        let node = nodes.get(&id).ok_or(LayoutError::UnknownItem { id })?;
        let Some(container) = node.item.container_spec() else {
            return Ok(());
        };

        let specs = self.child_specs(&node.children)?;
        let key = LayoutCacheKey::new(id, rect, self.ctx.scale, container, &specs);
        let placement = match self.layout_cache.get(&key) {
            Some(hit) => hit.clone(),
            None => {
                let prev = self.coherence.allocation(id);
                let placement = container.arrange(id, rect, &specs, self.ctx, &prev)?;
                tessel_core::trace!(
                    target: LAYOUT_TARGET,
                    container = %id,
                    children = specs.len(),
                    width = rect.width,
                    height = rect.height,
                    slack_w = placement.metrics.slack.width,
                    slack_h = placement.metrics.slack.height,
                    "solved container"
                );
                #[cfg(feature = "tracing")]
                for direction in [Direction::Horizontal, Direction::Vertical] {
                    let Some(sizes) = placement.allocation.get(direction) else {
                        continue;
                    };
                    if let Some((total, max)) = self.coherence.displacement(id, direction, sizes) {
                        tessel_core::trace!(
                            target: LAYOUT_TARGET,
                            container = %id,
                            direction = %direction,
                            total,
                            max,
                            "allocation displacement"
                        );
                    }
                }
                self.coherence.store_allocation(id, &placement.allocation);
                self.layout_cache.store(key, placement.clone());
                placement
            }
        };

        self.metrics.insert(id, placement.metrics);
        for (k, &child) in node.children.iter().enumerate() {
            let child_rect = placement.rects[k];
            self.dispositions.insert(child, placement.dispositions[k]);
            if specs[k].is_visible() {
                self.arrange(child, child_rect)?;
            } else {
                self.collapse(child, child_rect);
            }
        }
        Ok(())
    }

    /// Give a hidden subtree zero extent at `at`'s origin.
    fn collapse(&mut self, id: ItemId, at: Rect) {
        let zero = Rect::new(at.x, at.y, 0, 0);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            self.rects.insert(current, zero);
            self.collapsed.insert(current);
            if current != id {
                self.dispositions.insert(current, None);
            }
            if node.item.container_spec().is_some() {
                self.metrics.insert(
                    current,
                    ContainerMetrics {
                        inner: zero,
                        ..ContainerMetrics::default()
                    },
                );
            }
            stack.extend(node.children.iter().copied());
        }
    }

    fn apply_anchors(&mut self, anchors: &AnchorSet, order: &[ItemId]) -> Result<(), LayoutError> {
        for &source in order {
            if self.collapsed.contains(&source) {
                continue;
            }
            let mut clamped: BTreeSet<&str> = BTreeSet::new();
            for anchor in anchors.anchors_of(source) {
                let Some((current, effect)) = self.pending_effect(anchor) else {
                    continue;
                };
                match effect {
                    AnchorEffect::Translate { dx, dy } => self.translate(source, dx, dy),
                    AnchorEffect::Resize { direction, extent } => {
                        let admitted = self.admit_extent(anchor, direction, extent)?;
                        if i64::from(admitted) != extent {
                            clamped.insert(anchor.name.as_str());
                        }
                        let resized = match direction {
                            Direction::Horizontal => Rect { width: admitted, ..current },
                            Direction::Vertical => Rect { height: admitted, ..current },
                        };
                        self.arrange(source, resized)?;
                    }
                }
            }

            // A later anchor on the same source may undo an earlier one.
            for anchor in anchors.anchors_of(source) {
                if clamped.contains(anchor.name.as_str()) {
                    continue;
                }
                if self.pending_effect(anchor).is_some() {
                    return Err(LayoutError::ConflictingAnchors {
                        name: anchor.name.clone(),
                        source,
                        edge: anchor.source_edge,
                    });
                }
            }
        }
        Ok(())
    }

    /// What `anchor` still asks of its source, with the source's current
    /// rect. `None` when it holds or its target is hidden.
    fn pending_effect(&self, anchor: &Anchor) -> Option<(Rect, AnchorEffect)> {
        if self.collapsed.contains(&anchor.target) {
            return None;
        }
        let current = *self.rects.get(&anchor.source)?;
        let target = *self.rects.get(&anchor.target)?;
        anchor
            .effect(current, target, self.ctx.scale)
            .map(|effect| (current, effect))
    }

    /// Check an anchored extent against the source's bounds, clamping with a
    /// warning when anchors are not strict.
    fn admit_extent(&mut self, anchor: &Anchor, direction: Direction, extent: i64) -> Result<u32, LayoutError> {
        let hint = *self.sizing(anchor.source)?.hint(direction);
        let max = i64::from(hint.max_or_unbounded());
        if extent >= i64::from(hint.min) && extent <= max {
            return Ok(extent as u32);
        }
        if self.ctx.config.strict_anchors {
            return Err(LayoutError::AnchorUnsatisfiable {
                name: anchor.name.clone(),
                source: anchor.source,
                edge: anchor.source_edge,
                required: extent,
                min: hint.min,
                max: hint.max,
            });
        }
        let clamped = extent.clamp(i64::from(hint.min), max.max(i64::from(hint.min)));
        tessel_core::warn!(
            target: LAYOUT_TARGET,
            anchor = %anchor.name,
            item = %anchor.source,
            required = extent,
            clamped,
            "anchored extent outside item bounds"
        );
        Ok(clamped as u32)
    }

    fn translate(&mut self, id: ItemId, dx: i64, dy: i64) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(rect) = self.rects.get_mut(&current) {
                rect.x = shift(rect.x, dx);
                rect.y = shift(rect.y, dy);
            }
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.children.iter().copied());
            }
        }
    }
}

#[inline]
fn shift(value: i32, delta: i64) -> i32 {
    (i64::from(value) + delta).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{AnchorEdge, AnchorRelation};
    use crate::config::LayoutConfig;
    use crate::item::SizeHint;
    use crate::{Alignment, Sides};
    use pretty_assertions::assert_eq;

    fn row(spacing: u32) -> LayoutTree {
        let mut tree = LayoutTree::new(Container::horizontal().spacing(spacing), LayoutContext::default());
        tree.set_area(Rect::from_size(100, 20));
        tree
    }

    fn widget(min: u32, preferred: u32, max: Option<u32>) -> LayoutItem {
        LayoutItem::widget(ItemSizing::new(
            SizeHint::new(min, preferred, max),
            SizeHint::new(0, 10, None),
        ))
    }

    struct Label(u32);

    impl Measure for Label {
        fn measure(&self) -> ItemSizing {
            ItemSizing::new(SizeHint::exact(self.0 * 6), SizeHint::exact(12))
        }
    }

    #[test]
    fn new_tree_has_only_root() {
        let tree = LayoutTree::new(Container::vertical(), LayoutContext::default());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), ItemId::MIN);
        assert_eq!(tree.parent(tree.root()), Ok(None));
        assert!(!tree.is_valid());
    }

    #[test]
    fn fixed_and_spacer_fill_row() {
        let mut tree = row(0);
        let root = tree.root();
        let a = tree.add_item(root, LayoutItem::fixed(30, 20)).expect("add");
        let s = tree.add_item(root, LayoutItem::spacer()).expect("add");
        let b = tree.add_item(root, LayoutItem::fixed(10, 20)).expect("add");
        assert_eq!(tree.geometry(a), Ok(Rect::new(0, 0, 30, 20)));
        assert_eq!(tree.geometry(s), Ok(Rect::new(30, 0, 60, 20)));
        assert_eq!(tree.geometry(b), Ok(Rect::new(90, 0, 10, 20)));
        assert_eq!(tree.disposition(s), Ok(Some(Disposition::Weighted)));
        assert_eq!(tree.disposition(a), Ok(Some(Disposition::Fixed)));
        assert_eq!(tree.disposition(root), Ok(None));
    }

    #[test]
    fn unweighted_items_grow_to_preferred_then_slack() {
        let mut tree = row(0);
        let root = tree.root();
        let a = tree.add_item(root, widget(10, 30, None)).expect("add");
        let b = tree.add_item(root, widget(10, 20, None)).expect("add");
        assert_eq!(tree.geometry(a).map(|r| r.width), Ok(30));
        assert_eq!(tree.geometry(b).map(|r| r.width), Ok(20));
        let metrics = tree.container_metrics(root).expect("metrics");
        assert_eq!(metrics.slack.width, 50);
        assert_eq!(metrics.content.width, 50);
        assert_eq!(tree.disposition(a), Ok(Some(Disposition::Unweighted)));
    }

    #[test]
    fn insert_item_respects_index() {
        let mut tree = row(0);
        let root = tree.root();
        let a = tree.add_item(root, LayoutItem::fixed(10, 10)).expect("add");
        let b = tree.insert_item(root, 0, LayoutItem::fixed(20, 10)).expect("insert");
        let c = tree.insert_item(root, 99, LayoutItem::fixed(5, 10)).expect("insert");
        assert_eq!(tree.children(root), Ok(&[b, a, c][..]));
        assert_eq!(tree.geometry(a).map(|r| r.x), Ok(20));
    }

    #[test]
    fn add_to_widget_is_not_a_container() {
        let mut tree = row(0);
        let w = tree.add_item(tree.root(), LayoutItem::fixed(1, 1)).expect("add");
        assert_eq!(
            tree.add_item(w, LayoutItem::spacer()),
            Err(LayoutError::NotAContainer { id: w })
        );
        assert_eq!(
            tree.set_container(w, Container::vertical()),
            Err(LayoutError::NotAContainer { id: w })
        );
    }

    #[test]
    fn invalid_sizing_is_rejected() {
        let mut tree = row(0);
        let root = tree.root();
        let bad = LayoutItem::widget(ItemSizing::new(SizeHint::new(10, 10, Some(5)), SizeHint::ZERO));
        assert!(matches!(
            tree.add_item(root, bad),
            Err(LayoutError::InvalidBounds { .. })
        ));
        let w = tree.add_item(root, LayoutItem::spacer()).expect("add");
        let negative = ItemSizing::default().with_weight(Weight::uniform(-1.0));
        assert!(matches!(
            tree.set_sizing(w, negative),
            Err(LayoutError::InvalidWeight { item: Some(_), .. })
        ));
    }

    #[test]
    fn widgets_measure_themselves() {
        let mut tree = row(2);
        let root = tree.root();
        let a = tree.add_widget(root, &Label(3)).expect("add");
        let b = tree.add_widget(root, &Label(2)).expect("add");
        assert_eq!(tree.geometry(b), Ok(Rect::new(20, 0, 12, 12)));
        tree.remeasure(a, &Label(4)).expect("remeasure");
        assert!(!tree.is_valid());
        assert_eq!(tree.geometry(b).map(|r| r.x), Ok(26));
    }

    #[test]
    fn hidden_items_collapse_and_skip_spacing() {
        let mut tree = row(5);
        let root = tree.root();
        let a = tree.add_item(root, LayoutItem::fixed(10, 10)).expect("add");
        let group = tree.add_container(root, Container::vertical()).expect("add");
        let inner = tree.add_item(group, LayoutItem::fixed(10, 10)).expect("add");
        let b = tree.add_item(root, LayoutItem::fixed(10, 10)).expect("add");
        assert_eq!(tree.geometry(b).map(|r| r.x), Ok(30));

        tree.set_visible(group, false).expect("hide");
        assert_eq!(tree.geometry(b).map(|r| r.x), Ok(15));
        assert_eq!(tree.geometry(group).map(|r| r.size().is_empty()), Ok(true));
        assert_eq!(tree.geometry(inner).map(|r| r.width), Ok(0));
        assert_eq!(tree.disposition(group), Ok(None));
        assert_eq!(tree.disposition(inner), Ok(None));
        assert_eq!(tree.geometry(a).map(|r| r.x), Ok(0));
    }

    #[test]
    fn nested_container_is_laid_out_recursively() {
        let mut tree = LayoutTree::new(Container::vertical(), LayoutContext::default());
        tree.set_area(Rect::from_size(60, 40));
        let root = tree.root();
        let header = tree.add_item(root, LayoutItem::fixed(60, 10)).expect("add");
        let body = tree
            .add_item(
                root,
                LayoutItem::container(Container::horizontal().margin(Sides::all(2)))
                    .with_weight(Weight::uniform(1.0)),
            )
            .expect("add");
        let left = tree.add_item(body, LayoutItem::fixed(10, 5)).expect("add");
        let right = tree.add_item(body, LayoutItem::spacer()).expect("add");

        assert_eq!(tree.geometry(header), Ok(Rect::new(0, 0, 60, 10)));
        assert_eq!(tree.geometry(body), Ok(Rect::new(0, 10, 60, 30)));
        assert_eq!(tree.geometry(left), Ok(Rect::new(2, 12, 10, 5)));
        assert_eq!(tree.geometry(right), Ok(Rect::new(12, 12, 46, 26)));
    }

    #[test]
    fn unsatisfiable_keeps_previous_geometry() {
        let mut tree = row(0);
        let root = tree.root();
        let a = tree.add_item(root, widget(60, 60, None)).expect("add");
        assert_eq!(tree.geometry(a).map(|r| r.width), Ok(60));
        tree.drain_changes();

        let b = tree.add_item(root, widget(50, 50, None)).expect("add");
        let err = tree.validate().unwrap_err();
        assert_eq!(
            err,
            LayoutError::Unsatisfiable {
                container: root,
                direction: Direction::Horizontal,
                required: 110,
                available: 100,
            }
        );
        assert!(!tree.is_valid());
        assert_eq!(tree.cached_geometry(a), Some(Rect::new(0, 0, 60, 20)));
        assert_eq!(tree.cached_geometry(b), None);
        assert!(tree.drain_changes().is_empty());

        tree.set_area(Rect::from_size(120, 20));
        assert_eq!(tree.geometry(b).map(|r| r.x), Ok(60));
    }

    #[test]
    fn validate_twice_is_stable_and_quiet() {
        let mut tree = row(3);
        let root = tree.root();
        for weight in [1.0, 2.0, 3.0] {
            tree.add_item(root, LayoutItem::spacer().with_weight(Weight::uniform(weight)))
                .expect("add");
        }
        tree.validate().expect("validate");
        let first: Vec<Rect> = tree
            .children(root)
            .expect("children")
            .to_vec()
            .into_iter()
            .map(|id| tree.cached_geometry(id).expect("resolved"))
            .collect();
        assert_eq!(tree.drain_changes().len(), 4);

        tree.invalidate(root).expect("invalidate");
        tree.validate().expect("validate");
        let second: Vec<Rect> = tree
            .children(root)
            .expect("children")
            .to_vec()
            .into_iter()
            .map(|id| tree.cached_geometry(id).expect("resolved"))
            .collect();
        assert_eq!(first, second);
        assert!(tree.drain_changes().is_empty());
    }

    #[test]
    fn changes_report_old_and_new() {
        let mut tree = row(0);
        let root = tree.root();
        let s = tree.add_item(root, LayoutItem::spacer()).expect("add");
        tree.validate().expect("validate");
        tree.drain_changes();
        tree.set_area(Rect::from_size(50, 20));
        tree.validate().expect("validate");
        let changes = tree.drain_changes();
        assert!(changes.contains(&GeometryChange {
            id: s,
            old: Some(Rect::new(0, 0, 100, 20)),
            new: Rect::new(0, 0, 50, 20),
        }));
    }

    #[test]
    fn remove_drops_subtree_and_anchors() {
        let mut tree = row(0);
        let root = tree.root();
        let group = tree.add_container(root, Container::vertical()).expect("add");
        let inner = tree.add_item(group, LayoutItem::fixed(5, 5)).expect("add");
        let other = tree.add_item(root, LayoutItem::fixed(5, 5)).expect("add");
        tree.add_anchor(Anchor::new("follow", other, AnchorEdge::Top, inner, AnchorEdge::Bottom))
            .expect("anchor");

        let removed = tree.remove(group).expect("remove");
        assert_eq!(removed, vec![group, inner]);
        assert!(!tree.contains(inner));
        assert!(tree.anchor(other, "follow").is_none());
        assert_eq!(tree.children(root), Ok(&[other][..]));
        assert_eq!(tree.remove(root), Err(LayoutError::RootRemoval));
        assert_eq!(tree.remove(inner), Err(LayoutError::UnknownItem { id: inner }));
    }

    #[test]
    fn anchor_moves_item_and_subtree() {
        let mut tree = LayoutTree::new(Container::vertical(), LayoutContext::default());
        tree.set_area(Rect::from_size(100, 100));
        let root = tree.root();
        let target = tree.add_item(root, LayoutItem::fixed(40, 10)).expect("add");
        let group = tree
            .add_item(
                root,
                LayoutItem::container(Container::vertical()).with_flags(ItemFlags::FIXED, false),
            )
            .expect("add");
        let leaf = tree.add_item(group, LayoutItem::fixed(10, 10)).expect("add");
        tree.set_container(root, Container::vertical().cross_alignment(crate::CrossAlignment::Start))
            .expect("set");

        let before = tree.geometry(leaf).expect("geometry");
        tree.add_anchor(
            Anchor::new("beside", group, AnchorEdge::Left, target, AnchorEdge::Right).with_offset(5),
        )
        .expect("anchor");
        let group_rect = tree.geometry(group).expect("geometry");
        assert_eq!(group_rect.x, 45);
        let after = tree.geometry(leaf).expect("geometry");
        assert_eq!(after.x, before.x + 45);
        assert_eq!(after.y, before.y);
        let bbox = tree.bounding_box(root).expect("bbox");
        assert!(bbox.contains_rect(&after));
    }

    #[test]
    fn size_anchor_resizes_within_bounds() {
        let mut tree = row(0);
        let root = tree.root();
        let a = tree.add_item(root, widget(0, 30, None)).expect("add");
        let b = tree.add_item(root, widget(0, 10, Some(50))).expect("add");
        tree.add_anchor(
            Anchor::new("same", b, AnchorEdge::Width, a, AnchorEdge::Width)
                .with_relation(AnchorRelation::AtLeast),
        )
        .expect("anchor");
        assert_eq!(tree.geometry(b).map(|r| r.width), Ok(30));
    }

    #[test]
    fn size_anchor_outside_bounds_is_an_error_when_strict() {
        let mut tree = row(0);
        let root = tree.root();
        let a = tree.add_item(root, widget(0, 30, None)).expect("add");
        let b = tree.add_item(root, widget(0, 10, Some(20))).expect("add");
        tree.add_anchor(Anchor::new("same", b, AnchorEdge::Width, a, AnchorEdge::Width))
            .expect("anchor");
        assert_eq!(
            tree.validate(),
            Err(LayoutError::AnchorUnsatisfiable {
                name: "same".into(),
                source: b,
                edge: AnchorEdge::Width,
                required: 30,
                min: 0,
                max: Some(20),
            })
        );

        tree.set_context(
            LayoutContext::default().with_config(LayoutConfig::default().with_strict_anchors(false)),
        );
        assert_eq!(tree.geometry(b).map(|r| r.width), Ok(20));
    }

    #[test]
    fn cyclic_anchors_fail_validation() {
        let mut tree = row(0);
        let root = tree.root();
        let a = tree.add_item(root, LayoutItem::fixed(10, 10)).expect("add");
        let b = tree.add_item(root, LayoutItem::fixed(10, 10)).expect("add");
        tree.add_anchor(Anchor::new("ab", a, AnchorEdge::Left, b, AnchorEdge::Right))
            .expect("anchor");
        tree.add_anchor(Anchor::new("ba", b, AnchorEdge::Left, a, AnchorEdge::Right))
            .expect("anchor");
        assert_eq!(
            tree.validate(),
            Err(LayoutError::CyclicAnchors {
                names: vec!["ab".into(), "ba".into()],
            })
        );
        assert!(tree.remove_anchor(b, "ba").is_some());
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn anchor_to_unknown_item_is_rejected() {
        let mut tree = row(0);
        let a = tree.add_item(tree.root(), LayoutItem::fixed(1, 1)).expect("add");
        let ghost = ItemId::new(999).expect("non-zero");
        assert_eq!(
            tree.add_anchor(Anchor::new("x", a, AnchorEdge::Left, ghost, AnchorEdge::Left)),
            Err(LayoutError::UnknownItem { id: ghost })
        );
    }

    #[test]
    fn scale_factor_converts_logical_sizing() {
        let mut tree = LayoutTree::new(
            Container::horizontal().spacing(2),
            LayoutContext::with_scale_factor(2.0).expect("valid scale"),
        );
        tree.set_area(Rect::from_size(200, 40));
        let root = tree.root();
        let a = tree.add_item(root, LayoutItem::fixed(10, 10)).expect("add");
        let b = tree.add_item(root, LayoutItem::fixed(10, 10)).expect("add");
        assert_eq!(tree.geometry(a), Ok(Rect::new(0, 0, 20, 20)));
        assert_eq!(tree.geometry(b), Ok(Rect::new(24, 0, 20, 20)));
    }

    #[test]
    fn layout_cache_hits_on_revalidation() {
        let mut tree = row(0);
        let root = tree.root();
        let group = tree.add_container(root, Container::vertical()).expect("add");
        tree.add_item(group, LayoutItem::spacer()).expect("add");
        let other = tree.add_item(root, LayoutItem::spacer()).expect("add");
        tree.validate().expect("validate");
        let misses = tree.cache_stats().misses;

        // Touching a sibling re-solves the root but not the untouched group.
        tree.set_fixed(other, false).expect("noop");
        assert!(tree.is_valid());
        tree.set_sizing(other, ItemSizing::default().with_weight(Weight::uniform(2.0)))
            .expect("resize");
        tree.validate().expect("validate");
        let stats = tree.cache_stats();
        assert_eq!(stats.misses, misses + 2);
        assert!(stats.invalidations >= 1);

        // The group got a new width, so it missed; nothing changes now.
        tree.invalidate(other).expect("invalidate");
        tree.validate().expect("validate");
        assert_eq!(tree.cache_stats().hits, stats.hits + 1);

        tree.reset_cache_stats();
        let cleared = tree.cache_stats();
        assert_eq!((cleared.hits, cleared.misses, cleared.invalidations), (0, 0, 0));
        assert_eq!(cleared.entries, 2);
    }

    #[test]
    fn resolved_extent_clears_on_invalidation() {
        let mut tree = row(0);
        let root = tree.root();
        let a = tree.add_item(root, LayoutItem::fixed(30, 10)).expect("add");
        let b = tree.add_item(root, LayoutItem::spacer()).expect("add");
        assert_eq!(tree.resolved_extent(a), None);

        tree.validate().expect("validate");
        assert_eq!(tree.resolved_extent(a), Some(Size::new(30, 10)));
        assert_eq!(tree.resolved_extent(b), Some(Size::new(70, 20)));

        tree.invalidate(b).expect("invalidate");
        assert_eq!(tree.resolved_extent(b), None);
        assert_eq!(tree.cached_geometry(b), Some(Rect::new(30, 0, 70, 20)));
        tree.set_area(Rect::from_size(80, 20));
        tree.validate().expect("validate");
        assert_eq!(tree.resolved_extent(b), Some(Size::new(50, 20)));
    }

    #[test]
    fn alignment_center_offsets_content() {
        let mut tree = LayoutTree::new(
            Container::horizontal().alignment(Alignment::Center),
            LayoutContext::default(),
        );
        tree.set_area(Rect::from_size(100, 10));
        let a = tree.add_item(tree.root(), LayoutItem::fixed(20, 10)).expect("add");
        assert_eq!(tree.geometry(a).map(|r| r.x), Ok(40));
    }
}
