//! Layout items: identity, per-axis size hints, weights and flags.
//!
//! Sizing is authored in logical units and converted to device pixels with
//! [`ItemSizing::scaled`] at resolution time.

use std::fmt;

use bitflags::bitflags;
use tessel_core::scale::ScaleFactor;

use crate::Direction;
use crate::container::Container;
use crate::error::LayoutError;

/// Stable identifier for layout items.
///
/// `0` is reserved/invalid so IDs are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ItemId(u64);

impl ItemId {
    /// Lowest valid item ID.
    pub const MIN: Self = Self(1);

    /// Create a new item ID, rejecting 0.
    pub fn new(raw: u64) -> Result<Self, LayoutError> {
        if raw == 0 {
            return Err(LayoutError::ZeroItemId);
        }
        Ok(Self(raw))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next ID, or an error on overflow.
    pub fn checked_next(self) -> Result<Self, LayoutError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(LayoutError::ItemIdOverflow { current: self });
        };
        Self::new(next)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic ID source for one layout tree.
#[derive(Debug, Clone)]
pub struct ItemIdAllocator {
    next: ItemId,
}

impl ItemIdAllocator {
    /// Start allocating at [`ItemId::MIN`].
    #[must_use]
    pub fn new() -> Self {
        Self { next: ItemId::MIN }
    }

    /// Start allocating at `next`.
    #[must_use]
    pub const fn with_next(next: ItemId) -> Self {
        Self { next }
    }

    /// Hand out the next ID.
    pub fn allocate(&mut self) -> Result<ItemId, LayoutError> {
        let current = self.next;
        self.next = current.checked_next()?;
        Ok(current)
    }
}

impl Default for ItemIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Size constraints along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SizeHint {
    /// Smallest acceptable extent.
    pub min: u32,
    /// Extent the item asks for when space allows.
    pub preferred: u32,
    /// Largest acceptable extent (`None` = unbounded).
    pub max: Option<u32>,
}

impl SizeHint {
    /// No minimum, no preference, unbounded.
    pub const ZERO: Self = Self {
        min: 0,
        preferred: 0,
        max: None,
    };

    /// Create a hint with explicit bounds.
    #[inline]
    pub const fn new(min: u32, preferred: u32, max: Option<u32>) -> Self {
        Self {
            min,
            preferred,
            max,
        }
    }

    /// min = preferred = max.
    #[inline]
    pub const fn exact(size: u32) -> Self {
        Self::new(size, size, Some(size))
    }

    /// Minimum and preferred extent, unbounded max.
    #[inline]
    pub const fn at_least(min: u32, preferred: u32) -> Self {
        Self::new(min, preferred, None)
    }

    /// Upper bound, `u32::MAX` when unbounded.
    #[inline]
    pub fn max_or_unbounded(&self) -> u32 {
        self.max.unwrap_or(u32::MAX)
    }

    /// Clamp a value to this hint's bounds.
    #[inline]
    pub fn clamp(&self, value: u32) -> u32 {
        value.max(self.min).min(self.max_or_unbounded().max(self.min))
    }

    /// Whether `value` lies within `[min, max]`.
    #[inline]
    pub fn admits(&self, value: u32) -> bool {
        value >= self.min && value <= self.max_or_unbounded()
    }

    /// Preferred extent pulled into `[min, max]`.
    #[inline]
    pub fn clamped_preferred(&self) -> u32 {
        self.clamp(self.preferred)
    }

    /// Convert logical units to device pixels.
    #[must_use]
    pub fn scaled(self, scale: ScaleFactor) -> Self {
        Self {
            min: scale.apply(self.min),
            preferred: scale.apply(self.preferred),
            max: scale.apply_max(self.max),
        }
    }

    fn validate(&self, item: Option<ItemId>, direction: Direction) -> Result<(), LayoutError> {
        if let Some(max) = self.max
            && max < self.min
        {
            return Err(LayoutError::InvalidBounds {
                item,
                direction,
                min: self.min,
                max,
            });
        }
        Ok(())
    }
}

/// Share of surplus space per axis. `0` means the item does not grow past
/// its preferred extent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Weight {
    pub horizontal: f32,
    pub vertical: f32,
}

impl Weight {
    /// Unweighted on both axes.
    pub const NONE: Self = Self::new(0.0, 0.0);

    pub const fn new(horizontal: f32, vertical: f32) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// Same weight on both axes.
    pub const fn uniform(weight: f32) -> Self {
        Self::new(weight, weight)
    }

    #[inline]
    pub const fn get(&self, direction: Direction) -> f32 {
        match direction {
            Direction::Horizontal => self.horizontal,
            Direction::Vertical => self.vertical,
        }
    }

    /// Component-wise maximum.
    #[must_use]
    pub fn max(self, other: Weight) -> Weight {
        Weight::new(
            self.horizontal.max(other.horizontal),
            self.vertical.max(other.vertical),
        )
    }
}

/// Complete sizing of an item: a hint per axis plus its weight.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemSizing {
    pub width: SizeHint,
    pub height: SizeHint,
    pub weight: Weight,
}

impl ItemSizing {
    /// Unweighted sizing from two hints.
    pub const fn new(width: SizeHint, height: SizeHint) -> Self {
        Self {
            width,
            height,
            weight: Weight::NONE,
        }
    }

    /// Exactly `width` x `height`.
    pub const fn exact(width: u32, height: u32) -> Self {
        Self::new(SizeHint::exact(width), SizeHint::exact(height))
    }

    /// Set the weight.
    #[must_use]
    pub const fn with_weight(mut self, weight: Weight) -> Self {
        self.weight = weight;
        self
    }

    /// Hint along `direction`.
    #[inline]
    pub const fn hint(&self, direction: Direction) -> &SizeHint {
        match direction {
            Direction::Horizontal => &self.width,
            Direction::Vertical => &self.height,
        }
    }

    /// Convert logical units to device pixels. Weights are unitless.
    #[must_use]
    pub fn scaled(self, scale: ScaleFactor) -> Self {
        Self {
            width: self.width.scaled(scale),
            height: self.height.scaled(scale),
            weight: self.weight,
        }
    }

    /// Reject `max < min` and negative or non-finite weights.
    pub fn validate(&self, item: Option<ItemId>) -> Result<(), LayoutError> {
        for direction in [Direction::Horizontal, Direction::Vertical] {
            self.hint(direction).validate(item, direction)?;
            let weight = self.weight.get(direction);
            if !weight.is_finite() || weight < 0.0 {
                return Err(LayoutError::InvalidWeight {
                    item,
                    direction,
                    weight,
                });
            }
        }
        Ok(())
    }
}

/// Widget geometry query.
///
/// Widgets implement this to report their sizing in logical units; the tree
/// snapshots it on [`add_widget`](crate::LayoutTree::add_widget) and
/// [`remeasure`](crate::LayoutTree::remeasure).
pub trait Measure {
    fn measure(&self) -> ItemSizing;
}

impl Measure for ItemSizing {
    fn measure(&self) -> ItemSizing {
        *self
    }
}

bitflags! {
    /// Per-item layout flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ItemFlags: u8 {
        /// Participates in layout. Hidden items get zero extent and no spacing.
        const VISIBLE = 1 << 0;
        /// Horizontal extent is pinned to the preferred width.
        const FIXED_WIDTH = 1 << 1;
        /// Vertical extent is pinned to the preferred height.
        const FIXED_HEIGHT = 1 << 2;
        const FIXED = Self::FIXED_WIDTH.bits() | Self::FIXED_HEIGHT.bits();
    }
}

impl Default for ItemFlags {
    fn default() -> Self {
        Self::VISIBLE
    }
}

impl ItemFlags {
    /// Fixed flag for `direction`.
    #[inline]
    pub const fn fixed_along(direction: Direction) -> Self {
        match direction {
            Direction::Horizontal => Self::FIXED_WIDTH,
            Direction::Vertical => Self::FIXED_HEIGHT,
        }
    }
}

/// What an item is.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    Widget,
    Spacer,
    /// A nested container; its sizing is aggregated from its children.
    Container(Container),
}

/// A sizable, positionable node in a layout tree.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutItem {
    pub kind: ItemKind,
    pub sizing: ItemSizing,
    pub flags: ItemFlags,
}

impl LayoutItem {
    /// A widget with the given sizing.
    pub fn widget(sizing: ItemSizing) -> Self {
        Self {
            kind: ItemKind::Widget,
            sizing,
            flags: ItemFlags::default(),
        }
    }

    /// An expanding spacer: no minimum, weight 1 on both axes.
    pub fn spacer() -> Self {
        Self {
            kind: ItemKind::Spacer,
            sizing: ItemSizing::new(SizeHint::ZERO, SizeHint::ZERO).with_weight(Weight::uniform(1.0)),
            flags: ItemFlags::default(),
        }
    }

    /// A spacer pinned to `width` x `height`.
    pub fn fixed_spacer(width: u32, height: u32) -> Self {
        Self {
            kind: ItemKind::Spacer,
            sizing: ItemSizing::exact(width, height),
            flags: ItemFlags::default() | ItemFlags::FIXED,
        }
    }

    /// A fixed-size widget: the solver gives it `width` x `height` first.
    pub fn fixed(width: u32, height: u32) -> Self {
        Self {
            kind: ItemKind::Widget,
            sizing: ItemSizing::exact(width, height),
            flags: ItemFlags::default() | ItemFlags::FIXED,
        }
    }

    /// A nested container. Weight applies on top of the aggregated sizing.
    pub fn container(container: Container) -> Self {
        Self {
            kind: ItemKind::Container(container),
            sizing: ItemSizing::default(),
            flags: ItemFlags::default(),
        }
    }

    /// Set the weight.
    #[must_use]
    pub fn with_weight(mut self, weight: Weight) -> Self {
        self.sizing.weight = weight;
        self
    }

    /// Set or clear flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ItemFlags, enabled: bool) -> Self {
        self.flags.set(flags, enabled);
        self
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.flags.contains(ItemFlags::VISIBLE)
    }

    #[inline]
    pub fn is_fixed(&self, direction: Direction) -> bool {
        self.flags.contains(ItemFlags::fixed_along(direction))
    }

    #[inline]
    pub fn container_spec(&self) -> Option<&Container> {
        match &self.kind {
            ItemKind::Container(container) => Some(container),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_rejects_zero() {
        assert_eq!(ItemId::new(0), Err(LayoutError::ZeroItemId));
        assert_eq!(ItemId::new(7).map(ItemId::get), Ok(7));
    }

    #[test]
    fn item_id_overflow_is_reported() {
        let last = ItemId::new(u64::MAX).expect("non-zero");
        assert_eq!(
            last.checked_next(),
            Err(LayoutError::ItemIdOverflow { current: last })
        );
    }

    #[test]
    fn allocator_is_monotonic() {
        let mut ids = ItemIdAllocator::new();
        let a = ids.allocate().expect("alloc");
        let b = ids.allocate().expect("alloc");
        assert_eq!(a, ItemId::MIN);
        assert!(b > a);
    }

    #[test]
    fn hint_clamp() {
        let hint = SizeHint::new(5, 15, Some(20));
        assert_eq!(hint.clamp(10), 10);
        assert_eq!(hint.clamp(3), 5);
        assert_eq!(hint.clamp(30), 20);
        assert!(hint.admits(20));
        assert!(!hint.admits(21));
    }

    #[test]
    fn preferred_outside_bounds_is_pulled_in() {
        assert_eq!(SizeHint::new(10, 2, None).clamped_preferred(), 10);
        assert_eq!(SizeHint::new(0, 50, Some(30)).clamped_preferred(), 30);
    }

    #[test]
    fn scaled_hint_keeps_unbounded() {
        let scale = ScaleFactor::new(2.0).expect("valid");
        let hint = SizeHint::at_least(3, 4).scaled(scale);
        assert_eq!(hint, SizeHint::at_least(6, 8));
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        let sizing = ItemSizing::new(SizeHint::ZERO, SizeHint::new(10, 10, Some(4)));
        assert_eq!(
            sizing.validate(None),
            Err(LayoutError::InvalidBounds {
                item: None,
                direction: Direction::Vertical,
                min: 10,
                max: 4,
            })
        );
    }

    #[test]
    fn validate_rejects_bad_weights() {
        let negative = ItemSizing::default().with_weight(Weight::new(-1.0, 0.0));
        assert!(matches!(
            negative.validate(None),
            Err(LayoutError::InvalidWeight {
                direction: Direction::Horizontal,
                ..
            })
        ));
        let nan = ItemSizing::default().with_weight(Weight::new(0.0, f32::NAN));
        assert!(nan.validate(None).is_err());
    }

    #[test]
    fn constructors_set_flags() {
        assert!(LayoutItem::spacer().is_visible());
        assert!(!LayoutItem::spacer().is_fixed(Direction::Horizontal));
        let fixed = LayoutItem::fixed(4, 5);
        assert!(fixed.is_fixed(Direction::Horizontal));
        assert!(fixed.is_fixed(Direction::Vertical));
        let hidden = LayoutItem::spacer().with_flags(ItemFlags::VISIBLE, false);
        assert!(!hidden.is_visible());
    }

    #[test]
    fn sizing_is_its_own_measure() {
        let sizing = ItemSizing::exact(3, 4);
        assert_eq!(sizing.measure(), sizing);
    }
}
