#![forbid(unsafe_code)]

//! Weighted constraint layout.
//!
//! - [`LayoutItem`] - a widget, spacer, or nested container with per-axis
//!   [`SizeHint`]s, a [`Weight`], visibility and fixed-size flags
//! - [`Container`] - linear (row/column) or grid arrangement of items
//! - [`solve_tracks`] - 1D distribution with min/max relaxation
//! - [`Anchor`] - named edge constraints applied after base layout
//! - [`cache`] - disposition memo, per-container solve cache, coherence store
//! - [`LayoutTree`] - arena that owns items and resolves lazily
//!
//! # Example
//!
//! ```
//! use tessel_layout::{
//!     Container, ItemSizing, LayoutContext, LayoutItem, LayoutTree, Rect, SizeHint,
//! };
//!
//! let mut tree = LayoutTree::new(Container::horizontal().spacing(4), LayoutContext::default());
//! let root = tree.root();
//! let label = tree
//!     .add_item(root, LayoutItem::widget(ItemSizing::new(SizeHint::exact(40), SizeHint::exact(20))))
//!     .unwrap();
//! let field = tree.add_item(root, LayoutItem::spacer()).unwrap();
//!
//! tree.set_area(Rect::from_size(200, 20));
//! assert_eq!(tree.geometry(label).unwrap(), Rect::new(0, 0, 40, 20));
//! assert_eq!(tree.geometry(field).unwrap(), Rect::new(44, 0, 156, 20));
//! ```

pub mod anchor;
pub mod cache;
pub mod config;
pub mod container;
pub mod error;
pub mod item;
#[cfg(feature = "serde")]
pub mod snapshot;
pub mod solver;
pub mod tree;

pub use anchor::{Anchor, AnchorEdge, AnchorEffect, AnchorRelation, AnchorSet};
pub use cache::{
    CoherenceCache, DispositionCache, DispositionEntry, LayoutCache, LayoutCacheKey,
    LayoutCacheStats,
};
pub use config::{LayoutConfig, LayoutContext};
pub use container::{Allocation, Arrangement, ChildSpec, Container, ContainerMetrics, Placement};
pub use error::LayoutError;
pub use item::{
    ItemFlags, ItemId, ItemIdAllocator, ItemKind, ItemSizing, LayoutItem, Measure, SizeHint,
    Weight,
};
#[cfg(feature = "serde")]
pub use snapshot::{LAYOUT_SNAPSHOT_VERSION, LayoutSnapshot, NodeKind, NodeSnapshot};
pub use solver::{Disposition, Shortfall, Track, TrackSolution, round_layout_stable, solve_tracks};
pub use tessel_core::geometry::{Point, Rect, Sides, Size};
pub use tessel_core::scale::ScaleFactor;
pub use tree::{GeometryChange, LayoutTree};

/// The axis along which a container lays out its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Top to bottom.
    #[default]
    Vertical,
    /// Left to right.
    Horizontal,
}

impl Direction {
    /// The perpendicular direction.
    #[must_use]
    pub const fn cross(self) -> Self {
        match self {
            Direction::Vertical => Direction::Horizontal,
            Direction::Horizontal => Direction::Vertical,
        }
    }

    /// Extent of `size` along this direction.
    #[inline]
    pub const fn extent(self, size: Size) -> u32 {
        match self {
            Direction::Horizontal => size.width,
            Direction::Vertical => size.height,
        }
    }

    /// Start coordinate of `rect` along this direction.
    #[inline]
    pub const fn start(self, rect: Rect) -> i32 {
        match self {
            Direction::Horizontal => rect.x,
            Direction::Vertical => rect.y,
        }
    }

    /// Lowercase name, used in error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Direction::Horizontal => "horizontal",
            Direction::Vertical => "vertical",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Placement of the main-axis slack no item could absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Alignment {
    /// Items packed at the start (left/top).
    #[default]
    Start,
    /// Items centered; odd slack leaves the extra pixel at the end.
    Center,
    /// Items packed at the end (right/bottom).
    End,
}

impl Alignment {
    /// Leading offset for a given slack.
    #[inline]
    pub const fn offset(self, slack: u32) -> u32 {
        match self {
            Alignment::Start => 0,
            Alignment::Center => slack / 2,
            Alignment::End => slack,
        }
    }
}

/// Placement of items across the layout axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CrossAlignment {
    /// Fill the cross extent, clamped to the item's bounds.
    #[default]
    Stretch,
    /// Preferred extent, aligned to the start.
    Start,
    /// Preferred extent, centered.
    Center,
    /// Preferred extent, aligned to the end.
    End,
}

impl CrossAlignment {
    /// Leading offset for an item of `extent` in a cell of `available`.
    #[inline]
    pub const fn offset(self, available: u32, extent: u32) -> u32 {
        let free = available.saturating_sub(extent);
        match self {
            CrossAlignment::Stretch | CrossAlignment::Start => 0,
            CrossAlignment::Center => free / 2,
            CrossAlignment::End => free,
        }
    }
}
