//! Layout errors.
//!
//! Every malformed constraint surfaces here at resolution time. Nothing is
//! repaired automatically; the tree keeps its previous geometry and stays
//! invalid until the caller fixes the input.

use std::fmt;

use tessel_core::scale::ScaleFactorError;

use crate::Direction;
use crate::anchor::AnchorEdge;
use crate::item::ItemId;

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    ZeroItemId,
    ItemIdOverflow {
        current: ItemId,
    },
    UnknownItem {
        id: ItemId,
    },
    NotAContainer {
        id: ItemId,
    },
    RootRemoval,
    InvalidBounds {
        item: Option<ItemId>,
        direction: Direction,
        min: u32,
        max: u32,
    },
    InvalidWeight {
        item: Option<ItemId>,
        direction: Direction,
        weight: f32,
    },
    InvalidScale {
        factor: f32,
    },
    Unsatisfiable {
        container: ItemId,
        direction: Direction,
        required: u64,
        available: u32,
    },
    CyclicAnchors {
        names: Vec<String>,
    },
    DuplicateAnchor {
        source: ItemId,
        name: String,
    },
    IncompatibleEdges {
        name: String,
        source_edge: AnchorEdge,
        target_edge: AnchorEdge,
    },
    AnchorUnsatisfiable {
        name: String,
        source: ItemId,
        edge: AnchorEdge,
        required: i64,
        min: u32,
        max: Option<u32>,
    },
    ConflictingAnchors {
        name: String,
        source: ItemId,
        edge: AnchorEdge,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroItemId => write!(f, "layout item id 0 is invalid"),
            Self::ItemIdOverflow { current } => {
                write!(f, "layout item id allocator overflowed after {current}")
            }
            Self::UnknownItem { id } => write!(f, "layout item {id} not found"),
            Self::NotAContainer { id } => write!(f, "layout item {id} is not a container"),
            Self::RootRemoval => write!(f, "the root container cannot be removed"),
            Self::InvalidBounds {
                item,
                direction,
                min,
                max,
            } => {
                write!(f, "{direction} maximum {max} is below minimum {min}")?;
                if let Some(item) = item {
                    write!(f, " on item {item}")?;
                }
                Ok(())
            }
            Self::InvalidWeight {
                item,
                direction,
                weight,
            } => {
                write!(
                    f,
                    "{direction} weight {weight} must be finite and non-negative"
                )?;
                if let Some(item) = item {
                    write!(f, " on item {item}")?;
                }
                Ok(())
            }
            Self::InvalidScale { factor } => {
                write!(f, "invalid scale factor {factor} (must be finite and > 0)")
            }
            Self::Unsatisfiable {
                container,
                direction,
                required,
                available,
            } => write!(
                f,
                "container {container} needs {required}px {direction} but only {available}px are available"
            ),
            Self::CyclicAnchors { names } => {
                write!(f, "anchors form a cycle: {}", names.join(", "))
            }
            Self::DuplicateAnchor { source, name } => {
                write!(f, "item {source} already has an anchor named {name:?}")
            }
            Self::IncompatibleEdges {
                name,
                source_edge,
                target_edge,
            } => write!(
                f,
                "anchor {name:?} binds {source_edge} to incompatible edge {target_edge}"
            ),
            Self::AnchorUnsatisfiable {
                name,
                source,
                edge,
                required,
                min,
                max,
            } => {
                write!(
                    f,
                    "anchor {name:?} requires {edge} {required} on item {source}, outside [{min}, "
                )?;
                match max {
                    Some(max) => write!(f, "{max}]"),
                    None => write!(f, "unbounded]"),
                }
            }
            Self::ConflictingAnchors { name, source, edge } => write!(
                f,
                "anchor {name:?} on item {source} no longer holds its {edge} after the item's other anchors"
            ),
        }
    }
}

impl std::error::Error for LayoutError {}

impl From<ScaleFactorError> for LayoutError {
    fn from(err: ScaleFactorError) -> Self {
        Self::InvalidScale { factor: err.factor }
    }
}
