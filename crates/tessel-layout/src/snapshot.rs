//! Serializable view of a resolved layout.
//!
//! Renderers and tests consume [`LayoutSnapshot`] as JSON; the geometry
//! hash gives a cheap determinism check across runs.

use serde::{Deserialize, Serialize};
use tessel_core::geometry::Rect;

use crate::anchor::Anchor;
use crate::error::LayoutError;
use crate::item::{ItemId, ItemKind};
use crate::solver::Disposition;
use crate::tree::LayoutTree;

pub const LAYOUT_SNAPSHOT_VERSION: u16 = 1;

fn default_version() -> u16 {
    LAYOUT_SNAPSHOT_VERSION
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Widget,
    Spacer,
    Container,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: ItemId,
    #[serde(default)]
    pub parent: Option<ItemId>,
    pub kind: NodeKind,
    pub visible: bool,
    pub rect: Rect,
    #[serde(default)]
    pub disposition: Option<Disposition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    #[serde(default = "default_version")]
    pub version: u16,
    pub area: Rect,
    pub scale: f32,
    /// Sorted by id.
    pub nodes: Vec<NodeSnapshot>,
    #[serde(default)]
    pub anchors: Vec<Anchor>,
}

impl LayoutSnapshot {
    pub fn node(&self, id: ItemId) -> Option<&NodeSnapshot> {
        self.nodes
            .binary_search_by_key(&id, |node| node.id)
            .ok()
            .map(|index| &self.nodes[index])
    }

    /// FNV-1a over ids, parents, and resolved rectangles.
    #[must_use]
    pub fn geometry_hash(&self) -> u64 {
        const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0001_0000_01b3;

        fn mix_bytes(hash: &mut u64, bytes: &[u8]) {
            for byte in bytes {
                *hash ^= u64::from(*byte);
                *hash = hash.wrapping_mul(PRIME);
            }
        }

        fn mix_rect(hash: &mut u64, rect: Rect) {
            mix_bytes(hash, &rect.x.to_le_bytes());
            mix_bytes(hash, &rect.y.to_le_bytes());
            mix_bytes(hash, &rect.width.to_le_bytes());
            mix_bytes(hash, &rect.height.to_le_bytes());
        }

        let mut hash = OFFSET_BASIS;
        mix_rect(&mut hash, self.area);
        mix_bytes(&mut hash, &(self.nodes.len() as u64).to_le_bytes());
        for node in &self.nodes {
            mix_bytes(&mut hash, &node.id.get().to_le_bytes());
            mix_bytes(
                &mut hash,
                &node.parent.map_or(0, ItemId::get).to_le_bytes(),
            );
            mix_rect(&mut hash, node.rect);
        }
        hash
    }
}

impl LayoutTree {
    /// Validate, then capture every item's resolved geometry.
    pub fn snapshot(&mut self) -> Result<LayoutSnapshot, LayoutError> {
        self.validate()?;
        let mut nodes = Vec::with_capacity(self.len());
        let ids: Vec<ItemId> = self.items().map(|(id, _)| id).collect();
        for id in ids {
            let Some(item) = self.item(id) else {
                continue;
            };
            let kind = match item.kind {
                ItemKind::Widget => NodeKind::Widget,
                ItemKind::Spacer => NodeKind::Spacer,
                ItemKind::Container(_) => NodeKind::Container,
            };
            let visible = item.is_visible();
            nodes.push(NodeSnapshot {
                id,
                parent: self.parent(id)?,
                kind,
                visible,
                rect: self.cached_geometry(id).unwrap_or_default(),
                disposition: self.disposition(id)?,
            });
        }
        Ok(LayoutSnapshot {
            version: LAYOUT_SNAPSHOT_VERSION,
            area: self.area(),
            scale: self.context().scale.get(),
            nodes,
            anchors: self.anchors().iter().cloned().collect(),
        })
    }
}
