//! Binary-tree rectangle packer for glyph atlases
//!
//! Packs rectangles into one fixed-size surface. The tree lives in an arena
//! (`Vec<AtlasNode>`) addressed by index with the root at index 0; nodes are
//! only ever appended, so indices stay valid for the packer's lifetime.
//!
//! Every split node has exactly two children that are disjoint and tile the
//! parent rectangle. Occupied nodes are always leaves.

use serde::Serialize;

use crate::foundation::math::Rect;

/// One node of the packing tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtlasNode {
    /// Region of the atlas this node covers
    pub rect: Rect,
    /// Occupant id, [`AtlasNode::EMPTY_ID`] when free
    pub id: u32,
    /// Arena indices of the two children, `None` for leaves
    pub children: Option<[usize; 2]>,
}

impl AtlasNode {
    /// Occupant id of a free node
    pub const EMPTY_ID: u32 = 0;

    fn leaf(rect: Rect) -> Self {
        Self { rect, id: Self::EMPTY_ID, children: None }
    }

    /// Whether the node has no children
    pub const fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Whether the node holds a placed rectangle
    pub const fn is_occupied(&self) -> bool {
        self.id != Self::EMPTY_ID
    }
}

/// Rectangle packer over a single atlas surface
#[derive(Debug, Clone, Serialize)]
pub struct GlyphAtlasPacker {
    width: u32,
    height: u32,
    nodes: Vec<AtlasNode>,
}

impl GlyphAtlasPacker {
    /// Create a packer for a `width` x `height` surface
    pub fn new(width: u32, height: u32) -> Self {
        let root = AtlasNode::leaf(Rect::new(0, 0, width as i32, height as i32));
        Self { width, height, nodes: vec![root] }
    }

    /// Surface size
    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Place a `width` x `height` rectangle tagged with `id`
    ///
    /// Returns the placed rectangle, or `None` when no free leaf is large
    /// enough. `None` means the atlas is exhausted for that size; there is no
    /// eviction or repacking, and the tree is left untouched. `id` must be
    /// non-zero and the size must be non-empty.
    pub fn insert(&mut self, width: u32, height: u32, id: u32) -> Option<Rect> {
        if id == AtlasNode::EMPTY_ID || width == 0 || height == 0 {
            return None;
        }
        if width > self.width || height > self.height {
            return None;
        }
        let index = self.insert_at(0, width as i32, height as i32, id)?;
        Some(self.nodes[index].rect)
    }

    fn insert_at(&mut self, index: usize, width: i32, height: i32, id: u32) -> Option<usize> {
        if let Some([first, second]) = self.nodes[index].children {
            return self
                .insert_at(first, width, height, id)
                .or_else(|| self.insert_at(second, width, height, id));
        }

        let rect = self.nodes[index].rect;
        if self.nodes[index].is_occupied() || rect.width < width || rect.height < height {
            return None;
        }

        if rect.width == width && rect.height == height {
            self.nodes[index].id = id;
            return Some(index);
        }

        // Cut along the axis with the larger leftover so the big free region
        // stays in one piece.
        let leftover_w = rect.width - width;
        let leftover_h = rect.height - height;
        let (first, second) = if leftover_w > leftover_h {
            (
                Rect::new(rect.x, rect.y, width, rect.height),
                Rect::new(rect.x + width, rect.y, leftover_w, rect.height),
            )
        } else {
            (
                Rect::new(rect.x, rect.y, rect.width, height),
                Rect::new(rect.x, rect.y + height, rect.width, leftover_h),
            )
        };

        let first_index = self.nodes.len();
        self.nodes.push(AtlasNode::leaf(first));
        self.nodes.push(AtlasNode::leaf(second));
        self.nodes[index].children = Some([first_index, first_index + 1]);

        // The first child was sized to fit, so this cannot fail.
        self.insert_at(first_index, width, height, id)
    }

    /// Node by arena index
    pub fn node(&self, index: usize) -> Option<&AtlasNode> {
        self.nodes.get(index)
    }

    /// All nodes, root first
    pub fn nodes(&self) -> &[AtlasNode] {
        &self.nodes
    }

    /// Rectangles of all occupied leaves with their ids
    pub fn occupied_rects(&self) -> impl Iterator<Item = (u32, Rect)> + '_ {
        self.nodes.iter().filter(|node| node.is_occupied()).map(|node| (node.id, node.rect))
    }

    /// Total occupied area in square pixels
    pub fn occupied_area(&self) -> i64 {
        self.occupied_rects().map(|(_, rect)| rect.area()).sum()
    }

    /// Serialize the tree as RON for inspection
    pub fn dump_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}
