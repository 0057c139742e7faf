//! Commentable nodes discovered on the page and the lookup from comment root to block.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};

use crate::error::UcommentError;

static COMMENT_ROOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("comment root pattern is valid"));

/// Identifier shared by a commentable node, its indicator and the server's comment reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommentRoot(String);

impl CommentRoot {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for CommentRoot {
    type Error = UcommentError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.trim();
        if COMMENT_ROOT_RE.is_match(value) {
            Ok(CommentRoot(value.to_string()))
        } else {
            Err(UcommentError::InvalidInput(format!(
                "'{value}' is not a valid comment root"
            )))
        }
    }
}

impl fmt::Display for CommentRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for CommentRoot {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Element kind as far as indicator placement cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    /// Cannot host a child marker.
    Image,
}

impl NodeKind {
    pub fn from_tag_name(tag: &str) -> NodeKind {
        if tag.eq_ignore_ascii_case("img") {
            NodeKind::Image
        } else {
            NodeKind::Element
        }
    }
}

/// Which element carries the commentable class, the id and the indicator marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetHost {
    Node,
    /// The class and id were moved from the node to its parent element.
    Parent,
}

/// A commentable node after normalization: whatever the underlying element, it has a root and
/// a host for its marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentableTarget {
    pub root: CommentRoot,
    pub host: TargetHost,
}

impl CommentableTarget {
    pub fn normalize(id: &str, kind: NodeKind) -> Result<CommentableTarget, UcommentError> {
        let root = CommentRoot::try_from(id)?;
        let host = match kind {
            NodeKind::Element => TargetHost::Node,
            NodeKind::Image => TargetHost::Parent,
        };
        Ok(CommentableTarget { root, host })
    }
}

/// Document-relative vertical extent of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeGeometry {
    pub top: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentBlock {
    pub target: CommentableTarget,
    pub geometry: NodeGeometry,
    /// Mirrors the `ucomment-has-comments` flag of the indicator.
    pub has_comments: bool,
    /// `None` until the counts reply lands.
    pub count: Option<u32>,
}

impl CommentBlock {
    pub fn root(&self) -> &CommentRoot {
        &self.target.root
    }
}

/// All blocks of the page, in document order, with a unique root → index mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockIndex {
    blocks: Vec<CommentBlock>,
    by_root: HashMap<CommentRoot, usize>,
}

impl BlockIndex {
    pub fn build<I>(nodes: I) -> Result<BlockIndex, UcommentError>
    where
        I: IntoIterator<Item = (CommentableTarget, NodeGeometry)>,
    {
        let mut index = BlockIndex::default();
        for (target, geometry) in nodes {
            index.push(target, geometry)?;
        }
        tracing::debug!("Indexed {} commentable blocks", index.len());
        Ok(index)
    }

    pub fn push(
        &mut self,
        target: CommentableTarget,
        geometry: NodeGeometry,
    ) -> Result<usize, UcommentError> {
        if self.by_root.contains_key(&target.root) {
            return Err(UcommentError::DuplicateRoot(target.root.to_string()));
        }
        let idx = self.blocks.len();
        self.by_root.insert(target.root.clone(), idx);
        self.blocks.push(CommentBlock {
            target,
            geometry,
            has_comments: false,
            count: None,
        });
        Ok(idx)
    }

    pub fn index_of(&self, root: &str) -> Option<usize> {
        self.by_root.get(root.trim()).copied()
    }

    pub fn get(&self, idx: usize) -> Option<&CommentBlock> {
        self.blocks.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut CommentBlock> {
        self.blocks.get_mut(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommentBlock> {
        self.blocks.iter()
    }

    pub fn roots(&self) -> impl Iterator<Item = &CommentRoot> {
        self.blocks.iter().map(CommentBlock::root)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Replace the cached geometry of a block after a layout change.
    pub fn refresh_geometry(&mut self, idx: usize, geometry: NodeGeometry) -> bool {
        match self.blocks.get_mut(idx) {
            Some(block) => {
                block.geometry = geometry;
                true
            }
            None => false,
        }
    }
}
