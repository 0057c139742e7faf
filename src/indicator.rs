//! Margin indicators: placement, badge content and the highlight band over the active block.

use crate::{
    blocks::{BlockIndex, NodeGeometry},
    counts::CommentCounts,
};

pub const INDICATOR_ID_PREFIX: char = '_';

/// Id of the indicator marker for `root`.
pub fn indicator_id(root: &str) -> String {
    format!("{INDICATOR_ID_PREFIX}{root}")
}

/// Comment root encoded in an indicator id, if `id` is one.
pub fn root_from_indicator_id(id: &str) -> Option<&str> {
    id.strip_prefix(INDICATOR_ID_PREFIX)
        .filter(|root| !root.is_empty())
}

/// Horizontal position shared by every indicator: the comment border minus the bar width.
pub fn margin_column(border_x: f64, bar_width: f64) -> f64 {
    border_x - bar_width
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPlacement {
    pub x: f64,
    pub y: f64,
    pub height: f64,
}

pub fn place_marker(margin_x: f64, node: NodeGeometry) -> MarkerPlacement {
    MarkerPlacement {
        x: margin_x,
        y: node.top,
        height: node.height,
    }
}

/// Badge content of one indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    /// Empty for zero, so nothing visible is rendered.
    pub text: String,
    pub has_comments: bool,
}

impl Badge {
    pub fn for_count(count: u32) -> Badge {
        if count > 0 {
            Badge {
                text: count.to_string(),
                has_comments: true,
            }
        } else {
            Badge {
                text: String::new(),
                has_comments: false,
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountsUpdate {
    /// Block index and badge, for every block named in the reply.
    pub badges: Vec<(usize, Badge)>,
    pub total: u64,
}

impl CountsUpdate {
    /// The show/hide control is pointless when nothing on the page has comments.
    pub fn show_toggle_visible(&self) -> bool {
        self.total > 0
    }
}

/// Badges for the roots present in a decoded counts reply; unknown roots are ignored.
pub fn plan_counts_update(index: &BlockIndex, decoded: &CommentCounts) -> CountsUpdate {
    let mut update = CountsUpdate::default();
    for (root, count) in decoded.iter() {
        let Some(idx) = index.index_of(root) else {
            tracing::warn!("Counts reply names unknown comment root '{root}'");
            continue;
        };
        update.total += u64::from(count);
        update.badges.push((idx, Badge::for_count(count)));
    }
    update.badges.sort_by_key(|(idx, _)| *idx);
    update
}

/// Translucent band drawn across the content column over the block being commented on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightBand {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

pub const HIGHLIGHT_OPACITY: f64 = 0.4;

/// Horizontal extent of the content column, measured once at initialization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContentColumn {
    pub left: f64,
    pub width: f64,
    pub bar_width: f64,
}

impl ContentColumn {
    pub fn band_over(&self, node: NodeGeometry) -> HighlightBand {
        HighlightBand {
            x: self.left,
            y: node.top,
            width: (self.width - self.bar_width).max(0.0),
            height: node.height,
        }
    }
}
