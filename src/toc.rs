//! Table-of-contents accordion.
//!
//! Each first-level TOC entry with a nested list gets its list rewrapped in a collapsible
//! container and a toggle link. Entries whose nested items carry an indicator start expanded.

pub const EXPANDED_LABEL: &str = "(hide)";
pub const COLLAPSED_LABEL: &str = "(expand)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccordionSection {
    expanded: bool,
}

impl AccordionSection {
    /// Initial state for a section whose nested entries have (`true`) or lack an indicator.
    pub fn for_children<I: IntoIterator<Item = bool>>(child_has_marker: I) -> AccordionSection {
        AccordionSection {
            expanded: child_has_marker.into_iter().any(|has| has),
        }
    }

    /// State as read back from the container's CSS `display`.
    pub fn from_display(display: &str) -> AccordionSection {
        AccordionSection {
            expanded: display.trim() != "none",
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn label(&self) -> &'static str {
        if self.expanded {
            EXPANDED_LABEL
        } else {
            COLLAPSED_LABEL
        }
    }

    pub fn display(&self) -> &'static str {
        if self.expanded {
            "block"
        } else {
            "none"
        }
    }

    pub fn toggled(&self) -> AccordionSection {
        AccordionSection {
            expanded: !self.expanded,
        }
    }
}

/// First-level TOC entry as seen at initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocEntry {
    /// One flag per nested child entry: does it contain an indicator?
    pub nested: Option<Vec<bool>>,
}

/// Accordion section for each entry; `None` for entries without a nested list.
pub fn plan_accordion(entries: &[TocEntry]) -> Vec<Option<AccordionSection>> {
    entries
        .iter()
        .map(|entry| {
            entry
                .nested
                .as_ref()
                .map(|children| AccordionSection::for_children(children.iter().copied()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_sections_collapse_unless_commented() {
        let plan = plan_accordion(&[
            TocEntry { nested: None },
            TocEntry {
                nested: Some(vec![false, false]),
            },
            TocEntry {
                nested: Some(vec![false, true]),
            },
            TocEntry {
                nested: Some(vec![]),
            },
        ]);
        assert_eq!(plan[0], None);
        assert_eq!(plan[1].map(|s| s.label()), Some(COLLAPSED_LABEL));
        assert_eq!(plan[2].map(|s| s.label()), Some(EXPANDED_LABEL));
        assert_eq!(plan[3].map(|s| s.display()), Some("none"));
    }

    #[test]
    fn test_toggle_flips_display_and_label() {
        let section = AccordionSection::from_display("none");
        assert!(!section.is_expanded());
        let opened = section.toggled();
        assert_eq!(opened.display(), "block");
        assert_eq!(opened.label(), EXPANDED_LABEL);
        assert_eq!(AccordionSection::from_display("").label(), EXPANDED_LABEL);
    }
}
