//! Flat, document-ordered view of a parsed page.
//!
//! `scraper` exposes the tree through `ego_tree` node handles; the path-query
//! evaluator and the heuristic scanner want plain indices instead, so that
//! document order is just integer order and sets of nodes can be sorted and
//! deduplicated cheaply.

use scraper::{ElementRef, Html};

#[derive(Debug, Clone, Copy)]
pub(crate) enum DomNode<'a> {
    Document,
    Element(ElementRef<'a>),
    Text(&'a str),
}

#[derive(Debug)]
struct Entry<'a> {
    node: DomNode<'a>,
    parent: Option<usize>,
    children: Vec<usize>,
    /// One past the last index of this node's subtree.
    end: usize,
}

/// Pre-order arena over a parsed [`Html`] document. Index 0 is the document
/// node; every other index is an element or text node in document order.
#[derive(Debug)]
pub(crate) struct Dom<'a> {
    entries: Vec<Entry<'a>>,
}

/// Elements whose text never counts as page content.
const RAW_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

impl<'a> Dom<'a> {
    pub(crate) fn build(html: &'a Html) -> Self {
        let mut entries = vec![Entry {
            node: DomNode::Document,
            parent: None,
            children: Vec::new(),
            end: 1,
        }];

        let mut stack: Vec<(DomNode<'a>, usize)> = vec![(DomNode::Element(html.root_element()), 0)];

        while let Some((node, parent)) = stack.pop() {
            let index = entries.len();
            entries.push(Entry {
                node,
                parent: Some(parent),
                children: Vec::new(),
                end: index + 1,
            });
            entries[parent].children.push(index);

            if let DomNode::Element(element) = node {
                let children: Vec<DomNode<'a>> = element
                    .children()
                    .filter_map(|child| {
                        if let Some(el) = ElementRef::wrap(child) {
                            Some(DomNode::Element(el))
                        } else {
                            child.value().as_text().map(|text| DomNode::Text(&**text))
                        }
                    })
                    .collect();
                stack.extend(children.into_iter().rev().map(|child| (child, index)));
            }
        }

        // Children always carry larger indices than their parent, so a reverse
        // sweep sees every child's subtree end before the parent needs it.
        for index in (0..entries.len()).rev() {
            if let Some(&last) = entries[index].children.last() {
                entries[index].end = entries[last].end;
            }
        }

        Self { entries }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn node(&self, index: usize) -> DomNode<'a> {
        self.entries[index].node
    }

    pub(crate) fn parent(&self, index: usize) -> Option<usize> {
        self.entries[index].parent
    }

    pub(crate) fn children(&self, index: usize) -> &[usize] {
        &self.entries[index].children
    }

    /// Indices of all descendants of `index`, in document order.
    pub(crate) fn descendants(&self, index: usize) -> std::ops::Range<usize> {
        index + 1..self.entries[index].end
    }

    pub(crate) fn element(&self, index: usize) -> Option<ElementRef<'a>> {
        match self.entries[index].node {
            DomNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub(crate) fn element_name(&self, index: usize) -> Option<&'a str> {
        self.element(index).map(|el| el.value().name())
    }

    /// Concatenated text of the node and everything below it.
    pub(crate) fn text_content(&self, index: usize) -> String {
        match self.entries[index].node {
            DomNode::Text(text) => text.to_owned(),
            _ => self
                .descendants(index)
                .filter_map(|i| match self.entries[i].node {
                    DomNode::Text(text) => Some(text),
                    _ => None,
                })
                .collect(),
        }
    }

    /// `true` when the node sits inside `<script>`, `<style>` or similar.
    pub(crate) fn in_raw_text_element(&self, index: usize) -> bool {
        let mut current = self.entries[index].parent;
        while let Some(i) = current {
            if self
                .element_name(i)
                .is_some_and(|name| RAW_TEXT_ELEMENTS.contains(&name))
            {
                return true;
            }
            current = self.entries[i].parent;
        }
        false
    }
}

/// Returns the first value whose trimmed text is non-empty.
///
/// Values that carry markup are reduced to their text content first, so a
/// match like `<b>19.99</b>` yields `19.99`.
pub(crate) fn first_non_empty_text<I, S>(values: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values.into_iter().find_map(|value| {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.contains('<') && trimmed.contains('>') {
            let fragment = Html::parse_fragment(trimmed);
            let text: String = fragment.root_element().text().collect();
            let text = text.trim();
            return (!text.is_empty()).then(|| text.to_owned());
        }
        Some(trimmed.to_owned())
    })
}
