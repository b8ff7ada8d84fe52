//! Page host seam: element lookup, creation and inline content

use parking_lot::RwLock;
use std::collections::HashMap;

/// Handle to a mounted element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountNode {
    pub id: String,
}

impl MountNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// The page the chart is mounted into
pub trait DomHost: Send + Sync {
    fn find_element(&self, id: &str) -> Option<MountNode>;

    /// Create `<div id=id class=class>` under `parent_id`; `None` when the
    /// parent does not exist.
    fn create_element(&self, parent_id: &str, id: &str, class: &str) -> Option<MountNode>;

    fn set_inner_html(&self, node: &MountNode, html: &str);
}

#[derive(Debug, Clone, Default)]
struct Element {
    parent: Option<String>,
    class: String,
    inner_html: String,
}

/// Headless in-memory page
#[derive(Default)]
pub struct MemoryDom {
    elements: RwLock<HashMap<String, Element>>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page with the given top-level element ids.
    pub fn with_elements<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        let dom = Self::new();
        for id in ids {
            dom.insert(id);
        }
        dom
    }

    pub fn insert(&self, id: &str) {
        self.elements
            .write()
            .insert(id.to_string(), Element::default());
    }

    /// Remove an element and everything below it.
    pub fn remove(&self, id: &str) {
        let mut elements = self.elements.write();
        let mut pending = vec![id.to_string()];
        while let Some(current) = pending.pop() {
            elements.remove(&current);
            pending.extend(
                elements
                    .iter()
                    .filter(|(_, e)| e.parent.as_deref() == Some(current.as_str()))
                    .map(|(child, _)| child.clone()),
            );
        }
    }

    pub fn inner_html(&self, id: &str) -> Option<String> {
        self.elements.read().get(id).map(|e| e.inner_html.clone())
    }

    pub fn class_of(&self, id: &str) -> Option<String> {
        self.elements.read().get(id).map(|e| e.class.clone())
    }

    pub fn parent_of(&self, id: &str) -> Option<String> {
        self.elements.read().get(id).and_then(|e| e.parent.clone())
    }
}

impl DomHost for MemoryDom {
    fn find_element(&self, id: &str) -> Option<MountNode> {
        self.elements
            .read()
            .contains_key(id)
            .then(|| MountNode::new(id))
    }

    fn create_element(&self, parent_id: &str, id: &str, class: &str) -> Option<MountNode> {
        let mut elements = self.elements.write();
        if !elements.contains_key(parent_id) {
            return None;
        }
        elements.insert(
            id.to_string(),
            Element {
                parent: Some(parent_id.to_string()),
                class: class.to_string(),
                inner_html: String::new(),
            },
        );
        Some(MountNode::new(id))
    }

    fn set_inner_html(&self, node: &MountNode, html: &str) {
        match self.elements.write().get_mut(&node.id) {
            Some(element) => element.inner_html = html.to_string(),
            None => log::warn!("MemoryDom - element '{}' is gone", node.id),
        }
    }
}
