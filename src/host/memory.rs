//! In-memory host backed by a JSON document.
//!
//! Used by the binary to serve a document file and by the tests as a
//! synthetic tree. Selection changes are reported on a channel just like a
//! live host would.

use super::{Host, HostEvent, HostNode, HostTextStyle, NodeKind, TextProperties};
use crate::types::{HostError, NodeId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// One node of an in-memory document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryNode {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub children: Vec<MemoryNode>,
    #[serde(default)]
    pub text: Option<TextProperties>,
}

fn default_true() -> bool {
    true
}

impl MemoryNode {
    pub fn text(id: &str, properties: TextProperties) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            kind: NodeKind::Text,
            visible: true,
            children: Vec::new(),
            text: Some(properties),
        }
    }

    pub fn container(id: &str, children: Vec<MemoryNode>) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            kind: NodeKind::Container,
            visible: true,
            children,
            text: None,
        }
    }

    /// A node that is neither text nor container (vector, image, ...)
    pub fn other(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            kind: NodeKind::Other,
            visible: true,
            children: Vec::new(),
            text: None,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    fn find(&self, id: &str) -> Option<&MemoryNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

impl HostNode for MemoryNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn children(&self) -> &[Self] {
        &self.children
    }

    fn text_properties(&self) -> Option<&TextProperties> {
        self.text.as_ref()
    }

    fn visible(&self) -> bool {
        self.visible
    }
}

/// Errors loading a document file
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A page, its selection and the style catalogue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDocument {
    #[serde(default)]
    pub page: Vec<MemoryNode>,
    #[serde(default)]
    pub selection: Vec<NodeId>,
    /// Styles defined in the document
    #[serde(default)]
    pub styles: Vec<HostTextStyle>,
    /// Library styles resolvable by id only
    #[serde(default)]
    pub library_styles: Vec<HostTextStyle>,
}

impl MemoryDocument {
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let contents = std::fs::read_to_string(path)?;
        let document: MemoryDocument = serde_json::from_str(&contents)?;
        info!(
            "Loaded document from {:?}: {} top-level nodes, {} styles",
            path,
            document.page.len(),
            document.styles.len()
        );
        Ok(document)
    }
}

/// [`Host`] over a [`MemoryDocument`]
pub struct MemoryHost {
    document: MemoryDocument,
    events: Option<mpsc::UnboundedSender<HostEvent>>,
    notifications: Mutex<Vec<String>>,
    panel_size: Option<(u32, u32)>,
}

impl MemoryHost {
    pub fn new(document: MemoryDocument) -> Self {
        Self {
            document,
            events: None,
            notifications: Mutex::new(Vec::new()),
            panel_size: None,
        }
    }

    /// Receive selection-change notifications
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<HostEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    pub fn document(&self) -> &MemoryDocument {
        &self.document
    }

    /// Replace a named style, as if edited in the host between scans
    pub fn replace_style(&mut self, style: HostTextStyle) {
        match self.document.styles.iter_mut().find(|s| s.id == style.id) {
            Some(existing) => *existing = style,
            None => self.document.styles.push(style),
        }
    }

    /// Messages passed to [`Host::notify`] so far
    pub fn notifications(&self) -> Vec<String> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn panel_size(&self) -> Option<(u32, u32)> {
        self.panel_size
    }
}

#[async_trait::async_trait]
impl Host for MemoryHost {
    type Node = MemoryNode;

    fn selection(&self) -> Vec<&MemoryNode> {
        self.document
            .selection
            .iter()
            .filter_map(|id| self.find_node(id))
            .collect()
    }

    fn page_nodes(&self) -> Vec<&MemoryNode> {
        self.document.page.iter().collect()
    }

    fn find_node(&self, id: &str) -> Option<&MemoryNode> {
        self.document.page.iter().find_map(|node| node.find(id))
    }

    fn set_selection(&mut self, ids: Vec<NodeId>) {
        debug!("Selection set to {} nodes", ids.len());
        self.document.selection = ids;
        if let Some(events) = &self.events {
            // A dropped receiver just means nobody is listening
            let _ = events.send(HostEvent::SelectionChanged);
        }
    }

    async fn local_text_styles(&self) -> Result<Vec<HostTextStyle>, HostError> {
        Ok(self.document.styles.clone())
    }

    async fn text_style_by_id(&self, id: &str) -> Result<Option<HostTextStyle>, HostError> {
        Ok(self
            .document
            .styles
            .iter()
            .chain(self.document.library_styles.iter())
            .find(|style| style.id == id)
            .cloned())
    }

    fn notify(&self, message: &str) {
        info!("Host notification: {}", message);
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push(message.to_string());
        }
    }

    fn resize_panel(&mut self, width: u32, height: u32) {
        debug!("Panel resized to {}x{}", width, height);
        self.panel_size = Some((width, height));
    }
}
