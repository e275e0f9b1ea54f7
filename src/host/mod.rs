//! Host document integration.
//!
//! The document tree, the user's selection and the named style catalogue all
//! live in the host application. This module defines the interface the
//! scanner needs from it:
//! - [`HostNode`]: one node of the visual tree
//! - [`Host`]: selection, page and style access
//! - [`HostEvent`]: notifications pushed by the host
//!
//! [`memory`] provides an in-memory host backed by a JSON document.

pub mod memory;

use crate::types::{
    HostError, LetterSpacing, LineHeight, Mixed, NodeId, TextAlignHorizontal, TextAlignVertical,
    TextCase, TextDecoration,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a node contributes to a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    /// Editable text with typographic attributes
    Text,
    /// Has children, no direct text
    Container,
    /// Neither; skipped
    Other,
}

/// A node of the host's visual tree
pub trait HostNode: Sized {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn kind(&self) -> NodeKind;

    /// Children in native order; empty unless the node is a container
    fn children(&self) -> &[Self];

    /// Typographic attributes; `None` unless the node is text-bearing
    fn text_properties(&self) -> Option<&TextProperties>;

    fn visible(&self) -> bool {
        true
    }
}

/// Raw typographic attributes as reported by the host for one text node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProperties {
    #[serde(default)]
    pub characters: String,
    pub font_family: Mixed<String>,
    pub font_style: Mixed<String>,
    pub font_size: Mixed<f64>,
    #[serde(default)]
    pub line_height: Mixed<LineHeight>,
    #[serde(default)]
    pub letter_spacing: Mixed<LetterSpacing>,
    #[serde(default)]
    pub paragraph_spacing: f64,
    #[serde(default)]
    pub paragraph_indent: f64,
    #[serde(default)]
    pub text_align_horizontal: TextAlignHorizontal,
    #[serde(default)]
    pub text_align_vertical: TextAlignVertical,
    #[serde(default)]
    pub text_case: Mixed<TextCase>,
    #[serde(default)]
    pub text_decoration: Mixed<TextDecoration>,
    #[serde(default)]
    pub hanging_punctuation: bool,
    #[serde(default)]
    pub text_style_id: Mixed<Option<String>>,
    /// Variables bound to the font family, in binding order
    #[serde(default)]
    pub font_variables: Vec<String>,
    #[serde(default)]
    pub open_type_features: Mixed<BTreeMap<String, bool>>,
}

impl TextProperties {
    /// Uniform properties with host defaults for everything but the font
    pub fn new(family: &str, style: &str, size: f64) -> Self {
        Self {
            characters: String::new(),
            font_family: Mixed::Uniform(family.to_string()),
            font_style: Mixed::Uniform(style.to_string()),
            font_size: Mixed::Uniform(size),
            line_height: Mixed::default(),
            letter_spacing: Mixed::default(),
            paragraph_spacing: 0.0,
            paragraph_indent: 0.0,
            text_align_horizontal: TextAlignHorizontal::default(),
            text_align_vertical: TextAlignVertical::default(),
            text_case: Mixed::default(),
            text_decoration: Mixed::default(),
            hanging_punctuation: false,
            text_style_id: Mixed::default(),
            font_variables: Vec::new(),
            open_type_features: Mixed::default(),
        }
    }
}

/// A named text style as reported by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostTextStyle {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub font_family: String,
    pub font_style: String,
    pub font_size: Mixed<f64>,
    #[serde(default)]
    pub line_height: LineHeight,
    #[serde(default)]
    pub letter_spacing: LetterSpacing,
    #[serde(default)]
    pub paragraph_spacing: f64,
    #[serde(default)]
    pub paragraph_indent: f64,
    #[serde(default)]
    pub text_case: TextCase,
    #[serde(default)]
    pub text_decoration: TextDecoration,
    #[serde(default)]
    pub text_align_horizontal: Option<TextAlignHorizontal>,
    #[serde(default)]
    pub text_align_vertical: Option<TextAlignVertical>,
    #[serde(default)]
    pub remote: bool,
}

/// Notifications pushed by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// The user's selection changed, for whatever reason
    SelectionChanged,
}

/// Access to the host document
#[async_trait::async_trait]
pub trait Host: Send + Sync {
    type Node: HostNode + Sync;

    /// Roots of the current selection, in selection order
    fn selection(&self) -> Vec<&Self::Node>;

    /// Top-level nodes of the current page
    fn page_nodes(&self) -> Vec<&Self::Node>;

    /// Find any node on the current page by id
    fn find_node(&self, id: &str) -> Option<&Self::Node>;

    /// Replace the selection; the host reports the change as a [`HostEvent`]
    fn set_selection(&mut self, ids: Vec<NodeId>);

    /// All text styles defined in the document
    async fn local_text_styles(&self) -> Result<Vec<HostTextStyle>, HostError>;

    /// Resolve a style by id, including library styles not defined locally
    async fn text_style_by_id(&self, id: &str) -> Result<Option<HostTextStyle>, HostError>;

    /// Show a transient message to the user
    fn notify(&self, message: &str);

    fn resize_panel(&mut self, width: u32, height: u32);
}
