//! Core types used throughout the style grouper.
//!
//! This module defines the data model shared by every stage of a scan:
//! the per-node attribute record, named style definitions, the emitted
//! style groups and the outcome of a scan.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque node identifier, unique within a document
pub type NodeId = String;

/// Font family reported when sub-ranges use different families
pub const MULTIPLE_FONTS: &str = "Multiple fonts";

/// Font family reported when the family is bound to variables
pub const VARIABLE: &str = "Variable";

/// Font weight reported when sub-ranges use different styles
pub const MIXED_WEIGHTS: &str = "Mixed weights";

/// Font size reported when sub-ranges use different sizes
pub const MIXED_SIZES: &str = "Mixed sizes";

/// Description used for named styles without one
pub const NO_DESCRIPTION: &str = "No description";

/// Truncate a value to one decimal place (`floor(x * 10) / 10`)
pub fn truncate_tenth(value: f64) -> f64 {
    (value * 10.0).floor() / 10.0
}

/// A host attribute that is either uniform over the node's content or
/// differs between sub-ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mixed<T> {
    Uniform(T),
    Mixed,
}

impl<T> Mixed<T> {
    pub fn is_mixed(&self) -> bool {
        matches!(self, Mixed::Mixed)
    }

    pub fn as_uniform(&self) -> Option<&T> {
        match self {
            Mixed::Uniform(value) => Some(value),
            Mixed::Mixed => None,
        }
    }
}

impl<T> From<T> for Mixed<T> {
    fn from(value: T) -> Self {
        Mixed::Uniform(value)
    }
}

impl<T: Default> Default for Mixed<T> {
    fn default() -> Self {
        Mixed::Uniform(T::default())
    }
}

/// Font size of a record or style definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FontSize {
    Points(f64),
    /// Sub-ranges of a node use different sizes
    Mixed,
    /// A named style whose size is not a single value
    Variable,
}

impl FontSize {
    pub fn points(&self) -> Option<f64> {
        match self {
            FontSize::Points(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for FontSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontSize::Points(value) => write!(f, "{}", value),
            FontSize::Mixed => f.write_str(MIXED_SIZES),
            FontSize::Variable => f.write_str(VARIABLE),
        }
    }
}

impl Serialize for FontSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FontSize::Points(value) => serializer.serialize_f64(*value),
            FontSize::Mixed => serializer.serialize_str(MIXED_SIZES),
            FontSize::Variable => serializer.serialize_str(VARIABLE),
        }
    }
}

/// Line height, unit-aware
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineHeight {
    #[default]
    Auto,
    Pixels { value: f64 },
    Percent { value: f64 },
    Mixed,
}

impl LineHeight {
    /// Style definition form: percentages rounded, pixels truncated to 0.1
    pub fn normalized(self) -> Self {
        match self {
            LineHeight::Pixels { value } => LineHeight::Pixels {
                value: truncate_tenth(value),
            },
            LineHeight::Percent { value } => LineHeight::Percent {
                value: value.round(),
            },
            other => other,
        }
    }

    /// Record form: every numeric value truncated to 0.1
    pub fn truncated(self) -> Self {
        match self {
            LineHeight::Pixels { value } => LineHeight::Pixels {
                value: truncate_tenth(value),
            },
            LineHeight::Percent { value } => LineHeight::Percent {
                value: truncate_tenth(value),
            },
            other => other,
        }
    }
}

impl fmt::Display for LineHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineHeight::Auto => f.write_str("Auto"),
            LineHeight::Pixels { value } => write!(f, "{}px", value),
            LineHeight::Percent { value } => write!(f, "{}%", value),
            LineHeight::Mixed => f.write_str("Mixed"),
        }
    }
}

/// Letter spacing, unit-aware
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LetterSpacing {
    Pixels { value: f64 },
    Percent { value: f64 },
    Mixed,
}

impl Default for LetterSpacing {
    fn default() -> Self {
        LetterSpacing::Percent { value: 0.0 }
    }
}

impl LetterSpacing {
    /// Style definition form: percentages rounded, pixels truncated to 0.1
    pub fn normalized(self) -> Self {
        match self {
            LetterSpacing::Pixels { value } => LetterSpacing::Pixels {
                value: truncate_tenth(value),
            },
            LetterSpacing::Percent { value } => LetterSpacing::Percent {
                value: value.round(),
            },
            LetterSpacing::Mixed => LetterSpacing::Mixed,
        }
    }

    /// Record form: every numeric value truncated to 0.1
    pub fn truncated(self) -> Self {
        match self {
            LetterSpacing::Pixels { value } => LetterSpacing::Pixels {
                value: truncate_tenth(value),
            },
            LetterSpacing::Percent { value } => LetterSpacing::Percent {
                value: truncate_tenth(value),
            },
            LetterSpacing::Mixed => LetterSpacing::Mixed,
        }
    }
}

impl fmt::Display for LetterSpacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LetterSpacing::Pixels { value } => write!(f, "{}px", value),
            LetterSpacing::Percent { value } => write!(f, "{}%", value),
            LetterSpacing::Mixed => f.write_str("Mixed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextAlignHorizontal {
    #[default]
    Left,
    Center,
    Right,
    Justified,
}

impl TextAlignHorizontal {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlignHorizontal::Left => "LEFT",
            TextAlignHorizontal::Center => "CENTER",
            TextAlignHorizontal::Right => "RIGHT",
            TextAlignHorizontal::Justified => "JUSTIFIED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextAlignVertical {
    #[default]
    Top,
    Center,
    Bottom,
}

impl TextAlignVertical {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlignVertical::Top => "TOP",
            TextAlignVertical::Center => "CENTER",
            TextAlignVertical::Bottom => "BOTTOM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextCase {
    #[default]
    Original,
    Upper,
    Lower,
    Title,
    SmallCaps,
    SmallCapsForced,
    Mixed,
}

impl TextCase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextCase::Original => "ORIGINAL",
            TextCase::Upper => "UPPER",
            TextCase::Lower => "LOWER",
            TextCase::Title => "TITLE",
            TextCase::SmallCaps => "SMALL_CAPS",
            TextCase::SmallCapsForced => "SMALL_CAPS_FORCED",
            TextCase::Mixed => "MIXED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    Strikethrough,
    Mixed,
}

impl TextDecoration {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextDecoration::None => "NONE",
            TextDecoration::Underline => "UNDERLINE",
            TextDecoration::Strikethrough => "STRIKETHROUGH",
            TextDecoration::Mixed => "MIXED",
        }
    }
}

/// Normalized typographic attributes of one text-bearing node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAttributeRecord {
    pub id: NodeId,
    /// Layer name (not part of the fingerprint)
    pub name: String,
    /// Text content (not part of the fingerprint)
    pub text: String,
    /// Family, [`MULTIPLE_FONTS`] or [`VARIABLE`]
    pub font_family: String,
    /// Style name or [`MIXED_WEIGHTS`]
    pub font_weight: String,
    pub font_size: FontSize,
    pub line_height: LineHeight,
    pub letter_spacing: LetterSpacing,
    pub paragraph_spacing: f64,
    pub paragraph_indent: f64,
    pub text_align_horizontal: TextAlignHorizontal,
    pub text_align_vertical: TextAlignVertical,
    pub text_case: TextCase,
    pub text_decoration: TextDecoration,
    pub hanging_punctuation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_style_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound_variable_ids: Option<Vec<String>>,
    pub open_type_features: BTreeMap<String, bool>,
}

/// A named text style, normalized for comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub font_family: String,
    pub font_weight: String,
    pub font_size: FontSize,
    pub line_height: LineHeight,
    pub letter_spacing: LetterSpacing,
    pub paragraph_spacing: f64,
    pub paragraph_indent: f64,
    pub text_case: TextCase,
    pub text_decoration: TextDecoration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align_horizontal: Option<TextAlignHorizontal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align_vertical: Option<TextAlignVertical>,
    /// Defined in a team library rather than the current document
    pub remote: bool,
}

/// Style of an un-styled group: its first member's record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalStyle {
    #[serde(flatten)]
    pub record: TextAttributeRecord,
    pub has_variable: bool,
}

/// Representative style information reported for a group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StyleInfo {
    Library(StyleDefinition),
    Local(LocalStyle),
}

impl StyleInfo {
    pub fn font_family(&self) -> &str {
        match self {
            StyleInfo::Library(def) => &def.font_family,
            StyleInfo::Local(local) => &local.record.font_family,
        }
    }

    pub fn font_weight(&self) -> &str {
        match self {
            StyleInfo::Library(def) => &def.font_weight,
            StyleInfo::Local(local) => &local.record.font_weight,
        }
    }

    pub fn font_size(&self) -> FontSize {
        match self {
            StyleInfo::Library(def) => def.font_size,
            StyleInfo::Local(local) => local.record.font_size,
        }
    }

    /// Name of the named style, if any
    pub fn name(&self) -> Option<&str> {
        match self {
            StyleInfo::Library(def) => Some(&def.name),
            StyleInfo::Local(_) => None,
        }
    }
}

/// Key under which records are accumulated
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupingKey {
    /// Id of a registered named style
    Style(String),
    /// Structural fingerprint of the visual attributes
    Fingerprint(String),
}

/// Text layers sharing one grouping key
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleGroup {
    #[serde(skip)]
    pub key: GroupingKey,
    pub count: usize,
    pub member_ids: Vec<NodeId>,
    pub style: StyleInfo,
    pub has_style: bool,
}

/// Which forest a scan walks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanScope {
    /// The user's current selection
    #[default]
    Selection,
    /// Every top-level node on the current page
    All,
}

impl ScanScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanScope::Selection => "selection",
            ScanScope::All => "all",
        }
    }
}

/// Result of one scan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "camelCase")]
pub enum ScanOutcome {
    /// The forest to scan was empty
    NoLayerSelected,
    /// The forest held no text-bearing nodes
    NoTextLayerFound,
    /// Sorted groups, never empty
    Groups(Vec<StyleGroup>),
}

/// Errors reported by the host document
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Style not found: {0}")]
    StyleNotFound(String),

    #[error("Style fetch failed: {0}")]
    StyleFetch(String),
}
