//! Attribute extraction for text-bearing nodes.
//!
//! Turns the raw attributes a host reports for one text node into a
//! [`TextAttributeRecord`]. Mixed and variable-bound fields resolve to
//! sentinel values; nothing here fails.

use crate::host::{HostNode, TextProperties};
use crate::types::{
    truncate_tenth, FontSize, LetterSpacing, LineHeight, Mixed, TextAttributeRecord, TextCase,
    TextDecoration, MIXED_WEIGHTS, MULTIPLE_FONTS, VARIABLE,
};
use std::collections::BTreeMap;

/// Extract the record for a text-bearing node, if it reports attributes
pub fn extract_node<N: HostNode>(node: &N) -> Option<TextAttributeRecord> {
    node.text_properties()
        .map(|props| extract(node.id(), node.name(), props))
}

/// Build a normalized record from raw text attributes
pub fn extract(id: &str, name: &str, props: &TextProperties) -> TextAttributeRecord {
    let bound_variable_ids = bound_variables(&props.font_variables);

    // Variable binding wins over whatever family the glyphs report
    let font_family = if bound_variable_ids.is_some() {
        VARIABLE.to_string()
    } else {
        match &props.font_family {
            Mixed::Uniform(family) => family.clone(),
            Mixed::Mixed => MULTIPLE_FONTS.to_string(),
        }
    };

    let font_weight = match &props.font_style {
        Mixed::Uniform(style) => style.clone(),
        Mixed::Mixed => MIXED_WEIGHTS.to_string(),
    };

    // Mixed is checked before any rounding
    let font_size = match props.font_size {
        Mixed::Uniform(size) => FontSize::Points(truncate_tenth(size)),
        Mixed::Mixed => FontSize::Mixed,
    };

    let line_height = match props.line_height {
        Mixed::Uniform(height) => height.truncated(),
        Mixed::Mixed => LineHeight::Mixed,
    };

    let letter_spacing = match props.letter_spacing {
        Mixed::Uniform(spacing) => spacing.truncated(),
        Mixed::Mixed => LetterSpacing::Mixed,
    };

    let text_case = match props.text_case {
        Mixed::Uniform(case) => case,
        Mixed::Mixed => TextCase::Mixed,
    };

    let text_decoration = match props.text_decoration {
        Mixed::Uniform(decoration) => decoration,
        Mixed::Mixed => TextDecoration::Mixed,
    };

    // A mixed style reference means no single style applies
    let text_style_id = match &props.text_style_id {
        Mixed::Uniform(Some(id)) if !id.is_empty() => Some(id.clone()),
        _ => None,
    };

    TextAttributeRecord {
        id: id.to_string(),
        name: name.to_string(),
        text: props.characters.clone(),
        font_family,
        font_weight,
        font_size,
        line_height,
        letter_spacing,
        paragraph_spacing: truncate_tenth(props.paragraph_spacing),
        paragraph_indent: truncate_tenth(props.paragraph_indent),
        text_align_horizontal: props.text_align_horizontal,
        text_align_vertical: props.text_align_vertical,
        text_case,
        text_decoration,
        hanging_punctuation: props.hanging_punctuation,
        text_style_id,
        bound_variable_ids,
        open_type_features: open_type_features(&props.open_type_features),
    }
}

/// Ordered, de-duplicated variable ids; `None` when nothing is bound
fn bound_variables(ids: &[String]) -> Option<Vec<String>> {
    let mut ordered: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !id.is_empty() && !ordered.contains(id) {
            ordered.push(id.clone());
        }
    }
    if ordered.is_empty() {
        None
    } else {
        Some(ordered)
    }
}

fn open_type_features(features: &Mixed<BTreeMap<String, bool>>) -> BTreeMap<String, bool> {
    features.as_uniform().cloned().unwrap_or_default()
}
