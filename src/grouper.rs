//! Style fingerprinting and grouping.
//!
//! Every record gets a grouping key: the id of its named style when the
//! registry knows it, otherwise a structural fingerprint built from its
//! visual attributes in a fixed order. Records sharing a key are counted
//! into one [`StyleGroup`], and the groups are emitted styled-first, most
//! used first.

use crate::registry::StyleRegistry;
use crate::types::{
    FontSize, GroupingKey, LocalStyle, ScanOutcome, StyleGroup, StyleInfo, TextAttributeRecord,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Separator between fingerprint fields (ASCII unit separator)
pub const FIELD_SEPARATOR: &str = "\u{1f}";

/// How the panel orders groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOrder {
    /// Styled groups first, then by member count
    #[default]
    Usage,
    /// Styled groups first, then by font size, largest first
    Size,
}

/// Deterministic structural key for a record
pub fn fingerprint(record: &TextAttributeRecord) -> String {
    let variables = record
        .bound_variable_ids
        .as_ref()
        .map(|ids| ids.join(","))
        .unwrap_or_default();

    // BTreeMap iteration is already sorted by feature name
    let features = record
        .open_type_features
        .iter()
        .map(|(name, enabled)| format!("{}={}", name, if *enabled { 1 } else { 0 }))
        .collect::<Vec<_>>()
        .join(",");

    let fields = [
        record.font_family.clone(),
        record.font_weight.clone(),
        record.font_size.to_string(),
        record.line_height.to_string(),
        record.letter_spacing.to_string(),
        record.paragraph_spacing.to_string(),
        record.paragraph_indent.to_string(),
        record.text_align_horizontal.as_str().to_string(),
        record.text_align_vertical.as_str().to_string(),
        record.text_case.as_str().to_string(),
        record.text_decoration.as_str().to_string(),
        record.hanging_punctuation.to_string(),
        record.text_style_id.clone().unwrap_or_default(),
        variables,
        features,
    ];

    fields.join(FIELD_SEPARATOR)
}

/// Group records by style and sort the groups
///
/// An empty input yields [`ScanOutcome::NoTextLayerFound`], never an empty
/// group list.
pub fn group_records(records: Vec<TextAttributeRecord>, registry: &StyleRegistry) -> ScanOutcome {
    if records.is_empty() {
        return ScanOutcome::NoTextLayerFound;
    }

    let total = records.len();
    let mut groups: Vec<StyleGroup> = Vec::new();
    let mut positions: HashMap<GroupingKey, usize> = HashMap::new();

    for record in records {
        let definition = record
            .text_style_id
            .as_deref()
            .and_then(|id| registry.lookup(id));

        let key = match definition {
            Some(def) => GroupingKey::Style(def.id.clone()),
            None => GroupingKey::Fingerprint(fingerprint(&record)),
        };

        let position = match positions.get(&key) {
            Some(&position) => position,
            None => {
                let style = match definition {
                    Some(def) => StyleInfo::Library(def.clone()),
                    None => StyleInfo::Local(LocalStyle {
                        has_variable: record.bound_variable_ids.is_some(),
                        record: record.clone(),
                    }),
                };
                groups.push(StyleGroup {
                    key: key.clone(),
                    count: 0,
                    member_ids: Vec::new(),
                    style,
                    has_style: definition.is_some(),
                });
                positions.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };

        let group = &mut groups[position];
        group.count += 1;
        group.member_ids.push(record.id);
    }

    sort_groups(&mut groups, GroupOrder::Usage);
    debug!("Grouped {} text layers into {} groups", total, groups.len());

    ScanOutcome::Groups(groups)
}

/// Stable sort: styled groups first, then by the requested order
pub fn sort_groups(groups: &mut [StyleGroup], order: GroupOrder) {
    groups.sort_by(|a, b| {
        b.has_style.cmp(&a.has_style).then_with(|| match order {
            GroupOrder::Usage => b.count.cmp(&a.count),
            GroupOrder::Size => compare_size(a.style.font_size(), b.style.font_size()),
        })
    });
}

/// Larger sizes first; sentinels after every concrete size
fn compare_size(a: FontSize, b: FontSize) -> Ordering {
    match (a.points(), b.points()) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
