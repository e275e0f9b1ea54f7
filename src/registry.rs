//! Snapshot of the document's named text styles.
//!
//! The registry is rebuilt from the host before every grouping pass and is
//! read-only while a pass runs. Definitions carry rounded percentages and
//! pixel values truncated to 0.1.

use crate::host::{Host, HostTextStyle};
use crate::types::{truncate_tenth, FontSize, HostError, Mixed, StyleDefinition, NO_DESCRIPTION};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Named styles by id
#[derive(Debug, Clone, Default)]
pub struct StyleRegistry {
    definitions: Vec<StyleDefinition>,
    index: HashMap<String, usize>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot directly from host styles
    pub fn from_styles(styles: Vec<HostTextStyle>) -> Self {
        let mut registry = Self::new();
        registry.replace(styles);
        registry
    }

    /// Fetch every local style plus any referenced style not defined locally,
    /// then swap the snapshot. On failure the previous snapshot is kept.
    pub async fn refresh<H: Host>(
        &mut self,
        host: &H,
        referenced: &[String],
    ) -> Result<usize, HostError> {
        let mut styles = host.local_text_styles().await?;

        for id in referenced {
            if styles.iter().any(|style| &style.id == id) {
                continue;
            }
            match host.text_style_by_id(id).await {
                Ok(Some(style)) => {
                    debug!("Resolved library style {} ({})", style.name, id);
                    styles.push(style);
                }
                Ok(None) => debug!("Style {} could not be resolved", id),
                Err(e) => warn!("Failed to resolve style {}: {}", id, e),
            }
        }

        self.replace(styles);
        info!("Style registry refreshed: {} styles", self.definitions.len());
        Ok(self.definitions.len())
    }

    /// Replace the whole snapshot
    pub fn replace(&mut self, styles: Vec<HostTextStyle>) {
        let mut definitions = Vec::with_capacity(styles.len());
        let mut index = HashMap::with_capacity(styles.len());

        for style in &styles {
            if index.contains_key(&style.id) {
                continue;
            }
            index.insert(style.id.clone(), definitions.len());
            definitions.push(normalize(style));
        }

        self.definitions = definitions;
        self.index = index;
    }

    pub fn clear(&mut self) {
        self.definitions.clear();
        self.index.clear();
    }

    pub fn lookup(&self, id: &str) -> Option<&StyleDefinition> {
        self.index.get(id).map(|&i| &self.definitions[i])
    }

    /// All definitions in host order
    pub fn definitions(&self) -> &[StyleDefinition] {
        &self.definitions
    }

    /// Definitions that belong to the document itself
    pub fn local_definitions(&self) -> Vec<StyleDefinition> {
        self.definitions
            .iter()
            .filter(|def| !def.remote)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Normalize a host style into a comparison-ready definition
pub fn normalize(style: &HostTextStyle) -> StyleDefinition {
    let description = match style.description.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => NO_DESCRIPTION.to_string(),
    };

    let font_size = match style.font_size {
        Mixed::Uniform(size) => FontSize::Points(truncate_tenth(size)),
        Mixed::Mixed => FontSize::Variable,
    };

    StyleDefinition {
        id: style.id.clone(),
        name: style.name.clone(),
        description,
        font_family: style.font_family.clone(),
        font_weight: style.font_style.clone(),
        font_size,
        line_height: style.line_height.normalized(),
        letter_spacing: style.letter_spacing.normalized(),
        paragraph_spacing: truncate_tenth(style.paragraph_spacing),
        paragraph_indent: truncate_tenth(style.paragraph_indent),
        text_case: style.text_case,
        text_decoration: style.text_decoration,
        text_align_horizontal: style.text_align_horizontal,
        text_align_vertical: style.text_align_vertical,
        remote: style.remote,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::{MemoryDocument, MemoryHost};
    use crate::types::{LetterSpacing, LineHeight};

    fn host_style(id: &str, name: &str, size: f64) -> HostTextStyle {
        HostTextStyle {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            font_family: "Inter".to_string(),
            font_style: "Bold".to_string(),
            font_size: Mixed::Uniform(size),
            line_height: LineHeight::Percent { value: 119.7 },
            letter_spacing: LetterSpacing::Pixels { value: 0.25 },
            paragraph_spacing: 0.0,
            paragraph_indent: 0.0,
            text_case: Default::default(),
            text_decoration: Default::default(),
            text_align_horizontal: None,
            text_align_vertical: None,
            remote: false,
        }
    }

    #[test]
    fn test_normalize_units_and_defaults() {
        let def = normalize(&host_style("S:1", "Heading/H1", 32.05));
        assert_eq!(def.description, NO_DESCRIPTION);
        assert_eq!(def.font_size, FontSize::Points(32.0));
        assert_eq!(def.line_height, LineHeight::Percent { value: 120.0 });
        assert_eq!(def.letter_spacing, LetterSpacing::Pixels { value: 0.2 });
    }

    #[test]
    fn test_normalize_variable_size() {
        let mut style = host_style("S:1", "Fluid", 0.0);
        style.font_size = Mixed::Mixed;
        style.description = Some("  ".to_string());

        let def = normalize(&style);
        assert_eq!(def.font_size, FontSize::Variable);
        assert_eq!(def.description, NO_DESCRIPTION);
    }

    #[test]
    fn test_lookup() {
        let registry = StyleRegistry::from_styles(vec![
            host_style("S:1", "Heading/H1", 32.0),
            host_style("S:2", "Body", 16.0),
            host_style("S:1", "Duplicate", 99.0),
        ]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("S:1").map(|d| d.name.as_str()), Some("Heading/H1"));
        assert_eq!(registry.lookup("S:2").map(|d| d.name.as_str()), Some("Body"));
        assert!(registry.lookup("S:3").is_none());
    }

    #[test]
    fn test_replace_drops_previous_snapshot() {
        let mut registry = StyleRegistry::from_styles(vec![host_style("S:1", "Old", 12.0)]);
        registry.replace(vec![host_style("S:2", "New", 12.0)]);

        assert!(registry.lookup("S:1").is_none());
        assert!(registry.lookup("S:2").is_some());
    }

    #[tokio::test]
    async fn test_refresh_resolves_referenced_library_styles() {
        let mut library = host_style("S:lib", "Library/Caption", 10.0);
        library.remote = true;
        let host = MemoryHost::new(MemoryDocument {
            styles: vec![host_style("S:1", "Heading/H1", 32.0)],
            library_styles: vec![library],
            ..Default::default()
        });

        let mut registry = StyleRegistry::new();
        let count = registry
            .refresh(&host, &["S:lib".to_string(), "S:gone".to_string()])
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert!(registry.lookup("S:lib").unwrap().remote);
        assert_eq!(registry.local_definitions().len(), 1);
    }
}
