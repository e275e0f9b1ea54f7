//! Style Grouper - typographic style grouping for design documents
//!
//! This crate walks a tree of visual nodes, extracts the typographic
//! attributes of every text layer and groups layers that look the same:
//!
//! - **Named styles**: layers bound to a known text style group by style id
//! - **Fingerprints**: everything else groups by a structural fingerprint of
//!   its visual attributes
//!
//! # Architecture
//!
//! A [`PanelController`] answers panel requests over a framed JSON protocol,
//! runs scans through the [`walker`], [`extractor`] and [`grouper`] against a
//! fresh [`StyleRegistry`] snapshot, and uses a [`SelectionReconciler`] so
//! that its own reselections never trigger a rescan.

pub mod config;
pub mod controller;
pub mod extractor;
pub mod grouper;
pub mod host;
pub mod protocol;
pub mod reconciler;
pub mod registry;
pub mod types;
pub mod walker;

// Re-export commonly used types
pub use config::{ChangeMode, Config, ConfigError};
pub use controller::{ControllerError, PanelController};
pub use grouper::{fingerprint, group_records, GroupOrder};
pub use host::memory::{MemoryDocument, MemoryHost, MemoryNode};
pub use host::{Host, HostEvent, HostNode, HostTextStyle, NodeKind, TextProperties};
pub use protocol::{PanelEvent, PanelRequest, ProtocolError};
pub use reconciler::{ReconcilerState, SelectionDecision, SelectionReconciler};
pub use registry::StyleRegistry;
pub use types::{
    FontSize, GroupingKey, HostError, LetterSpacing, LineHeight, Mixed, NodeId, ScanOutcome,
    ScanScope, StyleDefinition, StyleGroup, StyleInfo, TextAttributeRecord,
};
pub use walker::{walk, TreeWalker, WalkOptions};
