//! Message protocol between the panel and the core.
//!
//! Messages are JSON objects tagged by `type`. On the wire each message is a
//! frame: a 32-bit native-endian length followed by that many bytes of JSON.
//! A zero-length frame or end of stream closes the session.

use crate::grouper::GroupOrder;
use crate::types::{NodeId, ScanOutcome, ScanScope, StyleDefinition, StyleGroup};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame accepted in either direction
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Requests sent by the panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PanelRequest {
    /// Refresh the style registry and return the local styles
    GetLocalTextStyles,
    /// Scan the selection or the whole page
    GetSelectedTextLayers {
        #[serde(default)]
        scope: ScanScope,
        #[serde(default)]
        order: GroupOrder,
    },
    /// Select the given nodes in the host
    SelectNodes { ids: Vec<NodeId> },
    /// Resize the panel surface
    Resize { width: u32, height: u32 },
}

/// Events sent to the panel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PanelEvent {
    ReturnLocalTextStyles { data: Vec<StyleDefinition> },
    ReturnTextLayers { data: Vec<StyleGroup> },
    NoLayerSelected,
    NoTextLayerFound,
    /// The selection changed; the panel should ask for a new scan
    Change,
}

impl PanelEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            PanelEvent::ReturnLocalTextStyles { .. } => "returnLocalTextStyles",
            PanelEvent::ReturnTextLayers { .. } => "returnTextLayers",
            PanelEvent::NoLayerSelected => "noLayerSelected",
            PanelEvent::NoTextLayerFound => "noTextLayerFound",
            PanelEvent::Change => "change",
        }
    }
}

impl From<ScanOutcome> for PanelEvent {
    fn from(outcome: ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::NoLayerSelected => PanelEvent::NoLayerSelected,
            ScanOutcome::NoTextLayerFound => PanelEvent::NoTextLayerFound,
            ScanOutcome::Groups(data) => PanelEvent::ReturnTextLayers { data },
        }
    }
}

/// Errors on the panel channel
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame of {0} bytes exceeds the size limit")]
    FrameTooLarge(usize),

    #[error("Invalid message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read one frame; `None` when the session is over
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Vec<u8>>, ProtocolError> {
    let mut length_bytes = [0u8; 4];

    match reader.read_exact(&mut length_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let length = u32::from_ne_bytes(length_bytes) as usize;
    if length == 0 {
        return Ok(None);
    }
    if length > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(length));
    }

    let mut message = vec![0u8; length];
    reader.read_exact(&mut message).await?;

    Ok(Some(message))
}

/// Write one frame and flush
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &[u8],
) -> Result<(), ProtocolError> {
    if message.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(message.len()));
    }

    let length_bytes = (message.len() as u32).to_ne_bytes();
    writer.write_all(&length_bytes).await?;
    writer.write_all(message).await?;
    writer.flush().await?;

    Ok(())
}

/// Decode a request from a frame body
pub fn decode_request(frame: &[u8]) -> Result<PanelRequest, ProtocolError> {
    Ok(serde_json::from_slice(frame)?)
}

/// Serialize and send one event
pub async fn write_event<W: AsyncWrite + Unpin>(
    writer: &mut W,
    event: &PanelEvent,
) -> Result<(), ProtocolError> {
    let body = serde_json::to_vec(event)?;
    write_frame(writer, &body).await
}
