//! Panel controller.
//!
//! Owns the host, the style registry and the selection reconciler, answers
//! panel requests and turns host selection changes into scans. Everything
//! runs on one task: the loop in [`PanelController::run`] waits on panel
//! requests, host events and the expiry of the current suppression window.

use crate::config::{ChangeMode, Config};
use crate::grouper::{group_records, sort_groups, GroupOrder};
use crate::host::{Host, HostEvent};
use crate::protocol::{PanelEvent, PanelRequest, ProtocolError};
use crate::reconciler::{SelectionDecision, SelectionReconciler};
use crate::registry::StyleRegistry;
use crate::types::{HostError, NodeId, ScanOutcome, ScanScope};
use crate::walker::walk;
use std::collections::BTreeSet;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Toast shown when a selection scan has nothing to work on
pub const EMPTY_SELECTION_MESSAGE: &str = "Please select at least one layer.";

/// Errors that stop the controller
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Panel event channel closed")]
    ChannelClosed,
}

/// Request dispatcher and scan driver
pub struct PanelController<H: Host> {
    host: H,
    config: Config,
    registry: StyleRegistry,
    reconciler: SelectionReconciler,
    events: mpsc::Sender<PanelEvent>,
    host_events: mpsc::UnboundedReceiver<HostEvent>,
    /// Scope and order of the last explicit scan request, reused by auto-rescans
    last_scope: ScanScope,
    last_order: GroupOrder,
}

impl<H: Host> PanelController<H> {
    pub fn new(
        host: H,
        config: Config,
        events: mpsc::Sender<PanelEvent>,
        host_events: mpsc::UnboundedReceiver<HostEvent>,
    ) -> Self {
        let reconciler = SelectionReconciler::new(config.selection.suppression_window());

        Self {
            host,
            config,
            registry: StyleRegistry::new(),
            reconciler,
            events,
            host_events,
            last_scope: ScanScope::default(),
            last_order: GroupOrder::default(),
        }
    }

    /// Apply the configured panel size
    pub fn init(&mut self) {
        let (width, height) = (self.config.panel.width, self.config.panel.height);
        self.host.resize_panel(width, height);
        info!("Panel controller ready ({}x{})", width, height);
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn reconciler(&self) -> &SelectionReconciler {
        &self.reconciler
    }

    pub fn registry(&self) -> &StyleRegistry {
        &self.registry
    }

    /// Serve until the panel side closes its request channel
    pub async fn run(
        &mut self,
        mut requests: mpsc::Receiver<PanelRequest>,
    ) -> Result<(), ControllerError> {
        loop {
            let suppression = self.reconciler.active_suppression();
            let deadline = suppression
                .map(|token| token.deadline())
                .unwrap_or_else(Instant::now);

            tokio::select! {
                biased;

                _ = sleep_until(deadline), if suppression.is_some() => {
                    if let Some(token) = suppression {
                        self.reconciler.release(token);
                        debug!("Suppression window closed");
                    }
                }
                Some(event) = self.host_events.recv() => {
                    self.handle_host_event(event).await?;
                }
                request = requests.recv() => match request {
                    Some(request) => self.handle_request(request).await?,
                    None => {
                        info!("Request channel closed, stopping controller");
                        return Ok(());
                    }
                },
            }
        }
    }

    /// Answer one panel request
    pub async fn handle_request(&mut self, request: PanelRequest) -> Result<(), ControllerError> {
        debug!("Handling request: {:?}", request);

        match request {
            PanelRequest::GetLocalTextStyles => {
                if let Err(e) = self.registry.refresh(&self.host, &[]).await {
                    warn!("Failed to refresh text styles: {}", e);
                }
                let data = self.registry.local_definitions();
                self.emit(PanelEvent::ReturnLocalTextStyles { data }).await
            }
            PanelRequest::GetSelectedTextLayers { scope, order } => {
                self.last_scope = scope;
                self.last_order = order;
                self.rescan().await
            }
            PanelRequest::SelectNodes { ids } => {
                self.select_nodes(ids);
                Ok(())
            }
            PanelRequest::Resize { width, height } => {
                self.host.resize_panel(width, height);
                Ok(())
            }
        }
    }

    /// React to a host notification
    pub async fn handle_host_event(&mut self, event: HostEvent) -> Result<(), ControllerError> {
        match event {
            HostEvent::SelectionChanged => {
                match self.reconciler.on_selection_changed(Instant::now()) {
                    SelectionDecision::Scan => match self.config.selection.on_change {
                        ChangeMode::Scan => self.rescan().await,
                        ChangeMode::Notify => self.emit(PanelEvent::Change).await,
                    },
                    SelectionDecision::Suppressed | SelectionDecision::Coalesced => Ok(()),
                }
            }
        }
    }

    /// Scan the selection or the whole page and group the text layers
    ///
    /// Does not emit anything; see [`handle_request`](Self::handle_request)
    /// for the panel-facing path.
    pub async fn scan(
        &mut self,
        scope: ScanScope,
        order: GroupOrder,
    ) -> Result<ScanOutcome, ControllerError> {
        let options = self.config.scan.walk_options();

        let walked = {
            let roots = match scope {
                ScanScope::Selection => self.host.selection(),
                ScanScope::All => self.host.page_nodes(),
            };

            if roots.is_empty() {
                info!("Scan ({}): nothing to scan", scope.as_str());
                if scope == ScanScope::Selection {
                    self.host.notify(EMPTY_SELECTION_MESSAGE);
                }
                return Ok(ScanOutcome::NoLayerSelected);
            }

            info!("Scan ({}) started over {} roots", scope.as_str(), roots.len());
            walk(&roots, options).await
        };

        let referenced: Vec<String> = walked
            .records
            .iter()
            .filter_map(|record| record.text_style_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if let Err(e) = self.registry.refresh(&self.host, &referenced).await {
            // Fall back to structural fingerprints rather than stale styles
            warn!("Style registry refresh failed: {}", e);
            self.registry.clear();
        }

        let visited = walked.visited;
        let mut outcome = group_records(walked.records, &self.registry);
        if let ScanOutcome::Groups(groups) = &mut outcome {
            if order != GroupOrder::Usage {
                sort_groups(groups, order);
            }
            info!(
                "Scan ({}) finished: {} nodes visited, {} groups",
                scope.as_str(),
                visited,
                groups.len()
            );
        } else {
            info!(
                "Scan ({}) finished: {} nodes visited, no text layers",
                scope.as_str(),
                visited
            );
        }

        Ok(outcome)
    }

    /// Scan with the last requested scope and emit the result, then run at
    /// most one follow-up for changes that arrived meanwhile
    async fn rescan(&mut self) -> Result<(), ControllerError> {
        if !self.reconciler.begin_scan() {
            debug!("Scan already running, follow-up queued");
            return Ok(());
        }

        loop {
            let result = self.scan(self.last_scope, self.last_order).await;
            self.drain_host_events();
            let again = self.reconciler.finish_scan();

            self.emit(result?.into()).await?;

            if !again {
                return Ok(());
            }
            debug!("Running coalesced rescan");
            self.reconciler.begin_scan();
        }
    }

    /// Feed notifications that queued up during a scan to the reconciler
    fn drain_host_events(&mut self) {
        while let Ok(event) = self.host_events.try_recv() {
            match event {
                HostEvent::SelectionChanged => {
                    self.reconciler.on_selection_changed(Instant::now());
                }
            }
        }
    }

    /// Select nodes in the host without triggering a rescan
    fn select_nodes(&mut self, ids: Vec<NodeId>) {
        let total = ids.len();
        let mut found = Vec::with_capacity(total);
        for id in ids {
            if self.host.find_node(&id).is_some() {
                found.push(id);
            } else {
                warn!("selectNodes: node {} not found, skipping", id);
            }
        }

        if found.is_empty() {
            warn!("selectNodes: none of {} ids resolved, selection left unchanged", total);
            return;
        }

        let token = self.reconciler.arm_suppression(Instant::now());
        info!(
            "Selecting {}/{} nodes (suppressed until {:?})",
            found.len(),
            total,
            token.deadline()
        );
        self.host.set_selection(found);
    }

    async fn emit(&self, event: PanelEvent) -> Result<(), ControllerError> {
        debug!("Emitting {}", event.as_str());
        self.events
            .send(event)
            .await
            .map_err(|_| ControllerError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::{MemoryDocument, MemoryHost, MemoryNode};
    use crate::host::TextProperties;
    use crate::reconciler::ReconcilerState;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn document() -> MemoryDocument {
        MemoryDocument {
            page: vec![MemoryNode::container(
                "1:1",
                vec![
                    MemoryNode::text("1:2", TextProperties::new("Inter", "Regular", 14.0)),
                    MemoryNode::text("1:3", TextProperties::new("Inter", "Regular", 14.0)),
                    MemoryNode::text("1:4", TextProperties::new("Inter", "Bold", 24.0)),
                ],
            )],
            selection: vec!["1:1".to_string()],
            ..Default::default()
        }
    }

    fn controller(
        config: Config,
    ) -> (PanelController<MemoryHost>, mpsc::Receiver<PanelEvent>) {
        let mut host = MemoryHost::new(document());
        let host_events = host.subscribe();
        let (tx, rx) = mpsc::channel(16);
        (PanelController::new(host, config, tx, host_events), rx)
    }

    #[tokio::test]
    async fn test_init_applies_panel_size() {
        let (mut controller, _rx) = controller(Config::default());
        controller.init();
        assert_eq!(controller.host().panel_size(), Some((240, 400)));

        controller
            .handle_request(PanelRequest::Resize { width: 320, height: 480 })
            .await
            .unwrap();
        assert_eq!(controller.host().panel_size(), Some((320, 480)));
    }

    #[tokio::test]
    async fn test_scan_request_emits_groups() {
        let (mut controller, mut rx) = controller(Config::default());

        controller
            .handle_request(PanelRequest::GetSelectedTextLayers {
                scope: ScanScope::Selection,
                order: GroupOrder::Usage,
            })
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            PanelEvent::ReturnTextLayers { data } => {
                assert_eq!(data.len(), 2);
                assert_eq!(data[0].count, 2);
                assert_eq!(data[0].member_ids, vec!["1:2", "1:3"]);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(controller.reconciler().state(), ReconcilerState::Idle);
    }

    #[tokio::test]
    async fn test_size_order() {
        let (mut controller, _rx) = controller(Config::default());

        let outcome = controller
            .scan(ScanScope::All, GroupOrder::Size)
            .await
            .unwrap();
        match outcome {
            ScanOutcome::Groups(groups) => assert_eq!(groups[0].member_ids, vec!["1:4"]),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_selection_notifies_host() {
        let (mut controller, _rx) = controller(Config::default());
        controller.host_mut().set_selection(vec![]);

        let outcome = controller
            .scan(ScanScope::Selection, GroupOrder::Usage)
            .await
            .unwrap();

        assert_eq!(outcome, ScanOutcome::NoLayerSelected);
        assert_eq!(controller.host().notifications(), vec![EMPTY_SELECTION_MESSAGE]);
    }

    #[tokio::test]
    async fn test_select_nodes_skips_unknown_ids() {
        let (mut controller, _rx) = controller(Config::default());

        controller
            .handle_request(PanelRequest::SelectNodes {
                ids: vec!["1:2".to_string(), "7:7".to_string(), "1:4".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(controller.host().document().selection, vec!["1:2", "1:4"]);
        assert_eq!(
            controller.reconciler().state(),
            ReconcilerState::SuppressingOwnSelection
        );
    }

    #[tokio::test]
    async fn test_select_nodes_with_no_known_ids_keeps_selection() {
        let (mut controller, _rx) = controller(Config::default());

        controller
            .handle_request(PanelRequest::SelectNodes {
                ids: vec!["7:7".to_string(), "8:8".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(controller.host().document().selection, vec!["1:1"]);
        assert_eq!(controller.reconciler().state(), ReconcilerState::Idle);
        assert!(controller.reconciler().active_suppression().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_own_selection_does_not_rescan() {
        let (mut controller, mut rx) = controller(Config::default());

        controller
            .handle_request(PanelRequest::SelectNodes {
                ids: vec!["1:4".to_string()],
            })
            .await
            .unwrap();
        controller
            .handle_host_event(HostEvent::SelectionChanged)
            .await
            .unwrap();

        assert!(rx.try_recv().is_err());
        assert_eq!(controller.reconciler().suppressed_total(), 1);

        tokio::time::advance(Duration::from_millis(500)).await;
        controller
            .handle_host_event(HostEvent::SelectionChanged)
            .await
            .unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            PanelEvent::ReturnTextLayers { .. }
        ));
    }

    #[tokio::test]
    async fn test_notify_mode_emits_change() {
        let mut config = Config::default();
        config.selection.on_change = ChangeMode::Notify;
        let (mut controller, mut rx) = controller(config);

        controller
            .handle_host_event(HostEvent::SelectionChanged)
            .await
            .unwrap();
        assert_eq!(rx.try_recv().unwrap(), PanelEvent::Change);
    }

    #[tokio::test]
    async fn test_changes_during_scan_coalesce_into_one_follow_up() {
        let (mut controller, mut rx) = controller(Config::default());

        // Pretend these arrived while the first scan was running
        controller.host_mut().set_selection(vec!["1:2".to_string()]);
        controller.host_mut().set_selection(vec!["1:2".to_string()]);

        controller
            .handle_request(PanelRequest::GetSelectedTextLayers {
                scope: ScanScope::Selection,
                order: GroupOrder::Usage,
            })
            .await
            .unwrap();

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
        assert_eq!(controller.reconciler().state(), ReconcilerState::Idle);
    }

    #[tokio::test]
    async fn test_local_styles_request() {
        let (mut controller, mut rx) = controller(Config::default());

        controller
            .handle_request(PanelRequest::GetLocalTextStyles)
            .await
            .unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            PanelEvent::ReturnLocalTextStyles { data: vec![] }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_releases_suppression_and_stops_on_close() {
        let (mut controller, mut rx) = controller(Config::default());
        let (tx, requests) = mpsc::channel(4);

        tx.send(PanelRequest::SelectNodes {
            ids: vec!["1:3".to_string()],
        })
        .await
        .unwrap();

        {
            let run = controller.run(requests);
            tokio::pin!(run);

            // Let the request and the resulting notification be handled
            tokio::select! {
                _ = &mut run => panic!("controller stopped early"),
                _ = tokio::time::sleep(Duration::from_millis(100)) => {}
            }
            // Past the window the token is released by the loop itself
            tokio::select! {
                _ = &mut run => panic!("controller stopped early"),
                _ = tokio::time::sleep(Duration::from_millis(600)) => {}
            }

            drop(tx);
            run.await.unwrap();
        }

        assert!(rx.try_recv().is_err());
        assert_eq!(controller.reconciler().suppressed_total(), 1);
        assert_eq!(controller.reconciler().state(), ReconcilerState::Idle);
    }
}
