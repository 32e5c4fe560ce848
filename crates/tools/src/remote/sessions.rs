//! Session registry: which tabs are known, which are connected, which one is
//! active. Every capability obtains its guaranteed-live connection here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use figbridge_core::{Error, Result};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::cdp::{CdpConnector, TabConnector, TabTransport};
use super::discovery::{self, HttpTargetSource, TabDescriptor, TargetSource};

/// A live connection bound to one tab. Title and URL are snapshots taken at
/// connect time; discovery listings carry the current values.
#[derive(Clone)]
pub struct TabSession {
    pub id: String,
    pub title: String,
    pub url: String,
    pub transport: Arc<dyn TabTransport>,
}

impl std::fmt::Debug for TabSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabSession")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl TabSession {
    /// Liveness probe: an inert evaluation. A probe failure counts as
    /// disconnected even if no close event fired.
    pub async fn probe(&self) -> bool {
        self.transport
            .call(
                "Runtime.evaluate",
                json!({"expression": "true", "returnByValue": true}),
            )
            .await
            .is_ok()
    }

    /// Evaluate an expression with promise awaiting and by-value results.
    /// Returns the raw `Runtime.evaluate` payload.
    pub async fn evaluate(&self, expression: &str) -> Result<serde_json::Value> {
        self.transport
            .call(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await
    }
}

/// One row of the list operation.
#[derive(Debug, Clone)]
pub struct TargetStatus {
    pub descriptor: TabDescriptor,
    pub connected: bool,
    pub active: bool,
}

pub struct SessionRegistry {
    source: Arc<dyn TargetSource>,
    connector: Arc<dyn TabConnector>,
    sessions: HashMap<String, TabSession>,
    active: Option<String>,
    closed_tx: mpsc::UnboundedSender<String>,
    closed_rx: mpsc::UnboundedReceiver<String>,
    connect_attempts: u32,
    connect_retry_delay: Duration,
}

impl SessionRegistry {
    pub fn new(port: u16, connect_attempts: u32, connect_retry_delay: Duration) -> Self {
        Self::with_parts(
            Arc::new(HttpTargetSource { port }),
            Arc::new(CdpConnector),
            connect_attempts,
            connect_retry_delay,
        )
    }

    /// Construct with injected discovery and connector implementations.
    pub fn with_parts(
        source: Arc<dyn TargetSource>,
        connector: Arc<dyn TabConnector>,
        connect_attempts: u32,
        connect_retry_delay: Duration,
    ) -> Self {
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        Self {
            source,
            connector,
            sessions: HashMap::new(),
            active: None,
            closed_tx,
            closed_rx,
            connect_attempts,
            connect_retry_delay,
        }
    }

    /// Transport-close events all funnel through here; every public
    /// operation drains them before touching the map, so there is exactly
    /// one code path that removes entries for transport loss.
    fn drain_closed(&mut self) {
        while let Ok(id) = self.closed_rx.try_recv() {
            if self.sessions.remove(&id).is_some() {
                info!(tab = %id, "Session transport closed, entry dropped");
            }
            if self.active.as_deref() == Some(id.as_str()) {
                self.active = None;
            }
        }
    }

    /// Discovery listing annotated with connection and active flags. Does
    /// not connect or probe.
    pub async fn list(&mut self) -> Vec<TargetStatus> {
        self.drain_closed();
        let targets = self.source.discover().await;
        targets
            .into_iter()
            .map(|d| TargetStatus {
                connected: self.sessions.contains_key(&d.id),
                active: self.active.as_deref() == Some(d.id.as_str()),
                descriptor: d,
            })
            .collect()
    }

    /// Return a live connection for the active tab, establishing one if
    /// absent. Repeated calls with a healthy connection are idempotent.
    pub async fn ensure_active(&mut self) -> Result<TabSession> {
        self.drain_closed();

        if let Some(id) = self.active.clone() {
            match self.sessions.get(&id).cloned() {
                Some(session) => {
                    if session.probe().await {
                        return Ok(session);
                    }
                    warn!(tab = %id, "Active session failed liveness probe, discarding");
                    self.sessions.remove(&id);
                    self.active = None;
                }
                None => self.active = None,
            }
        }

        // No usable active session: discover with bounded retry and connect
        // to the highest-priority candidate.
        let mut candidate = None;
        for attempt in 0..self.connect_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.connect_retry_delay).await;
            }
            let targets = self.source.discover().await;
            if let Some(primary) = discovery::primary_candidate(&targets) {
                candidate = Some(primary.clone());
                break;
            }
            debug!(attempt = attempt + 1, "No Figma tab discovered yet");
        }

        let tab = candidate.ok_or_else(|| {
            Error::NoTarget(
                "No Figma tab found. Open a Figma document in a browser started with \
                 --remote-debugging-port and try again."
                    .to_string(),
            )
        })?;

        self.connect_and_activate(tab).await
    }

    /// Resolve an identifier against the current discovery listing and make
    /// the resolved tab active, reusing a live connection when one exists.
    pub async fn switch_to(&mut self, ident: &str) -> Result<TabSession> {
        self.drain_closed();

        let targets = self.source.discover().await;
        if targets.is_empty() {
            return Err(Error::NoTarget(
                "No Figma tabs discovered; nothing to switch to".to_string(),
            ));
        }

        let tab = match resolve_target(&targets, ident) {
            Some(t) => t.clone(),
            None => {
                return Err(Error::NotFound(format!(
                    "No tab matches '{}'. Currently open:\n{}",
                    ident,
                    render_candidates(&targets)
                )))
            }
        };

        self.connect_and_activate(tab).await
    }

    /// Identifier, title and URL of the active connection. Pure read of
    /// local state; no network or protocol activity.
    pub fn active_info(&mut self) -> Option<(String, String, String)> {
        self.drain_closed();
        let id = self.active.as_ref()?;
        let s = self.sessions.get(id)?;
        Some((s.id.clone(), s.title.clone(), s.url.clone()))
    }

    /// The active session handle, if one exists. Local state only.
    pub fn active_session(&mut self) -> Option<TabSession> {
        self.drain_closed();
        let id = self.active.as_ref()?;
        self.sessions.get(id).cloned()
    }

    async fn connect_and_activate(&mut self, tab: TabDescriptor) -> Result<TabSession> {
        // Reuse a live connection when one is already held for this tab.
        if let Some(existing) = self.sessions.get(&tab.id).cloned() {
            if existing.probe().await {
                self.active = Some(tab.id.clone());
                return Ok(existing);
            }
            self.sessions.remove(&tab.id);
        }

        let transport = self.connector.connect(&tab, self.closed_tx.clone()).await?;
        let session = TabSession {
            id: tab.id.clone(),
            title: tab.title.clone(),
            url: tab.url.clone(),
            transport,
        };
        info!(tab = %tab.id, title = %tab.title, "Connected to Figma tab");
        self.sessions.insert(tab.id.clone(), session.clone());
        self.active = Some(tab.id);
        Ok(session)
    }
}

/// Ordered identifier resolution: exact id, case-insensitive title
/// substring, case-insensitive URL substring, 1-based ordinal index. The
/// first strategy yielding a match wins, and the first match within it.
pub fn resolve_target<'a>(targets: &'a [TabDescriptor], ident: &str) -> Option<&'a TabDescriptor> {
    if let Some(t) = targets.iter().find(|t| t.id == ident) {
        return Some(t);
    }
    let needle = ident.to_lowercase();
    if let Some(t) = targets
        .iter()
        .find(|t| t.title.to_lowercase().contains(&needle))
    {
        return Some(t);
    }
    if let Some(t) = targets
        .iter()
        .find(|t| t.url.to_lowercase().contains(&needle))
    {
        return Some(t);
    }
    if let Ok(n) = ident.parse::<usize>() {
        if n >= 1 {
            return targets.get(n - 1);
        }
    }
    None
}

/// Human-readable candidate listing embedded in switch failures.
pub fn render_candidates(targets: &[TabDescriptor]) -> String {
    targets
        .iter()
        .enumerate()
        .map(|(i, t)| format!("  {}. [{}] {} — {}", i + 1, t.id, t.title, t.url))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    fn tab(id: &str, title: &str, url: &str) -> TabDescriptor {
        TabDescriptor {
            id: id.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            ws_url: format!("ws://127.0.0.1:9222/devtools/page/{}", id),
        }
    }

    struct FakeSource {
        tabs: StdMutex<Vec<TabDescriptor>>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(tabs: Vec<TabDescriptor>) -> Arc<Self> {
            Arc::new(Self {
                tabs: StdMutex::new(tabs),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TargetSource for FakeSource {
        async fn discover(&self) -> Vec<TabDescriptor> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tabs.lock().unwrap().clone()
        }
    }

    struct FakeTransport {
        alive: Arc<AtomicBool>,
    }

    #[async_trait]
    impl TabTransport for FakeTransport {
        async fn call(&self, _method: &str, _params: Value) -> Result<Value> {
            if self.alive.load(Ordering::SeqCst) {
                Ok(json!({"result": {"type": "boolean", "value": true}}))
            } else {
                Err(Error::Session("transport gone".to_string()))
            }
        }
    }

    struct FakeConnector {
        connects: AtomicUsize,
        alive: Arc<AtomicBool>,
        closed_tx: StdMutex<Option<mpsc::UnboundedSender<String>>>,
    }

    impl FakeConnector {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                connects: AtomicUsize::new(0),
                alive: Arc::new(AtomicBool::new(true)),
                closed_tx: StdMutex::new(None),
            })
        }
    }

    #[async_trait]
    impl TabConnector for FakeConnector {
        async fn connect(
            &self,
            _tab: &TabDescriptor,
            closed_tx: mpsc::UnboundedSender<String>,
        ) -> Result<Arc<dyn TabTransport>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            *self.closed_tx.lock().unwrap() = Some(closed_tx);
            Ok(Arc::new(FakeTransport {
                alive: self.alive.clone(),
            }))
        }
    }

    fn registry(
        source: Arc<FakeSource>,
        connector: Arc<FakeConnector>,
    ) -> SessionRegistry {
        SessionRegistry::with_parts(source, connector, 3, Duration::from_millis(0))
    }

    #[tokio::test]
    async fn test_ensure_active_connects_single_candidate() {
        let source = FakeSource::new(vec![tab(
            "7",
            "Home",
            "https://www.figma.com/design/abc/Home",
        )]);
        let connector = FakeConnector::new();
        let mut reg = registry(source, connector.clone());

        let session = reg.ensure_active().await.unwrap();
        assert_eq!(session.id, "7");
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(reg.active_info().unwrap().0, "7");
    }

    #[tokio::test]
    async fn test_ensure_active_is_idempotent() {
        let source = FakeSource::new(vec![tab(
            "7",
            "Home",
            "https://www.figma.com/design/abc/Home",
        )]);
        let connector = FakeConnector::new();
        let mut reg = registry(source, connector.clone());

        let first = reg.ensure_active().await.unwrap();
        let second = reg.ensure_active().await.unwrap();
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first.transport, &second.transport));
    }

    #[tokio::test]
    async fn test_ensure_active_retries_then_no_target() {
        let source = FakeSource::new(vec![]);
        let connector = FakeConnector::new();
        let mut reg = registry(source.clone(), connector);

        let err = reg.ensure_active().await.unwrap_err();
        assert!(matches!(err, Error::NoTarget(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transport_loss_invalidates_active_pointer() {
        let source = FakeSource::new(vec![tab(
            "7",
            "Home",
            "https://www.figma.com/design/abc/Home",
        )]);
        let connector = FakeConnector::new();
        let mut reg = registry(source, connector.clone());

        reg.ensure_active().await.unwrap();

        // Simulated transport loss: the reader task would emit this event.
        let tx = connector.closed_tx.lock().unwrap().clone().unwrap();
        tx.send("7".to_string()).unwrap();

        assert!(reg.active_info().is_none());

        // Next ensure-active rediscovers and reconnects instead of reusing
        // the dead handle.
        let session = reg.ensure_active().await.unwrap();
        assert_eq!(session.id, "7");
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_probe_failure_forces_reconnect() {
        let source = FakeSource::new(vec![tab(
            "7",
            "Home",
            "https://www.figma.com/design/abc/Home",
        )]);
        let connector = FakeConnector::new();
        let mut reg = registry(source, connector.clone());

        reg.ensure_active().await.unwrap();
        connector.alive.store(false, Ordering::SeqCst);

        // Probe fails, the stale entry is dropped, and a fresh connection is
        // made (the fake connector hands back a transport sharing the same
        // flag, which is fine — fresh connections are trusted unprobed).
        reg.ensure_active().await.unwrap();
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_switch_reuses_live_connection() {
        let source = FakeSource::new(vec![
            tab("7", "Home", "https://www.figma.com/design/abc/Home"),
            tab("9", "Dashboard", "https://www.figma.com/design/def/Dash"),
        ]);
        let connector = FakeConnector::new();
        let mut reg = registry(source, connector.clone());

        reg.ensure_active().await.unwrap();
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);

        let session = reg.switch_to("7").await.unwrap();
        assert_eq!(session.id, "7");
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_switch_failure_lists_candidates() {
        let source = FakeSource::new(vec![
            tab("7", "Home", "https://www.figma.com/design/abc/Home"),
            tab("9", "Dashboard", "https://www.figma.com/design/def/Dash"),
        ]);
        let connector = FakeConnector::new();
        let mut reg = registry(source, connector);

        let err = reg.switch_to("nomatch").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Home"));
        assert!(msg.contains("Dashboard"));
    }

    #[tokio::test]
    async fn test_switch_with_empty_discovery_fails() {
        let source = FakeSource::new(vec![]);
        let connector = FakeConnector::new();
        let mut reg = registry(source, connector);

        let err = reg.switch_to("anything").await.unwrap_err();
        assert!(matches!(err, Error::NoTarget(_)));
    }

    #[tokio::test]
    async fn test_list_reports_flags() {
        let source = FakeSource::new(vec![
            tab("7", "Home", "https://www.figma.com/design/abc/Home"),
            tab("9", "Dashboard", "https://www.figma.com/design/def/Dash"),
        ]);
        let connector = FakeConnector::new();
        let mut reg = registry(source, connector);

        reg.ensure_active().await.unwrap();
        let listing = reg.list().await;
        assert_eq!(listing.len(), 2);
        assert!(listing[0].connected && listing[0].active);
        assert!(!listing[1].connected && !listing[1].active);
    }

    #[test]
    fn test_resolution_precedence() {
        let targets = vec![
            tab("7", "Home", "https://www.figma.com/design/abc/Home"),
            tab("9", "Dashboard", "https://www.figma.com/design/def/Dash"),
        ];

        // Title substring.
        assert_eq!(resolve_target(&targets, "dash").unwrap().id, "9");
        // Exact id beats ordinal.
        assert_eq!(resolve_target(&targets, "7").unwrap().id, "7");
        // Ordinal index, 1-based.
        assert_eq!(resolve_target(&targets, "2").unwrap().id, "9");
        // URL substring.
        assert_eq!(resolve_target(&targets, "def").unwrap().id, "9");
        // No match.
        assert!(resolve_target(&targets, "nomatch").is_none());
        // Ordinal out of range.
        assert!(resolve_target(&targets, "3").is_none());
        assert!(resolve_target(&targets, "0").is_none());
    }
}
