//! Target discovery against the local debugging endpoint.
//!
//! Queries the endpoint's `/json/list` page listing and filters it down to
//! open Figma document tabs. An unreachable endpoint is a soft failure (empty
//! listing); callers distinguish "no target" from "nothing yet" by retrying.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Figma document URL path fragments, most specific first. Position doubles
/// as the priority used for primary-candidate selection.
pub const URL_PATTERNS: &[&str] = &[
    "figma.com/design/",
    "figma.com/file/",
    "figma.com/board/",
    "figma.com/slides/",
    "figma.com/proto/",
];

/// A discovered tab. Produced fresh on every discovery query, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabDescriptor {
    pub id: String,
    pub title: String,
    pub url: String,
    /// Per-tab WebSocket debugger endpoint.
    pub ws_url: String,
}

/// Index of the first pattern the URL matches; lower wins.
pub fn pattern_rank(url: &str) -> Option<usize> {
    URL_PATTERNS.iter().position(|p| url.contains(p))
}

/// Filter a raw `/json/list` payload down to Figma page tabs, preserving
/// endpoint order. Entries without a WebSocket URL (already attached
/// elsewhere) are skipped.
pub fn filter_design_tabs(raw: &[Value]) -> Vec<TabDescriptor> {
    raw.iter()
        .filter(|t| t.get("type").and_then(|v| v.as_str()) == Some("page"))
        .filter_map(|t| {
            let url = t.get("url")?.as_str()?;
            pattern_rank(url)?;
            Some(TabDescriptor {
                id: t.get("id")?.as_str()?.to_string(),
                title: t
                    .get("title")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                url: url.to_string(),
                ws_url: t.get("webSocketDebuggerUrl")?.as_str()?.to_string(),
            })
        })
        .collect()
}

/// The tab ensure-active should auto-connect to: best pattern rank, ties
/// broken by endpoint order.
pub fn primary_candidate(tabs: &[TabDescriptor]) -> Option<&TabDescriptor> {
    let best = tabs.iter().filter_map(|t| pattern_rank(&t.url)).min()?;
    tabs.iter().find(|t| pattern_rank(&t.url) == Some(best))
}

/// Query `/json/list` on the given port.
pub async fn fetch_targets(port: u16) -> Vec<TabDescriptor> {
    let url = format!("http://127.0.0.1:{}/json/list", port);
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
    {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };

    let resp = match client.get(&url).send().await {
        Ok(r) => r,
        Err(e) => {
            debug!(port, "Discovery endpoint not reachable: {}", e);
            return Vec::new();
        }
    };

    let raw: Vec<Value> = match resp.json().await {
        Ok(v) => v,
        Err(e) => {
            warn!("Discovery endpoint returned a malformed listing: {}", e);
            return Vec::new();
        }
    };

    filter_design_tabs(&raw)
}

/// Discovery seam. Production queries the local endpoint; tests inject
/// synthetic listings.
#[async_trait]
pub trait TargetSource: Send + Sync {
    async fn discover(&self) -> Vec<TabDescriptor>;
}

pub struct HttpTargetSource {
    pub port: u16,
}

#[async_trait]
impl TargetSource for HttpTargetSource {
    async fn discover(&self) -> Vec<TabDescriptor> {
        fetch_targets(self.port).await
    }
}
