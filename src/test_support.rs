use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use crate::bridge::ToolDescriptor;
use crate::error::{ProxyError, Result};
use crate::options::ProxyOptions;
use crate::proxy::NegotiateOps;
use crate::registry::ToolRegistry;
use crate::schema::MCPToolSchema;
use crate::session::{MCPToolCallResult, SessionOps};

pub(crate) fn tool_schema(name: &str) -> MCPToolSchema {
    MCPToolSchema {
        name: name.into(),
        description: None,
        input_schema: json!({ "type": "object" }),
    }
}

/// In-memory stand-in for a negotiated MCP session.
pub(crate) struct MockSession {
    tools: Vec<MCPToolSchema>,
    fail_listing: bool,
    calls: Mutex<Vec<(String, serde_json::Value)>>,
    close_calls: AtomicUsize,
}

impl MockSession {
    pub(crate) fn with_tools(tools: Vec<MCPToolSchema>) -> Arc<Self> {
        Arc::new(Self {
            tools,
            fail_listing: false,
            calls: Mutex::new(Vec::new()),
            close_calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing_listing() -> Arc<Self> {
        Arc::new(Self {
            tools: Vec::new(),
            fail_listing: true,
            calls: Mutex::new(Vec::new()),
            close_calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> Vec<(String, serde_json::Value)> {
        self.calls.lock().expect("mock lock poisoned").clone()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionOps for MockSession {
    async fn list_tools(&self) -> Result<Vec<MCPToolSchema>> {
        if self.fail_listing {
            return Err(ProxyError::protocol("tools/list", "mock listing failure"));
        }
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<MCPToolCallResult> {
        self.calls
            .lock()
            .expect("mock lock poisoned")
            .push((name.to_owned(), arguments.clone()));
        Ok(MCPToolCallResult {
            structured_content: Some(json!({ "tool": name, "arguments": arguments })),
            text_content: None,
            content: Vec::new(),
        })
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Scripted negotiation outcome for one endpoint URL.
#[derive(Clone)]
pub(crate) struct MockPlan {
    pub(crate) session: Arc<MockSession>,
    /// Signalled when negotiation for this URL begins.
    pub(crate) entered: Option<Arc<Notify>>,
    /// Held until notified, to interleave overlapping attempts.
    pub(crate) gate: Option<Arc<Notify>>,
    pub(crate) fail: bool,
}

impl MockPlan {
    pub(crate) fn immediate(session: Arc<MockSession>) -> Self {
        Self {
            session,
            entered: None,
            gate: None,
            fail: false,
        }
    }
}

/// Negotiator that replays scripted plans instead of dialing endpoints.
///
/// Panics on an unplanned URL, which doubles as an assertion that the
/// endpoint was never contacted.
#[derive(Default)]
pub(crate) struct MockNegotiator {
    plans: Mutex<HashMap<String, MockPlan>>,
}

impl MockNegotiator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn plan(self, url: &str, plan: MockPlan) -> Self {
        self.plans
            .lock()
            .expect("mock lock poisoned")
            .insert(url.to_owned(), plan);
        self
    }
}

#[async_trait]
impl NegotiateOps for MockNegotiator {
    async fn negotiate(&self, options: &ProxyOptions) -> Result<Arc<dyn SessionOps>> {
        let plan = self
            .plans
            .lock()
            .expect("mock lock poisoned")
            .get(&options.url)
            .cloned()
            .unwrap_or_else(|| panic!("unexpected negotiation for {}", options.url));

        if let Some(entered) = &plan.entered {
            entered.notify_one();
        }
        if let Some(gate) = &plan.gate {
            gate.notified().await;
        }
        if plan.fail {
            return Err(ProxyError::Connection {
                url: options.url.clone(),
                message: "mock negotiation failure".into(),
            });
        }
        Ok(plan.session)
    }
}

/// Registry that records every register/unregister in call order.
pub(crate) struct RecordingRegistry {
    events: Mutex<Vec<String>>,
    registered: Mutex<Vec<String>>,
}

impl RecordingRegistry {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            registered: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().expect("mock lock poisoned").clone()
    }

    pub(crate) fn registered_names(&self) -> Vec<String> {
        self.registered.lock().expect("mock lock poisoned").clone()
    }
}

impl ToolRegistry for RecordingRegistry {
    fn register_tool(&self, descriptor: ToolDescriptor) {
        let name = descriptor.name().to_owned();
        self.events
            .lock()
            .expect("mock lock poisoned")
            .push(format!("register:{name}"));
        let mut registered = self.registered.lock().expect("mock lock poisoned");
        if !registered.contains(&name) {
            registered.push(name);
        }
    }

    fn unregister_tool(&self, name: &str) {
        self.events
            .lock()
            .expect("mock lock poisoned")
            .push(format!("unregister:{name}"));
        self.registered
            .lock()
            .expect("mock lock poisoned")
            .retain(|registered| registered != name);
    }
}
