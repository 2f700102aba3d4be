//! Scripted transport for tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::oneshot;

use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::error::ApiError;

#[derive(Clone)]
enum Canned {
    Reply(u16, String),
    Fail(String),
}

impl Canned {
    fn into_result(self) -> Result<ApiResponse, ApiError> {
        match self {
            Self::Reply(status, body) => Ok(ApiResponse { status, body }),
            Self::Fail(msg) => Err(ApiError::Transport(msg)),
        }
    }
}

struct Queued {
    gate: Option<oneshot::Receiver<()>>,
    canned: Canned,
}

#[derive(Default)]
struct Script {
    queue: VecDeque<Queued>,
    sticky: Option<Canned>,
}

/// Replays canned responses keyed by `"METHOD /path"`.
///
/// Queued responses are used first, in order; once the queue is empty the
/// sticky response (if any) answers every call.
#[derive(Default)]
pub(crate) struct MockTransport {
    scripts: Mutex<HashMap<String, Script>>,
    log: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn with_script(&self, route: &str, f: impl FnOnce(&mut Script)) {
        let mut scripts = self.scripts.lock().unwrap();
        f(scripts.entry(route.to_string()).or_default());
    }

    pub(crate) fn always(&self, route: &str, status: u16, body: serde_json::Value) {
        self.always_raw(route, status, &body.to_string());
    }

    pub(crate) fn always_raw(&self, route: &str, status: u16, body: &str) {
        let canned = Canned::Reply(status, body.to_string());
        self.with_script(route, |s| s.sticky = Some(canned));
    }

    pub(crate) fn fail_always(&self, route: &str, msg: &str) {
        let canned = Canned::Fail(msg.to_string());
        self.with_script(route, |s| s.sticky = Some(canned));
    }

    pub(crate) fn once(&self, route: &str, status: u16, body: serde_json::Value) {
        let canned = Canned::Reply(status, body.to_string());
        self.with_script(route, |s| s.queue.push_back(Queued { gate: None, canned }));
    }

    /// Queue a response that is held back until the returned sender fires.
    pub(crate) fn gated(
        &self,
        route: &str,
        status: u16,
        body: serde_json::Value,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        let canned = Canned::Reply(status, body.to_string());
        self.with_script(route, |s| {
            s.queue.push_back(Queued {
                gate: Some(rx),
                canned,
            })
        });
        tx
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, route: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.label() == route)
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let route = request.label();
        self.log.lock().unwrap().push(request);

        let next = {
            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts.get_mut(&route);
            match script {
                Some(s) => match s.queue.pop_front() {
                    Some(q) => Some((q.gate, q.canned)),
                    None => s.sticky.clone().map(|c| (None, c)),
                },
                None => None,
            }
        };

        let Some((gate, canned)) = next else {
            return Ok(ApiResponse {
                status: 404,
                body: format!(r#"{{"detail":"no script for {}"}}"#, route),
            });
        };

        if let Some(gate) = gate {
            let _ = gate.await;
        }
        canned.into_result()
    }
}
