//! Mock oracle for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use rubricon_core::traits::{OracleReply, OracleRequest, ScoringOracle};

/// A mock scoring oracle for exercising the engine without an LLM.
///
/// Replies are chosen by substring match against the question; the first
/// matching entry wins, else the default reply.
pub struct MockOracle {
    /// Question substring to canned reply.
    replies: HashMap<String, OracleReply>,
    default_reply: OracleReply,
    call_count: AtomicU32,
    last_request: Mutex<Option<OracleRequest>>,
}

impl MockOracle {
    pub fn new(replies: HashMap<String, OracleReply>, default_reply: OracleReply) -> Self {
        Self {
            replies,
            default_reply,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// A mock that always returns the same reply.
    pub fn with_fixed_reply(reply: OracleReply) -> Self {
        Self::new(HashMap::new(), reply)
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<OracleRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScoringOracle for MockOracle {
    fn name(&self) -> &str {
        "mock"
    }

    async fn score(&self, request: &OracleRequest) -> anyhow::Result<OracleReply> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap() = Some(request.clone());

        let reply = self
            .replies
            .iter()
            .find(|(key, _)| request.question.contains(key.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default_reply.clone());
        Ok(reply)
    }
}
