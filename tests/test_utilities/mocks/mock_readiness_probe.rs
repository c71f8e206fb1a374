use async_trait::async_trait;
use cdn_harness::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

/// Mock ReadinessProbe that succeeds from the `ready_on`-th call onwards
pub struct MockReadinessProbe {
    ready_on: Option<u32>,
    calls: AtomicU32,
}

impl MockReadinessProbe {
    pub fn ready_on(attempt: u32) -> Self {
        Self {
            ready_on: Some(attempt),
            calls: AtomicU32::new(0),
        }
    }

    pub fn never_ready() -> Self {
        Self {
            ready_on: None,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ReadinessProbe for MockReadinessProbe {
    async fn probe(&self) -> CdnResult<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.ready_on {
            Some(ready_on) if call >= ready_on => Ok(()),
            _ => Err(CdnError::Status {
                url: self.address().to_string(),
                status: 503,
                message: Some("starting".to_string()),
            }),
        }
    }

    fn address(&self) -> &str {
        "http://127.0.0.1:1"
    }
}
