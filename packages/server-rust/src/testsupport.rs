//! Shared helpers for unit and integration tests: canned requests and a
//! scriptable processor stub.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use crossbar_core::{codes, response_mti, AuthRequest, AuthResponse};
use parking_lot::Mutex;

use crate::processor::{AuthProcessor, ProcessorError};

/// Builds an authorization request with the usual test fields.
pub fn auth_request(pan: &str, amount: &str, stan: &str) -> AuthRequest {
    AuthRequest {
        mti: "0100".to_string(),
        pan: pan.to_string(),
        amount: amount.to_string(),
        transmission_time: "0704120000".to_string(),
        stan: stan.to_string(),
        region: None,
    }
}

/// One scripted behavior for [`ScriptedProcessor`].
#[derive(Debug, Clone)]
pub enum Script {
    /// Reply with the given response code.
    Reply(&'static str),
    /// Fail with a retryable processor error.
    Fail(&'static str),
    /// Sleep, then approve. Long enough delays trip the caller's deadline.
    Delay(Duration),
}

/// Processor stub that plays back a script, then approves everything.
#[derive(Debug, Default)]
pub struct ScriptedProcessor {
    script: Mutex<VecDeque<Script>>,
    calls: AtomicUsize,
}

impl ScriptedProcessor {
    /// A stub that approves every request.
    pub fn approving() -> Self {
        Self::default()
    }

    /// A stub that plays the given script in order, then approves.
    pub fn with_script(script: impl IntoIterator<Item = Script>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `process_auth` calls observed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn reply(request: &AuthRequest, code: &str) -> AuthResponse {
        AuthResponse {
            mti: response_mti(&request.mti),
            pan: request.pan.clone(),
            amount: request.amount.clone(),
            transmission_time: request.transmission_time.clone(),
            stan: request.stan.clone(),
            response_code: code.to_string(),
            processing_time_ms: 1,
        }
    }
}

#[async_trait]
impl AuthProcessor for ScriptedProcessor {
    async fn process_auth(&self, request: &AuthRequest) -> Result<AuthResponse, ProcessorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            None => Ok(Self::reply(request, codes::APPROVED)),
            Some(Script::Reply(code)) => Ok(Self::reply(request, code)),
            Some(Script::Fail(msg)) => Err(ProcessorError::Unavailable(msg.to_string())),
            Some(Script::Delay(d)) => {
                tokio::time::sleep(d).await;
                Ok(Self::reply(request, codes::APPROVED))
            }
        }
    }
}
