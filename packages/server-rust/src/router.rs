//! The pipeline behind the legacy link: translate the inbound frame, run
//! the payment workflow, translate the response back.
//!
//! Network-management messages (`0800`) are answered at this hop with an
//! echo; they never enter the workflow and never produce audit records.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use crossbar_core::fields::field;
use crossbar_core::{
    codes, reply_frame, request_from_frame, response_mti, response_to_frame, IsoMessage,
    WireError,
};

use crate::network::MessageHandler;
use crate::workflow::PaymentWorkflow;

/// Authorization request message class.
pub const MTI_AUTH_REQUEST: &str = "0100";
/// Network-management (echo) message class.
pub const MTI_NETWORK_MANAGEMENT: &str = "0800";

/// The router's frame pipeline.
pub struct AuthRouter {
    workflow: Arc<PaymentWorkflow>,
}

impl AuthRouter {
    #[must_use]
    pub fn new(workflow: Arc<PaymentWorkflow>) -> Self {
        Self { workflow }
    }

    async fn authorize(&self, frame: IsoMessage) -> Result<IsoMessage, WireError> {
        let request = request_from_frame(&frame)?;

        // One workflow instance per inbound request, keyed by stan plus
        // wall clock so a reused stan starts a fresh instance.
        let workflow_id = format!("{}-{}", request.stan, Utc::now().timestamp_millis());
        let response = self.workflow.execute(&workflow_id, request).await;

        response_to_frame(&response, &frame)
    }

    /// Link-level echo for network-management messages, built by the same
    /// reply constructor as every other outbound frame.
    fn echo(frame: &IsoMessage) -> Result<IsoMessage, WireError> {
        let mti = frame.mti().unwrap_or(MTI_NETWORK_MANAGEMENT);
        reply_frame(frame, &response_mti(mti), codes::APPROVED)
    }
}

#[async_trait]
impl MessageHandler for AuthRouter {
    async fn handle_message(&self, frame: IsoMessage) -> Result<IsoMessage, WireError> {
        match frame.mti() {
            Some(MTI_AUTH_REQUEST) => self.authorize(frame).await,
            Some(MTI_NETWORK_MANAGEMENT) => Self::echo(&frame),
            Some(other) => Err(WireError::UnsupportedMessageClass {
                mti: other.to_string(),
            }),
            None => Err(WireError::MissingField { field: field::MTI }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::dispatch::Dispatcher;
    use crate::processor::{AuthProcessor, ProcessorMap};
    use crate::routing::{BreakerConfig, HealthRegistry, RouteTable};
    use crate::screen::NullScreen;
    use crate::storage::{AuthStore, MemoryStore};
    use crate::testsupport::ScriptedProcessor;
    use crate::workflow::{
        Activities, MemoryStateStore, PaymentWorkflow, WorkflowConfig, WorkflowStateStore,
    };

    fn router() -> AuthRouter {
        let mut routes = BTreeMap::new();
        routes.insert("4".to_string(), "us_east".to_string());
        let table = RouteTable::build(&routes, "us_east").unwrap();
        let health = Arc::new(HealthRegistry::new(["us_east"], BreakerConfig::default()));
        let store = Arc::new(MemoryStore::new());

        let mut processors = ProcessorMap::new();
        processors.insert(
            "us_east".to_string(),
            Arc::new(ScriptedProcessor::approving()) as Arc<dyn AuthProcessor>,
        );
        let mut timeouts = HashMap::new();
        timeouts.insert("us_east".to_string(), Duration::from_millis(500));

        let dispatcher = Arc::new(Dispatcher::new(
            table,
            health,
            processors,
            timeouts,
            HashMap::new(),
            Arc::clone(&store) as Arc<dyn AuthStore>,
            None,
        ));
        let activities = Arc::new(Activities::new(
            Arc::new(NullScreen),
            dispatcher,
            Arc::new(crate::audit::NullLog),
            store,
        ));
        AuthRouter::new(Arc::new(PaymentWorkflow::new(
            activities,
            Arc::new(MemoryStateStore::new()) as Arc<dyn WorkflowStateStore>,
            WorkflowConfig::default(),
        )))
    }

    fn auth_frame(stan: &str) -> IsoMessage {
        let mut msg = IsoMessage::with_mti("0100").unwrap();
        msg.set(field::PAN, "4111111111111111").unwrap();
        msg.set(field::AMOUNT, "000000005000").unwrap();
        msg.set(field::TRANSMISSION_TIME, "0704120000").unwrap();
        msg.set(field::STAN, stan).unwrap();
        msg
    }

    #[tokio::test]
    async fn authorization_runs_the_workflow() {
        let reply = router()
            .handle_message(auth_frame("000001"))
            .await
            .unwrap();
        assert_eq!(reply.mti(), Some("0110"));
        assert_eq!(reply.get(field::STAN), Some("000001"));
        assert_eq!(reply.get(field::RESPONSE_CODE), Some("00"));
    }

    #[tokio::test]
    async fn network_management_is_echoed_at_this_hop() {
        let mut frame = IsoMessage::with_mti("0800").unwrap();
        frame.set(field::STAN, "000077").unwrap();

        let reply = router().handle_message(frame).await.unwrap();
        assert_eq!(reply.mti(), Some("0810"));
        assert_eq!(reply.get(field::STAN), Some("000077"));
        assert_eq!(reply.get(field::RESPONSE_CODE), Some("00"));
    }

    #[tokio::test]
    async fn unsupported_message_class_is_rejected() {
        let frame = IsoMessage::with_mti("0200").unwrap();
        let err = router().handle_message(frame).await.unwrap_err();
        assert!(matches!(err, WireError::UnsupportedMessageClass { mti } if mti == "0200"));
    }

    #[tokio::test]
    async fn frame_without_mti_is_rejected() {
        let err = router().handle_message(IsoMessage::new()).await.unwrap_err();
        assert!(matches!(err, WireError::MissingField { field: field::MTI }));
    }

    #[tokio::test]
    async fn missing_required_field_is_a_parse_error() {
        let mut frame = IsoMessage::with_mti("0100").unwrap();
        frame.set(field::PAN, "4111111111111111").unwrap();
        let err = router().handle_message(frame).await.unwrap_err();
        assert!(matches!(err, WireError::MissingField { .. }));
    }
}
