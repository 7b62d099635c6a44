use super::InboundKind;
use crate::types::{InboundMessage, RealtimeError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

type Handler = Arc<dyn Fn(&InboundMessage) + Send + Sync + 'static>;

/// Result of decoding one text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Known(InboundMessage),
    /// Well-formed frame whose tag this client does not route
    Unknown(String),
}

/// What happened to one frame handed to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Handled(InboundKind),
    NoHandler(InboundKind),
    UnknownTag(String),
    Malformed,
}

/// Routes decoded inbound messages to exactly one handler per tag.
///
/// Handlers run synchronously on the caller's task, so frames fed in arrival order are
/// handled in arrival order, one at a time.
#[derive(Clone, Default)]
pub struct MessageDispatcher {
    routes: HashMap<InboundKind, Handler>,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn on<F>(mut self, kind: InboundKind, handler: F) -> Self
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.register(kind, handler);
        self
    }

    /// Installs the handler for `kind`, replacing any previous one.
    pub fn register<F>(&mut self, kind: InboundKind, handler: F)
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        if self.routes.insert(kind, Arc::new(handler)).is_some() {
            tracing::debug!("Replaced handler for {}", kind);
        }
    }

    pub fn has_route(&self, kind: InboundKind) -> bool {
        self.routes.contains_key(&kind)
    }

    /// Decodes a raw text frame.
    pub fn decode(text: &str) -> Result<Decoded> {
        let value: Value = serde_json::from_str(text)?;
        let Some(tag) = value.get("type").and_then(Value::as_str) else {
            return Err(RealtimeError::Decode("frame has no type tag".to_string()));
        };

        if InboundKind::from_tag(tag).is_none() {
            return Ok(Decoded::Unknown(tag.to_string()));
        }

        Ok(Decoded::Known(serde_json::from_value(value)?))
    }

    /// Routes an already decoded message.
    pub fn dispatch(&self, message: &InboundMessage) -> DispatchOutcome {
        let kind = message.kind();
        match self.routes.get(&kind) {
            Some(handler) => {
                handler(message);
                DispatchOutcome::Handled(kind)
            }
            None => {
                tracing::debug!("No handler registered for {}", kind);
                DispatchOutcome::NoHandler(kind)
            }
        }
    }

    /// Decodes and routes one text frame. Failures are logged and the frame dropped.
    pub fn dispatch_frame(&self, text: &str) -> DispatchOutcome {
        match Self::decode(text) {
            Ok(Decoded::Known(message)) => self.dispatch(&message),
            Ok(Decoded::Unknown(tag)) => {
                tracing::warn!("Dropping frame with unknown type '{}'", tag);
                DispatchOutcome::UnknownTag(tag)
            }
            Err(e) => {
                tracing::warn!("Dropping malformed frame: {} - Raw: {}", e, text);
                DispatchOutcome::Malformed
            }
        }
    }
}
