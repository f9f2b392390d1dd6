//! GrainActivation Actor
//!
//! One kameo actor per live grain. The actor's mailbox is the grain's
//! mailbox: messages are handled one at a time in receipt order.

use super::messages::{Activate, Deactivate, HandlerOutcome, Invoke};
use crate::grain::{Grain, GrainContext};
use crate::observability::events;
use futures::FutureExt;
use kameo::{
    message::{Context, Message},
    Actor,
};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Actor hosting a single grain instance.
#[derive(Actor)]
pub struct GrainActivation {
    grain: Box<dyn Grain>,
    ctx: GrainContext,
    /// Last dispatch time (Unix millis), shared with the directory handle
    last_activity: Arc<AtomicI64>,
    /// Set once `on_deactivate` ran; later messages are bounced
    deactivated: bool,
}

impl GrainActivation {
    pub fn new(grain: Box<dyn Grain>, ctx: GrainContext, last_activity: Arc<AtomicI64>) -> Self {
        Self {
            grain,
            ctx,
            last_activity,
            deactivated: false,
        }
    }

    fn touch(&self) {
        self.last_activity
            .store(chrono::Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn grain_name(&self) -> String {
        self.ctx.identity().to_string()
    }
}

impl Message<Activate> for GrainActivation {
    type Reply = HandlerOutcome;

    async fn handle(&mut self, _msg: Activate, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        let result = AssertUnwindSafe(self.grain.on_activate(&self.ctx))
            .catch_unwind()
            .await;
        self.touch();

        match flatten(result) {
            Ok(()) => HandlerOutcome::Completed(serde_json::Value::Null),
            Err(error) => {
                events::grain_faulted(&self.grain_name(), "on_activate", &error);
                HandlerOutcome::Failed(error)
            }
        }
    }
}

impl Message<Invoke> for GrainActivation {
    type Reply = HandlerOutcome;

    async fn handle(&mut self, msg: Invoke, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        if self.deactivated {
            return HandlerOutcome::Deactivated;
        }

        let method = msg.message.method.clone();
        debug!(grain = %self.ctx.identity(), method = %method, "Handling grain message");

        let result = AssertUnwindSafe(self.grain.handle(&self.ctx, msg.message))
            .catch_unwind()
            .await;
        self.touch();

        match flatten(result) {
            Ok(value) => HandlerOutcome::Completed(value),
            Err(error) => {
                events::grain_faulted(&self.grain_name(), &method, &error);
                HandlerOutcome::Failed(error)
            }
        }
    }
}

impl Message<Deactivate> for GrainActivation {
    type Reply = HandlerOutcome;

    async fn handle(&mut self, _msg: Deactivate, _ctx: &mut Context<Self, Self::Reply>) -> Self::Reply {
        if self.deactivated {
            return HandlerOutcome::Deactivated;
        }
        self.deactivated = true;

        let result = AssertUnwindSafe(self.grain.on_deactivate(&self.ctx))
            .catch_unwind()
            .await;

        match flatten(result) {
            Ok(()) => HandlerOutcome::Completed(serde_json::Value::Null),
            Err(error) => {
                events::grain_faulted(&self.grain_name(), "on_deactivate", &error);
                HandlerOutcome::Failed(error)
            }
        }
    }
}

/// Collapse a caught panic and a handler error into one error string.
fn flatten<T>(result: Result<anyhow::Result<T>, Box<dyn Any + Send>>) -> Result<T, String> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(format!("{error:#}")),
        Err(panic) => Err(format!("handler panicked: {}", panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_panic_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(flatten::<()>(Err(boxed)), Err("handler panicked: boom".to_string()));

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(
            flatten::<()>(Err(boxed)),
            Err("handler panicked: owned boom".to_string())
        );
    }

    #[test]
    fn test_flatten_keeps_error_chain() {
        let err = anyhow::anyhow!("inner").context("outer");
        assert_eq!(flatten::<()>(Ok(Err(err))), Err("outer: inner".to_string()));
    }
}
