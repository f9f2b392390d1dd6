//! Grain Contract
//!
//! What application code implements. A grain is plain in-memory state plus a
//! message handler; the runtime decides where and when it lives.
//!
//! ```ignore
//! struct Counter { n: u64 }
//!
//! #[async_trait]
//! impl Grain for Counter {
//!     async fn handle(&mut self, _ctx: &GrainContext, msg: GrainMessage) -> anyhow::Result<Value> {
//!         match msg.method.as_str() {
//!             "incr" => { self.n += 1; Ok(json!(self.n)) }
//!             other => anyhow::bail!("unknown method {other}"),
//!         }
//!     }
//! }
//!
//! let registry = GrainRegistry::new()
//!     .with("counter", |_: &GrainIdentity| Box::new(Counter { n: 0 }) as Box<dyn Grain>);
//! ```

mod context;
mod message;
mod registry;

pub use context::GrainContext;
pub use message::GrainMessage;
pub use registry::{GrainFactory, GrainRegistry};

use async_trait::async_trait;
use serde_json::Value;

/// Behaviour of one grain kind.
///
/// Handlers run one at a time per activation, so `&mut self` is never
/// shared. An `Err` or a panic from `handle` is reported to the caller as a
/// grain fault; the activation keeps serving later messages.
#[async_trait]
pub trait Grain: Send + 'static {
    /// Runs once before the first message. An error aborts the activation.
    async fn on_activate(&mut self, _ctx: &GrainContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn handle(&mut self, ctx: &GrainContext, message: GrainMessage) -> anyhow::Result<Value>;

    /// Runs once during eviction, after every queued message was handled.
    async fn on_deactivate(&mut self, _ctx: &GrainContext) -> anyhow::Result<()> {
        Ok(())
    }
}
