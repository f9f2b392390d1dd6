//! Bulb Grain
//!
//! One light. Starts `unknown`; switching it reports to `house/<house>`.

use super::HOUSE;
use async_trait::async_trait;
use hearth_core::{Grain, GrainContext, GrainIdentity, GrainMessage};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, warn};

const DEFAULT_HOUSE: &str = "home";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulbState {
    Unknown,
    On,
    Off,
}

impl fmt::Display for BulbState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulbState::Unknown => write!(f, "unknown"),
            BulbState::On => write!(f, "on"),
            BulbState::Off => write!(f, "off"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SwitchRequest {
    house: Option<String>,
}

/// A light bulb. Starts in `unknown` state every time it is activated.
#[derive(Debug)]
pub struct Bulb {
    state: BulbState,
    house: Option<String>,
}

impl Default for Bulb {
    fn default() -> Self {
        Self {
            state: BulbState::Unknown,
            house: None,
        }
    }
}

impl Bulb {
    async fn switch(&mut self, ctx: &GrainContext, message: &GrainMessage, state: BulbState) -> anyhow::Result<Value> {
        let request: SwitchRequest = if message.payload.is_null() {
            SwitchRequest::default()
        } else {
            message.parse_payload()?
        };
        if let Some(house) = request.house {
            self.house = Some(house);
        }
        let house = self.house.get_or_insert_with(|| DEFAULT_HOUSE.to_string()).clone();

        self.state = state;
        debug!(grain = %ctx.identity(), state = %state, "Bulb switched");

        // The bulb's own state stands even if the house cannot be told.
        let notify = GrainMessage::new(
            "bulb_changed",
            json!({ "bulb": ctx.identity().identity, "on": state == BulbState::On }),
        );
        let notified = match ctx.call(&GrainIdentity::new(HOUSE, house.as_str()), notify).await {
            Ok(_) => true,
            Err(e) => {
                warn!(grain = %ctx.identity(), house = %house, error = %e, "Failed to notify house");
                false
            }
        };

        Ok(json!({ "state": self.state, "house": house, "house_notified": notified }))
    }
}

#[async_trait]
impl Grain for Bulb {
    async fn handle(&mut self, ctx: &GrainContext, message: GrainMessage) -> anyhow::Result<Value> {
        match message.method.as_str() {
            "turn_on" => self.switch(ctx, &message, BulbState::On).await,
            "turn_off" => self.switch(ctx, &message, BulbState::Off).await,
            "get_state" => Ok(json!({
                "state": self.state,
                "house": self.house,
                "member": ctx.member(),
            })),
            other => anyhow::bail!("bulb has no method {other:?}"),
        }
    }
}
