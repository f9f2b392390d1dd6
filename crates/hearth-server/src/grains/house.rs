//! House Grain
//!
//! Keeps the set of bulbs currently on, fed by `bulb_changed` reports.

use async_trait::async_trait;
use hearth_core::{Grain, GrainContext, GrainMessage};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;

#[derive(Debug, Deserialize)]
struct BulbChanged {
    bulb: String,
    on: bool,
}

/// Tracks which bulbs of one house are currently on.
#[derive(Debug, Default)]
pub struct House {
    bulbs_on: BTreeSet<String>,
}

impl House {
    fn apply(&mut self, change: BulbChanged) {
        if change.on {
            self.bulbs_on.insert(change.bulb);
        } else {
            self.bulbs_on.remove(&change.bulb);
        }
    }

    fn state(&self) -> Value {
        json!({ "bulbs_on": self.bulbs_on, "count": self.bulbs_on.len() })
    }
}

#[async_trait]
impl Grain for House {
    async fn handle(&mut self, _ctx: &GrainContext, message: GrainMessage) -> anyhow::Result<Value> {
        match message.method.as_str() {
            "bulb_changed" => {
                self.apply(message.parse_payload()?);
                Ok(self.state())
            }
            "get_state" => Ok(self.state()),
            other => anyhow::bail!("house has no method {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_bulbs_on() {
        let mut house = House::default();
        house.apply(BulbChanged { bulb: "kitchen".into(), on: true });
        house.apply(BulbChanged { bulb: "hall".into(), on: true });
        house.apply(BulbChanged { bulb: "kitchen".into(), on: false });
        house.apply(BulbChanged { bulb: "attic".into(), on: false });

        assert_eq!(house.state(), json!({ "bulbs_on": ["hall"], "count": 1 }));
    }
}
