//! Demo Grains
//!
//! The smart-home example: bulbs that report to the house they belong to.
//!
//! ```text
//! POST /grains/bulb/kitchen/turn_on {"house": "home"}
//!    ↓ bulb/kitchen (state = on)
//!    ↓ ctx.call(house/home, bulb_changed)
//! house/home (bulbs_on = {kitchen})
//! ```

mod bulb;
mod house;

pub use bulb::Bulb;
pub use house::House;

use hearth_core::{Grain, GrainIdentity, GrainRegistry};

pub const BULB: &str = "bulb";
pub const HOUSE: &str = "house";

/// Registry with every demo grain kind.
pub fn registry() -> GrainRegistry {
    GrainRegistry::new()
        .with(BULB, |_: &GrainIdentity| Box::new(Bulb::default()) as Box<dyn Grain>)
        .with(HOUSE, |_: &GrainIdentity| Box::new(House::default()) as Box<dyn Grain>)
}
