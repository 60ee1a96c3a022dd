//! Stromausfall-Alarme aus den Stromversorgungs-Logzeilen des Geräts.
//!
//! Die Notecard meldet Wechsel der USB-Versorgung und Brown-out-Resets als
//! Freitext in `body.text`; alle anderen Logzeilen (etwa normale Boots) werden
//! verworfen.

use accel_route_core::{Bindings, Event, Outcome, Transform};

use crate::compose::{best_device_label, route_with_message};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerChange {
    Failed,
    Restored,
    /// Wiederhergestellt, nachdem der Pufferakku leer war und ein Brown-out-Reset kam.
    RestoredAfterBrownOut,
}

impl PowerChange {
    pub fn from_text(text: &str) -> Option<Self> {
        if text.contains("USB power OFF") {
            Some(PowerChange::Failed)
        } else if text.contains("USB power ON") {
            Some(PowerChange::Restored)
        } else if text.contains("brown-out & hard reset") {
            Some(PowerChange::RestoredAfterBrownOut)
        } else {
            None
        }
    }

    pub fn message(self, device: &str) -> String {
        match self {
            PowerChange::Failed => format!("ALERT! Power has failed to device {device}."),
            PowerChange::Restored => format!("Power restored to device {device}."),
            PowerChange::RestoredAfterBrownOut => {
                format!("Power restored (LiPo battery discharged) to device {device}.")
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PowerOutageAlert;

impl Transform for PowerOutageAlert {
    type Error = crate::RouteError;

    fn name(&self) -> &'static str {
        "power-outage"
    }

    fn apply(&self, event: &Event, _env: &Bindings) -> Result<Outcome> {
        let Some(text) = event.body_str("text") else {
            return Ok(Outcome::do_not_route("no log text"));
        };
        let Some(change) = PowerChange::from_text(text) else {
            return Ok(Outcome::do_not_route("not a power state change"));
        };
        Ok(route_with_message(event, change.message(best_device_label(event))))
    }
}
