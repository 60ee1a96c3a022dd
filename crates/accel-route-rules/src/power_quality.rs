//! Netzqualitäts-Alarme von Power-Monitoren.
//!
//! Die Monitor-Firmware setzt `body.alert` (kommagetrennte Gründe wie
//! `overcurrent,power`) nur, wenn eine Schwelle überschritten wurde. Normale
//! Messungen werden verworfen.

use accel_route_core::{Bindings, Event, Outcome, Transform};

use crate::compose::{device_label, route_with_message, PowerReading};
use crate::error::Result;

/// Alarmgründe eines Power-Monitor-Events, falls vorhanden.
pub(crate) fn alert_reasons(event: &Event) -> Option<&str> {
    event.body_str("alert").filter(|reasons| !reasons.is_empty())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PowerQualityAlert;

impl Transform for PowerQualityAlert {
    type Error = crate::RouteError;

    fn name(&self) -> &'static str {
        "power-quality"
    }

    fn apply(&self, event: &Event, _env: &Bindings) -> Result<Outcome> {
        let Some(reasons) = alert_reasons(event) else {
            return Ok(Outcome::do_not_route("no power alert"));
        };
        let message = format!(
            "Power alert from {}: {reasons}. {}",
            device_label(event),
            PowerReading::from_event(event)
        );
        Ok(route_with_message(event, message))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apply(event: serde_json::Value) -> Outcome {
        PowerQualityAlert
            .apply(&Event::new(event), &Bindings::new())
            .expect("power-quality never fails")
    }

    #[test]
    fn readings_without_alert_are_dropped() {
        let outcome = apply(json!({
            "body": {"current": 0.2846, "frequency": 59.8125, "power": 7.9, "voltage": 118.6}
        }));
        assert_eq!(outcome, Outcome::do_not_route("no power alert"));
    }

    #[test]
    fn empty_alert_is_dropped() {
        let outcome = apply(json!({"sn": "x", "body": {"alert": "", "voltage": 120}}));
        assert!(!outcome.is_routed());
    }

    #[test]
    fn alert_message_lists_reasons_and_readings() {
        let outcome = apply(json!({
            "device": "dev:1234",
            "sn": "flumzel-extruder",
            "body": {"current": 5, "frequency": 59.8125, "power": 600, "voltage": 120,
                     "alert": "overcurrent,power"}
        }));
        assert_eq!(
            outcome.custom_message(),
            Some("Power alert from flumzel-extruder: overcurrent,power. 120V, 5A, 600W.")
        );
    }

    #[test]
    fn falls_back_to_device_id() {
        let outcome = apply(json!({
            "device": "dev:1234",
            "body": {"current": 5, "power": 600, "voltage": 120, "alert": "overvoltage"}
        }));
        let message = outcome.custom_message().unwrap();
        assert!(message.starts_with("Power alert from dev:1234: overvoltage."));
    }

    #[test]
    fn routed_event_keeps_original_fields() {
        let outcome = apply(json!({
            "sn": "x", "when": 1700000000,
            "body": {"alert": "overcurrent", "frequency": 60}
        }));
        let event = outcome.event().unwrap();
        assert_eq!(event.as_value()["when"], 1700000000);
        assert_eq!(event.body_f64("frequency"), Some(60.0));
        assert_eq!(event.body_str("alert"), Some("overcurrent"));
    }
}
