//! Werkzeugnutzungs-Alarme: Power-Alarme eines Monitors für mehrere Werkzeuge.
//!
//! Jede Messung nennt das Werkzeug über `body.instance` (Zahl oder Text) und
//! kann melden, ob es `active` ist und welchen `vibration`-Zustand es hat.

use accel_route_core::{Bindings, Event, Outcome, Transform};

use crate::compose::{device_label, route_with_message, PowerReading};
use crate::error::Result;
use crate::power_quality::alert_reasons;

/// Lookup-Tabelle von Instanznummern auf Werkzeugnamen, `"1:Lathe,2:Drill"`.
pub const TOOL_NAMES: &str = "tool_names";

fn tool_label(event: &Event, env: &Bindings) -> String {
    let instance = match event.body_i64("instance") {
        Some(instance) => instance.to_string(),
        None => match event.body_str("instance").map(str::trim) {
            Some(instance) if !instance.is_empty() => instance.to_string(),
            _ => return "unknown".to_string(),
        },
    };
    env.lookup(TOOL_NAMES, &instance)
        .map_or_else(|| format!("tool-{instance}"), str::to_string)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ToolUsageAlert;

impl Transform for ToolUsageAlert {
    type Error = crate::RouteError;

    fn name(&self) -> &'static str {
        "tool-usage"
    }

    fn apply(&self, event: &Event, env: &Bindings) -> Result<Outcome> {
        let Some(reasons) = alert_reasons(event) else {
            return Ok(Outcome::do_not_route("no power alert"));
        };
        let activity = match event.body_bool("active") {
            Some(true) => " active: yes",
            Some(false) => " active: no",
            None => "",
        };
        let vibration = event
            .body_str("vibration")
            .filter(|state| !state.is_empty())
            .map(|state| format!(" vib.: {state}"))
            .unwrap_or_default();
        let message = format!(
            "Power alert from {} {}{activity}: {reasons}. {}{vibration}",
            device_label(event),
            tool_label(event, env),
            PowerReading::from_event(event)
        );
        Ok(route_with_message(event, message))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn alert(extra: Value) -> Event {
        let mut body = json!({
            "current": 5, "frequency": 59.8125, "power": 600, "voltage": 120,
            "alert": "overcurrent,power"
        });
        if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            body.extend(extra.clone());
        }
        Event::new(json!({"device": "dev:1234", "sn": "machine-1", "body": body}))
    }

    fn message(event: &Event, env: &Bindings) -> String {
        ToolUsageAlert
            .apply(event, env)
            .unwrap()
            .custom_message()
            .expect("alert is routed")
            .to_string()
    }

    #[test]
    fn names_the_instance() {
        let env = Bindings::new();
        for instance in 1..=4 {
            let text = message(&alert(json!({"instance": instance})), &env);
            assert!(text.contains(&format!("tool-{instance}: ")), "{text}");
        }
        assert!(message(&alert(json!({})), &env).contains("unknown: "));
    }

    #[test]
    fn accepts_instance_sent_as_text() {
        let env: Bindings = [(TOOL_NAMES, "2:Drill")].into_iter().collect();
        assert!(message(&alert(json!({"instance": "1"})), &env).contains(" tool-1: "));
        assert!(message(&alert(json!({"instance": "2"})), &env).contains(" Drill: "));
        assert!(message(&alert(json!({"instance": ""})), &env).contains(" unknown: "));
    }

    #[test]
    fn tool_names_binding_overrides_instance_label() {
        let env: Bindings = [(TOOL_NAMES, "1:Lathe,2:Drill")].into_iter().collect();
        let text = message(&alert(json!({"instance": 2})), &env);
        assert!(text.starts_with("Power alert from machine-1 Drill: "), "{text}");
        let text = message(&alert(json!({"instance": 3})), &env);
        assert!(text.contains("tool-3: "), "{text}");
    }

    #[test]
    fn reports_activity_only_when_known() {
        let env = Bindings::new();
        assert_eq!(
            message(&alert(json!({"instance": 2, "active": true})), &env),
            "Power alert from machine-1 tool-2 active: yes: overcurrent,power. 120V, 5A, 600W."
        );
        assert!(message(&alert(json!({"instance": 2, "active": false})), &env)
            .contains(" active: no:"));
        assert!(!message(&alert(json!({"instance": 1})), &env).contains("active:"));
    }

    #[test]
    fn appends_vibration_state_without_raw_value() {
        let env = Bindings::new();
        let text = message(
            &alert(json!({"instance": 1, "vibration_raw": 123.45, "vibration": "normal"})),
            &env,
        );
        assert_eq!(
            text,
            "Power alert from machine-1 tool-1: overcurrent,power. 120V, 5A, 600W. vib.: normal"
        );
        assert!(!message(&alert(json!({"instance": 1})), &env).contains("vib"));
    }

    #[test]
    fn readings_without_alert_are_dropped() {
        let event = Event::new(json!({"body": {"current": 0.2846, "instance": 1}}));
        let outcome = ToolUsageAlert.apply(&event, &Bindings::new()).unwrap();
        assert!(!outcome.is_routed());
    }
}
