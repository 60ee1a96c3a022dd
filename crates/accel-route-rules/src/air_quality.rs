//! Luftqualitäts-Alarme von Sensor-Knoten hinter einem Gateway.
//!
//! Knoten schreiben in `<nodeId>#aqi.qo`. Die Firmware markiert eine Messung
//! mit `alert: 1`, wenn die Luft schlecht wird, mit `alert: 3`, wenn sie sich
//! erholt, und mit `alert: 2`, solange sie schlecht bleibt; weitergeleitet
//! werden nur die Übergänge.

use accel_route_core::{Bindings, Event, Outcome, Transform};

use crate::classify::classify;
use crate::compose::{route_with_message, AirReading};
use crate::error::Result;

pub const AQI_NOTEFILE: &str = "aqi.qo";

/// Lookup-Tabelle von Knoten-IDs auf Anzeigenamen, `"2231234:Area 51"`.
pub const NODE_NAMES: &str = "node_names";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirAlert {
    Raised,
    Continuing,
    Cleared,
}

impl AirAlert {
    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            1 => Some(AirAlert::Raised),
            2 => Some(AirAlert::Continuing),
            3 => Some(AirAlert::Cleared),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AirQualityAlert;

impl Transform for AirQualityAlert {
    type Error = crate::RouteError;

    fn name(&self) -> &'static str {
        "air-quality"
    }

    fn apply(&self, event: &Event, env: &Bindings) -> Result<Outcome> {
        let Some(node_id) = classify(event).and_then(|file| file.node_id_for(AQI_NOTEFILE)) else {
            return Ok(Outcome::do_not_route("not a node air-quality notefile"));
        };
        let reading = AirReading::from_event(event);
        let node = env.lookup(NODE_NAMES, node_id).unwrap_or(node_id);
        let message = match event.body_i64("alert").and_then(AirAlert::from_level) {
            Some(AirAlert::Raised) => format!("ALERT! Air quality alert in {node}. {reading}"),
            Some(AirAlert::Cleared) => format!("Air quality normal in {node}. {reading}"),
            Some(AirAlert::Continuing) => {
                return Ok(Outcome::do_not_route("air-quality alert continuing"))
            }
            None => return Ok(Outcome::do_not_route("no air-quality alert")),
        };
        Ok(route_with_message(event, message))
    }
}
