//! Nachrichtenaufbau, gemeinsam für alle Alarm-Transformationen.

use accel_route_core::{Event, Outcome};
use serde_json::Value;
use std::fmt;

pub const CUSTOM_MESSAGE: &str = "customMessage";

const UNKNOWN_DEVICE: &str = "unknown";

/// Gibt einen JSON-Wert so aus, wie er in einer Benachrichtigung steht: `120`,
/// `0.2846`, `59.8125`. Ganzzahlige Floats verlieren ihre Nachkommastellen,
/// `null` wird leer.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64().map(format_f64).unwrap_or_default()
            }
        }
        other => other.to_string(),
    }
}

fn format_f64(f: f64) -> String {
    if !f.is_finite() {
        return String::new();
    }
    if f == 0.0 {
        // auch -0.0
        return "0".to_string();
    }
    let magnitude = f.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        // Exponentialschreibweise wie in JSON-Ausgaben: 1e+21, 1.5e-7
        let formatted = format!("{f:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => formatted,
        };
    }
    if f.fract() == 0.0 {
        format!("{f:.0}")
    } else {
        format!("{f}")
    }
}

/// `body.<key>`, formatiert mit [`format_value`]; leer, wenn nicht vorhanden.
pub fn measurement(event: &Event, key: &str) -> String {
    event.body_value(key).map(format_value).unwrap_or_default()
}

fn first_non_empty<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> &'a str {
    candidates
        .into_iter()
        .flatten()
        .find(|id| !id.is_empty())
        .unwrap_or(UNKNOWN_DEVICE)
}

/// Geräte-Bezeichnung für Alarmtexte: Seriennummer, sonst Device-ID.
pub fn device_label(event: &Event) -> &str {
    first_non_empty([event.serial_number(), event.device(), event.best_id()])
}

/// Geräte-Bezeichnung der Device-Cloud (`best_id`), danach Seriennummer,
/// danach Device-ID.
pub fn best_device_label(event: &Event) -> &str {
    first_non_empty([event.best_id(), event.serial_number(), event.device()])
}

/// Spannung, Strom und Leistung einer Power-Monitor-Messung.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerReading {
    pub voltage: String,
    pub current: String,
    pub power: String,
}

impl PowerReading {
    pub fn from_event(event: &Event) -> Self {
        Self {
            voltage: measurement(event, "voltage"),
            current: measurement(event, "current"),
            power: measurement(event, "power"),
        }
    }
}

impl fmt::Display for PowerReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}V, {}A, {}W.", self.voltage, self.current, self.power)
    }
}

/// Luftqualitätsindex, CO2- und TVOC-Konzentration einer Luftmessung.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirReading {
    pub aqi: String,
    pub eco2: String,
    pub tvoc: String,
}

impl AirReading {
    pub fn from_event(event: &Event) -> Self {
        Self {
            aqi: measurement(event, "aqi"),
            eco2: measurement(event, "eco2"),
            tvoc: measurement(event, "tvoc"),
        }
    }
}

impl fmt::Display for AirReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AQI: {}, CO2: {}ppm, TVOC: {}ppb.",
            self.aqi, self.eco2, self.tvoc
        )
    }
}

/// Leitet eine Kopie von `event` mit `fields` im Body weiter.
///
/// Events, deren Body keine Annotationen aufnehmen kann, werden verworfen.
pub fn route_annotated<I>(event: &Event, fields: I) -> Outcome
where
    I: IntoIterator<Item = (String, Value)>,
{
    match event.annotate(fields) {
        Ok(annotated) => Outcome::route(annotated),
        Err(err) => Outcome::do_not_route(err.to_string()),
    }
}

/// Leitet eine Kopie von `event` mit `message` als Custom-Message weiter.
pub fn route_with_message(event: &Event, message: String) -> Outcome {
    route_annotated(event, [(CUSTOM_MESSAGE.to_string(), Value::String(message))])
}
