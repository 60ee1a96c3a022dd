//! Motorüberwachung anhand der Bewegungszähler des Beschleunigungssensors.
//!
//! Der Motion-Tracker meldet die Anzahl Bewegungen pro Zeitabschnitt als
//! kompakten String, ein Zeichen pro Abschnitt (`"MNOPQZR341"`). Jedes Zeichen
//! ist eine Ziffer zur Basis 36: `0`-`9`, dann `A`-`Z`; `M` ist also 22 und `Z` 35.
//!
//! Ob der Motor laufen soll, steht im ersten Eingang des GPIO-Report-Bindings
//! (`"high,off,off,off"`).

use accel_route_core::{Bindings, Event, Outcome, Transform};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::compose::{device_label, route_annotated, CUSTOM_MESSAGE};
use crate::error::{Result, RouteError};

pub const GPIO_REPORT: &str = "_aux_gpio_report";
/// Höchste erwartete Durchschnittsvibration bei ausgeschaltetem Motor.
pub const VIBRATION_OFF: &str = "vibration_off";
/// Niedrigste erwartete Durchschnittsvibration bei laufendem Motor.
pub const VIBRATION_MIN: &str = "vibration_min";
/// Höchste erwartete Durchschnittsvibration bei laufendem Motor.
pub const VIBRATION_MAX: &str = "vibration_max";

const MOVEMENT_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NOT_A_DIGIT: u8 = u8::MAX;

const fn movement_table() -> [u8; 256] {
    let mut table = [NOT_A_DIGIT; 256];
    let mut i = 0;
    while i < MOVEMENT_ALPHABET.len() {
        table[MOVEMENT_ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

static MOVEMENT_VALUES: [u8; 256] = movement_table();

/// Dekodiert einen Bewegungs-String; `None`, sobald ein Zeichen außerhalb des Alphabets liegt.
pub fn decode_movements(movements: &str) -> Option<Vec<u32>> {
    movements
        .bytes()
        .map(|b| match MOVEMENT_VALUES[usize::from(b)] {
            NOT_A_DIGIT => None,
            value => Some(u32::from(value)),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VibrationSummary {
    pub min: u32,
    pub max: u32,
    /// Mittlere Bewegungsanzahl; halbe Werte werden zur geraden Zahl gerundet.
    pub average: u32,
    pub values: Vec<u32>,
}

impl VibrationSummary {
    pub fn from_values(values: Vec<u32>) -> Option<Self> {
        let min = *values.iter().min()?;
        let max = *values.iter().max()?;
        let sum: u64 = values.iter().map(|&v| u64::from(v)).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = sum as f64 / values.len() as f64;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let average = mean.round_ties_even() as u32;
        Some(Self {
            min,
            max,
            average,
            values,
        })
    }

    /// Der Motor ist im Fenster an- oder ausgegangen: ein Ende des Fensters
    /// steht still, das andere bewegt sich.
    pub fn is_transient(&self) -> bool {
        let (Some(&first), Some(&last)) = (self.values.first(), self.values.last()) else {
            return false;
        };
        self.min == 0 && self.max > 0 && ((first == 0) != (last == 0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VibrationReason {
    InactiveOver,
    ActiveUnder,
    ActiveOver,
}

impl VibrationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            VibrationReason::InactiveOver => "inactive-over",
            VibrationReason::ActiveUnder => "active-under",
            VibrationReason::ActiveOver => "active-over",
        }
    }
}

fn numeric_binding(env: &Bindings, name: &str) -> Result<Option<f64>> {
    let Some(raw) = env.get(name).map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(Some)
        .ok_or_else(|| RouteError::InvalidBinding {
            name: name.to_string(),
            value: raw.to_string(),
        })
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VibrationThresholds {
    pub off: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl VibrationThresholds {
    pub fn from_bindings(env: &Bindings) -> Result<Self> {
        Ok(Self {
            off: numeric_binding(env, VIBRATION_OFF)?,
            min: numeric_binding(env, VIBRATION_MIN)?,
            max: numeric_binding(env, VIBRATION_MAX)?,
        })
    }

    pub fn evaluate(&self, active: bool, average: u32) -> Option<VibrationReason> {
        let average = f64::from(average);
        if !active {
            return self
                .off
                .filter(|&off| average > off)
                .map(|_| VibrationReason::InactiveOver);
        }
        if self.min.is_some_and(|min| average < min) {
            Some(VibrationReason::ActiveUnder)
        } else if self.max.is_some_and(|max| average > max) {
            Some(VibrationReason::ActiveOver)
        } else {
            None
        }
    }
}

/// Motorzustand aus dem ersten Eingang des GPIO-Reports: `high` heißt läuft.
pub fn active_state(env: &Bindings) -> Option<bool> {
    let first = env.get(GPIO_REPORT)?.split(',').next()?.trim();
    if first.eq_ignore_ascii_case("high") {
        Some(true)
    } else if first.eq_ignore_ascii_case("low") {
        Some(false)
    } else {
        None
    }
}

fn summarize(event: &Event) -> Option<VibrationSummary> {
    let movements = event.body_str("movements")?;
    match decode_movements(movements) {
        Some(values) => VibrationSummary::from_values(values),
        None => {
            warn!(movements, "movement string has characters outside 0-9A-Z");
            None
        }
    }
}

/// Annotiert Bewegungs-Events mit Vibrationsstatistik und Alarmgrund.
/// Events mit Objekt-Body werden immer weitergeleitet.
#[derive(Debug, Default, Clone, Copy)]
pub struct MotorVibrationMonitor;

impl Transform for MotorVibrationMonitor {
    type Error = RouteError;

    fn name(&self) -> &'static str {
        "motor-vibration"
    }

    fn apply(&self, event: &Event, env: &Bindings) -> Result<Outcome> {
        let thresholds = VibrationThresholds::from_bindings(env)?;
        let active = active_state(env);

        let mut fields: Vec<(String, Value)> = Vec::new();
        if let Some(active) = active {
            fields.push(("active".to_string(), Value::Bool(active)));
        }
        if let Some(summary) = summarize(event) {
            let transient = summary.is_transient();
            let reason = active
                .filter(|_| !transient)
                .and_then(|active| thresholds.evaluate(active, summary.average));
            if let Some(reason) = reason {
                fields.push(("reason".to_string(), json!(reason)));
                fields.push((
                    CUSTOM_MESSAGE.to_string(),
                    Value::String(format!(
                        "Vibration alert from {}: {}, average {}.",
                        device_label(event),
                        reason.as_str(),
                        summary.average
                    )),
                ));
            }
            fields.push(("transient".to_string(), Value::Bool(transient)));
            fields.push(("vibration".to_string(), json!(summary)));
        }
        Ok(route_annotated(event, fields))
    }
}
