//! Geräte-Events, wie sie die Device-Cloud ausliefert.
//!
//! Die Felder unterscheiden sich je nach Firmware-Stand, daher bleibt das Event
//! rohes JSON und wird über typisierte Accessoren gelesen. Jeder Accessor liefert
//! `None`, wenn ein Feld fehlt oder einen unerwarteten Typ hat;
//! [`Event::has_body_field`] unterscheidet die beiden Fälle.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnnotateError {
    #[error("event is not a JSON object")]
    NotAnObject,
    #[error("event body is not a JSON object")]
    BodyNotAnObject,
}

/// Eine Telemetrie- oder System-Notification, z. B.
/// `{"device": "dev:1234", "sn": "pump-3", "file": "air.qo", "body": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Event(Value);

impl Event {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    fn field_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn device(&self) -> Option<&str> {
        self.field_str("device")
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.field_str("sn")
    }

    pub fn best_id(&self) -> Option<&str> {
        self.field_str("best_id")
    }

    /// Name des Notefiles aus `file`, ersatzweise aus `event`.
    pub fn notefile(&self) -> Option<&str> {
        self.field_str("file").or_else(|| self.field_str("event"))
    }

    pub fn body(&self) -> Option<&Map<String, Value>> {
        self.0.get("body").and_then(Value::as_object)
    }

    pub fn body_value(&self, key: &str) -> Option<&Value> {
        self.body()?.get(key)
    }

    /// `true`, wenn `body.<key>` vorhanden ist, egal mit welchem Wert (auch `null`).
    pub fn has_body_field(&self, key: &str) -> bool {
        self.body().is_some_and(|body| body.contains_key(key))
    }

    pub fn body_str(&self, key: &str) -> Option<&str> {
        self.body_value(key).and_then(Value::as_str)
    }

    pub fn body_f64(&self, key: &str) -> Option<f64> {
        self.body_value(key).and_then(Value::as_f64)
    }

    /// Ganzzahlige Sicht auf `body.<key>`; ganzzahlige Floats wie `2.0` zählen mit.
    pub fn body_i64(&self, key: &str) -> Option<i64> {
        let value = self.body_value(key)?;
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        })
    }

    pub fn body_bool(&self, key: &str) -> Option<bool> {
        self.body_value(key).and_then(Value::as_bool)
    }

    /// Liefert eine Kopie des Events mit `fields` in `body` eingemischt.
    ///
    /// Ein fehlender `body` wird angelegt; vorhandene Schlüssel werden überschrieben.
    pub fn annotate<I>(&self, fields: I) -> Result<Event, AnnotateError>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut value = self.0.clone();
        let root = value.as_object_mut().ok_or(AnnotateError::NotAnObject)?;
        let body = root
            .entry("body")
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or(AnnotateError::BodyNotAnObject)?;
        body.extend(fields);
        Ok(Event(value))
    }
}
