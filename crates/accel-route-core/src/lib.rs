//! Gemeinsame Typen der Accelerator-Route-Transformationen.
//!
//! Eine Transformation erhält ein Geräte-[`Event`] zusammen mit den
//! Umgebungs-[`Bindings`] der Route und liefert ein [`Outcome`]: entweder das
//! (ggf. annotierte) Event zum Weiterleiten oder ein explizites
//! "nicht weiterleiten".

pub mod bindings;
pub mod event;

pub use bindings::{BindingError, Bindings};
pub use event::{AnnotateError, Event};

use serde::{Deserialize, Serialize};

/// Ergebnis einer Transformation für ein einzelnes Event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Event weiterleiten.
    Route { event: Event },
    /// Event verwerfen; `why` dient nur Logs und Statistik.
    DoNotRoute { why: String },
}

impl Outcome {
    pub fn route(event: Event) -> Self {
        Outcome::Route { event }
    }

    pub fn do_not_route(why: impl Into<String>) -> Self {
        Outcome::DoNotRoute { why: why.into() }
    }

    #[must_use]
    pub fn is_routed(&self) -> bool {
        matches!(self, Outcome::Route { .. })
    }

    /// Das weitergeleitete Event, falls vorhanden.
    #[must_use]
    pub fn event(&self) -> Option<&Event> {
        match self {
            Outcome::Route { event } => Some(event),
            Outcome::DoNotRoute { .. } => None,
        }
    }

    /// `body.customMessage` des weitergeleiteten Events.
    #[must_use]
    pub fn custom_message(&self) -> Option<&str> {
        self.event()?.body_str("customMessage")
    }
}

/// Eine Route-Transformation: reine Funktion aus Event und Bindings.
pub trait Transform {
    type Error: std::error::Error;

    fn name(&self) -> &'static str;
    fn apply(&self, event: &Event, env: &Bindings) -> Result<Outcome, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_serializes_with_tag() {
        let routed = Outcome::route(Event::new(json!({"body": {"customMessage": "hi"}})));
        let value = serde_json::to_value(&routed).expect("serialize");
        assert_eq!(value["outcome"], "route");
        assert_eq!(value["event"]["body"]["customMessage"], "hi");
        assert_eq!(routed.custom_message(), Some("hi"));

        let dropped = Outcome::do_not_route("no alert");
        let value = serde_json::to_value(&dropped).expect("serialize");
        assert_eq!(value, json!({"outcome": "do_not_route", "why": "no alert"}));
        assert!(!dropped.is_routed());
        assert!(dropped.custom_message().is_none());
    }
}
