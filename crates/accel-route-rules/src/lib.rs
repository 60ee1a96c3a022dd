#![warn(clippy::unwrap_used, clippy::expect_used)]

//! Alarm-Transformationen für die Event-Routen der IoT-Accelerators.
//!
//! Jede Route ist eine reine Funktion aus einem Event und den Bindings der
//! Route: Event einordnen, Messwerte bewerten, Nachricht zusammensetzen.
//! Events ohne meldenswerten Inhalt werden nicht weitergeleitet.

pub mod air_quality;
pub mod classify;
pub mod compose;
pub mod error;
pub mod motor;
pub mod power_outage;
pub mod power_quality;
pub mod tool_usage;

pub use error::{Result, RouteError};

use accel_route_core::{Bindings, Event, Outcome, Transform};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use air_quality::AirQualityAlert;
use motor::MotorVibrationMonitor;
use power_outage::PowerOutageAlert;
use power_quality::PowerQualityAlert;
use tool_usage::ToolUsageAlert;

/// Die mit den Accelerators ausgelieferten Route-Transformationen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    PowerQuality,
    ToolUsage,
    PowerOutage,
    AirQuality,
    MotorVibration,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::PowerQuality,
        Route::ToolUsage,
        Route::PowerOutage,
        Route::AirQuality,
        Route::MotorVibration,
    ];

    /// Prüft die Bindings, die eine Route liest, damit Konfigurationsfehler
    /// vor dem ersten Event auffallen und nicht bei jedem.
    pub fn check_bindings(self, env: &Bindings) -> Result<()> {
        match self {
            Route::MotorVibration => motor::VibrationThresholds::from_bindings(env).map(|_| ()),
            _ => Ok(()),
        }
    }

    fn transform(self) -> &'static dyn Transform<Error = RouteError> {
        match self {
            Route::PowerQuality => &PowerQualityAlert,
            Route::ToolUsage => &ToolUsageAlert,
            Route::PowerOutage => &PowerOutageAlert,
            Route::AirQuality => &AirQualityAlert,
            Route::MotorVibration => &MotorVibrationMonitor,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.transform().name())
    }
}

impl FromStr for Route {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self> {
        Route::ALL
            .into_iter()
            .find(|route| route.transform().name() == s.trim())
            .ok_or_else(|| RouteError::UnknownRoute(s.to_string()))
    }
}

impl Transform for Route {
    type Error = RouteError;

    fn name(&self) -> &'static str {
        self.transform().name()
    }

    fn apply(&self, event: &Event, env: &Bindings) -> Result<Outcome> {
        let outcome = self.transform().apply(event, env)?;
        match &outcome {
            Outcome::Route { .. } => debug!(
                route = self.name(),
                message = outcome.custom_message(),
                "event routed"
            ),
            Outcome::DoNotRoute { why } => {
                debug!(route = self.name(), why = why.as_str(), "event not routed")
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn route_names_roundtrip() {
        for route in Route::ALL {
            assert_eq!(route.to_string().parse::<Route>().unwrap(), route);
            let json = serde_json::to_string(&route).unwrap();
            assert_eq!(json, format!("\"{route}\""));
        }
        assert_eq!("air-quality".parse::<Route>().unwrap(), Route::AirQuality);
    }

    #[test]
    fn unknown_route_is_rejected() {
        let err = "aqi".parse::<Route>().unwrap_err();
        assert!(matches!(err, RouteError::UnknownRoute(ref name) if name == "aqi"));
        assert_eq!(err.to_string(), "Unknown route: aqi");
    }

    #[test]
    fn check_bindings_rejects_bad_thresholds() {
        let env: Bindings = [("vibration_off", "x")].into_iter().collect();
        assert!(Route::MotorVibration.check_bindings(&env).is_err());
        assert!(Route::PowerQuality.check_bindings(&env).is_ok());
        assert!(Route::MotorVibration.check_bindings(&Bindings::new()).is_ok());
    }
}
