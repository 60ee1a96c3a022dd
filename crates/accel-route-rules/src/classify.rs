//! Einordnung von Notefiles.
//!
//! Geräte und ihre Sensor-Knoten schreiben in Notefiles. Knotenbezogene
//! Notefiles tragen die Knoten-ID als Präfix: `2231234#aqi.qo`.

use accel_route_core::Event;

pub const SESSION_NOTEFILE: &str = "_session.qo";
pub const SWITCH_NOTEFILE: &str = "switch.qo";
pub const AIR_NOTEFILE: &str = "air.qo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notefile<'a> {
    /// `_session.qo`
    Session,
    /// Jedes andere Notefile der Device-Cloud mit `_`-Präfix.
    System(&'a str),
    Switch,
    Air,
    /// `<node_id>#<name>`
    Node { node_id: &'a str, name: &'a str },
    Other(&'a str),
}

impl<'a> Notefile<'a> {
    pub fn parse(file: &'a str) -> Self {
        match file {
            SESSION_NOTEFILE => return Notefile::Session,
            SWITCH_NOTEFILE => return Notefile::Switch,
            AIR_NOTEFILE => return Notefile::Air,
            _ => {}
        }
        if let Some((node_id, name)) = file.split_once('#') {
            if !node_id.is_empty() && !name.is_empty() && !name.contains('#') {
                return Notefile::Node { node_id, name };
            }
            return Notefile::Other(file);
        }
        if file.starts_with('_') {
            return Notefile::System(file);
        }
        Notefile::Other(file)
    }

    /// Die Knoten-ID, falls dies das knotenbezogene Notefile `name` ist.
    pub fn node_id_for(&self, name: &str) -> Option<&'a str> {
        match *self {
            Notefile::Node { node_id, name: n } if n == name => Some(node_id),
            _ => None,
        }
    }
}

/// Ordnet das Notefile von `event` ein; `None`, wenn das Event keins nennt.
pub fn classify(event: &Event) -> Option<Notefile<'_>> {
    event.notefile().map(Notefile::parse)
}
