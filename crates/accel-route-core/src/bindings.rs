//! Umgebungs-Bindings, die jeder Auswertung mitgegeben werden.
//!
//! Bindings sind flache `name -> string`-Paare, die an der Route konfiguriert
//! sind (Alarmschwellen, Lookup-Tabellen, GPIO-Reports). Sie gehören nicht zum
//! Event.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("binding assignment must look like KEY=VALUE, got '{0}'")]
    MalformedAssignment(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Bindings(BTreeMap<String, String>);

impl Bindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Übernimmt alle Bindings aus `other` und überschreibt vorhandene.
    pub fn merge(&mut self, other: Bindings) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Zerlegt eine `KEY=VALUE`-Zuweisung. Der Wert darf selbst `=` enthalten.
    pub fn parse_assignment(raw: &str) -> Result<(String, String), BindingError> {
        match raw.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(BindingError::MalformedAssignment(raw.to_string())),
        }
    }

    /// Sucht `id` in einer Lookup-Tabelle.
    ///
    /// Tabellen enthalten `id:name`-Einträge, getrennt durch `,`, `;` oder
    /// Zeilenumbrüche, z. B. `node_names = "2231234:Area 51,2231235:Hangar 18"`.
    /// Leere Namen gelten als fehlend.
    pub fn lookup(&self, table: &str, id: &str) -> Option<&str> {
        self.get(table)?
            .split([',', ';', '\n'])
            .filter_map(|entry| entry.split_once(':'))
            .find(|(key, _)| key.trim() == id)
            .map(|(_, name)| name.trim())
            .filter(|name| !name.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
