//! The declarative, JSON-compatible net description (`spec.md` §6).
//!
//! This is the wire format: comma-separated lists stay as plain strings here
//! and are only split into typed sets when [`crate::net::model::NetModel`] is
//! built from a [`NetDefinition`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetDefinition {
    pub players: Vec<PlayerDef>,
    pub places: Vec<PlaceDef>,
    pub transitions: Vec<TransitionDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerDef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceDef {
    pub name: String,
    pub marking: i64,
    /// Comma-separated player names, empty string means observed by nobody.
    #[serde(default)]
    pub player_observable: String,
    /// Player name this place is a win condition for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionDef {
    pub name: String,
    pub rate: f64,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub inhibitor: String,
    /// Comma-separated `place=delta` pairs.
    #[serde(default)]
    pub control_rate: String,
    /// Player name, or empty / "None" for no owner.
    #[serde(default)]
    pub player_control: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fire_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn split_nonempty(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

impl PlaceDef {
    pub(crate) fn observers(&self) -> impl Iterator<Item = &str> {
        split_nonempty(&self.player_observable)
    }
}

impl TransitionDef {
    pub(crate) fn inputs(&self) -> impl Iterator<Item = &str> {
        split_nonempty(&self.input)
    }

    pub(crate) fn outputs(&self) -> impl Iterator<Item = &str> {
        split_nonempty(&self.output)
    }

    pub(crate) fn inhibitors(&self) -> impl Iterator<Item = &str> {
        split_nonempty(&self.inhibitor)
    }

    /// Parses `place=delta` pairs, failing on malformed entries.
    pub(crate) fn control_rates(&self) -> impl Iterator<Item = Result<(&str, f64), String>> {
        split_nonempty(&self.control_rate).map(|entry| {
            let (place, delta) = entry.split_once('=').ok_or_else(|| entry.to_string())?;
            let delta: f64 = delta.parse().map_err(|_| entry.to_string())?;
            Ok((place, delta))
        })
    }

    /// Whether `player_control` names an actual owning player.
    pub(crate) fn owner(&self) -> Option<&str> {
        let p = self.player_control.trim();
        if p.is_empty() || p == "None" {
            None
        } else {
            Some(p)
        }
    }
}
