//! The immutable structural description of a PNPSC net (`spec.md` §3, §4.A),
//! plus the mutable simulation state a [`crate::simulator::Simulator`] owns
//! exclusively during a run.

use std::collections::HashMap;

use tracing::info;

use crate::error::{LoaderError, NetError, PnpscResult};
use crate::net::definition::{NetDefinition, PlaceDef, PlayerDef, TransitionDef};

/// Index of a place in the canonical sorted order.
pub type PlaceIdx = usize;
/// Index of a transition in the canonical sorted order.
pub type TransitionIdx = usize;

/// Index of a player in registration order (not sorted — registration order
/// is observable via turn sequencing in `spec.md` §4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub usize);

/// A `(place, delta)` control-rate modifier: while `place` is marked, add
/// `delta` to the owning transition's effective rate.
#[derive(Debug, Clone, Copy)]
pub struct ControlRateModifier {
    pub place: PlaceIdx,
    pub delta: f64,
}

#[derive(Debug, Clone)]
pub struct TransitionInfo {
    pub name: String,
    pub base_rate: f64,
    pub owner: Option<PlayerId>,
    pub inputs: Vec<PlaceIdx>,
    pub outputs: Vec<PlaceIdx>,
    pub inhibitors: Vec<PlaceIdx>,
    pub control_rates: Vec<ControlRateModifier>,
    pub fire_cost: Option<f64>,
}

/// Structurally constant description of a PNPSC net: arcs, control-rate
/// modifiers, ownership and visibility, all resolved to dense indices at
/// construction time (`spec.md` §9 "Dynamic dictionaries ... → dense
/// vectors").
#[derive(Debug, Clone)]
pub struct NetModel {
    place_names: Vec<String>,
    place_index: HashMap<String, PlaceIdx>,
    initial_marking: Vec<f64>,
    goal_owner: Vec<Option<PlayerId>>,

    transitions: Vec<TransitionInfo>,
    transition_index: HashMap<String, TransitionIdx>,

    player_names: Vec<String>,
    player_index: HashMap<String, PlayerId>,

    /// Sorted place indices visible to each player.
    visible_places: Vec<Vec<PlaceIdx>>,
    /// Sorted transition indices controlled by each player.
    controlled_rates: Vec<Vec<TransitionIdx>>,
    /// Place indices that are this player's own goal places.
    goal_places: Vec<Vec<PlaceIdx>>,
    /// Place indices that are any *other* player's goal places.
    end_places: Vec<Vec<PlaceIdx>>,
}

impl NetModel {
    /// Parses a declarative net definition from a JSON string and builds
    /// the canonical model in one step (`spec.md` §4.E/§6).
    pub fn load_str(json: &str) -> PnpscResult<Self> {
        let def: NetDefinition = serde_json::from_str(json).map_err(LoaderError::Json)?;
        Self::from_definition(&def)
    }

    /// As [`Self::load_str`], reading the JSON document from an arbitrary
    /// reader.
    pub fn load_reader(reader: impl std::io::Read) -> PnpscResult<Self> {
        let def: NetDefinition = serde_json::from_reader(reader).map_err(LoaderError::Json)?;
        Self::from_definition(&def)
    }

    pub fn from_definition(def: &NetDefinition) -> PnpscResult<Self> {
        let mut player_names = Vec::with_capacity(def.players.len());
        let mut player_index = HashMap::with_capacity(def.players.len());
        for (i, p) in def.players.iter().enumerate() {
            player_index.insert(p.name.clone(), PlayerId(i));
            player_names.push(p.name.clone());
        }

        let mut sorted_places: Vec<&crate::net::definition::PlaceDef> = def.places.iter().collect();
        sorted_places.sort_by(|a, b| a.name.cmp(&b.name));

        let mut place_names = Vec::with_capacity(sorted_places.len());
        let mut place_index = HashMap::with_capacity(sorted_places.len());
        let mut initial_marking = Vec::with_capacity(sorted_places.len());
        let mut goal_owner = Vec::with_capacity(sorted_places.len());
        let mut visible_places = vec![Vec::new(); player_names.len()];
        let mut goal_places = vec![Vec::new(); player_names.len()];

        for (idx, p) in sorted_places.iter().enumerate() {
            if p.marking < 0 {
                return Err(NetError::NegativeMarking(p.name.clone()).into());
            }
            place_index.insert(p.name.clone(), idx);
            place_names.push(p.name.clone());
            initial_marking.push(p.marking as f64);

            for observer in p.observers() {
                let pid = player_index
                    .get(observer)
                    .ok_or_else(|| NetError::UnknownPlayer(observer.to_string()))?;
                visible_places[pid.0].push(idx);
            }

            let owner = match &p.goal {
                Some(name) => {
                    let pid = *player_index
                        .get(name.as_str())
                        .ok_or_else(|| NetError::UnknownPlayer(name.clone()))?;
                    goal_places[pid.0].push(idx);
                    Some(pid)
                }
                None => None,
            };
            goal_owner.push(owner);
        }

        let mut sorted_transitions: Vec<&crate::net::definition::TransitionDef> =
            def.transitions.iter().collect();
        sorted_transitions.sort_by(|a, b| a.name.cmp(&b.name));

        let mut transition_index = HashMap::with_capacity(sorted_transitions.len());
        for (idx, t) in sorted_transitions.iter().enumerate() {
            transition_index.insert(t.name.clone(), idx);
        }

        let mut controlled_rates = vec![Vec::new(); player_names.len()];
        let mut transitions = Vec::with_capacity(sorted_transitions.len());

        let resolve_place = |name: &str, place_index: &HashMap<String, PlaceIdx>| {
            place_index
                .get(name)
                .copied()
                .ok_or_else(|| NetError::UnknownPlace(name.to_string()))
        };

        for (idx, t) in sorted_transitions.iter().enumerate() {
            let inputs = t
                .inputs()
                .map(|p| resolve_place(p, &place_index))
                .collect::<Result<Vec<_>, _>>()?;
            let outputs = t
                .outputs()
                .map(|p| resolve_place(p, &place_index))
                .collect::<Result<Vec<_>, _>>()?;
            let inhibitors = t
                .inhibitors()
                .map(|p| resolve_place(p, &place_index))
                .collect::<Result<Vec<_>, _>>()?;

            for ih in &inhibitors {
                if inputs.contains(ih) {
                    return Err(NetError::OverlappingArcs(
                        t.name.clone(),
                        place_names[*ih].clone(),
                    )
                    .into());
                }
            }

            let control_rates = t
                .control_rates()
                .map(|res| {
                    let (place, delta) = res.map_err(NetError::MalformedControlRate)?;
                    Ok(ControlRateModifier {
                        place: resolve_place(place, &place_index)?,
                        delta,
                    })
                })
                .collect::<Result<Vec<_>, NetError>>()?;

            let owner = match t.owner() {
                Some(name) => {
                    let pid = *player_index
                        .get(name)
                        .ok_or_else(|| NetError::UnknownPlayer(name.to_string()))?;
                    controlled_rates[pid.0].push(idx);
                    Some(pid)
                }
                None => None,
            };

            transitions.push(TransitionInfo {
                name: t.name.clone(),
                base_rate: t.rate,
                owner,
                inputs,
                outputs,
                inhibitors,
                control_rates,
                fire_cost: t.fire_cost,
            });
        }

        let end_places: Vec<Vec<PlaceIdx>> = (0..player_names.len())
            .map(|me| {
                let mut union: Vec<PlaceIdx> = goal_places
                    .iter()
                    .enumerate()
                    .filter(|(other, _)| *other != me)
                    .flat_map(|(_, places)| places.iter().copied())
                    .collect();
                union.sort_unstable();
                union.dedup();
                union
            })
            .collect();

        info!(
            places = place_names.len(),
            transitions = transitions.len(),
            players = player_names.len(),
            "loaded PNPSC net"
        );

        Ok(Self {
            place_names,
            place_index,
            initial_marking,
            goal_owner,
            transitions,
            transition_index,
            player_names,
            player_index,
            visible_places,
            controlled_rates,
            goal_places,
            end_places,
        })
    }

    pub fn num_places(&self) -> usize {
        self.place_names.len()
    }

    pub fn num_transitions(&self) -> usize {
        self.transitions.len()
    }

    pub fn num_players(&self) -> usize {
        self.player_names.len()
    }

    pub fn place_name(&self, idx: PlaceIdx) -> &str {
        &self.place_names[idx]
    }

    pub fn place_names(&self) -> &[String] {
        &self.place_names
    }

    pub fn transition_name(&self, idx: TransitionIdx) -> &str {
        &self.transitions[idx].name
    }

    pub fn transition_names(&self) -> impl Iterator<Item = &str> {
        self.transitions.iter().map(|t| t.name.as_str())
    }

    pub fn place_index(&self, name: &str) -> Option<PlaceIdx> {
        self.place_index.get(name).copied()
    }

    pub fn transition_index(&self, name: &str) -> Option<TransitionIdx> {
        self.transition_index.get(name).copied()
    }

    pub fn player_id(&self, name: &str) -> Option<PlayerId> {
        self.player_index.get(name).copied()
    }

    pub fn player_name(&self, id: PlayerId) -> &str {
        &self.player_names[id.0]
    }

    pub fn player_names(&self) -> &[String] {
        &self.player_names
    }

    pub fn initial_marking(&self) -> &[f64] {
        &self.initial_marking
    }

    pub fn initial_rates(&self) -> Vec<f64> {
        self.transitions.iter().map(|t| t.base_rate).collect()
    }

    pub fn transition(&self, idx: TransitionIdx) -> &TransitionInfo {
        &self.transitions[idx]
    }

    pub fn transitions(&self) -> &[TransitionInfo] {
        &self.transitions
    }

    /// Sorted place indices visible to `player`.
    pub fn visible_places(&self, player: PlayerId) -> &[PlaceIdx] {
        &self.visible_places[player.0]
    }

    /// Sorted transition indices controlled by `player`.
    pub fn controlled_rates(&self, player: PlayerId) -> &[TransitionIdx] {
        &self.controlled_rates[player.0]
    }

    /// This player's own goal places.
    pub fn goal_places(&self, player: PlayerId) -> &[PlaceIdx] {
        &self.goal_places[player.0]
    }

    /// Union of every *other* player's goal places (bug-fixed per
    /// `spec.md` §9: unions all other players, not just the first).
    pub fn end_places(&self, player: PlayerId) -> &[PlaceIdx] {
        &self.end_places[player.0]
    }

    pub fn goal_owner(&self, place: PlaceIdx) -> Option<PlayerId> {
        self.goal_owner[place]
    }

    /// Reconstructs the declarative form from canonical state
    /// (`spec.md` §8 "Round-trip / idempotence").
    pub fn to_definition(&self) -> NetDefinition {
        let players = self
            .player_names
            .iter()
            .map(|name| PlayerDef { name: name.clone() })
            .collect();

        let mut observers: Vec<Vec<&str>> = vec![Vec::new(); self.num_places()];
        for (pid, places) in self.visible_places.iter().enumerate() {
            for &p in places {
                observers[p].push(&self.player_names[pid]);
            }
        }

        let places = (0..self.num_places())
            .map(|i| PlaceDef {
                name: self.place_names[i].clone(),
                marking: self.initial_marking[i] as i64,
                player_observable: observers[i].join(","),
                goal: self.goal_owner[i].map(|pid| self.player_names[pid.0].clone()),
                description: None,
            })
            .collect();

        let transitions = self
            .transitions
            .iter()
            .map(|t| TransitionDef {
                name: t.name.clone(),
                rate: t.base_rate,
                input: self.join_places(&t.inputs),
                output: self.join_places(&t.outputs),
                inhibitor: self.join_places(&t.inhibitors),
                control_rate: t
                    .control_rates
                    .iter()
                    .map(|m| format!("{}={}", self.place_names[m.place], m.delta))
                    .collect::<Vec<_>>()
                    .join(","),
                player_control: t
                    .owner
                    .map(|pid| self.player_names[pid.0].clone())
                    .unwrap_or_default(),
                fire_cost: t.fire_cost,
                description: None,
            })
            .collect();

        NetDefinition {
            players,
            places,
            transitions,
        }
    }

    fn join_places(&self, places: &[PlaceIdx]) -> String {
        places
            .iter()
            .map(|&p| self.place_names[p].as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}
