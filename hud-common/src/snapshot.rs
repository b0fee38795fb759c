//! One point-in-time state payload published by the tracker backend.
//!
//! Every field is optional on the wire and falls back to its rest state, so a
//! payload from an older or newer backend still decodes. A field that is present
//! with the wrong type is rejected.

use crate::team::{ObjectiveKind, Owner, SchemaError, Team};
use crate::{BOTTOM_OBJECTIVE_SLOTS, TOP_OBJECTIVE_SLOTS};
use arrayvec::ArrayVec;
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

/// Points a team can still bank for each top objective it holds
pub const TOP_OBJECTIVE_POINTS: u32 = 20;

#[derive(Debug, Default, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct TeamState {
    #[serde(rename = "value", alias = "score", default, deserialize_with = "nullable")]
    pub score: u32,
    #[serde(rename = "kos", alias = "knockouts", default, deserialize_with = "nullable")]
    pub knockouts: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub surrendered: bool,
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct SelfState {
    #[serde(rename = "value", alias = "score", default, deserialize_with = "nullable")]
    pub score: u32,
    #[serde(rename = "kos", alias = "knockouts", default, deserialize_with = "nullable")]
    pub knockouts: u32,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct BottomObjective {
    #[serde(rename = "name", alias = "kind")]
    pub kind: ObjectiveKind,
    #[serde(rename = "team", alias = "owner")]
    pub owner: Team,
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// The user has started the tracker
    #[serde(default, deserialize_with = "nullable")]
    pub ready: bool,
    #[serde(rename = "match", alias = "inMatch", default, deserialize_with = "nullable")]
    pub in_match: bool,
    #[serde(
        rename = "seconds",
        alias = "secondsRemaining",
        default,
        deserialize_with = "nullable"
    )]
    pub seconds_remaining: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub purple: TeamState,
    #[serde(default, deserialize_with = "nullable")]
    pub orange: TeamState,
    #[serde(rename = "self", alias = "selfState", default, deserialize_with = "nullable")]
    pub self_state: SelfState,
    #[serde(rename = "stacks", alias = "stackCount", default, deserialize_with = "nullable")]
    pub stack_count: u32,
    /// Position is the objective slot
    #[serde(
        rename = "regis",
        alias = "topObjectiveOwners",
        default,
        deserialize_with = "top_objectives"
    )]
    pub top_objectives: [Owner; TOP_OBJECTIVE_SLOTS],
    #[serde(rename = "rayquaza", alias = "centralObjectiveOwner", default)]
    pub central_objective: Owner,
    /// Secured bottom objectives in slot order, missing slots are unclaimed
    #[serde(
        rename = "bottom",
        alias = "bottomObjectives",
        default,
        deserialize_with = "bottom_objectives"
    )]
    pub bottom_objectives: ArrayVec<BottomObjective, BOTTOM_OBJECTIVE_SLOTS>,
    /// Newest event last
    #[serde(rename = "events", alias = "eventLog", default, deserialize_with = "nullable")]
    pub event_log: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub version: String,
    #[serde(default, deserialize_with = "nullable")]
    pub profile: String,
    #[serde(default, deserialize_with = "nullable")]
    pub debug: bool,
}

impl Snapshot {
    pub fn from_json(bytes: &[u8]) -> Result<Self, SchemaError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn team(&self, team: Team) -> &TeamState {
        match team {
            Team::Purple => &self.purple,
            Team::Orange => &self.orange,
        }
    }

    pub fn team_mut(&mut self, team: Team) -> &mut TeamState {
        match team {
            Team::Purple => &mut self.purple,
            Team::Orange => &mut self.orange,
        }
    }

    /// Number of top objective slots currently held by `team`
    pub fn top_objectives_held(&self, team: Team) -> usize {
        self.top_objectives
            .iter()
            .filter(|owner| owner.team() == Some(team))
            .count()
    }

    /// The most a team's score can reach by banking its held top objectives,
    /// `None` when it holds none
    pub fn potential_score(&self, team: Team) -> Option<u32> {
        match self.top_objectives_held(team) as u32 {
            0 => None,
            held => Some(self.team(team).score + held * TOP_OBJECTIVE_POINTS),
        }
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn top_objectives<'de, D>(deserializer: D) -> Result<[Owner; TOP_OBJECTIVE_SLOTS], D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Owner>>::deserialize(deserializer)?.unwrap_or_default();
    if raw.len() > TOP_OBJECTIVE_SLOTS {
        warn!(
            "Snapshot reported {} top objectives, ignoring all past {TOP_OBJECTIVE_SLOTS}",
            raw.len()
        );
    }
    let mut owners = [Owner::None; TOP_OBJECTIVE_SLOTS];
    owners
        .iter_mut()
        .zip(raw)
        .for_each(|(slot, owner)| *slot = owner);
    Ok(owners)
}

fn bottom_objectives<'de, D>(
    deserializer: D,
) -> Result<ArrayVec<BottomObjective, BOTTOM_OBJECTIVE_SLOTS>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<BottomObjective>>::deserialize(deserializer)?.unwrap_or_default();
    if raw.len() > BOTTOM_OBJECTIVE_SLOTS {
        warn!(
            "Snapshot reported {} bottom objectives, ignoring all past {BOTTOM_OBJECTIVE_SLOTS}",
            raw.len()
        );
    }
    Ok(raw.into_iter().take(BOTTOM_OBJECTIVE_SLOTS).collect())
}
