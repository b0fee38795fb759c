use derivative::Derivative;
use enum_iterator::Sequence;
use serde::{Deserialize, Deserializer, Serialize, de};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown team {0:?}")]
    UnknownTeam(String),
    #[error("unknown objective kind {0:?}")]
    UnknownObjective(String),
    #[error("invalid snapshot: {0}")]
    Json(String),
}

impl From<serde_json::Error> for SchemaError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

#[derive(Derivative, Serialize, Sequence)]
#[derivative(Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    #[derivative(Default)]
    Purple,
    Orange,
}

impl Team {
    pub fn other(self) -> Self {
        match self {
            Self::Purple => Self::Orange,
            Self::Orange => Self::Purple,
        }
    }
}

impl core::fmt::Display for Team {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            Self::Purple => write!(f, "Purple"),
            Self::Orange => write!(f, "Orange"),
        }
    }
}

impl FromStr for Team {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "purple" => Ok(Self::Purple),
            "orange" => Ok(Self::Orange),
            _ => Err(SchemaError::UnknownTeam(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Team {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Who holds an objective slot. `None` is the rest state.
#[derive(Derivative, Serialize, Sequence)]
#[derivative(Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    #[derivative(Default)]
    None,
    Purple,
    Orange,
}

impl Owner {
    /// Decodes an owner string from the backend. Anything that is not a team,
    /// including the empty string the backend sends to clear a slot, is `None`.
    pub fn from_wire(s: &str) -> Self {
        s.parse::<Team>().map(Self::from).unwrap_or_default()
    }

    pub fn team(self) -> Option<Team> {
        match self {
            Self::None => None,
            Self::Purple => Some(Team::Purple),
            Self::Orange => Some(Team::Orange),
        }
    }
}

impl From<Team> for Owner {
    fn from(team: Team) -> Self {
        match team {
            Team::Purple => Self::Purple,
            Team::Orange => Self::Orange,
        }
    }
}

impl<'de> Deserialize<'de> for Owner {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Owner::from_wire).unwrap_or_default())
    }
}

#[derive(Derivative, Serialize, Sequence)]
#[derivative(Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveKind {
    #[derivative(Default)]
    Regice,
    Regirock,
    Registeel,
}

impl ObjectiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regice => "regice",
            Self::Regirock => "regirock",
            Self::Registeel => "registeel",
        }
    }

    /// The kind pictured in a bottom slot before anything is secured there
    pub fn rest_for_slot(slot: usize) -> Self {
        match slot % 3 {
            0 => Self::Regice,
            1 => Self::Regirock,
            _ => Self::Registeel,
        }
    }
}

impl FromStr for ObjectiveKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regice" => Ok(Self::Regice),
            "regirock" => Ok(Self::Regirock),
            "registeel" => Ok(Self::Registeel),
            _ => Err(SchemaError::UnknownObjective(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for ObjectiveKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
