use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A user's sentiment on a post. One per (user, post) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    #[default]
    None,
    Like,
    Dislike,
}

/// What a client may ask for. `none` is only ever reached by toggling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Like,
    Dislike,
}

#[derive(Debug, Error)]
#[error("unknown reaction value '{0}'")]
pub struct UnknownReaction(pub String);

impl Reaction {
    /// Next state after the owner asks for `action`.
    /// Repeating the current reaction clears it; anything else switches to it.
    pub fn toggle(self, action: ReactionAction) -> Reaction {
        let requested = Reaction::from(action);
        if self == requested {
            Reaction::None
        } else {
            requested
        }
    }

    /// `None` when there is no opinion to show.
    pub fn as_opinion(self) -> Option<Reaction> {
        match self {
            Reaction::None => None,
            other => Some(other),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Reaction::None => "none",
            Reaction::Like => "like",
            Reaction::Dislike => "dislike",
        }
    }
}

impl From<ReactionAction> for Reaction {
    fn from(action: ReactionAction) -> Self {
        match action {
            ReactionAction::Like => Reaction::Like,
            ReactionAction::Dislike => Reaction::Dislike,
        }
    }
}

impl FromStr for Reaction {
    type Err = UnknownReaction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Reaction::None),
            "like" => Ok(Reaction::Like),
            "dislike" => Ok(Reaction::Dislike),
            other => Err(UnknownReaction(other.to_string())),
        }
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionAction {
    type Err = UnknownReaction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(ReactionAction::Like),
            "dislike" => Ok(ReactionAction::Dislike),
            other => Err(UnknownReaction(other.to_string())),
        }
    }
}
