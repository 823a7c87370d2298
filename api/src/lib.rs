pub mod client;
pub mod wire;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Domain types, independent of the backend's wire format
// ---------------------------------------------------------------------------

/// Identifier exactly as the backend sent it. Posted back in the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Num(i64),
    Text(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Num(n) => write!(f, "{n}"),
            Id::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Num(n)
    }
}

impl From<i32> for Id {
    fn from(n: i32) -> Self {
        Id::Num(i64::from(n))
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::Text(s.to_owned())
    }
}

/// A user or a team, depending on the event's `multiplayer` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    pub participant: Option<Participant>, // None = TBD, feeder not decided yet
}

impl Slot {
    pub fn resolved(id: impl Into<Id>, name: impl Into<String>) -> Self {
        Self {
            participant: Some(Participant { id: id.into(), name: name.into() }),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.participant.is_some()
    }

    pub fn label(&self) -> &str {
        self.participant.as_ref().map(|p| p.name.as_str()).unwrap_or("TBD")
    }
}

/// Which of the two slots of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSide {
    First,
    Second,
}

impl SlotSide {
    pub fn index(self) -> usize {
        match self {
            SlotSide::First => 0,
            SlotSide::Second => 1,
        }
    }
}

/// Lifecycle of a match as observed by the client. Never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    /// At least one slot is still waiting for its feeder.
    Pending,
    /// Both slots resolved, no winner yet.
    Ready,
    Decided,
}

impl MatchState {
    pub fn label(&self) -> &'static str {
        match self {
            MatchState::Pending => "pending",
            MatchState::Ready => "ready",
            MatchState::Decided => "decided",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub id: Id,
    /// Round index, 0 = first round.
    pub key_number: u32,
    /// Position within the round. Stable ordering key.
    pub match_number: u32,
    pub winner_id: Option<Id>,
    pub slots: [Slot; 2],
}

impl Match {
    pub fn slot(&self, side: SlotSide) -> &Slot {
        &self.slots[side.index()]
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Slot::is_resolved)
    }

    pub fn state(&self) -> MatchState {
        if self.winner_id.is_some() {
            MatchState::Decided
        } else if self.is_complete() {
            MatchState::Ready
        } else {
            MatchState::Pending
        }
    }

    pub fn winner(&self) -> Option<&Participant> {
        let winner_id = self.winner_id.as_ref()?;
        self.slots
            .iter()
            .filter_map(|s| s.participant.as_ref())
            .find(|p| &p.id == winner_id)
    }

    pub fn is_winner(&self, side: SlotSide) -> bool {
        match (&self.winner_id, &self.slot(side).participant) {
            (Some(winner), Some(p)) => &p.id == winner,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    /// The `keyNumber` shared by every match of this round.
    pub index: u32,
    pub matches: Vec<Match>,
}

/// Immutable snapshot of one event's bracket, rounds in play order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bracket {
    pub event_id: String,
    pub multiplayer: bool,
    pub rounds: Vec<Round>,
}

impl Bracket {
    /// Group raw matches into rounds ascending by `key_number`, each round
    /// sorted by `match_number`. Arrival order of the input is irrelevant.
    pub fn from_matches(event_id: impl Into<String>, multiplayer: bool, matches: Vec<Match>) -> Self {
        let mut by_round: BTreeMap<u32, Vec<Match>> = BTreeMap::new();
        for m in matches {
            by_round.entry(m.key_number).or_default().push(m);
        }

        let rounds = by_round
            .into_iter()
            .map(|(index, mut matches)| {
                matches.sort_by_key(|m| m.match_number);
                Round { index, matches }
            })
            .collect();

        Self { event_id: event_id.into(), multiplayer, rounds }
    }

    /// Locate a match by id. Returns (round position, match position, match).
    pub fn find_match(&self, id: &Id) -> Option<(usize, usize, &Match)> {
        self.rounds.iter().enumerate().find_map(|(r, round)| {
            round
                .matches
                .iter()
                .position(|m| &m.id == id)
                .map(|i| (r, i, &round.matches[i]))
        })
    }

    pub fn match_at(&self, round: usize, idx: usize) -> Option<&Match> {
        self.rounds.get(round)?.matches.get(idx)
    }

    pub fn match_count(&self) -> usize {
        self.rounds.iter().map(|r| r.matches.len()).sum()
    }

    pub fn final_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    /// Winner of the final, once the final is a single decided match.
    pub fn champion(&self) -> Option<&Participant> {
        let last = self.final_round()?;
        match last.matches.as_slice() {
            [only] => only.winner(),
            _ => None,
        }
    }
}
