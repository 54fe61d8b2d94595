use crate::model::card::Card;
use core::fmt;

/// Unrecoverable engine failures.
///
/// Everything here signals that the tree builder and the information model
/// have diverged (or that a caller held a stale handle); callers must abort
/// the traversal rather than continue with corrupted state. Expected
/// absences — a belief particle with no child matching an observation —
/// are ordinary control flow and never surface as an error.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A revealed card contradicts a position we already knew.
    InfoSetDiverged {
        position: usize,
        expected: Card,
        actual: Card,
    },
    /// An information-set bucket would go negative.
    CorruptInfoSet { reason: &'static str },
    /// A card reached a rule branch that has no play semantics for it.
    UnsupportedCard { card: Card },
    /// An encoded action failed to decode.
    MalformedAction,
    /// The public action log is full.
    HistoryOverflow,
    /// A node handle outlived the storage generation it pointed at.
    StaleHandle,
    /// A child index past the node's child count.
    ChildOutOfRange { index: usize },
    /// Terminal utility was requested from a non-terminal node.
    NotATerminal,
    /// Chance-child probabilities were requested from a non-chance node.
    NotAChance,
    /// The acting player was requested from a chance or terminal node.
    NoActingPlayer,
    /// The free-card pool ran dry before every unresolved slot was filled.
    FreePoolExhausted { missing: usize },
    /// Every belief particle was rejected by an observation.
    EmptyBelief,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InfoSetDiverged {
                position,
                expected,
                actual,
            } => write!(
                f,
                "draw pile position {position} was known to be {expected} but is revealed as {actual}"
            ),
            EngineError::CorruptInfoSet { reason } => {
                write!(f, "information set accounting broke: {reason}")
            }
            EngineError::UnsupportedCard { card } => {
                write!(f, "no play rule for card {card}")
            }
            EngineError::MalformedAction => write!(f, "malformed encoded action"),
            EngineError::HistoryOverflow => write!(f, "action history is full"),
            EngineError::StaleHandle => write!(f, "node handle refers to freed storage"),
            EngineError::ChildOutOfRange { index } => {
                write!(f, "child index {index} past the node's child count")
            }
            EngineError::NotATerminal => write!(f, "utility requested from a non-terminal node"),
            EngineError::NotAChance => {
                write!(f, "chance probability requested from a non-chance node")
            }
            EngineError::NoActingPlayer => {
                write!(f, "acting player requested from a chance or terminal node")
            }
            EngineError::FreePoolExhausted { missing } => {
                write!(f, "free-card pool exhausted with {missing} slots unfilled")
            }
            EngineError::EmptyBelief => write!(f, "no belief particle survived the observation"),
        }
    }
}

impl std::error::Error for EngineError {}
