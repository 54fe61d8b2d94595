use crate::error::EngineError;
use crate::game::action::{Action, EncodedAction};
use crate::game::info_set::{INFO_SET_BYTES, InfoSet};
use crate::game::state::GameState;
use crate::model::card::Card;
use crate::model::player::Player;
use serde::{Deserialize, Serialize};

/// An information set together with the legal actions available at it.
///
/// The byte form doubles as the hashable key a strategy store indexes by:
/// the 40 info-set bytes, then each action in its 1- or 3-byte wire form,
/// then a trailing little-endian `u32` holding how many bytes the action
/// section occupied so the decoder can split the buffer from the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoSetWithActions {
    pub info_set: InfoSet,
    pub actions: Vec<Action>,
}

impl InfoSetWithActions {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(INFO_SET_BYTES + 3 * self.actions.len() + 4);
        buf.extend_from_slice(&self.info_set.to_bytes());

        let action_start = buf.len();
        for &action in &self.actions {
            let packed = EncodedAction::encode(action);
            buf.push(packed.0[0]);
            if packed.has_private_info() {
                buf.push(packed.0[1]);
                buf.push(packed.0[2]);
            }
        }

        let action_bytes = (buf.len() - action_start) as u32;
        buf.extend_from_slice(&action_bytes.to_le_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<InfoSetWithActions, EngineError> {
        if bytes.len() < 4 {
            return Err(EngineError::MalformedAction);
        }
        let (body, count) = bytes.split_at(bytes.len() - 4);
        let action_bytes = u32::from_le_bytes([count[0], count[1], count[2], count[3]]) as usize;
        if action_bytes > body.len() {
            return Err(EngineError::MalformedAction);
        }
        let (info_bytes, mut actions_buf) = body.split_at(body.len() - action_bytes);
        let info_set = InfoSet::from_bytes(info_bytes)?;

        let mut actions = Vec::new();
        while !actions_buf.is_empty() {
            let mut packed = EncodedAction::default();
            packed.0[0] = actions_buf[0];
            actions_buf = &actions_buf[1..];
            if packed.has_private_info() {
                if actions_buf.len() < 2 {
                    return Err(EngineError::MalformedAction);
                }
                packed.0[1] = actions_buf[0];
                packed.0[2] = actions_buf[1];
                actions_buf = &actions_buf[2..];
            }
            actions.push(packed.decode()?);
        }

        Ok(InfoSetWithActions { info_set, actions })
    }
}

/// Human-readable snapshot of a game state, for logs and run reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSnapshot {
    pub draw_pile: Vec<Card>,
    pub pile_size: usize,
    pub hands: [Vec<Card>; 2],
    pub actions: Vec<String>,
}

impl GameSnapshot {
    pub fn capture(state: &GameState) -> Self {
        let actions = state
            .history()
            .iter()
            .filter_map(|encoded| encoded.decode().ok())
            .map(|action| action.to_string())
            .collect();
        GameSnapshot {
            draw_pile: (0..state.pile_size()).map(|i| state.pile_card(i)).collect(),
            pile_size: state.pile_size(),
            hands: [
                state.hand(Player::First).as_vec(),
                state.hand(Player::Second).as_vec(),
            ],
            actions,
        }
    }

    pub fn to_json(state: &GameState) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Self::capture(state))
    }
}
