use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{Color, GameCode, GameError, GameSnapshot, PatternOffer, PlayerId, Polarity, StampMask};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateGameRequest {
    pub colors: Vec<Color>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateGameResponse {
    pub success: bool,
    pub game_code: GameCode,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct JoinGameRequest {
    pub game_id: GameCode,
    pub preferred_color: Option<Color>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct JoinGameResponse {
    pub success: bool,
    pub player_id: PlayerId,
    pub assigned_color: Color,
}

/// A stamp placement. The server derives everything else from it; no
/// client-side state is merged into the game.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MoveRequest {
    pub game_id: GameCode,
    pub player_id: PlayerId,
    pub anchor: usize,
    pub mask: StampMask,
    pub polarity: Polarity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MoveResponse {
    pub accepted: bool,
    pub goal_reached: bool,
    pub revision: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OffersResponse {
    pub offers: Vec<PatternOffer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

/// Items of a game's event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "camelCase")]
#[ts(export)]
pub enum StreamEvent {
    Connected,
    GameUpdate(GameSnapshot),
    Keepalive,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ClientMessage {
    CreateGame { colors: Vec<Color> },
    JoinGame { game_id: GameCode, preferred_color: Option<Color> },
    /// Attach to an already joined seat with a fresh subscription.
    Watch { game_id: GameCode, player_id: PlayerId },
    SubmitMove { anchor: usize, mask: StampMask, polarity: Polarity },
    RequestOffers,
    Heartbeat,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ServerMessage {
    GameCreated { game_code: GameCode },
    Joined { player_id: PlayerId, assigned_color: Color },
    MoveAccepted { goal_reached: bool, revision: u64 },
    Offers { offers: Vec<PatternOffer> },
    Event { event: StreamEvent },
    Rejected { error: GameError },
    Error { message: String },
}
