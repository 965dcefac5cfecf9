//! The `{code, msg}` envelopes that cross the connection boundary.
//!
//! Every message on the wire is a JSON object with a string `code` naming
//! the message kind and a code-specific `msg` payload:
//!
//! ```json
//! { "code": "draw", "msg": { "x": 10, "y": 10, "color": 1, "radius": 2, "connected": false } }
//! ```
//!
//! Inbound messages decode into [`Inbound`], a closed sum type over the
//! known codes plus [`Inbound::Unknown`], which keeps the raw payload so an
//! unrecognized code can be rejected without guessing at its meaning.
//! Outbound messages are [`Outbound`], serialized with serde's adjacent
//! tagging so they have exactly the same shape.

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::{Circle, GameResult, Player, PlayerId, RoomCode, RoomSettings, RoomSnapshot};
use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Inbound payloads
// ---------------------------------------------------------------------------

/// `join`: enter an existing room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinMsg {
    pub room: RoomCode,
    /// Session token handed to the authenticator. Absent means "guest".
    #[serde(default)]
    pub token: Option<String>,
}

/// `create`: make a new room with these settings, then join it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateMsg {
    #[serde(default)]
    pub settings: RoomSettings,
    #[serde(default)]
    pub token: Option<String>,
}

/// `list`: one page of known room codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListMsg {
    pub offset: usize,
    pub count: usize,
}

impl Default for ListMsg {
    fn default() -> Self {
        Self {
            offset: 0,
            count: 20,
        }
    }
}

/// `text`/`chat`: a chat line, which may also be a guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMsg {
    pub text: String,
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// A decoded client → server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Join(JoinMsg),
    Create(CreateMsg),
    List(ListMsg),
    Start,
    Text(TextMsg),
    Draw(Circle),
    Leave,
    /// A code outside the known set. `payload` is the raw `msg` JSON.
    Unknown { code: String, payload: Vec<u8> },
}

/// The envelope as it arrives, before the payload is interpreted.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    code: String,
    #[serde(default)]
    msg: Value,
}

impl Inbound {
    /// Interprets `msg` according to `code`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] when the payload doesn't match the
    /// code's schema. Unknown codes are *not* an error here; they come back
    /// as [`Inbound::Unknown`] and are rejected by whoever receives them.
    pub fn from_parts(code: &str, msg: Value) -> Result<Self, ProtocolError> {
        let inbound = match code {
            "join" => Self::Join(payload(msg)?),
            "create" => Self::Create(payload_or_default(msg)?),
            "list" => Self::List(payload_or_default(msg)?),
            "start" => Self::Start,
            "text" | "chat" => Self::Text(payload(msg)?),
            "draw" => Self::Draw(payload(msg)?),
            "leave" => Self::Leave,
            other => Self::Unknown {
                code: other.to_string(),
                payload: serde_json::to_vec(&msg).map_err(ProtocolError::Encode)?,
            },
        };
        Ok(inbound)
    }

    /// The wire code this message was decoded from.
    pub fn code(&self) -> &str {
        match self {
            Self::Join(_) => "join",
            Self::Create(_) => "create",
            Self::List(_) => "list",
            Self::Start => "start",
            Self::Text(_) => "text",
            Self::Draw(_) => "draw",
            Self::Leave => "leave",
            Self::Unknown { code, .. } => code,
        }
    }
}

/// Lets any [`Codec`](crate::Codec) decode straight into `Inbound`.
impl<'de> Deserialize<'de> for Inbound {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawEnvelope::deserialize(deserializer)?;
        Inbound::from_parts(&raw.code, raw.msg).map_err(de::Error::custom)
    }
}

fn payload<T: DeserializeOwned>(msg: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(msg).map_err(ProtocolError::Decode)
}

/// Like [`payload`], but an absent `msg` means "all defaults".
fn payload_or_default<T: DeserializeOwned + Default>(
    msg: Value,
) -> Result<T, ProtocolError> {
    if msg.is_null() {
        return Ok(T::default());
    }
    payload(msg)
}

// ---------------------------------------------------------------------------
// Outbound payloads
// ---------------------------------------------------------------------------

/// `join`: a player entered the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinNotice {
    pub player: Player,
}

/// `leave`: a player left the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveNotice {
    pub player: PlayerId,
}

/// `chat`: a chat line, attributed to its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMsg {
    pub player: Player,
    pub text: String,
}

/// `begin`: a new turn started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginMsg {
    /// The word to draw. Only the drawer gets it as is; everyone else gets
    /// it masked with one `_` per character (see `doodle_game::mask_word`).
    pub next_word: String,
    pub next_player_index: usize,
}

/// `score`: a player's score changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreMsg {
    pub player: PlayerId,
    pub score: u32,
}

/// `end`: the turn is over; the word is revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndMsg {
    pub word: String,
    /// Room-wide running score total.
    pub tally: u32,
}

/// `finish`: the game is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishMsg {
    pub results: Vec<GameResult>,
}

/// `rooms`: a page of room codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomsMsg {
    pub codes: Vec<RoomCode>,
}

/// `error`: something the client sent was rejected.
///
/// `status` follows HTTP conventions (400 bad request, 404 not found,
/// 409 conflict, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMsg {
    pub status: u16,
    pub error_desc: String,
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A server → client message.
///
/// `#[serde(tag = "code", content = "msg")]` produces the envelope shape
/// directly: `Outbound::Draw(c)` becomes `{"code": "draw", "msg": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "msg", rename_all = "lowercase")]
pub enum Outbound {
    Join(JoinNotice),
    State(RoomSnapshot),
    Leave(LeaveNotice),
    Chat(ChatMsg),
    Begin(BeginMsg),
    Draw(Circle),
    Score(ScoreMsg),
    End(EndMsg),
    Finish(FinishMsg),
    Rooms(RoomsMsg),
    Error(ErrorMsg),
}

impl Outbound {
    /// Shorthand for an `error` envelope.
    pub fn error(status: u16, desc: impl Into<String>) -> Self {
        Self::Error(ErrorMsg {
            status,
            error_desc: desc.into(),
        })
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::State(_) => "state",
            Self::Leave(_) => "leave",
            Self::Chat(_) => "chat",
            Self::Begin(_) => "begin",
            Self::Draw(_) => "draw",
            Self::Score(_) => "score",
            Self::End(_) => "end",
            Self::Finish(_) => "finish",
            Self::Rooms(_) => "rooms",
            Self::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> Result<Inbound, serde_json::Error> {
        serde_json::from_value(value)
    }

    // =====================================================================
    // Inbound decoding
    // =====================================================================

    #[test]
    fn test_decode_draw() {
        let msg = decode(json!({
            "code": "draw",
            "msg": {"x": 10, "y": 10, "color": 1, "radius": 2, "connected": false}
        }))
        .unwrap();
        assert_eq!(
            msg,
            Inbound::Draw(Circle { x: 10, y: 10, color: 1, radius: 2, connected: false })
        );
    }

    #[test]
    fn test_decode_text_and_chat_alias() {
        let text = decode(json!({"code": "text", "msg": {"text": "hi"}})).unwrap();
        let chat = decode(json!({"code": "chat", "msg": {"text": "hi"}})).unwrap();
        assert_eq!(text, chat);
        assert_eq!(text.code(), "text");
    }

    #[test]
    fn test_decode_start_without_msg() {
        assert_eq!(decode(json!({"code": "start"})).unwrap(), Inbound::Start);
        // A stray payload on a payload-less code is ignored.
        assert_eq!(
            decode(json!({"code": "start", "msg": {}})).unwrap(),
            Inbound::Start
        );
    }

    #[test]
    fn test_decode_join_with_and_without_token() {
        let msg = decode(json!({"code": "join", "msg": {"room": "123abc"}})).unwrap();
        assert_eq!(
            msg,
            Inbound::Join(JoinMsg { room: RoomCode::new("123abc"), token: None })
        );

        let msg = decode(json!({"code": "join", "msg": {"room": "x", "token": "t"}}))
            .unwrap();
        assert!(matches!(msg, Inbound::Join(JoinMsg { token: Some(ref t), .. }) if t == "t"));
    }

    #[test]
    fn test_decode_list_defaults_when_msg_missing() {
        let msg = decode(json!({"code": "list"})).unwrap();
        assert_eq!(msg, Inbound::List(ListMsg { offset: 0, count: 20 }));
    }

    #[test]
    fn test_decode_create_reads_settings() {
        let msg = decode(json!({
            "code": "create",
            "msg": {"settings": {"wordBank": ["Word"], "rounds": 1}}
        }))
        .unwrap();
        match msg {
            Inbound::Create(create) => {
                assert_eq!(create.settings.word_bank, vec!["Word".to_string()]);
                assert_eq!(create.settings.rounds, 1);
            }
            other => panic!("expected Create, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_unknown_code_keeps_raw_payload() {
        let msg = decode(json!({"code": "fly", "msg": {"speed": 9000}})).unwrap();
        match msg {
            Inbound::Unknown { code, payload } => {
                assert_eq!(code, "fly");
                let raw: Value = serde_json::from_slice(&payload).unwrap();
                assert_eq!(raw, json!({"speed": 9000}));
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_malformed_payload_is_error() {
        // Known code, wrong payload shape.
        assert!(decode(json!({"code": "draw", "msg": {"x": "left"}})).is_err());
        assert!(decode(json!({"code": "text"})).is_err());
    }

    #[test]
    fn test_decode_missing_code_is_error() {
        assert!(decode(json!({"msg": {"text": "hi"}})).is_err());
    }

    // =====================================================================
    // Outbound shapes
    // =====================================================================

    #[test]
    fn test_begin_json_format() {
        let out = Outbound::Begin(BeginMsg {
            next_word: "Word".into(),
            next_player_index: 0,
        });
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(
            json,
            json!({"code": "begin", "msg": {"nextWord": "Word", "nextPlayerIndex": 0}})
        );
    }

    #[test]
    fn test_draw_echo_has_same_shape_as_input() {
        let input = json!({
            "code": "draw",
            "msg": {"x": 10, "y": 10, "color": 1, "radius": 2, "connected": false}
        });
        let stroke = match decode(input.clone()).unwrap() {
            Inbound::Draw(c) => c,
            other => panic!("expected Draw, got {other:?}"),
        };
        let output = serde_json::to_value(Outbound::Draw(stroke)).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_error_json_format() {
        let json = serde_json::to_value(Outbound::error(400, "not your turn")).unwrap();
        assert_eq!(json["code"], "error");
        assert_eq!(json["msg"]["status"], 400);
        assert_eq!(json["msg"]["errorDesc"], "not your turn");
    }

    #[test]
    fn test_chat_carries_full_player() {
        let out = Outbound::Chat(ChatMsg {
            player: Player::new(PlayerId(3), "cat"),
            text: "Hello 123".into(),
        });
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["msg"]["player"]["id"], 3);
        assert_eq!(json["msg"]["player"]["name"], "cat");
        assert_eq!(json["msg"]["text"], "Hello 123");
    }

    #[test]
    fn test_outbound_code_matches_serialized_tag() {
        let samples = [
            Outbound::Leave(LeaveNotice { player: PlayerId(1) }),
            Outbound::Score(ScoreMsg { player: PlayerId(1), score: 50 }),
            Outbound::End(EndMsg { word: "w".into(), tally: 50 }),
            Outbound::Rooms(RoomsMsg { codes: vec![] }),
        ];
        for out in samples {
            let json = serde_json::to_value(&out).unwrap();
            assert_eq!(json["code"], out.code());
        }
    }
}
