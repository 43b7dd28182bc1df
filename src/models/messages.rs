use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdateMessage {
    #[serde(rename = "roomId", alias = "roomToken")]
    pub room_token: String,
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleUpdateMessage {
    #[serde(rename = "roomId", alias = "roomToken")]
    pub room_token: String,
    pub title: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorPositionMessage {
    #[serde(rename = "roomId", alias = "roomToken")]
    pub room_token: String,
    pub position: u64,
    pub user_id: String,
}

/// Cursor as relayed to peers; never persisted
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorMovedMessage {
    pub position: u64,
    pub user_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoteLoadedMessage {
    pub title: String,
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    pub date: String,
}

/// Events a client may send over the socket
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "join-room")]
    JoinRoom(String),
    #[serde(rename = "leave-room")]
    LeaveRoom(String),
    #[serde(rename = "note-update")]
    NoteUpdate(NoteUpdateMessage),
    #[serde(rename = "title-update")]
    TitleUpdate(TitleUpdateMessage),
    #[serde(rename = "cursor-position")]
    CursorPosition(CursorPositionMessage),
    #[serde(rename = "ping")]
    Ping,
}

/// Events the server pushes to a client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "user-joined")]
    UserJoined(String),
    #[serde(rename = "user-left")]
    UserLeft(String),
    #[serde(rename = "note-updated")]
    NoteUpdated(String),
    #[serde(rename = "title-updated")]
    TitleUpdated(String),
    #[serde(rename = "cursor-moved")]
    CursorMoved(CursorMovedMessage),
    #[serde(rename = "note-loaded")]
    NoteLoaded(NoteLoadedMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
}
