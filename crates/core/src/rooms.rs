//! Shared room store: one code buffer and one chat log per room.
//!
//! Rooms live in `rooms.json` keyed by their user-chosen id. Creation is an
//! explicit confirm step after referencing an unseen id; joining is
//! idempotent and participants never leave.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use tracing::{debug, info};

use crate::errors::{AuthError, CoreError, StoreError, ValidationError};
use crate::models::{ChatMessage, Room};
use crate::persist::JsonStore;

/// Timestamp format stamped onto chat messages.
const CHAT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Store of shared rooms.
pub struct RoomStore {
    store: JsonStore<HashMap<String, Room>>,
}

impl RoomStore {
    /// Create a handle backed by `rooms.json` under `data_dir`.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            store: JsonStore::new(data_dir.as_ref().join("rooms.json")),
        }
    }

    /// Create a new room. The creator becomes its first participant.
    pub fn create(
        &self,
        id: &str,
        description: &str,
        creator: &str,
    ) -> Result<Room, CoreError> {
        self.store.update(|rooms| {
            if rooms.contains_key(id) {
                return Err(ValidationError::RoomExists(id.to_string()).into());
            }
            let room = Room {
                id: id.to_string(),
                description: description.to_string(),
                code: String::new(),
                chat: Vec::new(),
                participants: vec![creator.to_string()],
            };
            rooms.insert(id.to_string(), room.clone());
            info!(room = id, creator, "created room");
            Ok(room)
        })
    }

    /// Add `username` to the room's participants. Joining twice is a no-op.
    pub fn join(&self, id: &str, username: &str) -> Result<Room, CoreError> {
        self.store.update(|rooms| {
            let room = rooms
                .get_mut(id)
                .ok_or_else(|| StoreError::not_found("room", id))?;
            if !room.participants.iter().any(|p| p == username) {
                room.participants.push(username.to_string());
                info!(room = id, username, "joined room");
            }
            Ok(room.clone())
        })
    }

    /// Look up a room by id.
    pub fn get(&self, id: &str) -> Result<Room, CoreError> {
        let rooms = self.store.read()?;
        rooms
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("room", id).into())
    }

    /// Replace the room's shared code buffer.
    pub fn save_code(&self, id: &str, code: &str) -> Result<(), CoreError> {
        self.store.update(|rooms| {
            let room = rooms
                .get_mut(id)
                .ok_or_else(|| StoreError::not_found("room", id))?;
            room.code = code.to_string();
            debug!(room = id, bytes = code.len(), "saved room code");
            Ok(())
        })
    }

    /// Append a chat message, stamped with the current time.
    pub fn append_message(
        &self,
        id: &str,
        user: &str,
        message: &str,
    ) -> Result<ChatMessage, CoreError> {
        self.store.update(|rooms| {
            let room = rooms
                .get_mut(id)
                .ok_or_else(|| StoreError::not_found("room", id))?;
            let entry = ChatMessage {
                user: user.to_string(),
                message: message.to_string(),
                timestamp: Utc::now().format(CHAT_TIME_FORMAT).to_string(),
            };
            room.chat.push(entry.clone());
            debug!(room = id, user, "appended chat message");
            Ok(entry)
        })
    }

    /// Replace the text of the message at `index`. Only its author may edit;
    /// the original timestamp is kept.
    pub fn edit_message(
        &self,
        id: &str,
        index: usize,
        acting_user: &str,
        new_text: &str,
    ) -> Result<(), CoreError> {
        self.store.update(|rooms| {
            let room = rooms
                .get_mut(id)
                .ok_or_else(|| StoreError::not_found("room", id))?;
            let entry = room
                .chat
                .get_mut(index)
                .ok_or_else(|| StoreError::not_found("chat message", index.to_string()))?;
            if entry.user != acting_user {
                return Err(AuthError::Forbidden {
                    user: acting_user.to_string(),
                    action: format!("edit message {index} in room {id}"),
                }
                .into());
            }
            entry.message = new_text.to_string();
            debug!(room = id, index, "edited chat message");
            Ok(())
        })
    }

    /// Remove the message at `index`. Only its author may delete it; later
    /// messages shift down by one.
    pub fn delete_message(
        &self,
        id: &str,
        index: usize,
        acting_user: &str,
    ) -> Result<(), CoreError> {
        self.store.update(|rooms| {
            let room = rooms
                .get_mut(id)
                .ok_or_else(|| StoreError::not_found("room", id))?;
            let entry = room
                .chat
                .get(index)
                .ok_or_else(|| StoreError::not_found("chat message", index.to_string()))?;
            if entry.user != acting_user {
                return Err(AuthError::Forbidden {
                    user: acting_user.to_string(),
                    action: format!("delete message {index} in room {id}"),
                }
                .into());
            }
            room.chat.remove(index);
            debug!(room = id, index, "deleted chat message");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_store() -> (tempfile::TempDir, RoomStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RoomStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_create_room() {
        let (_dir, store) = room_store();

        let room = store.create("rust101", "intro session", "alice").unwrap();
        assert_eq!(room.participants, vec!["alice".to_string()]);
        assert!(room.code.is_empty());

        let fetched = store.get("rust101").unwrap();
        assert_eq!(fetched, room);
    }

    #[test]
    fn test_create_existing_room_rejected() {
        let (_dir, store) = room_store();
        store.create("rust101", "intro", "alice").unwrap();

        let result = store.create("rust101", "again", "bob");
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::RoomExists(_)))
        ));
    }

    #[test]
    fn test_join_is_idempotent() {
        let (_dir, store) = room_store();
        store.create("rust101", "intro", "alice").unwrap();

        store.join("rust101", "bob").unwrap();
        let room = store.join("rust101", "bob").unwrap();
        assert_eq!(
            room.participants,
            vec!["alice".to_string(), "bob".to_string()]
        );
    }

    #[test]
    fn test_join_unknown_room() {
        let (_dir, store) = room_store();
        let result = store.join("ghost", "alice");
        assert!(matches!(
            result,
            Err(CoreError::Store(StoreError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_save_code_replaces_buffer() {
        let (_dir, store) = room_store();
        store.create("rust101", "intro", "alice").unwrap();

        store.save_code("rust101", "print('hello')").unwrap();
        store.save_code("rust101", "print('bye')").unwrap();
        assert_eq!(store.get("rust101").unwrap().code, "print('bye')");
    }

    #[test]
    fn test_chat_append_and_edit() {
        let (_dir, store) = room_store();
        store.create("rust101", "intro", "alice").unwrap();

        let sent = store.append_message("rust101", "alice", "hi all").unwrap();
        store.edit_message("rust101", 0, "alice", "hello all").unwrap();

        let room = store.get("rust101").unwrap();
        assert_eq!(room.chat[0].message, "hello all");
        // Editing keeps the original timestamp.
        assert_eq!(room.chat[0].timestamp, sent.timestamp);
    }

    #[test]
    fn test_chat_edit_by_non_author_forbidden() {
        let (_dir, store) = room_store();
        store.create("rust101", "intro", "alice").unwrap();
        store.append_message("rust101", "alice", "hi").unwrap();

        let result = store.edit_message("rust101", 0, "bob", "hijacked");
        assert!(matches!(
            result,
            Err(CoreError::Auth(AuthError::Forbidden { .. }))
        ));
        assert_eq!(store.get("rust101").unwrap().chat[0].message, "hi");
    }

    #[test]
    fn test_chat_delete_shifts_indexes() {
        let (_dir, store) = room_store();
        store.create("rust101", "intro", "alice").unwrap();
        store.append_message("rust101", "alice", "first").unwrap();
        store.append_message("rust101", "alice", "second").unwrap();

        store.delete_message("rust101", 0, "alice").unwrap();
        let room = store.get("rust101").unwrap();
        assert_eq!(room.chat.len(), 1);
        assert_eq!(room.chat[0].message, "second");
    }

    #[test]
    fn test_chat_delete_by_non_author_forbidden() {
        let (_dir, store) = room_store();
        store.create("rust101", "intro", "alice").unwrap();
        store.append_message("rust101", "alice", "hi").unwrap();

        let result = store.delete_message("rust101", 0, "bob");
        assert!(matches!(
            result,
            Err(CoreError::Auth(AuthError::Forbidden { .. }))
        ));
        assert_eq!(store.get("rust101").unwrap().chat.len(), 1);
    }

    #[test]
    fn test_chat_index_out_of_range() {
        let (_dir, store) = room_store();
        store.create("rust101", "intro", "alice").unwrap();

        let result = store.edit_message("rust101", 5, "alice", "x");
        assert!(matches!(
            result,
            Err(CoreError::Store(StoreError::NotFound { .. }))
        ));
        let result = store.delete_message("rust101", 0, "alice");
        assert!(matches!(
            result,
            Err(CoreError::Store(StoreError::NotFound { .. }))
        ));
    }
}
