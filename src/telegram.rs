//! Telegram Bot API projections (spec.md §4.1, §4.5 supplement)
//!
//! `GetTgUser`/`GetTgUpdateList` project a decoded JSON response into the
//! shapes spec.md's Data Model names. The response `Value` itself already
//! owns its strings (serde_json gives us that for free, unlike the arena
//! the original reached for to own theirs) — an `Arena` context is still
//! required by [`crate::poll`] because assembling the log line below
//! allocates scratch storage into it, same role the original's arena played
//! for its `as_tg_update`/`as_tg_message` decode pass.

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::result::PollResult;

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct TgUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct TgChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct TgMessage {
    pub message_id: i64,
    pub chat: TgChat,
    pub from: Option<TgUser>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct TgUpdate {
    pub update_id: i64,
    pub message: Option<TgMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TgMethod {
    GetMe,
    GetUpdates,
    SendMessage,
    SetMessageReaction,
}

/// A fully-built request, ready for `CurlPerform` (spec.md §4.5 supplement).
#[derive(Debug, Clone)]
pub struct TgMethodCall {
    pub method: TgMethod,
    pub url: String,
}

impl TgMethodCall {
    pub fn get_me(base: &str, token: &str) -> Self {
        Self { method: TgMethod::GetMe, url: crate::url::get_me(base, token) }
    }

    pub fn get_updates(base: &str, token: &str, offset: Option<i64>) -> Self {
        Self { method: TgMethod::GetUpdates, url: crate::url::get_updates(base, token, offset) }
    }

    pub fn send_message(base: &str, token: &str, chat_id: i64, text: &str) -> Self {
        Self { method: TgMethod::SendMessage, url: crate::url::send_message(base, token, chat_id, text) }
    }

    pub fn set_message_reaction(base: &str, token: &str, chat_id: i64, message_id: i64) -> Self {
        Self {
            method: TgMethod::SetMessageReaction,
            url: crate::url::set_message_reaction(base, token, chat_id, message_id),
        }
    }
}

/// Projects a `getMe` response body into a `Done` result carrying the
/// decoded user as JSON. Dispatches on `.ok` first (spec.md §4.2
/// `GetTgUser`): `true` reads `.result`; `false` surfaces `.description`
/// (the Telegram API's own error message) and returns *Error*.
pub fn get_user(root: &JsonValue) -> PollResult {
    let ok = root.get("ok").and_then(JsonValue::as_bool).unwrap_or(false);
    if !ok {
        let description = root.get("description").and_then(JsonValue::as_str).unwrap_or("unknown error");
        println!("[ERROR] getMe failed: {description}");
        return PollResult::error();
    }

    match root.get("result").cloned().map(serde_json::from_value::<TgUser>) {
        Some(Ok(user)) => {
            println!("[INFO] got user {} (id {})", user.first_name, user.id);
            PollResult::done_json(serde_json::to_value(user).expect("TgUser always serializes"))
        }
        _ => PollResult::error(),
    }
}

/// Projects a `getUpdates` response body (`{"ok":true,"result":[...]}`)
/// into a `Done` result carrying the decoded update list as JSON.
pub fn get_update_list(root: &JsonValue, arena: &Bump) -> PollResult {
    let Some(items) = root.get("result").and_then(JsonValue::as_array) else {
        return PollResult::error();
    };

    let mut updates = Vec::with_capacity(items.len());
    // Scratch buffer for the summary line, arena-backed per the Arena
    // context this task requires (mirrors the original's use of its arena
    // as decode working memory rather than long-lived storage).
    let mut chat_ids: BumpVec<i64> = BumpVec::new_in(arena);
    for item in items {
        match serde_json::from_value::<TgUpdate>(item.clone()) {
            Ok(update) => {
                if let Some(chat_id) = update.message.as_ref().map(|m| m.chat.id) {
                    chat_ids.push(chat_id);
                }
                updates.push(update);
            }
            Err(_) => return PollResult::error(),
        }
    }

    println!("[INFO] got {} update(s) from chats {:?}", updates.len(), chat_ids.as_slice());
    PollResult::done_json(serde_json::to_value(updates).expect("Vec<TgUpdate> always serializes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_a_well_formed_get_me_response() {
        let root = json!({"ok": true, "result": {"id": 1, "is_bot": true, "first_name": "bot"}});
        let r = get_user(&root);
        assert!(r.is_done());
    }

    #[test]
    fn malformed_get_me_response_is_an_error_result() {
        let root = json!({"ok": false});
        assert!(get_user(&root).is_error());
    }

    #[test]
    fn api_error_response_is_an_error_result() {
        let root = json!({"ok": false, "error_code": 401, "description": "Unauthorized"});
        assert!(get_user(&root).is_error());
    }

    #[test]
    fn decodes_an_update_list_and_tracks_chat_ids() {
        let arena = Bump::new();
        let root = json!({
            "ok": true,
            "result": [
                {"update_id": 1, "message": {"message_id": 1, "chat": {"id": 9, "type": "private"}, "text": "hi"}}
            ]
        });
        let r = get_update_list(&root, &arena);
        assert!(r.is_done());
    }
}
