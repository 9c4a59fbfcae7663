use wegate_common::MessageKind;

use crate::message::NormalizedMessage;

/// The package handed to a responder: the classified kind, group flag, the
/// conversation to answer to, and the full normalized message for anything
/// the responder wants to dig out itself.
#[derive(Debug)]
pub struct MsgContext {
    pub kind: MessageKind,
    pub is_group: bool,
    /// Conversation id replies are dispatched to.
    pub receiver: String,
    /// Stable key for per-conversation responder state: the room id in a
    /// group, the peer id in a single chat.
    pub session_id: String,
    pub message: NormalizedMessage,
}

impl MsgContext {
    #[must_use]
    pub fn from_message(message: NormalizedMessage) -> Self {
        let receiver = message.conversation_id.clone();
        let session_id = if message.is_group {
            message.conversation_id.clone()
        } else {
            message.sender_id.clone()
        };
        Self {
            kind: message.kind,
            is_group: message.is_group,
            receiver,
            session_id,
            message,
        }
    }
}
