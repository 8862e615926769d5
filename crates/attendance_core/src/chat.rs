//! crates/attendance_core/src/chat.rs
//!
//! Conversations between an employee and the admin desk. Messages are
//! append-only; the only mutation is the one-way `read` flag.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{ChatMessage, ChatParty, Employee, NewChatMessage};
use crate::error::CoreResult;
use crate::ports::RecordStore;

#[derive(Debug, Validate)]
struct ChatDraft {
    #[validate(length(min = 1, max = 1000, message = "Message must be 1-1000 characters"))]
    text: String,
}

#[derive(Clone)]
pub struct ChatDesk {
    store: Arc<dyn RecordStore>,
}

impl ChatDesk {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// The side of the conversation `employee` speaks for.
    fn party_of(employee: &Employee) -> ChatParty {
        if employee.is_admin() {
            ChatParty::AdminDesk
        } else {
            ChatParty::Employee(employee.id)
        }
    }

    /// Appends a message to the conversation with `conversation_employee_id`.
    /// Admins speak for the desk; employees can only write to their own thread.
    pub async fn send(
        &self,
        sender: &Employee,
        conversation_employee_id: Uuid,
        text: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<ChatMessage> {
        let draft = ChatDraft {
            text: text.trim().to_string(),
        };
        draft.validate()?;

        let (from, to) = if sender.is_admin() {
            (ChatParty::AdminDesk, ChatParty::Employee(conversation_employee_id))
        } else {
            (ChatParty::Employee(sender.id), ChatParty::AdminDesk)
        };

        let message = self
            .store
            .insert_chat_message(NewChatMessage {
                sender: from,
                sender_name: sender.full_name.clone(),
                sender_role: sender.role,
                receiver: to,
                text: draft.text,
                sent_at: now,
            })
            .await?;
        debug!(message_id = %message.id, sender = %from, receiver = %to, "Chat message stored");
        Ok(message)
    }

    /// The conversation oldest first, as `reader` sees it. Messages addressed to
    /// the reader are flagged read afterwards; the returned list shows them as
    /// they were before this view.
    pub async fn conversation(
        &self,
        reader: &Employee,
        conversation_employee_id: Uuid,
    ) -> CoreResult<Vec<ChatMessage>> {
        let messages = self.store.conversation(conversation_employee_id).await?;

        let me = Self::party_of(reader);
        let counterpart = match me {
            ChatParty::AdminDesk => ChatParty::Employee(conversation_employee_id),
            ChatParty::Employee(_) => ChatParty::AdminDesk,
        };
        if messages.iter().any(|m| m.receiver == me && !m.read) {
            self.store.mark_read(me, counterpart).await?;
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::memory::MemoryStore;
    use crate::testing::{admin, at, employee};

    #[tokio::test]
    async fn employee_and_desk_exchange_messages() {
        let store = Arc::new(MemoryStore::new());
        let desk = ChatDesk::new(store.clone());
        let e1 = employee("E1", "Asha Raman");
        let e2 = employee("E2", "Ravi Kumar");
        let boss = admin("A1", "Meera Iyer");

        let sent = desk
            .send(&e1, e1.id, "  Running late today  ", at(2024, 6, 1, 8, 0))
            .await
            .unwrap();
        assert_eq!(sent.text, "Running late today");
        assert_eq!(sent.receiver, ChatParty::AdminDesk);
        assert!(!sent.read);

        desk.send(&e2, e2.id, "Unrelated thread", at(2024, 6, 1, 8, 1))
            .await
            .unwrap();
        desk.send(&boss, e1.id, "Noted, thanks", at(2024, 6, 1, 8, 2))
            .await
            .unwrap();

        // The admin's view flags the employee's message as read.
        let admin_view = desk.conversation(&boss, e1.id).await.unwrap();
        assert_eq!(admin_view.len(), 2);
        assert_eq!(admin_view[0].sender, ChatParty::Employee(e1.id));
        assert_eq!(admin_view[1].sender, ChatParty::AdminDesk);

        let employee_view = desk.conversation(&e1, e1.id).await.unwrap();
        assert!(employee_view[0].read);
        assert!(!employee_view[1].read);

        let after = store.conversation(e1.id).await.unwrap();
        assert!(after.iter().all(|m| m.read));
    }

    #[tokio::test]
    async fn blank_and_oversized_messages_are_rejected() {
        let desk = ChatDesk::new(Arc::new(MemoryStore::new()));
        let e1 = employee("E1", "Asha Raman");

        let blank = desk.send(&e1, e1.id, "   ", at(2024, 6, 1, 8, 0)).await;
        assert!(matches!(blank, Err(CoreError::Validation(_))));

        let long = "x".repeat(1001);
        let oversized = desk.send(&e1, e1.id, &long, at(2024, 6, 1, 8, 0)).await;
        assert!(matches!(oversized, Err(CoreError::Validation(_))));
    }
}
