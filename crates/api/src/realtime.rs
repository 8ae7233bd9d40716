use std::collections::HashMap;

use tokio::sync::RwLock;
use tokio::sync::broadcast;

use skillswap_domain::chat::ChatMessage;

use crate::observability;

const ROOM_CAPACITY: usize = 256;

/// In-process fan-out table, one broadcast channel per request conversation.
/// Subscriptions are lazy and rooms are pruned once the last listener is
/// gone. State does not survive a restart.
#[derive(Default)]
pub struct ChatRealtime {
    rooms: RwLock<HashMap<String, broadcast::Sender<ChatMessage>>>,
}

impl ChatRealtime {
    pub async fn subscribe(&self, room: &str) -> broadcast::Receiver<ChatMessage> {
        let mut rooms = self.rooms.write().await;
        let sender = rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0);
        observability::register_chat_realtime_event("subscribe");
        sender.subscribe()
    }

    /// Returns the number of listeners the message reached.
    pub async fn publish(&self, room: &str, message: ChatMessage) -> usize {
        let delivered = {
            let rooms = self.rooms.read().await;
            match rooms.get(room) {
                Some(sender) => sender.send(message).unwrap_or(0),
                None => 0,
            }
        };
        observability::register_chat_realtime_event("publish");

        if delivered == 0 {
            let mut rooms = self.rooms.write().await;
            if rooms
                .get(room)
                .is_some_and(|sender| sender.receiver_count() == 0)
            {
                rooms.remove(room);
            }
        }
        delivered
    }

    #[cfg(test)]
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, content: &str) -> ChatMessage {
        ChatMessage {
            message_id: id.to_string(),
            request_id: "r1".to_string(),
            sender_id: "u1".to_string(),
            sender_name: "u1".to_string(),
            content: content.to_string(),
            created_at_ms: 0,
        }
    }

    #[tokio::test]
    async fn all_subscribers_see_the_same_order() {
        let realtime = ChatRealtime::default();
        let mut a = realtime.subscribe("r1").await;
        let mut b = realtime.subscribe("r1").await;

        for (id, content) in [("m1", "one"), ("m2", "two"), ("m3", "three")] {
            assert_eq!(realtime.publish("r1", message(id, content)).await, 2);
        }

        for expected in ["one", "two", "three"] {
            assert_eq!(a.recv().await.expect("recv").content, expected);
            assert_eq!(b.recv().await.expect("recv").content, expected);
        }
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let realtime = ChatRealtime::default();
        let mut a = realtime.subscribe("r1").await;
        let _b = realtime.subscribe("r2").await;

        realtime.publish("r1", message("m1", "one")).await;
        assert_eq!(a.recv().await.expect("recv").content, "one");
        assert!(a.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_room_is_pruned_on_publish() {
        let realtime = ChatRealtime::default();
        {
            let _receiver = realtime.subscribe("r1").await;
        }
        assert_eq!(realtime.room_count().await, 1);
        assert_eq!(realtime.publish("r1", message("m1", "one")).await, 0);
        assert_eq!(realtime.room_count().await, 0);
    }
}
