//! Change notifications for farm data
//!
//! Every write publishes a `ChangeEvent`. Subscribers treat any event as a
//! signal to refetch and recompute; events carry no row data.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

/// Table whose rows changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    CattleFattening,
    MilkReception,
    StorageTanks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: ChangeTable,
    pub farm_id: Uuid,
}

/// Process-wide fan-out of change events
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: ChangeEvent) {
        // No receivers is fine, nobody is watching this farm
        let receivers = self.sender.send(event).unwrap_or(0);
        tracing::debug!(
            "Published {:?} change for farm {} to {} subscriber(s)",
            event.table,
            event.farm_id,
            receivers
        );
    }

    /// Subscribe to one farm's changes, optionally narrowed to one table
    pub fn subscribe(&self, farm_id: Uuid, table: Option<ChangeTable>) -> ChangeSubscription {
        ChangeSubscription {
            receiver: self.sender.subscribe(),
            farm_id,
            table,
        }
    }
}

pub struct ChangeSubscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    farm_id: Uuid,
    table: Option<ChangeTable>,
}

impl ChangeSubscription {
    /// Wait for the next matching change. None once the feed is closed.
    ///
    /// A lagging subscriber has missed events it cannot replay, so it gets a
    /// synthetic event for its farm and reloads everything.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Change subscriber for farm {} lagged by {} event(s)",
                        self.farm_id,
                        skipped
                    );
                    return Some(ChangeEvent {
                        table: self.table.unwrap_or(ChangeTable::CattleFattening),
                        farm_id: self.farm_id,
                    });
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    fn matches(&self, event: &ChangeEvent) -> bool {
        event.farm_id == self.farm_id && self.table.map_or(true, |t| t == event.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_filters_by_farm_and_table() {
        let feed = ChangeFeed::new(16);
        let farm = Uuid::new_v4();
        let mut sub = feed.subscribe(farm, Some(ChangeTable::MilkReception));

        feed.publish(ChangeEvent {
            table: ChangeTable::MilkReception,
            farm_id: Uuid::new_v4(),
        });
        feed.publish(ChangeEvent {
            table: ChangeTable::CattleFattening,
            farm_id: farm,
        });
        feed.publish(ChangeEvent {
            table: ChangeTable::MilkReception,
            farm_id: farm,
        });

        let event = sub.next().await.unwrap();
        assert_eq!(event.farm_id, farm);
        assert_eq!(event.table, ChangeTable::MilkReception);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_gets_reload_signal() {
        let feed = ChangeFeed::new(1);
        let farm = Uuid::new_v4();
        let mut sub = feed.subscribe(farm, None);

        for _ in 0..3 {
            feed.publish(ChangeEvent {
                table: ChangeTable::StorageTanks,
                farm_id: farm,
            });
        }

        let event = sub.next().await.unwrap();
        assert_eq!(event.farm_id, farm);
    }

    #[test]
    fn test_event_payload_format() {
        let payload = r#"{"table":"milk_reception","farm_id":"00000000-0000-0000-0000-000000000000"}"#;
        let event: ChangeEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(event.table, ChangeTable::MilkReception);
        assert_eq!(event.farm_id, Uuid::nil());
    }
}
