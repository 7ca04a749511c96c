use std::collections::HashMap;

use tracing::warn;
use uuid::Uuid;

use crate::messages::{self, ReminderLine};
use crate::state::AppState;
use crate::users::repo::User;

use super::dto::DeliveryStats;
use super::repo::PendingPurchaseRow;

/// All outstanding purchases of one reachable user, in purchase order.
pub struct ReminderBatch {
    pub user_id: Uuid,
    pub phone_number: String,
    pub lines: Vec<ReminderLine>,
}

/// Group pending purchases per user. Rows whose user reference is gone or
/// whose user has no phone number cannot be delivered and are counted as
/// skipped.
pub fn group_reminders(rows: Vec<PendingPurchaseRow>) -> (Vec<ReminderBatch>, usize) {
    let mut skipped = 0;
    let mut order: Vec<Uuid> = Vec::new();
    let mut by_user: HashMap<Uuid, ReminderBatch> = HashMap::new();

    for row in rows {
        let (user_id, phone) = match (row.user_id, row.user_phone) {
            (Some(id), Some(phone)) if !phone.trim().is_empty() => (id, phone),
            _ => {
                warn!(purchase_id = %row.purchase_id, "pending purchase without reachable user");
                skipped += 1;
                continue;
            }
        };
        let batch = by_user.entry(user_id).or_insert_with(|| {
            order.push(user_id);
            ReminderBatch {
                user_id,
                phone_number: phone,
                lines: Vec::new(),
            }
        });
        batch.lines.push(ReminderLine {
            purchased_at: row.purchased_at,
            remaining_amount: row.remaining_amount,
        });
    }

    let batches = order
        .into_iter()
        .filter_map(|id| by_user.remove(&id))
        .collect();
    (batches, skipped)
}

/// Send one composed message to every user; failures are counted, not
/// retried.
pub async fn broadcast_to_users(state: &AppState, users: &[User], body: &str) -> DeliveryStats {
    let mut stats = DeliveryStats {
        total_users: users.len(),
        messages_sent: 0,
        messages_failed: 0,
    };
    for user in users {
        if user.phone_number.trim().is_empty() {
            warn!(user_id = %user.id, "user has no phone number, skipping");
            stats.messages_failed += 1;
            continue;
        }
        match state.notifier.send(&user.phone_number, body).await {
            Ok(_) => stats.messages_sent += 1,
            Err(e) => {
                warn!(error = %e, user_id = %user.id, "broadcast message failed");
                stats.messages_failed += 1;
            }
        }
    }
    stats
}

/// One consolidated reminder per user; skipped rows count as failures.
pub async fn deliver_reminders(state: &AppState, rows: Vec<PendingPurchaseRow>) -> DeliveryStats {
    let (batches, skipped) = group_reminders(rows);
    let mut stats = DeliveryStats {
        total_users: batches.len(),
        messages_sent: 0,
        messages_failed: skipped,
    };

    for batch in batches {
        let body = messages::payment_reminder(&state.config, &batch.lines);
        match state.notifier.send(&batch.phone_number, &body).await {
            Ok(_) => stats.messages_sent += 1,
            Err(e) => {
                warn!(error = %e, user_id = %batch.user_id, "payment reminder failed");
                stats.messages_failed += 1;
            }
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn row(
        user_id: Option<Uuid>,
        phone: Option<&str>,
        remaining: f64,
    ) -> PendingPurchaseRow {
        PendingPurchaseRow {
            purchase_id: Uuid::new_v4(),
            user_id,
            remaining_amount: remaining,
            purchased_at: datetime!(2024-03-01 09:00 UTC),
            user_phone: phone.map(Into::into),
        }
    }

    #[test]
    fn purchases_are_grouped_per_user() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let rows = vec![
            row(Some(alice), Some("9876543210"), 100.0),
            row(Some(bob), Some("9123456780"), 200.0),
            row(Some(alice), Some("9876543210"), 300.0),
        ];

        let (batches, skipped) = group_reminders(rows);
        assert_eq!(skipped, 0);
        assert_eq!(batches.len(), 2);
        let alice_batch = batches.iter().find(|b| b.user_id == alice).unwrap();
        assert_eq!(alice_batch.lines.len(), 2);
        let bob_batch = batches.iter().find(|b| b.user_id == bob).unwrap();
        assert_eq!(bob_batch.lines.len(), 1);
    }

    #[test]
    fn unreachable_users_are_skipped_and_counted() {
        let rows = vec![
            row(None, None, 100.0),
            row(Some(Uuid::new_v4()), None, 200.0),
            row(Some(Uuid::new_v4()), Some("  "), 250.0),
            row(Some(Uuid::new_v4()), Some("9876543210"), 300.0),
        ];

        let (batches, skipped) = group_reminders(rows);
        assert_eq!(skipped, 3);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].lines[0].remaining_amount, 300.0);
    }

    #[test]
    fn empty_input_produces_no_batches() {
        let (batches, skipped) = group_reminders(Vec::new());
        assert!(batches.is_empty());
        assert_eq!(skipped, 0);
    }
}
