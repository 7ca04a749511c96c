use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub message: String,
    pub message_hindi: Option<String>,
    pub target_role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryStats {
    pub total_users: usize,
    pub messages_sent: usize,
    pub messages_failed: usize,
}

#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub message: String,
    pub stats: DeliveryStats,
}
