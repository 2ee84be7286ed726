use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message the callback bridge page posts to the window that opened the flow.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HandoffMessage {
    pub auth_id: String,
}

/// Body of a successful token redemption. `tokens` is the provider's token
/// response, passed through untouched.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenRedeemResponse {
    pub tokens: Value,
}
