use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ResolvedUserResponse {
    pub id: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FriendsResponse {
    pub data: Vec<Value>,
}
