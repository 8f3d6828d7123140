use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Something the user owns. Kept on the device only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FridgeItem {
    pub id: i64,
    pub name: String,
}
