use serde::{Deserialize, Serialize};

/// Bearer token claims this service reads. Other claims the identity
/// service adds are ignored.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub role: u8, // role id
    pub exp: usize,
    pub token_type: TokenType,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
