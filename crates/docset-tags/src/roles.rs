use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::TagResult;

/// Source of user roles, supplied by the embedding application.
#[async_trait]
pub trait RoleProvider: Send + Sync {
    /// Roles held by `user_id`; unknown users have none.
    async fn roles(&self, user_id: u64) -> TagResult<Vec<String>>;
}

/// Fixed user-to-roles table.
#[derive(Clone, Debug, Default)]
pub struct StaticRoles {
    roles: HashMap<u64, Vec<String>>,
}

impl StaticRoles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, user_id: u64, role: impl Into<String>) -> Self {
        self.roles.entry(user_id).or_default().push(role.into());
        self
    }
}

#[async_trait]
impl RoleProvider for StaticRoles {
    async fn roles(&self, user_id: u64) -> TagResult<Vec<String>> {
        Ok(self.roles.get(&user_id).cloned().unwrap_or_default())
    }
}
