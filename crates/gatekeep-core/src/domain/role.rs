use serde::{Deserialize, Serialize};

/// Role entity - read-only reference data ranked by precedence level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    /// Higher levels are more privileged.
    pub level: i32,
    pub description: String,
}

impl Role {
    pub fn new(id: i64, name: impl Into<String>, level: i32) -> Self {
        Self {
            id,
            name: name.into(),
            level,
            description: String::new(),
        }
    }

    /// Whether this role is at least as privileged as `required`.
    pub fn outranks_or_equals(&self, required: &Role) -> bool {
        self.level >= required.level
    }
}
