use serde::{Deserialize, Serialize};

// ============================================================================
// Principal - who is acting on the order collection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Operator,
    Requester,
    FulfillmentAgent,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Operator => "operator",
            Role::Requester => "requester",
            Role::FulfillmentAgent => "fulfillment_agent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub role: Role,
    /// Customer id for requesters, partner id for agents.
    pub id: String,
}

impl Principal {
    pub fn new(role: Role, id: impl Into<String>) -> Self {
        Self { role, id: id.into() }
    }

    pub fn operator(id: impl Into<String>) -> Self {
        Self::new(Role::Operator, id)
    }

    pub fn requester(customer_id: impl Into<String>) -> Self {
        Self::new(Role::Requester, customer_id)
    }

    pub fn agent(partner_id: impl Into<String>) -> Self {
        Self::new(Role::FulfillmentAgent, partner_id)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.role.as_str(), self.id)
    }
}
