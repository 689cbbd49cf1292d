use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Something a thread hangs off of: a portfolio entry, a shared board,
/// any commentable unit of the wider product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Subject {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub collaborators: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommenterBadge {
    Owner,
    Collaborator,
    Visitor,
}

impl CommenterBadge {
    /// Label shown next to the author name, if any.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::Owner => Some("owner"),
            Self::Collaborator => Some("collaborator"),
            Self::Visitor => None,
        }
    }
}

impl Subject {
    pub fn badge_for(&self, author_id: Uuid) -> CommenterBadge {
        if author_id == self.owner_id {
            CommenterBadge::Owner
        } else if self.collaborators.contains(&author_id) {
            CommenterBadge::Collaborator
        } else {
            CommenterBadge::Visitor
        }
    }

    /// The subject owner may delete any comment under it.
    pub fn can_moderate(&self, actor_id: Uuid) -> bool {
        actor_id == self.owner_id
    }
}
