use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: uuid::Uuid,
    pub display_name: String,
    pub bio: Option<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl UserProfile {
    pub fn new(display_name: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            display_name,
            bio: None,
            goals: Vec::new(),
            created_at: None,
        }
    }

    pub fn with_bio(mut self, bio: Option<String>) -> Self {
        self.bio = bio;
        self
    }

    pub fn with_goals(mut self, goals: Vec<String>) -> Self {
        self.goals = goals;
        self
    }
}
