use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: uuid::Uuid,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Insight {
    pub fn new(title: String, content: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            title,
            content,
            category: None,
            created_at: Some(chrono::Utc::now()),
        }
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }
}
