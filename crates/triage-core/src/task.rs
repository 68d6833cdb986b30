use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Urgency class for a task. Display order is by [`Priority::rank`],
/// critical first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    Moderate,
    Optional,
}

impl Priority {
    /// Sort rank; lower is more urgent.
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 1,
            Self::Moderate => 2,
            Self::Optional => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Moderate => "moderate",
            Self::Optional => "optional",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "moderate" => Ok(Self::Moderate),
            "optional" => Ok(Self::Optional),
            other => Err(anyhow::anyhow!("invalid priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,

    pub text: String,

    pub priority: Priority,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Mints a fresh task. `text` is expected to be trimmed and non-empty;
    /// the store enforces that before calling in here.
    pub fn new(text: String, priority: Priority, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            priority,
            created_at: now,
        }
    }
}
