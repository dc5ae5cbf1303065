//! Named collections of the quiz dataset.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One of the three stored collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Quizzes,
    Questions,
    Answers,
}

impl Collection {
    /// Wholesale reset order, leaves first.
    pub const RESET_ORDER: [Collection; 3] = [Self::Answers, Self::Questions, Self::Quizzes];

    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            Self::Quizzes => "quizzes",
            Self::Questions => "questions",
            Self::Answers => "answers",
        }
    }

    /// Human-facing label used in logs and progress output.
    pub fn label(self) -> &'static str {
        match self {
            Self::Quizzes => "Quizzes",
            Self::Questions => "Questions",
            Self::Answers => "Answers",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// Error for an unknown collection name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCollection(pub String);

impl Display for UnknownCollection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown collection `{}`; expected quizzes|questions|answers",
            self.0
        )
    }
}

impl Error for UnknownCollection {}

impl FromStr for Collection {
    type Err = UnknownCollection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quizzes" | "quiz" => Ok(Self::Quizzes),
            "questions" | "question" => Ok(Self::Questions),
            "answers" | "answer" => Ok(Self::Answers),
            other => Err(UnknownCollection(other.to_string())),
        }
    }
}
