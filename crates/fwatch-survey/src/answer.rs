//! Volunteer answers (task runs).

use serde::Deserialize;
use serde_json::Value;

/// Sentinel label sent by the deforestation survey when nothing was marked.
pub const NO_DEFORESTATION: &str = "no-deforestation";

/// One volunteer's response to a task.
///
/// The payload shape depends on the survey: the best-tile survey sends a
/// plain label, the deforestation survey sends a feature list or the
/// [`NO_DEFORESTATION`] sentinel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    /// A plain label (category or sentinel).
    Label(String),
    /// Marked features for spatial-answer surveys.
    Features(Vec<Feature>),
    /// Anything else, kept verbatim.
    Other(Value),
}

impl Answer {
    /// The label, if this is a plain-string answer other than the sentinel.
    pub fn label(&self) -> Option<&str> {
        match self {
            Answer::Label(label) if label != NO_DEFORESTATION => Some(label),
            _ => None,
        }
    }

    /// Whether the volunteer reported no deforestation.
    pub fn is_no_deforestation(&self) -> bool {
        matches!(self, Answer::Label(label) if label == NO_DEFORESTATION)
    }
}

/// A marked feature.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Feature {
    /// Feature geometry.
    pub geometry: Geometry,
}

/// Geometry of a marked feature, in WGS84 longitude/latitude.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// A single position.
    Point {
        /// `[x, y]` (extra ordinates are kept).
        coordinates: Vec<f64>,
    },
    /// A polygon; the first ring is the outer ring.
    Polygon {
        /// Rings of `[x, y]` positions.
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    /// Any other geometry type.
    #[serde(other)]
    Unsupported,
}

/// One answer record for a task.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteRecord {
    /// Task-run id.
    pub id: u64,
    /// Task this answer belongs to.
    pub task_id: u64,
    /// Answer payload.
    pub answer: Answer,
}

// ============================================================================
// JSON Schema Types (matching the /api/taskrun response)
// ============================================================================

/// A task run as returned by `/api/taskrun`.
#[derive(Debug, Deserialize)]
pub(crate) struct TaskRunRecord {
    pub id: u64,
    pub task_id: u64,
    #[serde(default)]
    pub info: Value,
}

impl TaskRunRecord {
    /// Extract the answer stored under `info.<key>`.
    ///
    /// A missing key or non-object `info` yields `Answer::Other(Value::Null)`.
    pub fn into_vote(self, key: &str) -> VoteRecord {
        let raw = match self.info {
            Value::Object(mut map) => map.remove(key).unwrap_or(Value::Null),
            _ => Value::Null,
        };
        let answer = serde_json::from_value(raw.clone()).unwrap_or(Answer::Other(raw));
        VoteRecord {
            id: self.id,
            task_id: self.task_id,
            answer,
        }
    }
}
