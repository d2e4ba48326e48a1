//! Tasks and their geographic extents.

use serde::Deserialize;

/// Geographic extent of a task in WGS84 decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    /// West edge.
    pub min_x: f64,
    /// South edge.
    pub min_y: f64,
    /// East edge.
    pub max_x: f64,
    /// North edge.
    pub max_y: f64,
}

impl Extent {
    /// Build an extent from a `[left, bottom, right, top]` array.
    ///
    /// Each axis pair is sorted, so an array with swapped values still
    /// describes the same rectangle.
    pub fn from_bounds(bounds: [f64; 4]) -> Self {
        let [x0, y0, x1, y1] = bounds;
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {} {}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

/// One unit of crowd annotation, tied to a fixed geographic extent.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Server-side task id.
    pub id: u64,
    /// Area the volunteers were shown.
    pub extent: Extent,
}

// ============================================================================
// JSON Schema Types (matching the /api/task response)
// ============================================================================

/// A task as returned by `/api/task`.
#[derive(Debug, Deserialize)]
pub(crate) struct TaskRecord {
    pub id: u64,
    pub info: TaskInfo,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskInfo {
    pub tile: TileInfo,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TileInfo {
    #[serde(rename = "restrictedExtent")]
    pub restricted_extent: [f64; 4],
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        Task {
            id: record.id,
            extent: Extent::from_bounds(record.info.tile.restricted_extent),
        }
    }
}

/// An application as returned by `/api/app`.
#[derive(Debug, Deserialize)]
pub(crate) struct AppRecord {
    pub id: u64,
}
