//! The fixed set of date-coded acquisitions volunteers choose from.

use std::path::{Path, PathBuf};

/// Number of candidate acquisitions per task.
pub const CATEGORY_COUNT: usize = 12;

/// Acquisition labels (year followed by day of year), in tally index order.
pub const CATEGORY_LABELS: [&str; CATEGORY_COUNT] = [
    "2011352", "2011353", "2011355", "2011357", "2011358", "2011359",
    "2011360", "2011361", "2011362", "2011363", "2011364", "2011365",
];

/// One of the [`CATEGORY_COUNT`] acquisitions, identified by its tally index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category(pub(crate) usize);

impl Category {
    /// Category at a tally index, if in range.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < CATEGORY_COUNT).then_some(Self(index))
    }

    /// Category for an exact label match.
    pub fn from_label(label: &str) -> Option<Self> {
        CATEGORY_LABELS.iter().position(|&l| l == label).map(Self)
    }

    /// All categories in index order.
    pub fn all() -> impl Iterator<Item = Category> {
        (0..CATEGORY_COUNT).map(Self)
    }

    /// Tally index.
    pub fn index(self) -> usize {
        self.0
    }

    /// Acquisition label.
    pub fn label(self) -> &'static str {
        CATEGORY_LABELS[self.0]
    }

    /// Source raster for this acquisition inside `images_dir`.
    pub fn source_path(self, images_dir: &Path) -> PathBuf {
        images_dir.join(format!("{}.tif", self.label()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_lookup() {
        assert_eq!(Category::from_label("2011352").map(Category::index), Some(0));
        assert_eq!(Category::from_label("2011353").map(Category::index), Some(1));
        assert_eq!(Category::from_label("2011365").map(Category::index), Some(11));
        // Day 354 and 356 were never offered.
        assert_eq!(Category::from_label("2011354"), None);
        assert_eq!(Category::from_label(" 2011353"), None);
        assert_eq!(Category::from_label(""), None);
    }

    #[test]
    fn test_index_roundtrip() {
        for category in Category::all() {
            assert_eq!(Category::from_label(category.label()), Some(category));
            assert_eq!(Category::from_index(category.index()), Some(category));
        }
        assert_eq!(Category::from_index(CATEGORY_COUNT), None);
    }

    #[test]
    fn test_source_path() {
        let category = Category::from_label("2011360").unwrap();
        assert_eq!(
            category.source_path(Path::new("/data/FAS_Brazil7")),
            PathBuf::from("/data/FAS_Brazil7/2011360.tif")
        );
    }
}
