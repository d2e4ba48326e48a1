//! Per-task vote counting and winner selection.

use crate::category::{Category, CATEGORY_COUNT};
use fwatch_survey::{Task, VoteRecord};
use tracing::debug;

/// Vote counts for one task, index-aligned to [`crate::CATEGORY_LABELS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    counts: [u32; CATEGORY_COUNT],
}

impl Tally {
    /// Build a tally from raw counts.
    pub fn from_counts(counts: [u32; CATEGORY_COUNT]) -> Self {
        Self { counts }
    }

    /// Count the votes whose label exactly matches a known category.
    ///
    /// Anything else (unknown labels, the no-deforestation sentinel, spatial
    /// answers) is dropped without error.
    pub fn from_votes(votes: &[VoteRecord]) -> Self {
        let mut tally = Self::default();
        for vote in votes {
            if let Some(category) = vote.answer.label().and_then(Category::from_label) {
                tally.counts[category.index()] += 1;
            }
        }
        tally
    }

    /// Raw counts.
    pub fn counts(&self) -> &[u32; CATEGORY_COUNT] {
        &self.counts
    }

    /// Votes for one category.
    pub fn count(&self, category: Category) -> u32 {
        self.counts[category.index()]
    }

    /// Total counted votes.
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Leftmost category with the highest count, and that count.
    ///
    /// An empty tally yields the first category with zero votes.
    pub fn winner(&self) -> (Category, u32) {
        let mut best = 0;
        for (i, &count) in self.counts.iter().enumerate().skip(1) {
            if count > self.counts[best] {
                best = i;
            }
        }
        (Category(best), self.counts[best])
    }
}

/// Tally every task's answers, preserving task order.
pub fn tally_tasks(answers: &[Vec<VoteRecord>]) -> Vec<Tally> {
    answers
        .iter()
        .enumerate()
        .map(|(position, votes)| {
            let tally = Tally::from_votes(votes);
            let (winner, max) = tally.winner();
            debug!(
                position,
                counts = ?tally.counts(),
                maximum = max,
                winner = winner.index(),
                "tally"
            );
            tally
        })
        .collect()
}

/// The winning acquisition for an eligible task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    /// Task id.
    pub task_id: u64,
    /// Winning category.
    pub category: Category,
    /// Votes for the winner.
    pub winning_count: u32,
    /// All counted votes for the task.
    pub total_count: u32,
}

impl Selection {
    /// Pick the winner for `task`, or `None` when it has fewer than
    /// `min_answers` counted votes.
    pub fn select(task: &Task, tally: &Tally, min_answers: u32) -> Option<Self> {
        let total_count = tally.total();
        if total_count < min_answers {
            return None;
        }
        let (category, winning_count) = tally.winner();
        Some(Self {
            task_id: task.id,
            category,
            winning_count,
            total_count,
        })
    }

    /// Share of counted votes that went to the winner; 0.0 with no votes.
    pub fn agreement_ratio(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.winning_count as f64 / self.total_count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fwatch_survey::{Answer, Extent};

    fn votes(labels: &[&str]) -> Vec<VoteRecord> {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| VoteRecord {
                id: i as u64,
                task_id: 1,
                answer: Answer::Label(label.to_string()),
            })
            .collect()
    }

    fn task(id: u64) -> Task {
        Task {
            id,
            extent: Extent::from_bounds([-60.0, -6.0, -59.0, -5.0]),
        }
    }

    #[test]
    fn test_counts_known_labels_only() {
        let mut records = votes(&["2011352", "2011353", "2011353", "bogus", "2011365", "no-deforestation"]);
        records.push(VoteRecord {
            id: 99,
            task_id: 1,
            answer: Answer::Other(serde_json::Value::Null),
        });

        let tally = Tally::from_votes(&records);
        assert_eq!(tally.counts(), &[1, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        // 7 records, 4 matched.
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn test_leftmost_winner_on_tie() {
        let tally = Tally::from_counts([3, 3, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let (winner, count) = tally.winner();
        assert_eq!(winner.index(), 0);
        assert_eq!(count, 3);

        let tally = Tally::from_counts([0, 1, 0, 0, 0, 5, 0, 0, 0, 0, 0, 5]);
        assert_eq!(tally.winner().0.label(), "2011359");
    }

    #[test]
    fn test_empty_tally_winner() {
        let (winner, count) = Tally::default().winner();
        assert_eq!(winner.index(), 0);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_threshold_excludes() {
        let tally = Tally::from_counts([7, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(Selection::select(&task(1), &tally, 10).is_none());
        assert!(Selection::select(&task(1), &tally, 7).is_some());
        assert!(Selection::select(&task(1), &tally, 0).is_some());
    }

    #[test]
    fn test_selection_ratio() {
        let tally = Tally::from_votes(&votes(&[
            "2011352", "2011352", "2011352", "2011352", "2011353", "2011353", "2011353",
            "2011353", "2011353", "2011353",
        ]));
        let selection = Selection::select(&task(1), &tally, 5).unwrap();
        assert_eq!(selection.category.label(), "2011353");
        assert_eq!(selection.winning_count, 6);
        assert_eq!(selection.total_count, 10);
        assert_eq!(selection.agreement_ratio(), 0.6);
    }

    #[test]
    fn test_zero_votes_ratio() {
        let selection = Selection::select(&task(3), &Tally::default(), 0).unwrap();
        assert_eq!(selection.agreement_ratio(), 0.0);
    }

    #[test]
    fn test_tally_tasks_keeps_order() {
        let tallies = tally_tasks(&[votes(&["2011365"]), vec![], votes(&["2011352", "2011352"])]);
        assert_eq!(tallies.len(), 3);
        assert_eq!(tallies[0].winner().0.index(), 11);
        assert_eq!(tallies[1].total(), 0);
        assert_eq!(tallies[2].count(Category::from_index(0).unwrap()), 2);
    }
}
