//! Running-average rating kept on every tutor.
//!
//! The aggregate is never recomputed from the review table; each review
//! create, edit or delete feeds exactly one [`RatingChange`] through
//! [`RatingAggregate::apply`]. The stored value therefore stays equal to the
//! mean of the ratings of the reviews that currently exist.

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct RatingAggregate {
    pub average_rating: f64,
    pub total_reviews: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingChange {
    Add(i32),
    Replace { old: i32, new: i32 },
    Remove(i32),
}

impl RatingAggregate {
    pub const EMPTY: RatingAggregate = RatingAggregate {
        average_rating: 0.0,
        total_reviews: 0,
    };

    pub fn new(average_rating: f64, total_reviews: i32) -> Self {
        Self {
            average_rating,
            total_reviews,
        }
    }

    pub fn apply(self, change: RatingChange) -> Self {
        match change {
            RatingChange::Add(rating) => self.add(rating),
            RatingChange::Replace { old, new } => self.replace(old, new),
            RatingChange::Remove(rating) => self.remove(rating),
        }
    }

    pub fn add(self, rating: i32) -> Self {
        let total = self.total_reviews + 1;
        let score = self.score() + f64::from(rating);
        Self {
            average_rating: score / f64::from(total),
            total_reviews: total,
        }
    }

    pub fn replace(self, old: i32, new: i32) -> Self {
        if self.total_reviews == 0 {
            return self;
        }
        let score = self.score() - f64::from(old) + f64::from(new);
        Self {
            average_rating: score / f64::from(self.total_reviews),
            total_reviews: self.total_reviews,
        }
    }

    /// Removing the last rating resets the aggregate instead of dividing by zero.
    pub fn remove(self, rating: i32) -> Self {
        if self.total_reviews <= 1 {
            return Self::EMPTY;
        }
        let total = self.total_reviews - 1;
        let score = self.score() - f64::from(rating);
        Self {
            average_rating: score / f64::from(total),
            total_reviews: total,
        }
    }

    fn score(&self) -> f64 {
        self.average_rating * f64::from(self.total_reviews)
    }
}

impl Default for RatingAggregate {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn averages_match_hand_computed() {
        let agg = RatingAggregate::EMPTY.add(5);
        assert_eq!(agg, RatingAggregate::new(5.0, 1));

        let agg = agg.add(3);
        assert_eq!(agg, RatingAggregate::new(4.0, 2));

        let agg = agg.replace(3, 1);
        assert_eq!(agg, RatingAggregate::new(3.0, 2));

        let agg = agg.remove(5);
        assert_eq!(agg, RatingAggregate::new(1.0, 1));

        let agg = agg.remove(1);
        assert_eq!(agg, RatingAggregate::EMPTY);
    }

    #[test]
    fn replace_on_empty_aggregate_is_a_no_op() {
        assert_eq!(RatingAggregate::EMPTY.replace(2, 4), RatingAggregate::EMPTY);
    }

    #[test]
    fn remove_on_empty_aggregate_stays_empty() {
        assert_eq!(RatingAggregate::EMPTY.remove(3), RatingAggregate::EMPTY);
    }

    #[test]
    fn apply_dispatches_to_each_operation() {
        let agg = RatingAggregate::EMPTY
            .apply(RatingChange::Add(4))
            .apply(RatingChange::Add(2))
            .apply(RatingChange::Replace { old: 2, new: 5 })
            .apply(RatingChange::Remove(4));
        assert_eq!(agg, RatingAggregate::new(5.0, 1));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(i32),
        Replace(usize, i32),
        Remove(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1..=5i32).prop_map(Op::Add),
            (any::<usize>(), 1..=5i32).prop_map(|(i, r)| Op::Replace(i, r)),
            any::<usize>().prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn average_tracks_mean_of_active_ratings(ops in proptest::collection::vec(op(), 0..60)) {
            let mut active: Vec<i32> = Vec::new();
            let mut agg = RatingAggregate::EMPTY;

            for op in ops {
                match op {
                    Op::Add(r) => {
                        agg = agg.apply(RatingChange::Add(r));
                        active.push(r);
                    }
                    Op::Replace(i, r) => {
                        if active.is_empty() {
                            continue;
                        }
                        let idx = i % active.len();
                        agg = agg.apply(RatingChange::Replace { old: active[idx], new: r });
                        active[idx] = r;
                    }
                    Op::Remove(i) => {
                        if active.is_empty() {
                            continue;
                        }
                        let idx = i % active.len();
                        agg = agg.apply(RatingChange::Remove(active[idx]));
                        active.swap_remove(idx);
                    }
                }

                prop_assert_eq!(agg.total_reviews as usize, active.len());
                let expected = if active.is_empty() {
                    0.0
                } else {
                    active.iter().map(|r| f64::from(*r)).sum::<f64>() / active.len() as f64
                };
                prop_assert!((agg.average_rating - expected).abs() < 1e-6);
            }
        }
    }
}
