//! Counter reconciliation
//!
//! Translates ledger membership changes into aggregate counter deltas. The
//! delta is computed from what the guarded ledger mutations actually did,
//! then applied as a single storage-side increment.

use crate::engagement::store::VoteKind;

/// A pending adjustment to a votable's like/dislike counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterDelta {
    pub likes: i64,
    pub dislikes: i64,
}

impl CounterDelta {
    /// Delta for casting a vote. `was_opposite` is whether the actor held
    /// the opposite vote at the moment it was removed; when true the
    /// opposite counter is decremented in the same delta.
    pub fn engage(vote: VoteKind, was_opposite: bool) -> Self {
        let mut delta = Self::default();
        *delta.slot_mut(vote) += 1;
        if was_opposite {
            *delta.slot_mut(vote.opposite()) -= 1;
        }
        delta
    }

    /// Delta for retracting a held vote
    pub fn retract(vote: VoteKind) -> Self {
        let mut delta = Self::default();
        *delta.slot_mut(vote) -= 1;
        delta
    }

    pub fn is_zero(&self) -> bool {
        self.likes == 0 && self.dislikes == 0
    }

    fn slot_mut(&mut self, vote: VoteKind) -> &mut i64 {
        match vote {
            VoteKind::Like => &mut self.likes,
            VoteKind::Dislike => &mut self.dislikes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_like() {
        let d = CounterDelta::engage(VoteKind::Like, false);
        assert_eq!(d, CounterDelta { likes: 1, dislikes: 0 });
    }

    #[test]
    fn test_like_after_dislike_is_one_logical_op() {
        let d = CounterDelta::engage(VoteKind::Like, true);
        assert_eq!(
            d,
            CounterDelta {
                likes: 1,
                dislikes: -1
            }
        );
    }

    #[test]
    fn test_dislike_after_like() {
        let d = CounterDelta::engage(VoteKind::Dislike, true);
        assert_eq!(
            d,
            CounterDelta {
                likes: -1,
                dislikes: 1
            }
        );
    }

    #[test]
    fn test_retract() {
        assert_eq!(
            CounterDelta::retract(VoteKind::Like),
            CounterDelta {
                likes: -1,
                dislikes: 0
            }
        );
        assert_eq!(
            CounterDelta::retract(VoteKind::Dislike),
            CounterDelta {
                likes: 0,
                dislikes: -1
            }
        );
    }

    #[test]
    fn test_two_actor_walk_returns_to_zero() {
        // X likes, Y dislikes, X unlikes, Y undislikes
        let walk = [
            CounterDelta::engage(VoteKind::Like, false),
            CounterDelta::engage(VoteKind::Dislike, false),
            CounterDelta::retract(VoteKind::Like),
            CounterDelta::retract(VoteKind::Dislike),
        ];

        let (mut likes, mut dislikes) = (0i64, 0i64);
        let mut seen = Vec::new();
        for d in walk {
            likes += d.likes;
            dislikes += d.dislikes;
            seen.push((likes, dislikes));
        }
        assert_eq!(seen, vec![(1, 0), (1, 1), (0, 1), (0, 0)]);
    }
}
