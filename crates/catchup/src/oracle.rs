//! Read-only view of the host node's chain heights.

use dirchain_common::Height;

/// Heights the host node tracks about itself and the network.
///
/// The engine polls these three reads every scan cycle; implementations
/// should make them cheap (a load of an atomic or a short lock).
pub trait ChainHeights: Send + Sync {
    /// Highest height durably persisted by the host node.
    fn highest_saved(&self) -> Height;

    /// Highest height acknowledged as produced by the network. May briefly
    /// exceed [`highest_known`](Self::highest_known).
    fn highest_ack(&self) -> Height;

    /// Highest height any peer has advertised.
    fn highest_known(&self) -> Height;

    /// Upper bound (exclusive) on the heights worth requesting.
    ///
    /// The acknowledged height gets a tolerance of two blocks for heights
    /// the network has produced but peers have not yet advertised.
    fn target_ceiling(&self) -> Height {
        self.highest_ack().saturating_add(2).max(self.highest_known())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        saved: Height,
        ack: Height,
        known: Height,
    }

    impl ChainHeights for Fixed {
        fn highest_saved(&self) -> Height {
            self.saved
        }
        fn highest_ack(&self) -> Height {
            self.ack
        }
        fn highest_known(&self) -> Height {
            self.known
        }
    }

    #[test]
    fn test_ceiling_prefers_known_when_far_ahead() {
        let heights = Fixed {
            saved: 0,
            ack: 10,
            known: 50,
        };
        assert_eq!(heights.target_ceiling(), 50);
    }

    #[test]
    fn test_ceiling_gives_ack_two_blocks_of_tolerance() {
        let heights = Fixed {
            saved: 0,
            ack: 10,
            known: 11,
        };
        assert_eq!(heights.target_ceiling(), 12);
    }

    #[test]
    fn test_ceiling_saturates_at_max_height() {
        let heights = Fixed {
            saved: 0,
            ack: Height::MAX,
            known: 0,
        };
        assert_eq!(heights.target_ceiling(), Height::MAX);
    }
}
