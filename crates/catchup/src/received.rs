//! Received block payloads awaiting in-order application.

use dirchain_block::BlockState;
use dirchain_common::Height;
use std::collections::VecDeque;

/// One received payload keyed by its height.
#[derive(Debug)]
struct ReceivedBlock {
    height: Height,
    state: BlockState,
}

/// Ascending collection of received payloads plus the `base` watermark.
///
/// `base` is the highest height already handed to the applier (or known
/// saved); everything at or below it is done. The watermark only moves
/// forward: [`set_base`](Self::set_base) when the host's saved height jumps
/// ahead, or [`pop_next_contiguous`](Self::pop_next_contiguous) as blocks
/// are applied one by one.
#[derive(Debug, Default)]
pub struct ReceivedBlocks {
    entries: VecDeque<ReceivedBlock>,
    base: Height,
}

impl ReceivedBlocks {
    /// Create an empty collection with base 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// The contiguous-delivery watermark.
    pub fn base(&self) -> Height {
        self.base
    }

    /// Raise the watermark and drop every payload at or below it.
    ///
    /// Lowering the watermark is a programmer error; the call is ignored
    /// (with a debug assertion) so the monotonicity guarantee survives
    /// release builds.
    pub fn set_base(&mut self, height: Height) {
        debug_assert!(height >= self.base, "base watermark may not move backwards");
        if height < self.base {
            return;
        }
        self.base = height;
        while matches!(self.entries.front(), Some(e) if e.height <= self.base) {
            self.entries.pop_front();
        }
    }

    /// Insert a payload in height order.
    ///
    /// Returns `false` without storing when the height is stale (at or
    /// below the watermark) or already present — the first writer wins.
    pub fn add(&mut self, height: Height, state: BlockState) -> bool {
        if height <= self.base {
            return false;
        }
        for (i, e) in self.entries.iter().enumerate().rev() {
            if height > e.height {
                self.entries.insert(i + 1, ReceivedBlock { height, state });
                return true;
            }
            if height == e.height {
                return false;
            }
        }
        self.entries.push_front(ReceivedBlock { height, state });
        true
    }

    /// Look up the payload at `height`.
    pub fn get(&self, height: Height) -> Option<&BlockState> {
        self.entries
            .iter()
            .find(|e| e.height == height)
            .map(|e| &e.state)
    }

    /// Remove the payload at `height`. No-op if absent.
    pub fn remove(&mut self, height: Height) {
        if let Some(pos) = self.entries.iter().position(|e| e.height == height) {
            self.entries.remove(pos);
        }
    }

    /// Height of the last payload, or the watermark if that is higher.
    pub fn highest_received(&self) -> Height {
        let back = self.entries.back().map(|e| e.height).unwrap_or(0);
        back.max(self.base)
    }

    /// Pop the payload at `base + 1`, advancing the watermark past it.
    ///
    /// Stale entries at the front (at or below the watermark) are discarded
    /// on the way. Returns `None` when the next contiguous height has not
    /// arrived yet.
    pub fn pop_next_contiguous(&mut self) -> Option<BlockState> {
        loop {
            let front_height = self.entries.front()?.height;
            if front_height <= self.base {
                self.entries.pop_front();
                continue;
            }
            if front_height == self.base + 1 {
                self.base = front_height;
                return self.entries.pop_front().map(|e| e.state);
            }
            return None;
        }
    }

    /// Number of buffered payloads.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no payloads are buffered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ascending snapshot of the buffered heights.
    pub fn heights(&self) -> Vec<Height> {
        self.entries.iter().map(|e| e.height).collect()
    }

    /// Heights missing between adjacent buffered payloads.
    ///
    /// For each adjacent pair with a hole between them, every intermediate
    /// height appears exactly once. Holes between the watermark and the
    /// first payload are not reported here; the scan loop covers those via
    /// the request frontier.
    pub fn gap_heights(&self) -> Vec<Height> {
        let mut gaps = Vec::new();
        for pair in self
            .entries
            .iter()
            .zip(self.entries.iter().skip(1))
        {
            let (a, b) = (pair.0.height, pair.1.height);
            for h in a + 1..b {
                gaps.push(h);
            }
        }
        gaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirchain_block::DirectoryBlock;

    fn make_state(height: Height) -> BlockState {
        let mut block = DirectoryBlock::genesis(1);
        block.header.height = height;
        block.seal();
        BlockState::new(block)
    }

    #[test]
    fn test_add_keeps_ascending_order() {
        let mut received = ReceivedBlocks::new();
        for h in [3, 1, 4, 2] {
            assert!(received.add(h, make_state(h)));
        }
        assert_eq!(received.heights(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_add_first_writer_wins() {
        let mut received = ReceivedBlocks::new();
        assert!(received.add(2, make_state(2)));
        assert!(!received.add(2, make_state(2)));
        assert_eq!(received.len(), 1);
    }

    #[test]
    fn test_add_rejects_stale() {
        let mut received = ReceivedBlocks::new();
        received.set_base(5);
        assert!(!received.add(5, make_state(5)));
        assert!(!received.add(3, make_state(3)));
        assert!(received.add(6, make_state(6)));
    }

    #[test]
    fn test_set_base_purges_at_or_below() {
        let mut received = ReceivedBlocks::new();
        for h in [1, 2, 3, 7] {
            received.add(h, make_state(h));
        }
        received.set_base(3);
        assert_eq!(received.heights(), vec![7]);
        assert_eq!(received.base(), 3);
    }

    #[test]
    fn test_get_and_remove() {
        let mut received = ReceivedBlocks::new();
        received.add(2, make_state(2));

        assert_eq!(received.get(2).unwrap().height(), 2);
        assert!(received.get(3).is_none());

        received.remove(2);
        received.remove(2);
        assert!(received.get(2).is_none());
        assert!(received.is_empty());
    }

    #[test]
    fn test_highest_received() {
        let mut received = ReceivedBlocks::new();
        assert_eq!(received.highest_received(), 0);

        received.set_base(4);
        assert_eq!(received.highest_received(), 4);

        received.add(9, make_state(9));
        assert_eq!(received.highest_received(), 9);
    }

    #[test]
    fn test_pop_next_contiguous_in_order() {
        let mut received = ReceivedBlocks::new();
        for h in [2, 1, 3] {
            received.add(h, make_state(h));
        }

        for expected in 1..=3 {
            let state = received.pop_next_contiguous().unwrap();
            assert_eq!(state.height(), expected);
            assert_eq!(received.base(), expected);
        }
        assert!(received.pop_next_contiguous().is_none());
    }

    #[test]
    fn test_pop_next_contiguous_stops_at_gap() {
        let mut received = ReceivedBlocks::new();
        received.add(1, make_state(1));
        received.add(3, make_state(3));

        assert_eq!(received.pop_next_contiguous().unwrap().height(), 1);
        assert!(received.pop_next_contiguous().is_none());
        assert_eq!(received.base(), 1);
    }

    #[test]
    fn test_gap_heights() {
        let mut received = ReceivedBlocks::new();
        for h in [5, 7, 8, 11] {
            received.add(h, make_state(h));
        }
        assert_eq!(received.gap_heights(), vec![6, 9, 10]);
    }

    #[test]
    fn test_base_never_regresses_on_pop() {
        let mut received = ReceivedBlocks::new();
        received.set_base(2);
        received.add(3, make_state(3));

        let mut last = received.base();
        while let Some(state) = received.pop_next_contiguous() {
            assert!(received.base() >= last);
            assert_eq!(state.height(), received.base());
            last = received.base();
        }
        assert_eq!(received.base(), 3);
    }
}
