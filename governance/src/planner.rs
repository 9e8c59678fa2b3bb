//! Height planning for a consensus proposal
//!
//! Derives the vote end, trigger and block-num heights from the current
//! chain height. Each height is the previous one plus a non-negative
//! buffer, so the ordering `current <= stop_vote <= trigger <= block_num`
//! always holds.

use serde::{Deserialize, Serialize};

use crate::config::ProposalConfig;

/// Key heights a proposal depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightPlan {
    pub current_height: u64,
    pub stop_vote_height: u64,
    pub trigger_height: u64,
    pub block_num_height: u64,
}

/// Compute the height plan. Additions saturate at `u64::MAX`.
pub fn plan(current_height: u64, config: &ProposalConfig) -> HeightPlan {
    let stop_vote_height = current_height.saturating_add(config.vote_duration_blocks);
    let trigger_height = stop_vote_height.saturating_add(config.trigger_buffer);
    let block_num_height = trigger_height.saturating_add(config.block_num_buffer);

    HeightPlan {
        current_height,
        stop_vote_height,
        trigger_height,
        block_num_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(vote: u64, trigger: u64, block_num: u64) -> ProposalConfig {
        ProposalConfig {
            vote_duration_blocks: vote,
            trigger_buffer: trigger,
            block_num_buffer: block_num,
            min_vote_percent: 51,
        }
    }

    #[test]
    fn test_plan_from_height_1000() {
        let plan = plan(1000, &config(40, 10, 5));
        assert_eq!(plan.current_height, 1000);
        assert_eq!(plan.stop_vote_height, 1040);
        assert_eq!(plan.trigger_height, 1050);
        assert_eq!(plan.block_num_height, 1055);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let cfg = config(7, 3, 2);
        assert_eq!(plan(42, &cfg), plan(42, &cfg));
    }

    #[test]
    fn test_plan_ordering_holds() {
        let heights = [0u64, 1, 999, 1_000_000, u64::MAX - 10, u64::MAX];
        let buffers = [0u64, 1, 5, 40, u64::MAX];

        for &height in &heights {
            for &vote in &buffers {
                for &trigger in &buffers {
                    for &block_num in &buffers {
                        let p = plan(height, &config(vote, trigger, block_num));
                        assert!(p.current_height <= p.stop_vote_height);
                        assert!(p.stop_vote_height <= p.trigger_height);
                        assert!(p.trigger_height <= p.block_num_height);
                    }
                }
            }
        }
    }

    #[test]
    fn test_positive_buffers_are_strict() {
        let p = plan(500, &config(1, 1, 1));
        assert!(p.current_height < p.stop_vote_height);
        assert!(p.stop_vote_height < p.trigger_height);
        assert!(p.trigger_height < p.block_num_height);
    }

    #[test]
    fn test_zero_buffers_collapse() {
        let p = plan(500, &config(10, 0, 0));
        assert_eq!(p.stop_vote_height, 510);
        assert_eq!(p.trigger_height, 510);
        assert_eq!(p.block_num_height, 510);
    }
}
