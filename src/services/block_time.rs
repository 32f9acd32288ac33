//! Wall-clock to block-number resolution
//!
//! Binary search over block timestamps, assuming timestamps are
//! non-decreasing with block number. Chain-read errors propagate
//! unmodified; resolution is not retried here.

use tracing::debug;

use crate::services::chain::{ChainError, ChainReader};

/// Find the greatest block whose timestamp is `<= target` (unix seconds).
///
/// Targets before the genesis-observed timestamp resolve to block 0;
/// targets at or beyond the head's timestamp resolve to the head.
/// O(log head) chain reads.
pub async fn find_block_by_time<C: ChainReader>(
    chain: &C,
    target: u64,
) -> Result<u64, ChainError> {
    let mut hi = chain.head_block_number().await?;
    let mut lo = 0u64;

    let lo_ts = chain.block_timestamp(lo).await?;
    if target <= lo_ts {
        return Ok(lo);
    }

    while lo + 1 < hi {
        let mid = (lo + hi) / 2;
        let mid_ts = chain.block_timestamp(mid).await?;
        if mid_ts <= target {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    // lo + 1 == hi (or the chain has a single block); the head itself is
    // the answer when its timestamp does not exceed the target.
    if hi > lo && chain.block_timestamp(hi).await? <= target {
        lo = hi;
    }

    debug!(target = target, block = lo, "Resolved target time to block");

    Ok(lo)
}
