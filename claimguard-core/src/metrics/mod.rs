/*
    Metrics - counters for claim activity

    Provides counters and a histogram for:
    - Claim lifecycle (created, refused, renamed, deleted)
    - Protection decisions (allowed, denied)
    - Persistence (autosave flushes and their failures)

    Descriptions are registered once with `init_metrics`; recording works
    whether or not a recorder is installed.
*/

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    // Claim lifecycle
    describe_counter!(
        "claimguard_claims_created_total",
        "Total number of claims placed"
    );

    describe_counter!(
        "claimguard_claims_refused_total",
        "Total number of claim attempts refused, labeled by reason (access, exists)"
    );

    describe_counter!(
        "claimguard_claims_renamed_total",
        "Total number of successful claim renames"
    );

    describe_counter!(
        "claimguard_claims_deleted_total",
        "Total number of claims removed"
    );

    // Protection
    describe_counter!(
        "claimguard_block_checks_total",
        "Total number of block action checks, labeled by decision (allowed, unclaimed, denied, bypass)"
    );

    // Persistence
    describe_counter!(
        "claimguard_flushes_total",
        "Total number of dirty-region flushes"
    );

    describe_counter!(
        "claimguard_flush_failures_total",
        "Total number of regions whose staff could not be saved during a flush"
    );

    describe_histogram!(
        "claimguard_flush_duration_seconds",
        "Duration of a dirty-region flush"
    );
}

/// Record claim placed
pub fn claim_created() {
    counter!("claimguard_claims_created_total").increment(1);
}

/// Record claim refused
pub fn claim_refused(reason: &'static str) {
    counter!("claimguard_claims_refused_total", "reason" => reason).increment(1);
}

/// Record claim renamed
pub fn claim_renamed() {
    counter!("claimguard_claims_renamed_total").increment(1);
}

/// Record claim deleted
pub fn claim_deleted() {
    counter!("claimguard_claims_deleted_total").increment(1);
}

/// Record the outcome of a block action check
pub fn block_check(decision: &'static str) {
    counter!("claimguard_block_checks_total", "decision" => decision).increment(1);
}

/// Record a completed flush
pub fn flush_completed(started: Instant, failures: usize) {
    counter!("claimguard_flushes_total").increment(1);
    if failures > 0 {
        counter!("claimguard_flush_failures_total").increment(failures as u64);
    }
    histogram!("claimguard_flush_duration_seconds").record(started.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder() {
        // No recorder installed: every call is a no-op and must not panic.
        init_metrics();
        claim_created();
        claim_refused("exists");
        claim_renamed();
        claim_deleted();
        block_check("denied");
        flush_completed(Instant::now(), 2);
    }
}
