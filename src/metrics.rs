use crate::model::DeletionProgress;

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute deletion progress from the archive count of the baseline inventory
/// (if one was captured) and of the working inventory.
pub fn deletion_progress(baseline: Option<u64>, remaining: u64) -> DeletionProgress {
    // A working inventory larger than its baseline means the baseline is stale;
    // the working count then stands in as the total.
    let total = baseline.unwrap_or(remaining).max(remaining);
    let deleted = total - remaining;
    let progress_percent = if total == 0 {
        0.0
    } else {
        round2(deleted as f64 / total as f64 * 100.0)
    };
    DeletionProgress {
        total,
        deleted,
        remaining,
        progress_percent,
    }
}
