//! Time formatting helpers.

use chrono::Duration;

/// Format a duration in human-readable form, e.g. `3h 20m`.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        format!("{}s", total_seconds)
    } else if total_seconds < 3600 {
        format!("{}m {}s", total_seconds / 60, total_seconds % 60)
    } else if total_seconds < 86400 {
        format!("{}h {}m", total_seconds / 3600, (total_seconds % 3600) / 60)
    } else {
        format!("{}d {}h", total_seconds / 86400, (total_seconds % 86400) / 3600)
    }
}
