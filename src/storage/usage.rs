//! Volume usage
//!
//! Advisory capacity figures for the volume holding the storage root.

use log::{debug, warn};

use crate::storage::results::{UsageReport, UsageSnapshot};
use crate::storage::root::StorageRoot;

/// Reports total, used and free space. Never fails; an unreadable volume is
/// reported as [`UsageReport::Unavailable`].
pub fn report_usage(root: &StorageRoot) -> UsageReport {
    match fs2::statvfs(root.path()) {
        Ok(stats) => {
            let snapshot = UsageSnapshot::from_totals(stats.total_space(), stats.free_space());
            debug!(
                "Volume usage for {}: {} MB used, {} MB free ({}%)",
                root.path().display(),
                snapshot.used_mb(),
                snapshot.free_mb(),
                snapshot.used_percent
            );
            UsageReport::Computed(snapshot)
        }
        Err(e) => {
            warn!(
                "Volume usage unavailable for {}: {}",
                root.path().display(),
                e
            );
            UsageReport::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}
