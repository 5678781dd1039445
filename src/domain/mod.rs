//! Backend-agnostic domain types.

mod allocation;
mod id;
mod presence;
mod resource;
mod storage;
mod user;

use chrono::{NaiveDateTime, Timelike, Utc};

pub use allocation::{Allocation, CascadeStep};
pub use id::AllocationId;
pub use presence::Presence;
pub use resource::Resource;
pub use storage::StorageKind;
pub use user::User;

/// Current UTC time truncated to microseconds.
///
/// Every backend stores microsecond precision, so truncating up front keeps
/// values read back equal to values written.
#[must_use]
pub fn timestamp_now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    let micros = now.nanosecond() / 1_000 * 1_000;
    now.with_nanosecond(micros).unwrap_or(now)
}
