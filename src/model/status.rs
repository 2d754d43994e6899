use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Attendance status for a single (camper, checkpoint, date) key.
///
/// `Unmarked` is the absence of a record: the store never keeps a row with
/// this value, and writing it removes the row. `EarlyPickup` is only ever
/// written to the Early Pickup checkpoint; the daily checkpoint holds
/// `present`/`absent`/`late`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Status {
    #[default]
    Unmarked,
    Present,
    Absent,
    Late,
    EarlyPickup,
}

impl Status {
    /// Statuses a unit leader may assign to the daily checkpoint.
    pub fn valid_for_daily(self) -> bool {
        matches!(self, Status::Present | Status::Absent | Status::Late)
    }

    /// True when the camper is on site (early pickup may be toggled).
    pub fn counts_as_present(self) -> bool {
        matches!(self, Status::Present | Status::Late)
    }
}
