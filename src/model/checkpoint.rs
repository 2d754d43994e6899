/// The fixed set of attendance checkpoints.
///
/// Ids match the historical database rows so older exports stay readable.
/// Ids 2 and 3 (After Lunch / Departure) were retired when the camp moved to
/// a single daily roll call plus KC and early-pickup toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checkpoint {
    /// Morning roll call, one status per camper per day.
    Daily,
    /// Kid Connection before-care, independent toggle.
    KcBefore,
    /// Kid Connection after-care, independent toggle.
    KcAfter,
    /// Early pickup flag, dependent on the daily status being present/late.
    EarlyPickup,
}

impl Checkpoint {
    pub fn id(self) -> i64 {
        match self {
            Checkpoint::Daily => 1,
            Checkpoint::KcBefore => 4,
            Checkpoint::KcAfter => 5,
            Checkpoint::EarlyPickup => 6,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Checkpoint::Daily),
            4 => Some(Checkpoint::KcBefore),
            5 => Some(Checkpoint::KcAfter),
            6 => Some(Checkpoint::EarlyPickup),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Checkpoint::Daily => "Morning",
            Checkpoint::KcBefore => "KC Before",
            Checkpoint::KcAfter => "KC After",
            Checkpoint::EarlyPickup => "Early Pickup",
        }
    }

    pub fn time_label(self) -> &'static str {
        match self {
            Checkpoint::Daily => "9:00 AM",
            Checkpoint::KcBefore => "7:30 AM",
            Checkpoint::KcAfter => "4:00 PM",
            Checkpoint::EarlyPickup => "",
        }
    }

    /// Active checkpoints in display order.
    pub fn all() -> [Checkpoint; 4] {
        [
            Checkpoint::Daily,
            Checkpoint::KcBefore,
            Checkpoint::KcAfter,
            Checkpoint::EarlyPickup,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for cp in Checkpoint::all() {
            assert_eq!(Checkpoint::from_id(cp.id()), Some(cp));
        }
        assert_eq!(Checkpoint::from_id(2), None);
        assert_eq!(Checkpoint::from_id(99), None);
    }
}
