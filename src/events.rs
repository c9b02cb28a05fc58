//! Level update records - what the book reports back for market data.

use crate::level::Level;

/// What happened to a price level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum UpdateKind {
    /// The level was created by this operation
    Add = 0,
    /// The level's aggregates changed
    Update = 1,
    /// The level emptied and was removed
    Delete = 2,
}

/// Event record returned by every limit-side book operation.
///
/// `level` is a by-value snapshot: the post-modification aggregates for
/// `Add`/`Update`, and the just-emptied record (zeroed counters, price and
/// side preserved) for `Delete`, so subscribers can publish "level now
/// empty" accurately. `top` reports whether the affected level was the
/// best of its side at the moment of modification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelUpdate {
    /// Kind of change
    pub kind: UpdateKind,
    /// Snapshot of the affected level
    pub level: Level,
    /// True if the level was the top of its side
    pub top: bool,
}

impl LevelUpdate {
    /// Create a new update record.
    #[inline]
    pub const fn new(kind: UpdateKind, level: Level, top: bool) -> Self {
        Self { kind, level, top }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelType;

    #[test]
    fn test_update_record() {
        let level = Level::new(LevelType::Bid, 10000);
        let update = LevelUpdate::new(UpdateKind::Add, level, true);
        assert_eq!(update.kind, UpdateKind::Add);
        assert_eq!(update.level.price, 10000);
        assert!(update.top);
    }
}
