use chanmap_types::EngineOptions;

use crate::Rejection;

/// Whether a percentage belongs to a fresh progressive release or to an
/// update of a rollout that is already live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressiveKind {
    Release,
    /// Adjusting a live rollout currently targeting `previous_percentage`
    Update { previous_percentage: u8 },
}

/// Inclusive range a progressive percentage may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercentageRange {
    pub min: u8,
    pub max: u8,
}

impl PercentageRange {
    pub fn contains(&self, value: u8) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Nearest value inside the range.
    pub fn clamp(&self, value: u8) -> u8 {
        value.clamp(self.min, self.max)
    }
}

/// Legal range for a percentage of the given kind.
///
/// A fresh release moves freely between the configured minimum and 100.
/// An update only widens: from the previously released percentage up to 100.
pub fn progressive_direction(kind: ProgressiveKind, options: &EngineOptions) -> PercentageRange {
    let floor = options.min_progressive_percentage.clamp(1, 100);
    match kind {
        ProgressiveKind::Release => PercentageRange {
            min: floor,
            max: 100,
        },
        ProgressiveKind::Update {
            previous_percentage,
        } => PercentageRange {
            min: previous_percentage.clamp(floor, 100),
            max: 100,
        },
    }
}

/// Validate a requested percentage.
pub fn check_percentage(
    kind: ProgressiveKind,
    value: u8,
    options: &EngineOptions,
) -> Result<u8, Rejection> {
    let range = progressive_direction(kind, options);
    if range.contains(value) {
        Ok(value)
    } else {
        Err(Rejection::PercentageOutOfRange {
            value,
            min: range.min,
            max: range.max,
        })
    }
}
