use serde::{Deserialize, Serialize};

/// Innings phases for a regulation 20-over innings. The windows are fixed
/// and never inferred from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Powerplay,
    Middle,
    Death,
    Other,
}

/// Phases that participate in phase-level aggregates, in display order.
/// `Other` covers overs outside 0..=19 and is always excluded.
pub const REPORTED_PHASES: [Phase; 3] = [Phase::Powerplay, Phase::Middle, Phase::Death];

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Powerplay => "Powerplay",
            Phase::Middle => "Middle",
            Phase::Death => "Death",
            Phase::Other => "Other",
        }
    }
}

/// Classify a zero-based over number.
pub fn classify_over(over: u32) -> Phase {
    match over {
        0..=5 => Phase::Powerplay,
        6..=14 => Phase::Middle,
        15..=19 => Phase::Death,
        _ => Phase::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_boundaries() {
        assert_eq!(classify_over(0), Phase::Powerplay);
        assert_eq!(classify_over(5), Phase::Powerplay);
        assert_eq!(classify_over(6), Phase::Middle);
        assert_eq!(classify_over(14), Phase::Middle);
        assert_eq!(classify_over(15), Phase::Death);
        assert_eq!(classify_over(19), Phase::Death);
        assert_eq!(classify_over(20), Phase::Other);
        assert_eq!(classify_over(35), Phase::Other);
    }
}
