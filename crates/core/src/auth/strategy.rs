//! Capture strategy policy

use super::ports::CaptureStrategy;

/// Pick the capture strategy for one attempt.
///
/// An explicit manual request wins; otherwise a headless session falls back
/// to manual capture.
#[must_use]
pub const fn select_strategy(force_manual: bool, headless: bool) -> CaptureStrategy {
    if force_manual || headless {
        CaptureStrategy::Manual
    } else {
        CaptureStrategy::Automatic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        assert_eq!(select_strategy(false, false), CaptureStrategy::Automatic);
        assert_eq!(select_strategy(true, false), CaptureStrategy::Manual);
        assert_eq!(select_strategy(false, true), CaptureStrategy::Manual);
        assert_eq!(select_strategy(true, true), CaptureStrategy::Manual);
    }
}
