//! Sustained-detection hysteresis over a momentary visibility boolean.
//!
//! The sensor collaborator refreshes the momentary boolean every tick; this
//! signal turns it into a debounced "spotted long enough" trigger. The
//! signal never self-resets on trigger: consuming the event (and calling
//! [`DetectionSignal::reset`]) is the caller's responsibility, otherwise it
//! would re-trigger every tick.

/// Accumulated visibility with instant reset on loss of sight.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DetectionSignal {
    visible: bool,
    sustained: f32,
}

impl DetectionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refreshes the momentary boolean. Sustained duration resets to zero
    /// the instant visibility is lost, regardless of what had accumulated.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if !visible {
            self.sustained = 0.0;
        }
    }

    /// Accrues sustained duration while visible. The caller must skip this
    /// while the agent is paused: detection is suspended, not merely
    /// ignored, during a challenge session.
    pub fn accumulate(&mut self, dt: f32) {
        if self.visible {
            self.sustained += dt;
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn sustained(&self) -> f32 {
        self.sustained
    }

    pub fn has_exceeded(&self, threshold: f32) -> bool {
        self.sustained >= threshold
    }

    /// Consumes the trigger after the caller has acted on it.
    pub fn reset(&mut self) {
        self.sustained = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_only_while_visible() {
        let mut signal = DetectionSignal::new();
        signal.accumulate(1.0);
        assert_eq!(signal.sustained(), 0.0);

        signal.set_visible(true);
        signal.accumulate(1.0);
        signal.accumulate(0.5);
        assert_eq!(signal.sustained(), 1.5);
    }

    #[test]
    fn resets_to_zero_the_instant_visibility_drops() {
        let mut signal = DetectionSignal::new();
        signal.set_visible(true);
        signal.accumulate(2.75);
        signal.set_visible(false);
        assert_eq!(signal.sustained(), 0.0);
    }

    #[test]
    fn trigger_does_not_self_reset() {
        let mut signal = DetectionSignal::new();
        signal.set_visible(true);
        signal.accumulate(3.0);
        assert!(signal.has_exceeded(3.0));
        // Still exceeded until the caller consumes it.
        assert!(signal.has_exceeded(3.0));
        signal.reset();
        assert!(!signal.has_exceeded(3.0));
        assert!(signal.is_visible());
    }
}
