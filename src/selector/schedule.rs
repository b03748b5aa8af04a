/// Per-round sample fraction: grows by a fixed step and freezes once the
/// next step would pass 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSchedule {
    current: f64,
    step: f64,
}

impl SampleSchedule {
    pub fn new(initial: f64, step: f64) -> Self {
        Self {
            current: initial.clamp(f64::MIN_POSITIVE, 1.0),
            step: step.max(0.0),
        }
    }

    /// Always sample everything.
    pub fn full() -> Self {
        Self::new(1.0, 0.0)
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn advance(&mut self) {
        let next = self.current + self.step;
        // Tolerate accumulated float error so 0.2 + 16 * 0.05 still reaches 1.0
        if next <= 1.0 + 1e-9 {
            self.current = next.min(1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grows_then_freezes_at_one() {
        let mut schedule = SampleSchedule::new(0.20, 0.05);
        let mut seen = vec![schedule.current()];
        for _ in 0..30 {
            schedule.advance();
            seen.push(schedule.current());
        }
        assert!(seen.windows(2).all(|w| w[1] >= w[0]));
        assert!(seen.iter().all(|&f| f <= 1.0));
        assert_eq!(schedule.current(), 1.0);
    }

    #[test]
    fn test_freezes_without_reaching_one() {
        let mut schedule = SampleSchedule::new(0.9, 0.3);
        schedule.advance();
        assert_eq!(schedule.current(), 0.9);
    }
}
