use config::SCHEDULE_TICK_DIVISOR;

/// Divides the raw timer interrupt frequency down to the scheduling
/// frequency.
#[derive(Debug, Clone, Default)]
pub struct TickDivider {
    ticks: u64,
}

impl TickDivider {
    #[must_use]
    pub const fn new() -> Self {
        Self { ticks: 0 }
    }

    /// Count one raw timer tick. Returns true if a scheduling decision is
    /// due on this tick.
    pub fn tick(&mut self) -> bool {
        self.ticks = self.ticks.wrapping_add(1);
        self.ticks % u64::from(SCHEDULE_TICK_DIVISOR) == 0
    }

    /// The number of raw ticks counted so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_fifth_tick_schedules() {
        let mut divider = TickDivider::new();
        let due: alloc::vec::Vec<u64> = (1..=15).filter(|_| divider.tick()).collect();
        assert_eq!(due.len(), 3);
        assert_eq!(divider.ticks(), 15);
    }
}
