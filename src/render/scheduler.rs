//! Render cadence
//!
//! With cycle counter `n` and period `N`:
//!
//! - `n % N == 0` issues a full plot and resets `n` to zero
//! - `n % N == N - 1` restarts the renderer and reconfigures it
//! - every other cycle only refreshes the data
//!
//! In voltmeter mode a refresh fast-forwards `n` so the renderer is rebuilt
//! at least every `voltmeter_window` cycles. Setting `n` to `-1` makes the
//! next cycle a full plot.

/// What the current cycle should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderAction {
    FullPlot,
    Restart,
    Refresh,
}

/// Cycle counter driving the render cadence
#[derive(Debug, Clone)]
pub struct RenderScheduler {
    counter: i64,
    period: i64,
    voltmeter_window: i64,
}

impl RenderScheduler {
    /// `period` must be at least 2
    pub fn new(period: u32, voltmeter_window: u32) -> Self {
        Self {
            counter: 0,
            period: i64::from(period.max(2)),
            voltmeter_window: i64::from(voltmeter_window),
        }
    }

    /// Action for the current counter value
    pub fn action(&self) -> RenderAction {
        let phase = self.counter.rem_euclid(self.period);
        if phase == 0 {
            RenderAction::FullPlot
        } else if phase == self.period - 1 {
            RenderAction::Restart
        } else {
            RenderAction::Refresh
        }
    }

    /// Record that a full plot happened
    pub fn full_plot_done(&mut self) {
        self.counter = 0;
    }

    /// Move the counter close to the next restart (voltmeter refreshes)
    pub fn fast_forward(&mut self) {
        let floor = self.period - self.voltmeter_window;
        if self.counter < floor {
            self.counter = floor;
        }
    }

    /// Make the next cycle a full plot
    pub fn force_full_plot(&mut self) {
        self.counter = -1;
    }

    /// End of cycle
    pub fn advance(&mut self) {
        self.counter += 1;
    }

    pub fn counter(&self) -> i64 {
        self.counter
    }

    pub fn period(&self) -> i64 {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(scheduler: &mut RenderScheduler, cycles: usize, voltmeter: bool) -> Vec<RenderAction> {
        let mut actions = Vec::new();
        for _ in 0..cycles {
            let action = scheduler.action();
            match action {
                RenderAction::FullPlot => scheduler.full_plot_done(),
                RenderAction::Refresh if voltmeter => scheduler.fast_forward(),
                _ => {}
            }
            actions.push(action);
            scheduler.advance();
        }
        actions
    }

    #[test]
    fn test_cadence() {
        let mut scheduler = RenderScheduler::new(5, 250);
        let actions = run(&mut scheduler, 10, false);
        use RenderAction::*;
        assert_eq!(
            actions,
            vec![
                FullPlot, Refresh, Refresh, Refresh, Restart, FullPlot, Refresh, Refresh, Refresh,
                Restart,
            ]
        );
    }

    #[test]
    fn test_force_full_plot() {
        let mut scheduler = RenderScheduler::new(5000, 250);
        run(&mut scheduler, 3, false);
        scheduler.force_full_plot();
        scheduler.advance();
        assert_eq!(scheduler.action(), RenderAction::FullPlot);
    }

    #[test]
    fn test_voltmeter_fast_forward() {
        let mut scheduler = RenderScheduler::new(5000, 250);
        let actions = run(&mut scheduler, 252, true);

        // Full plot, then refreshes starting at 4750, restart at 4999
        assert_eq!(actions[0], RenderAction::FullPlot);
        assert_eq!(actions[1], RenderAction::Refresh);
        assert_eq!(actions[249], RenderAction::Refresh);
        assert_eq!(actions[250], RenderAction::Restart);
        assert_eq!(actions[251], RenderAction::FullPlot);
    }
}
