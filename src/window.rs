/// The emissions of an area, one entry per simulation step.
///
/// Index `i` holds the sum for step `i`; there are no gaps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmissionSeries {
    values: Vec<f64>,
}

impl EmissionSeries {
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends the sum for the next step.
    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    /// The number of steps recorded.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Sums the last `window` entries.
    ///
    /// When fewer entries exist, every recorded entry is summed.
    pub fn window_sum(&self, window: usize) -> f64 {
        let start = self.values.len().saturating_sub(window);
        self.values[start..].iter().sum()
    }

    /// Sums every recorded entry.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

#[cfg(test)]
mod test {
    use super::EmissionSeries;
    use assert_approx_eq::assert_approx_eq;

    fn brute_force(values: &[f64], k: usize, window: usize) -> f64 {
        let start = (k + 1).saturating_sub(window);
        values[start..=k].iter().sum()
    }

    #[test]
    fn window_sum_matches_definition() {
        let values = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0];
        for window in [1, 5, 20] {
            let mut series = EmissionSeries::new();
            for (k, value) in values.iter().enumerate() {
                series.push(*value);
                assert_approx_eq!(series.window_sum(window), brute_force(&values, k, window));
            }
        }
    }

    #[test]
    fn window_is_left_truncated() {
        let mut series = EmissionSeries::new();
        series.push(10.0);
        series.push(20.0);
        assert_approx_eq!(series.window_sum(5), 30.0);
        assert_approx_eq!(series.window_sum(1), 20.0);
        series.push(5.0);
        assert_approx_eq!(series.window_sum(2), 25.0);
        assert_approx_eq!(series.total(), 35.0);
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn empty_series() {
        let series = EmissionSeries::new();
        assert_eq!(series.window_sum(3), 0.0);
        assert_eq!(series.total(), 0.0);
        assert_eq!(series.last(), None);
    }
}
