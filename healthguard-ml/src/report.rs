//! Inference & Reporting Engine
//!
//! ## Overview
//!
//! A report combines two independent signals over the most recent data:
//!
//! 1. **Model vote**: majority over the trailing `K` window predictions.
//! 2. **Threshold check**: max temperature, current and vibration magnitude
//!    over the trailing `K` raw samples, each compared to a fixed alarm limit.
//!
//! The two are shown side by side and never merged.
//!
//! ## Fault Attribution
//!
//! When the vote is [`HealthState::Alert`], the mean feature vector over the
//! trailing windows (every time step) names the feature with the largest
//! signed mean as the probable contributor.
//!
//! ## Insufficient Data
//!
//! No samples, no windows or no predictions yield
//! [`ReportOutcome::InsufficientData`], never a panic. Fewer than `K`
//! predictions aggregate over what exists unless
//! [`ReportConfig::require_full_trailing`] is set.

use std::fmt;

use serde::{Deserialize, Serialize};

use healthguard_core::{
    constants::{
        CURRENT_ALARM_A, HEALTH_STATE_COUNT, TEMP_ALARM_C, TRAILING_WINDOW, VIBRATION_ALARM,
    },
    mean_over_windows, CleanTable, FeatureKind, SensorSample, Window,
};

use crate::{
    errors::{MLError, MLResult},
    state::HealthState,
};

/// Report settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Trailing predictions and samples considered
    pub trailing: usize,
    /// Temperature alarm (°C, inclusive)
    pub temp_threshold: f32,
    /// Current alarm (A, inclusive)
    pub current_threshold: f32,
    /// Vibration magnitude alarm (inclusive)
    pub vibration_threshold: f32,
    /// Refuse to report with fewer than `trailing` predictions
    pub require_full_trailing: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            trailing: TRAILING_WINDOW,
            temp_threshold: TEMP_ALARM_C,
            current_threshold: CURRENT_ALARM_A,
            vibration_threshold: VIBRATION_ALARM,
            require_full_trailing: false,
        }
    }
}

impl ReportConfig {
    /// Threshold for `channel`
    pub fn threshold(&self, channel: Channel) -> f32 {
        match channel {
            Channel::Temperature => self.temp_threshold,
            Channel::Current => self.current_threshold,
            Channel::Vibration => self.vibration_threshold,
        }
    }

    /// Max of each channel over the trailing samples, compared to its threshold
    pub fn check_thresholds(&self, samples: &[SensorSample]) -> [ChannelStatus; 3] {
        let start = samples.len().saturating_sub(self.trailing);
        let recent = &samples[start..];

        Channel::ALL.map(|channel| {
            let max = recent
                .iter()
                .map(|s| channel.read(s))
                .fold(f32::NEG_INFINITY, f32::max);
            let threshold = self.threshold(channel);
            ChannelStatus {
                channel,
                max,
                threshold,
                alarm: !recent.is_empty() && max >= threshold,
            }
        })
    }
}

/// Raw sensor channel with an alarm threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    /// Machine temperature
    Temperature,
    /// Motor current
    Current,
    /// Acceleration magnitude
    Vibration,
}

impl Channel {
    /// Report order
    pub const ALL: [Channel; 3] = [Channel::Temperature, Channel::Current, Channel::Vibration];

    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            Channel::Temperature => "Temperature",
            Channel::Current => "Current",
            Channel::Vibration => "Vibration",
        }
    }

    fn read(self, sample: &SensorSample) -> f32 {
        match self {
            Channel::Temperature => sample.temp,
            Channel::Current => sample.current,
            Channel::Vibration => sample.vibration_magnitude(),
        }
    }
}

/// One channel's trailing maximum and alarm flag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStatus {
    /// Channel checked
    pub channel: Channel,
    /// Largest value over the trailing samples
    pub max: f32,
    /// Limit compared against
    pub threshold: f32,
    /// `max >= threshold`
    pub alarm: bool,
}

/// Majority state; ties go to the least severe state. `None` when empty.
pub fn aggregate(states: &[HealthState]) -> Option<HealthState> {
    if states.is_empty() {
        return None;
    }
    let votes = tally(states);
    let mut best = 0;
    for (id, &count) in votes.iter().enumerate().skip(1) {
        if count > votes[best] {
            best = id;
        }
    }
    HealthState::from_id(best)
}

fn tally(states: &[HealthState]) -> [usize; HEALTH_STATE_COUNT] {
    let mut votes = [0usize; HEALTH_STATE_COUNT];
    for state in states {
        votes[state.id()] += 1;
    }
    votes
}

/// Probable fault contributor for an Alert vote
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaultAttribution {
    /// Feature with the largest mean
    pub feature: FeatureKind,
    /// Its mean over the trailing windows
    pub mean: f32,
}

/// One raw reading echoed in the report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Position in the cleaned table
    pub index: usize,
    /// Temperature
    pub temp: f32,
    /// Current
    pub current: f32,
    /// Vibration magnitude
    pub vibration: f32,
}

/// Health report for the most recent data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Trailing raw readings, oldest first
    pub readings: Vec<Reading>,
    /// Per-channel threshold results
    pub channels: [ChannelStatus; 3],
    /// Majority vote
    pub status: HealthState,
    /// Vote counts per state over the trailing predictions
    pub votes: [usize; HEALTH_STATE_COUNT],
    /// Predictions that took part in the vote
    pub predictions_used: usize,
    /// Set only when `status` is Alert
    pub fault: Option<FaultAttribution>,
}

impl HealthReport {
    /// True when any channel tripped its threshold
    pub fn any_alarm(&self) -> bool {
        self.channels.iter().any(|c| c.alarm)
    }

    /// Status of one channel
    pub fn channel(&self, channel: Channel) -> &ChannelStatus {
        &self.channels[Channel::ALL
            .iter()
            .position(|&c| c == channel)
            .unwrap_or_default()]
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Machine Health Report ===")?;
        writeln!(f, "Last {} readings:", self.readings.len())?;
        for r in &self.readings {
            writeln!(
                f,
                "  [{:>5}] temp={:.2} current={:.2} vibration={:.2}",
                r.index, r.temp, r.current, r.vibration
            )?;
        }

        writeln!(f, "Channel status:")?;
        for c in &self.channels {
            let symbol = if c.alarm { "[ALARM]" } else { "[ ok  ]" };
            writeln!(f, "  {} {:<11} max={:.2}", symbol, c.channel.label(), c.max)?;
        }

        writeln!(f, "Thresholds:")?;
        for c in &self.channels {
            writeln!(f, "  {:<11} >= {:.2}", c.channel.label(), c.threshold)?;
        }

        writeln!(
            f,
            "Predicted status: {} ({} predictions: Normal {}, Moderate {}, Alert {})",
            self.status, self.predictions_used, self.votes[0], self.votes[1], self.votes[2]
        )?;
        if let Some(fault) = &self.fault {
            writeln!(
                f,
                "Probable fault: {} (mean {:.3})",
                fault.feature.name(),
                fault.mean
            )?;
        }
        Ok(())
    }
}

/// What a report request produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReportOutcome {
    /// Full report
    Report(HealthReport),
    /// Not enough data to vote
    InsufficientData {
        /// Cleaned samples available
        samples: usize,
        /// Window predictions available
        available: usize,
        /// Window predictions needed
        required: usize,
    },
}

impl ReportOutcome {
    /// The report, if one was produced
    pub fn report(&self) -> Option<&HealthReport> {
        match self {
            ReportOutcome::Report(r) => Some(r),
            ReportOutcome::InsufficientData { .. } => None,
        }
    }
}

impl fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportOutcome::Report(report) => fmt::Display::fmt(report, f),
            ReportOutcome::InsufficientData {
                samples,
                available,
                required,
            } => writeln!(
                f,
                "Insufficient data: {} window predictions from {} samples, need {}. No health status reported.",
                available, samples, required
            ),
        }
    }
}

/// Builds [`ReportOutcome`]s
#[derive(Debug, Clone, Default)]
pub struct ReportEngine {
    config: ReportConfig,
}

impl ReportEngine {
    /// Engine with explicit settings
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Settings in use
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Report on `table`, whose windows are `windows` with one predicted
    /// state each in `states`
    pub fn build(
        &self,
        table: &CleanTable,
        windows: &[Window],
        states: &[HealthState],
    ) -> MLResult<ReportOutcome> {
        if states.len() != windows.len() {
            return Err(MLError::ShapeMismatch {
                expected: format!("{} predictions (one per window)", windows.len()),
                actual: format!("{} predictions", states.len()),
            });
        }

        let k = self.config.trailing.max(1);
        let required = if self.config.require_full_trailing { k } else { 1 };
        if table.is_empty() || states.len() < required {
            log::warn!(
                "Insufficient data for a report: {} predictions from {} samples",
                states.len(),
                table.len()
            );
            return Ok(ReportOutcome::InsufficientData {
                samples: table.len(),
                available: states.len(),
                required,
            });
        }

        let used = states.len().min(k);
        let tail_states = &states[states.len() - used..];
        let tail_windows = &windows[windows.len() - used..];

        let votes = tally(tail_states);
        let status = aggregate(tail_states).unwrap_or(HealthState::Normal);

        let fault = (status == HealthState::Alert).then(|| {
            let (feature, mean) = mean_over_windows(tail_windows).argmax();
            FaultAttribution { feature, mean }
        });

        let recent = table.tail(k);
        let offset = table.len() - recent.len();
        let readings = recent
            .iter()
            .enumerate()
            .map(|(i, s)| Reading {
                index: offset + i,
                temp: s.temp,
                current: s.current,
                vibration: s.vibration_magnitude(),
            })
            .collect();

        let report = HealthReport {
            readings,
            channels: self.config.check_thresholds(&table.samples),
            status,
            votes,
            predictions_used: used,
            fault,
        };
        log::info!(
            "Report: status={} votes={:?} alarms={}",
            report.status,
            report.votes,
            report.any_alarm()
        );
        Ok(ReportOutcome::Report(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthguard_core::{time::from_epoch_millis, FeatureVector};

    fn sample(temp: f32, current: f32, accel: [f32; 3]) -> SensorSample {
        SensorSample::new(from_epoch_millis(0).unwrap(), temp, current, accel)
    }

    fn table(samples: Vec<SensorSample>) -> CleanTable {
        CleanTable {
            samples,
            ..CleanTable::default()
        }
    }

    fn windows(n: usize) -> Vec<Window> {
        (0..n)
            .map(|start| Window {
                start,
                vectors: vec![FeatureVector([0.1, 0.2, 0.0, -0.5, 0.9]); 2],
            })
            .collect()
    }

    fn states(ids: &[usize]) -> Vec<HealthState> {
        ids.iter().filter_map(|&i| HealthState::from_id(i)).collect()
    }

    #[test]
    fn tie_goes_to_lowest_state() {
        let votes = states(&[0, 0, 0, 0, 0, 1, 1, 1, 1, 1]);
        assert_eq!(aggregate(&votes), Some(HealthState::Normal));
        assert_eq!(aggregate(&states(&[2, 1, 2, 1])), Some(HealthState::Moderate));
        assert_eq!(aggregate(&states(&[2, 2, 1])), Some(HealthState::Alert));
        assert_eq!(aggregate(&[]), None);
    }

    #[test]
    fn thresholds_are_inclusive() {
        let config = ReportConfig::default();
        let status = config.check_thresholds(&[sample(29.10, 10.00, [0.2, 0.0, 0.0])]);
        assert!(status.iter().all(|c| c.alarm));

        let status = config.check_thresholds(&[sample(29.09, 9.99, [0.19, 0.0, 0.0])]);
        assert!(status.iter().all(|c| !c.alarm));
    }

    #[test]
    fn thresholds_only_see_trailing_samples() {
        let config = ReportConfig::default();
        let mut samples = vec![sample(50.0, 50.0, [5.0, 0.0, 0.0])];
        samples.extend((0..10).map(|_| sample(20.0, 5.0, [0.0; 3])));

        let status = config.check_thresholds(&samples);
        assert!(status.iter().all(|c| !c.alarm));
        assert_eq!(status[0].max, 20.0);
    }

    #[test]
    fn alert_vote_attributes_fault() {
        let samples: Vec<_> = (0..12).map(|_| sample(20.0, 5.0, [0.0; 3])).collect();
        let outcome = ReportEngine::default()
            .build(&table(samples), &windows(3), &states(&[2, 2, 0]))
            .unwrap();

        let report = outcome.report().unwrap();
        assert_eq!(report.status, HealthState::Alert);
        assert_eq!(report.predictions_used, 3);
        assert_eq!(report.votes, [1, 0, 2]);
        let fault = report.fault.unwrap();
        assert_eq!(fault.feature, FeatureKind::Vibration);
        assert!((fault.mean - 0.9).abs() < 1e-6);
        assert_eq!(report.readings.len(), 10);
        assert_eq!(report.readings[0].index, 2);
    }

    #[test]
    fn non_alert_vote_has_no_fault() {
        let samples: Vec<_> = (0..5).map(|_| sample(20.0, 5.0, [0.0; 3])).collect();
        let outcome = ReportEngine::default()
            .build(&table(samples), &windows(2), &states(&[1, 1]))
            .unwrap();
        assert_eq!(outcome.report().unwrap().fault, None);
    }

    #[test]
    fn trailing_vote_ignores_older_predictions() {
        let samples: Vec<_> = (0..20).map(|_| sample(20.0, 5.0, [0.0; 3])).collect();
        let mut ids = vec![2; 5];
        ids.extend([0; 10]);
        let outcome = ReportEngine::default()
            .build(&table(samples), &windows(15), &states(&ids))
            .unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.status, HealthState::Normal);
        assert_eq!(report.predictions_used, 10);
    }

    #[test]
    fn empty_input_is_insufficient_not_a_panic() {
        let engine = ReportEngine::default();
        let outcome = engine.build(&table(Vec::new()), &[], &[]).unwrap();
        assert!(matches!(
            outcome,
            ReportOutcome::InsufficientData { available: 0, .. }
        ));
        assert!(outcome.to_string().starts_with("Insufficient data"));
    }

    #[test]
    fn full_trailing_can_be_required() {
        let engine = ReportEngine::new(ReportConfig {
            require_full_trailing: true,
            ..ReportConfig::default()
        });
        let samples: Vec<_> = (0..15).map(|_| sample(20.0, 5.0, [0.0; 3])).collect();
        let outcome = engine
            .build(&table(samples), &windows(5), &states(&[0; 5]))
            .unwrap();
        assert_eq!(
            outcome,
            ReportOutcome::InsufficientData {
                samples: 15,
                available: 5,
                required: 10
            }
        );
    }

    #[test]
    fn mismatched_predictions_are_rejected() {
        let err = ReportEngine::default()
            .build(&table(Vec::new()), &windows(2), &states(&[0]))
            .unwrap_err();
        assert!(matches!(err, MLError::ShapeMismatch { .. }));
    }

    #[test]
    fn display_lists_every_section() {
        let samples = vec![
            sample(20.0, 5.0, [0.0; 3]),
            sample(35.0, 15.0, [1.0, 1.0, 1.0]),
        ];
        let outcome = ReportEngine::default()
            .build(&table(samples), &windows(1), &states(&[2]))
            .unwrap();
        let text = outcome.to_string();

        assert!(text.contains("[    1] temp=35.00 current=15.00 vibration=1.73"));
        assert!(text.contains("[ALARM] Temperature max=35.00"));
        assert!(text.contains(">= 29.10"));
        assert!(text.contains(">= 10.00"));
        assert!(text.contains(">= 0.20"));
        assert!(text.contains("Predicted status: Alert"));
        assert!(text.contains("Probable fault: vibration (mean 0.900)"));
    }
}
