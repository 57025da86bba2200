//! Load profiles
//!
//! A profile expands into ordered stages; each stage is one dispatcher run
//! per selected endpoint:
//! - **Smoke**: a handful of slow requests to check the service is up
//! - **Stress**: one large burst at high concurrency
//! - **Endurance**: a long run at moderate concurrency
//! - **Spike**: warmup, sudden burst, recovery
//! - **GradualRamp**: concurrency doubling from stage to stage
//! - **Custom**: a single stage built from command-line values

use crate::config::RunConfig;
use crate::pacing::PacingSpec;
use serde::{Deserialize, Serialize};

/// One named run configuration within a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage label used in reports and exports
    pub name: String,

    /// How the stage is dispatched
    #[serde(flatten)]
    pub run: RunConfig,
}

impl Stage {
    /// Create a stage
    pub fn new(name: impl Into<String>, run: RunConfig) -> Self {
        Self {
            name: name.into(),
            run,
        }
    }
}

/// Named load profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LoadProfile {
    Smoke,
    Stress,
    Endurance,
    Spike,
    GradualRamp,
    #[default]
    Custom,
}

impl LoadProfile {
    /// Profile name as accepted on the command line
    pub fn name(&self) -> &'static str {
        match self {
            LoadProfile::Smoke => "smoke",
            LoadProfile::Stress => "stress",
            LoadProfile::Endurance => "endurance",
            LoadProfile::Spike => "spike",
            LoadProfile::GradualRamp => "gradual-ramp",
            LoadProfile::Custom => "custom",
        }
    }

    /// Expand the profile into stages
    ///
    /// `base` supplies the custom stage and the timeout and rate limit every
    /// predefined stage inherits.
    pub fn stages(&self, base: &RunConfig) -> Vec<Stage> {
        let stage = |name: &str, total: usize, concurrency: usize, pacing: PacingSpec| {
            Stage::new(
                name,
                RunConfig {
                    total_requests: total,
                    concurrency,
                    pacing,
                    ..base.clone()
                },
            )
        };
        let fixed = |delay_ms| PacingSpec::Fixed { delay_ms };

        match self {
            LoadProfile::Smoke => vec![stage("smoke", 5, 1, fixed(500))],
            LoadProfile::Stress => vec![stage("stress", 500, 50, PacingSpec::None)],
            LoadProfile::Endurance => vec![stage("endurance", 2000, 10, fixed(100))],
            LoadProfile::Spike => vec![
                stage("warmup", 20, 2, PacingSpec::None),
                stage("spike", 300, 100, PacingSpec::None),
                stage("recovery", 20, 2, PacingSpec::None),
            ],
            LoadProfile::GradualRamp => vec![
                stage("ramp-5", 50, 5, PacingSpec::None),
                stage("ramp-10", 50, 10, PacingSpec::None),
                stage("ramp-20", 100, 20, PacingSpec::None),
                stage("ramp-40", 100, 40, PacingSpec::None),
            ],
            LoadProfile::Custom => vec![Stage::new("custom", base.clone())],
        }
    }
}

impl std::fmt::Display for LoadProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn totals(stages: &[Stage]) -> Vec<(usize, usize)> {
        stages
            .iter()
            .map(|s| (s.run.total_requests, s.run.concurrency))
            .collect()
    }

    #[test]
    fn test_smoke_profile() {
        let stages = LoadProfile::Smoke.stages(&RunConfig::default());
        assert_eq!(totals(&stages), vec![(5, 1)]);
        assert_eq!(stages[0].run.pacing, PacingSpec::Fixed { delay_ms: 500 });
    }

    #[test]
    fn test_spike_profile_order() {
        let stages = LoadProfile::Spike.stages(&RunConfig::default());
        let names: Vec<&str> = stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["warmup", "spike", "recovery"]);
        assert_eq!(totals(&stages), vec![(20, 2), (300, 100), (20, 2)]);
    }

    #[test]
    fn test_gradual_ramp_increases_concurrency() {
        let stages = LoadProfile::GradualRamp.stages(&RunConfig::default());
        let concurrency: Vec<usize> = stages.iter().map(|s| s.run.concurrency).collect();
        assert_eq!(concurrency, vec![5, 10, 20, 40]);
    }

    #[test]
    fn test_custom_profile_uses_base() {
        let base = RunConfig::new(42, 7).with_delay_ms(15);
        let stages = LoadProfile::Custom.stages(&base);
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].name, "custom");
        assert_eq!(stages[0].run, base);
    }

    #[test]
    fn test_profiles_inherit_timeout_and_rate_limit() {
        let base = RunConfig::default()
            .with_request_timeout(Duration::from_secs(3))
            .with_rate_limit(25.0);

        for stage in LoadProfile::Stress.stages(&base) {
            assert_eq!(stage.run.request_timeout_ms, 3000);
            assert_eq!(stage.run.rate_limit, Some(25.0));
        }
    }

    #[test]
    fn test_every_profile_stage_is_valid() {
        for profile in [
            LoadProfile::Smoke,
            LoadProfile::Stress,
            LoadProfile::Endurance,
            LoadProfile::Spike,
            LoadProfile::GradualRamp,
        ] {
            for stage in profile.stages(&RunConfig::default()) {
                assert!(stage.run.validate().is_ok(), "{} / {}", profile, stage.name);
            }
        }
    }

    #[test]
    fn test_profile_names() {
        assert_eq!(LoadProfile::GradualRamp.to_string(), "gradual-ramp");
        assert_eq!(LoadProfile::default(), LoadProfile::Custom);
    }
}
