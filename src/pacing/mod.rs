//! Per-task pacing patterns
//!
//! Pacing decides how long an admitted task waits before it fires:
//! - **None**: fire immediately
//! - **Fixed**: the same delay for every task (`D(ms)`)
//! - **Normal**: delays sampled from a normal distribution (`N(mean,std)`)
//! - **Uniform**: delays sampled from a uniform distribution (`U(min,max)`)
//!
//! The delay throttles individual tasks. It is not a global rate limiter and
//! does not produce a fixed requests/sec figure on its own.

use crate::config::ConfigError;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Trait for producing per-task delays
pub trait Pacing: Send + Sync {
    /// Get the delay before the next request fires
    fn next_delay(&mut self) -> Duration;

    /// Get the pacing name
    fn name(&self) -> &str;
}

/// No delay at all
pub struct NoDelay;

impl Pacing for NoDelay {
    fn next_delay(&mut self) -> Duration {
        Duration::ZERO
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Fixed delay for every task
pub struct FixedDelay {
    delay_ms: u64,
}

impl FixedDelay {
    /// Create a new fixed delay
    pub fn new(delay_ms: u64) -> Self {
        Self { delay_ms }
    }
}

impl Pacing for FixedDelay {
    fn next_delay(&mut self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Normally distributed delay, clamped at zero
pub struct NormalDelay {
    distribution: Normal<f64>,
}

impl NormalDelay {
    /// Create a new normal delay with mean and standard deviation in milliseconds
    pub fn new(mean_ms: f64, std_dev_ms: f64) -> Result<Self, ConfigError> {
        let distribution = Normal::new(mean_ms, std_dev_ms).map_err(|e| {
            ConfigError::InvalidPacing(format!("invalid normal distribution parameters: {}", e))
        })?;
        Ok(Self { distribution })
    }
}

impl Pacing for NormalDelay {
    fn next_delay(&mut self) -> Duration {
        let mut rng = rand::thread_rng();
        let delay_ms = self.distribution.sample(&mut rng).max(0.0) as u64;
        Duration::from_millis(delay_ms)
    }

    fn name(&self) -> &str {
        "normal"
    }
}

/// Uniformly distributed delay within `[min_ms, max_ms]`
pub struct UniformDelay {
    distribution: Uniform<u64>,
}

impl UniformDelay {
    /// Create a new uniform delay with min and max in milliseconds
    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self, ConfigError> {
        if min_ms > max_ms {
            return Err(ConfigError::InvalidPacing(format!(
                "uniform min ({}) must not exceed max ({})",
                min_ms, max_ms
            )));
        }
        Ok(Self {
            distribution: Uniform::new_inclusive(min_ms, max_ms),
        })
    }
}

impl Pacing for UniformDelay {
    fn next_delay(&mut self) -> Duration {
        let mut rng = rand::thread_rng();
        Duration::from_millis(self.distribution.sample(&mut rng))
    }

    fn name(&self) -> &str {
        "uniform"
    }
}

/// Serializable description of a pacing pattern
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PacingSpec {
    /// Fire immediately after admission
    #[default]
    None,
    /// Fixed delay
    Fixed {
        /// Delay in milliseconds
        delay_ms: u64,
    },
    /// Normal distribution
    Normal {
        /// Mean delay in milliseconds
        mean_ms: f64,
        /// Standard deviation in milliseconds
        std_dev_ms: f64,
    },
    /// Uniform distribution
    Uniform {
        /// Lower bound in milliseconds
        min_ms: u64,
        /// Upper bound in milliseconds (inclusive)
        max_ms: u64,
    },
}

impl PacingSpec {
    /// Check the parameters without building the pacing
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build().map(|_| ())
    }

    /// Build a fresh pacing instance
    pub fn build(&self) -> Result<Box<dyn Pacing>, ConfigError> {
        match *self {
            PacingSpec::None => Ok(Box::new(NoDelay)),
            PacingSpec::Fixed { delay_ms } => Ok(Box::new(FixedDelay::new(delay_ms))),
            PacingSpec::Normal {
                mean_ms,
                std_dev_ms,
            } => {
                if !mean_ms.is_finite() || mean_ms < 0.0 {
                    return Err(ConfigError::InvalidPacing(format!(
                        "normal mean must be a non-negative number, got: {}",
                        mean_ms
                    )));
                }
                Ok(Box::new(NormalDelay::new(mean_ms, std_dev_ms)?))
            }
            PacingSpec::Uniform { min_ms, max_ms } => {
                Ok(Box::new(UniformDelay::new(min_ms, max_ms)?))
            }
        }
    }

    /// True when every task fires without waiting
    pub fn is_none(&self) -> bool {
        matches!(
            self,
            PacingSpec::None | PacingSpec::Fixed { delay_ms: 0 }
        )
    }
}

impl fmt::Display for PacingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacingSpec::None => write!(f, "none"),
            PacingSpec::Fixed { delay_ms } => write!(f, "D({})", delay_ms),
            PacingSpec::Normal {
                mean_ms,
                std_dev_ms,
            } => write!(f, "N({},{})", mean_ms, std_dev_ms),
            PacingSpec::Uniform { min_ms, max_ms } => write!(f, "U({},{})", min_ms, max_ms),
        }
    }
}

impl FromStr for PacingSpec {
    type Err = ConfigError;

    /// Parse strings like `D(100)`, `N(100,10)`, `U(50,150)` or `none`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim();
        if spec.eq_ignore_ascii_case("none") || spec.is_empty() {
            return Ok(PacingSpec::None);
        }

        let params = extract_params(spec)?;
        let kind = spec.chars().next().map(|c| c.to_ascii_uppercase());

        let parsed = match kind {
            Some('D') => {
                if params.len() != 1 {
                    return Err(invalid(spec, "D(delay_ms)"));
                }
                PacingSpec::Fixed {
                    delay_ms: parse_param(&params[0], spec)?,
                }
            }
            Some('N') => {
                if params.len() != 2 {
                    return Err(invalid(spec, "N(mean_ms,std_dev_ms)"));
                }
                PacingSpec::Normal {
                    mean_ms: parse_param(&params[0], spec)?,
                    std_dev_ms: parse_param(&params[1], spec)?,
                }
            }
            Some('U') => {
                if params.len() != 2 {
                    return Err(invalid(spec, "U(min_ms,max_ms)"));
                }
                PacingSpec::Uniform {
                    min_ms: parse_param(&params[0], spec)?,
                    max_ms: parse_param(&params[1], spec)?,
                }
            }
            _ => {
                return Err(ConfigError::InvalidPacing(format!(
                    "{}: expected D(delay), N(mean,std), U(min,max) or none",
                    spec
                )))
            }
        };

        parsed.validate()?;
        Ok(parsed)
    }
}

fn invalid(spec: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidPacing(format!("{}: expected {}", spec, expected))
}

fn parse_param<T: FromStr>(value: &str, spec: &str) -> Result<T, ConfigError> {
    value
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidPacing(format!("invalid value {:?} in {}", value, spec)))
}

/// Extract parameters from a string like "U(50, 150)" -> ["50", "150"]
fn extract_params(spec: &str) -> Result<Vec<String>, ConfigError> {
    let start = spec
        .find('(')
        .ok_or_else(|| ConfigError::InvalidPacing(format!("missing '(' in {}", spec)))?;
    let end = spec
        .rfind(')')
        .ok_or_else(|| ConfigError::InvalidPacing(format!("missing ')' in {}", spec)))?;

    if start >= end {
        return Err(ConfigError::InvalidPacing(format!(
            "invalid parentheses in {}",
            spec
        )));
    }

    Ok(spec[start + 1..end]
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}
