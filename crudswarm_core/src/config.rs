//! Run configuration and validation.

use std::time::Duration;

use rand::Rng;
use reqwest::Url;

use crate::error::ConfigError;

/// Uniform think-time range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThinkTime {
    pub min: Duration,
    pub max: Duration,
}

impl ThinkTime {
    pub fn between(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Fixed pause, `min == max`
    pub fn constant(pause: Duration) -> Self {
        Self {
            min: pause,
            max: pause,
        }
    }

    /// Draw a pause uniformly from `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = saturating_nanos(self.min);
        let max = saturating_nanos(self.max);
        if min >= max {
            return self.min;
        }
        Duration::from_nanos(rng.gen_range(min..=max))
    }
}

fn saturating_nanos(pause: Duration) -> u64 {
    u64::try_from(pause.as_nanos()).unwrap_or(u64::MAX)
}

impl Default for ThinkTime {
    fn default() -> Self {
        Self::between(Duration::from_secs(1), Duration::from_secs(3))
    }
}

/// Parameters of one load run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Base URL every task path is appended to
    pub host: String,
    /// Total number of virtual users
    pub users: usize,
    /// Users started per second during ramp-up
    pub spawn_rate: f64,
    /// Stop automatically after this long; `None` runs until `stop_run`
    pub run_time: Option<Duration>,
    pub think_time: ThinkTime,
    pub request_timeout: Duration,
    /// Seeds every user's RNG (user N gets `seed + N`)
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:8080".to_string(),
            users: 1,
            spawn_rate: 1.0,
            run_time: None,
            think_time: ThinkTime::default(),
            request_timeout: Duration::from_secs(10),
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.users == 0 {
            return Err(ConfigError::NoUsers);
        }
        if !self.spawn_rate.is_finite()
            || self.spawn_rate <= 0.0
            || Duration::try_from_secs_f64(1.0 / self.spawn_rate).is_err()
        {
            return Err(ConfigError::InvalidSpawnRate(self.spawn_rate));
        }
        // Sampling works in u64 nanoseconds, roughly 584 years
        if self.think_time.min > self.think_time.max
            || u64::try_from(self.think_time.max.as_nanos()).is_err()
        {
            return Err(ConfigError::InvalidThinkTime {
                min: self.think_time.min,
                max: self.think_time.max,
            });
        }
        if self.run_time.is_some_and(|limit| limit.is_zero()) {
            return Err(ConfigError::InvalidRunTime);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidRequestTimeout);
        }
        validate_host(&self.host)
    }

    /// Delay between two consecutive user spawns
    ///
    /// Saturates at `Duration::MAX` for rates `validate` rejects.
    pub fn spawn_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.spawn_rate).unwrap_or(Duration::MAX)
    }
}

fn validate_host(host: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidHost {
        host: host.to_string(),
        reason,
    };
    let url = Url::parse(host).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(RunConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_zero_users_rejected() {
        let config = RunConfig {
            users: 0,
            ..RunConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoUsers));
    }

    #[test]
    fn test_bad_spawn_rates_rejected() {
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e-20, f64::MIN_POSITIVE] {
            let config = RunConfig {
                spawn_rate: rate,
                ..RunConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidSpawnRate(_))
            ));
        }
    }

    #[test]
    fn test_reversed_think_time_rejected() {
        let config = RunConfig {
            think_time: ThinkTime::between(Duration::from_secs(3), Duration::from_secs(1)),
            ..RunConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThinkTime { .. })
        ));
    }

    #[test]
    fn test_think_time_beyond_u64_nanos_rejected() {
        let config = RunConfig {
            think_time: ThinkTime::between(
                Duration::from_secs(1),
                Duration::from_millis(18_446_744_073_710),
            ),
            ..RunConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThinkTime { .. })
        ));

        let config = RunConfig {
            think_time: ThinkTime::constant(Duration::from_nanos(u64::MAX)),
            ..RunConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_huge_think_time_sample_does_not_panic() {
        let mut rng = StdRng::seed_from_u64(7);
        let think = ThinkTime::between(Duration::from_secs(1), Duration::MAX);
        let pause = think.sample(&mut rng);
        assert!(pause >= think.min);

        let think = ThinkTime::between(
            Duration::from_secs(1),
            Duration::from_millis(18_446_744_073_710),
        );
        assert!(think.sample(&mut rng) >= Duration::from_secs(1));
    }

    #[test]
    fn test_zero_think_time_allowed() {
        let config = RunConfig {
            think_time: ThinkTime::constant(Duration::ZERO),
            ..RunConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_zero_run_time_and_timeout_rejected() {
        let config = RunConfig {
            run_time: Some(Duration::ZERO),
            ..RunConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidRunTime));

        let config = RunConfig {
            request_timeout: Duration::ZERO,
            ..RunConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidRequestTimeout));
    }

    #[test]
    fn test_host_must_be_http_url() {
        for host in ["localhost:8080", "ftp://example.com", ""] {
            let config = RunConfig {
                host: host.to_string(),
                ..RunConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidHost { .. })),
                "host {host:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_think_time_samples_stay_in_range() {
        let think = ThinkTime::between(Duration::from_millis(1000), Duration::from_millis(3000));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let pause = think.sample(&mut rng);
            assert!(pause >= think.min && pause <= think.max);
        }
        assert_eq!(
            ThinkTime::constant(Duration::from_millis(5)).sample(&mut rng),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn test_spawn_interval() {
        let config = RunConfig {
            spawn_rate: 4.0,
            ..RunConfig::default()
        };
        assert_eq!(config.spawn_interval(), Duration::from_millis(250));

        let config = RunConfig {
            spawn_rate: 1e-20,
            ..RunConfig::default()
        };
        assert_eq!(config.spawn_interval(), Duration::MAX);
    }
}
