//! Environment configuration for different deployment stages

use std::{env, time::Duration};

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion, Region};
use ssqs::Queue;

/// Queue name used in development
const DEVELOPMENT_QUEUE_NAME: &str = "ssqs-queue";
/// Region LocalStack answers for
const DEVELOPMENT_REGION: &str = "us-east-1";

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development => Some("http://localhost:4566"),
        }
    }

    /// Log filter used when `RUST_LOG` is not set
    #[must_use]
    pub const fn default_log_filter(&self) -> &'static str {
        match self {
            Self::Production | Self::Staging => "info",
            Self::Development => "debug",
        }
    }

    /// AWS configuration with retry and timeout settings
    ///
    /// The operation timeout leaves room for the longest long poll.
    pub async fn aws_config(&self, region: Option<&str>) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }

        let mut config_builder = loader
            .load()
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// Returns the queue the worker consumes
    ///
    /// # Panics
    ///
    /// Panics if `SSQS_QUEUE_URL` or `SSQS_QUEUE_NAME` is not set in production/staging,
    /// or if a numeric setting is not a valid integer
    #[must_use]
    pub fn queue(&self) -> Queue {
        let (name, url) = match self {
            Self::Production | Self::Staging => (
                env::var("SSQS_QUEUE_NAME").expect("SSQS_QUEUE_NAME environment variable is not set"),
                env::var("SSQS_QUEUE_URL").expect("SSQS_QUEUE_URL environment variable is not set"),
            ),
            Self::Development => (
                env::var("SSQS_QUEUE_NAME").unwrap_or_else(|_| DEVELOPMENT_QUEUE_NAME.to_string()),
                env::var("SSQS_QUEUE_URL").unwrap_or_else(|_| {
                    format!("http://localhost:4566/000000000000/{DEVELOPMENT_QUEUE_NAME}")
                }),
            ),
        };

        let region = env::var("SSQS_QUEUE_REGION").ok().or_else(|| match self {
            Self::Production | Self::Staging => None,
            Self::Development => Some(DEVELOPMENT_REGION.to_string()),
        });

        Queue {
            name,
            url,
            poll_duration: int_var("SSQS_POLL_DURATION_SECS", 20),
            visibility_timeout: int_var("SSQS_VISIBILITY_TIMEOUT_SECS", 30),
            max_messages: int_var("SSQS_MAX_MESSAGES", 10),
            region,
        }
    }
}

fn int_var(key: &str, default: i32) -> i32 {
    env::var(key).map_or(default, |v| {
        v.trim()
            .parse()
            .unwrap_or_else(|_| panic!("{key} environment variable is not a valid integer"))
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    use super::*;

    const QUEUE_VARS: [&str; 6] = [
        "SSQS_QUEUE_NAME",
        "SSQS_QUEUE_URL",
        "SSQS_QUEUE_REGION",
        "SSQS_POLL_DURATION_SECS",
        "SSQS_VISIBILITY_TIMEOUT_SECS",
        "SSQS_MAX_MESSAGES",
    ];

    fn clear_queue_vars() {
        for key in QUEUE_VARS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_environment_from_env() {
        // Test development (default)
        env::remove_var("APP_ENV");
        assert_eq!(Environment::from_env(), Environment::Development);

        // Test staging
        env::set_var("APP_ENV", " Staging ");
        assert_eq!(Environment::from_env(), Environment::Staging);

        // Test production
        env::set_var("APP_ENV", "production");
        assert_eq!(Environment::from_env(), Environment::Production);

        // Cleanup
        env::remove_var("APP_ENV");
    }

    #[test]
    #[serial]
    #[should_panic(expected = "Invalid environment: invalid")]
    fn test_invalid_environment() {
        env::set_var("APP_ENV", "invalid");
        let _ = Environment::from_env();
    }

    #[test]
    #[serial]
    fn test_development_queue_defaults() {
        clear_queue_vars();

        let queue = Environment::Development.queue();

        assert_eq!(
            queue,
            Queue {
                name: "ssqs-queue".to_string(),
                url: "http://localhost:4566/000000000000/ssqs-queue".to_string(),
                poll_duration: 20,
                visibility_timeout: 30,
                max_messages: 10,
                region: Some("us-east-1".to_string()),
            }
        );
        assert!(queue.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_production_queue_from_env() {
        clear_queue_vars();
        env::set_var("SSQS_QUEUE_NAME", "orders");
        env::set_var(
            "SSQS_QUEUE_URL",
            "https://sqs.eu-west-1.amazonaws.com/123456789012/orders",
        );
        env::set_var("SSQS_QUEUE_REGION", "eu-west-1");
        env::set_var("SSQS_POLL_DURATION_SECS", "5");
        env::set_var("SSQS_VISIBILITY_TIMEOUT_SECS", "120");

        let queue = Environment::Production.queue();
        clear_queue_vars();

        assert_eq!(queue.name, "orders");
        assert_eq!(queue.poll_duration, 5);
        assert_eq!(queue.visibility_timeout, 120);
        assert_eq!(queue.max_messages, 10);
        assert_eq!(queue.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    #[serial]
    #[should_panic(expected = "SSQS_QUEUE_NAME environment variable is not set")]
    fn test_production_requires_queue_name() {
        clear_queue_vars();
        let _ = Environment::Production.queue();
    }

    #[test]
    #[serial]
    #[should_panic(expected = "SSQS_MAX_MESSAGES environment variable is not a valid integer")]
    fn test_invalid_integer_setting() {
        clear_queue_vars();
        env::set_var("SSQS_MAX_MESSAGES", "ten");
        let _ = Environment::Development.queue();
    }
}
