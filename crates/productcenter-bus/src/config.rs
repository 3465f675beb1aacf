//! Bus configuration: broker endpoints from the environment plus
//! producer/consumer tuning.
//!
//! [`BusConfig`] is the opaque configuration struct the rest of the crate
//! carries around. Endpoint settings (brokers, TLS, SASL, identifiers) come
//! from process environment variables at startup; tuning knobs have the
//! platform's fixed defaults and are passed through to rdkafka unmodified.
//! Credential contents are never parsed or validated here.

use std::time::Duration;

use crate::error::{BusError, BusResult};

/// SASL/PLAIN credentials. Opaque to the bus; handed to the client as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslPlain {
    /// SASL username.
    pub username: String,
    /// SASL password.
    pub password: String,
}

/// Producer tuning, passed through to the transport unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerTuning {
    /// Let publishes create missing topics.
    pub allow_auto_topic_creation: bool,
    /// Transaction timeout.
    pub transaction_timeout: Duration,
}

impl Default for ProducerTuning {
    fn default() -> Self {
        Self {
            allow_auto_topic_creation: true,
            transaction_timeout: Duration::from_secs(30),
        }
    }
}

/// Consumer tuning, passed through to the transport unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerTuning {
    /// Maximum wait before a poll returns empty.
    pub max_wait: Duration,
    /// Maximum bytes per fetch.
    pub max_fetch_bytes: usize,
    /// Consumer group session timeout.
    pub session_timeout: Duration,
    /// Heartbeat interval; must be shorter than the session timeout.
    pub heartbeat_interval: Duration,
}

impl Default for ConsumerTuning {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(1),
            max_fetch_bytes: 1_048_576, // 1 MiB
            session_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(3),
        }
    }
}

/// Bounded retry budget for the initial broker connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryBudget {
    /// Maximum connection attempts.
    pub attempts: u32,
    /// Backoff before the second attempt; doubles each retry.
    pub initial_backoff: Duration,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            attempts: 8,
            initial_backoff: Duration::from_millis(100),
        }
    }
}

/// Complete configuration for the event bus transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Comma-separated broker address list.
    pub brokers: String,
    /// Client identifier presented to the broker.
    pub client_id: String,
    /// Consumer group identifier.
    pub group_id: String,
    /// Enable TLS on broker connections.
    pub ssl: bool,
    /// SASL/PLAIN credentials, if authentication is enabled.
    pub sasl: Option<SaslPlain>,
    /// Producer tuning knobs.
    pub producer: ProducerTuning,
    /// Consumer tuning knobs.
    pub consumer: ConsumerTuning,
    /// Connect retry budget.
    pub retry: RetryBudget,
    /// Connection and authentication timeout, also the publish confirm
    /// bound.
    pub connection_timeout: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".into(),
            client_id: "productcenter".into(),
            group_id: "productcenter-group".into(),
            ssl: false,
            sasl: None,
            producer: ProducerTuning::default(),
            consumer: ConsumerTuning::default(),
            retry: RetryBudget::default(),
            connection_timeout: Duration::from_secs(3),
        }
    }
}

impl BusConfig {
    /// Builds the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Config` on invalid combinations (see
    /// [`BusConfig::validate`]).
    pub fn from_env() -> BusResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// The seam `from_env` goes through; tests inject maps here instead of
    /// mutating the process environment.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Config` on invalid combinations.
    pub fn from_lookup<F>(lookup: F) -> BusResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(brokers) = lookup("KAFKA_BROKERS") {
            config.brokers = brokers;
        }
        if let Some(client_id) = lookup("KAFKA_CLIENT_ID") {
            config.client_id = client_id;
        }
        if let Some(group_id) = lookup("KAFKA_GROUP_ID") {
            config.group_id = group_id;
        }
        config.ssl = flag(lookup("KAFKA_SSL"));

        if flag(lookup("KAFKA_SASL_ENABLED")) {
            let username = lookup("KAFKA_SASL_USERNAME").ok_or_else(|| {
                BusError::Config("KAFKA_SASL_ENABLED is set but KAFKA_SASL_USERNAME is not".into())
            })?;
            let password = lookup("KAFKA_SASL_PASSWORD").ok_or_else(|| {
                BusError::Config("KAFKA_SASL_ENABLED is set but KAFKA_SASL_PASSWORD is not".into())
            })?;
            config.sasl = Some(SaslPlain { username, password });
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Config` if the broker list or client identifiers
    /// are empty, the retry budget is zero, or the heartbeat interval does
    /// not fit inside the session timeout.
    pub fn validate(&self) -> BusResult<()> {
        if self.brokers.trim().is_empty() {
            return Err(BusError::Config("broker list is empty".into()));
        }
        if self.client_id.is_empty() {
            return Err(BusError::Config("client id is empty".into()));
        }
        if self.group_id.is_empty() {
            return Err(BusError::Config("consumer group id is empty".into()));
        }
        if self.retry.attempts == 0 {
            return Err(BusError::Config("retry budget must allow at least one attempt".into()));
        }
        if self.consumer.heartbeat_interval >= self.consumer.session_timeout {
            return Err(BusError::Config(
                "heartbeat interval must be shorter than the session timeout".into(),
            ));
        }
        Ok(())
    }

    /// Returns the rdkafka `security.protocol` value for this config.
    #[must_use]
    pub fn security_protocol(&self) -> &'static str {
        match (self.ssl, self.sasl.is_some()) {
            (false, false) => "plaintext",
            (true, false) => "ssl",
            (false, true) => "sasl_plaintext",
            (true, true) => "sasl_ssl",
        }
    }
}

/// Parses a boolean environment flag; only `true` (any case) enables.
fn flag(value: Option<String>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

#[cfg(feature = "kafka")]
mod client_config {
    //! Conversion to rdkafka client configs, kept together so every
    //! property we set is visible in one place.

    use rdkafka::ClientConfig;

    use super::BusConfig;

    impl BusConfig {
        /// Builds the rdkafka producer configuration.
        #[must_use]
        pub fn to_producer_client_config(&self) -> ClientConfig {
            let mut config = self.base_client_config();
            config
                .set(
                    "allow.auto.create.topics",
                    self.producer.allow_auto_topic_creation.to_string(),
                )
                .set(
                    "transaction.timeout.ms",
                    self.producer.transaction_timeout.as_millis().to_string(),
                )
                .set(
                    "message.timeout.ms",
                    self.connection_timeout.as_millis().to_string(),
                );
            config
        }

        /// Builds the rdkafka consumer configuration.
        ///
        /// Subscription always starts from the current offset: the bus
        /// guarantees forward-only processing from the join point, never
        /// historical replay.
        #[must_use]
        pub fn to_consumer_client_config(&self) -> ClientConfig {
            let mut config = self.base_client_config();
            config
                .set("group.id", &self.group_id)
                .set("auto.offset.reset", "latest")
                .set("enable.auto.commit", "true")
                .set("enable.partition.eof", "false")
                .set("fetch.wait.max.ms", self.consumer.max_wait.as_millis().to_string())
                .set("fetch.max.bytes", self.consumer.max_fetch_bytes.to_string())
                .set(
                    "session.timeout.ms",
                    self.consumer.session_timeout.as_millis().to_string(),
                )
                .set(
                    "heartbeat.interval.ms",
                    self.consumer.heartbeat_interval.as_millis().to_string(),
                );
            config
        }

        fn base_client_config(&self) -> ClientConfig {
            let mut config = ClientConfig::new();
            config
                .set("bootstrap.servers", &self.brokers)
                .set("client.id", &self.client_id)
                .set("security.protocol", self.security_protocol())
                .set(
                    "socket.connection.setup.timeout.ms",
                    self.connection_timeout.as_millis().to_string(),
                );
            if let Some(ref sasl) = self.sasl {
                config
                    .set("sasl.mechanism", "PLAIN")
                    .set("sasl.username", &sasl.username)
                    .set("sasl.password", &sasl.password);
            }
            config
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let vars: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| vars.get(key).map(ToString::to_string)
    }

    #[test]
    fn test_defaults_match_platform_settings() {
        let config = BusConfig::default();
        assert_eq!(config.brokers, "localhost:9092");
        assert_eq!(config.client_id, "productcenter");
        assert_eq!(config.group_id, "productcenter-group");
        assert!(!config.ssl);
        assert!(config.sasl.is_none());
        assert!(config.producer.allow_auto_topic_creation);
        assert_eq!(config.producer.transaction_timeout, Duration::from_secs(30));
        assert_eq!(config.consumer.max_wait, Duration::from_secs(1));
        assert_eq!(config.consumer.max_fetch_bytes, 1_048_576);
        assert_eq!(config.consumer.session_timeout, Duration::from_secs(30));
        assert_eq!(config.consumer.heartbeat_interval, Duration::from_secs(3));
        assert_eq!(config.retry.attempts, 8);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(100));
        assert_eq!(config.connection_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_from_lookup_with_no_vars_is_default() {
        let config = BusConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, BusConfig::default());
    }

    #[test]
    fn test_from_lookup_overrides_endpoint_settings() {
        let config = BusConfig::from_lookup(lookup_from(&[
            ("KAFKA_BROKERS", "k1:9092,k2:9092"),
            ("KAFKA_CLIENT_ID", "annotator"),
            ("KAFKA_GROUP_ID", "annotator-group"),
            ("KAFKA_SSL", "true"),
        ]))
        .unwrap();
        assert_eq!(config.brokers, "k1:9092,k2:9092");
        assert_eq!(config.client_id, "annotator");
        assert_eq!(config.group_id, "annotator-group");
        assert!(config.ssl);
        assert_eq!(config.security_protocol(), "ssl");
    }

    #[test]
    fn test_sasl_requires_both_credentials() {
        let err = BusConfig::from_lookup(lookup_from(&[
            ("KAFKA_SASL_ENABLED", "true"),
            ("KAFKA_SASL_USERNAME", "svc"),
        ]))
        .unwrap_err();
        assert!(matches!(err, BusError::Config(_)));
        assert!(err.to_string().contains("KAFKA_SASL_PASSWORD"));
    }

    #[test]
    fn test_sasl_enabled_sets_protocol() {
        let config = BusConfig::from_lookup(lookup_from(&[
            ("KAFKA_SASL_ENABLED", "true"),
            ("KAFKA_SASL_USERNAME", "svc"),
            ("KAFKA_SASL_PASSWORD", "secret"),
            ("KAFKA_SSL", "true"),
        ]))
        .unwrap();
        assert_eq!(
            config.sasl,
            Some(SaslPlain {
                username: "svc".into(),
                password: "secret".into(),
            })
        );
        assert_eq!(config.security_protocol(), "sasl_ssl");
    }

    #[test]
    fn test_flag_only_accepts_true() {
        assert!(flag(Some("true".into())));
        assert!(flag(Some("TRUE".into())));
        assert!(!flag(Some("1".into())));
        assert!(!flag(Some("yes".into())));
        assert!(!flag(None));
    }

    #[test]
    fn test_validate_rejects_empty_brokers() {
        let config = BusConfig {
            brokers: "  ".into(),
            ..BusConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_retry_budget() {
        let config = BusConfig {
            retry: RetryBudget {
                attempts: 0,
                initial_backoff: Duration::from_millis(100),
            },
            ..BusConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_heartbeat_longer_than_session() {
        let config = BusConfig {
            consumer: ConsumerTuning {
                heartbeat_interval: Duration::from_secs(60),
                ..ConsumerTuning::default()
            },
            ..BusConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "kafka")]
    mod kafka {
        use super::*;

        #[test]
        fn test_producer_client_config() {
            let config = BusConfig::default().to_producer_client_config();
            assert_eq!(config.get("bootstrap.servers"), Some("localhost:9092"));
            assert_eq!(config.get("client.id"), Some("productcenter"));
            assert_eq!(config.get("security.protocol"), Some("plaintext"));
            assert_eq!(config.get("allow.auto.create.topics"), Some("true"));
            assert_eq!(config.get("transaction.timeout.ms"), Some("30000"));
            assert_eq!(config.get("message.timeout.ms"), Some("3000"));
        }

        #[test]
        fn test_consumer_client_config() {
            let config = BusConfig::default().to_consumer_client_config();
            assert_eq!(config.get("group.id"), Some("productcenter-group"));
            assert_eq!(config.get("auto.offset.reset"), Some("latest"));
            assert_eq!(config.get("fetch.wait.max.ms"), Some("1000"));
            assert_eq!(config.get("fetch.max.bytes"), Some("1048576"));
            assert_eq!(config.get("session.timeout.ms"), Some("30000"));
            assert_eq!(config.get("heartbeat.interval.ms"), Some("3000"));
        }

        #[test]
        fn test_sasl_properties_applied() {
            let bus = BusConfig {
                sasl: Some(SaslPlain {
                    username: "svc".into(),
                    password: "secret".into(),
                }),
                ..BusConfig::default()
            };
            let config = bus.to_producer_client_config();
            assert_eq!(config.get("security.protocol"), Some("sasl_plaintext"));
            assert_eq!(config.get("sasl.mechanism"), Some("PLAIN"));
            assert_eq!(config.get("sasl.username"), Some("svc"));
            assert_eq!(config.get("sasl.password"), Some("secret"));
        }
    }
}
