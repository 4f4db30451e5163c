//! Settings loaded from the environment

use anyhow::{anyhow, Context, Result};
use discovery_api::{BackendConfig, BackendKind, HealthCheckSpec, RegisterOptions};
use discovery_core::WaitPolicy;
use std::str::FromStr;
use std::time::Duration;

/// Output format of the log subscriber
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// A service to resolve on every cycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupTarget {
    pub name: String,
    pub port: Option<u16>,
}

/// How this process announces itself
#[derive(Clone, Debug, PartialEq)]
pub struct SelfRegistration {
    pub address: String,
    pub port: u16,
    pub options: RegisterOptions,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub backend: BackendConfig,
    pub wait: WaitPolicy,
    pub http_timeout: Duration,
    pub lookups: Vec<LookupTarget>,
    pub interval: Duration,
    pub registration: Option<SelfRegistration>,
    pub service_name: Option<String>,
    pub log_format: LogFormat,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build settings from any variable source
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).filter(|value| !value.trim().is_empty());

        let kind = match var("DISCOVERY_BACKEND") {
            Some(kind) => BackendKind::from_str(&kind)?,
            None => BackendKind::default(),
        };
        let backend = BackendConfig::new(kind, var("DISCOVERY_TARGET").unwrap_or_default());

        let defaults = WaitPolicy::default();
        let wait = WaitPolicy {
            timeout: millis(&var, "DISCOVERY_WAIT_TIMEOUT_MS")?.unwrap_or(defaults.timeout),
            max_attempts: number(&var, "DISCOVERY_WAIT_ATTEMPTS")?.unwrap_or(defaults.max_attempts),
            base_delay: millis(&var, "DISCOVERY_WAIT_BASE_MS")?.unwrap_or(defaults.base_delay),
        };

        let lookups = match var("DISCOVERY_LOOKUP") {
            Some(list) => parse_lookups(&list)?,
            None => Vec::new(),
        };

        let registration = match var("DISCOVERY_REGISTER_ADDRESS") {
            Some(address) => {
                let port = number(&var, "DISCOVERY_REGISTER_PORT")?
                    .ok_or_else(|| anyhow!("DISCOVERY_REGISTER_PORT is required with DISCOVERY_REGISTER_ADDRESS"))?;
                let mut options = RegisterOptions::new().tags(split_list(
                    &var("DISCOVERY_REGISTER_TAGS").unwrap_or_default(),
                ));
                if let Some(id) = var("DISCOVERY_REGISTER_ID") {
                    options = options.id(id);
                }
                if let Some(url) = var("DISCOVERY_REGISTER_CHECK_HTTP") {
                    let interval = var("DISCOVERY_REGISTER_CHECK_INTERVAL").unwrap_or_else(|| "10s".to_string());
                    options = options.check(HealthCheckSpec::new().http(url).interval(interval));
                }
                Some(SelfRegistration {
                    address,
                    port,
                    options,
                })
            }
            None => None,
        };

        let log_format = match var("DISCOVERY_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => return Err(anyhow!("unknown DISCOVERY_LOG_FORMAT: {}", other)),
        };

        Ok(Self {
            backend,
            wait,
            http_timeout: millis(&var, "DISCOVERY_HTTP_TIMEOUT_MS")?.unwrap_or(Duration::from_secs(5)),
            lookups,
            interval: number(&var, "DISCOVERY_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(30)),
            registration,
            service_name: var("DISCOVERY_SERVICE_NAME"),
            log_format,
        })
    }
}

fn number<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|value| value.trim().parse::<T>().with_context(|| format!("invalid {}: {}", key, value)))
        .transpose()
}

fn millis<F>(var: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(number::<u64, F>(var, key)?.map(Duration::from_millis))
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `name` or `name:port`, comma separated
fn parse_lookups(list: &str) -> Result<Vec<LookupTarget>> {
    split_list(list)
        .into_iter()
        .map(|entry| match entry.rsplit_once(':') {
            Some((name, port)) => Ok(LookupTarget {
                name: name.to_string(),
                port: Some(port.parse().with_context(|| format!("invalid port in DISCOVERY_LOOKUP entry {}", entry))?),
            }),
            None => Ok(LookupTarget { name: entry, port: None }),
        })
        .collect()
}
