use crate::{
    data::Headers,
    error::Error,
    http_client::{HttpClient, HyperHttpClient},
    session::SessionContext,
};
use std::{env, sync::Arc, time::Duration};

pub const BASE_URL_VAR: &str = "VOLLEY_BASE_URL";
pub const TIMEOUT_MS_VAR: &str = "VOLLEY_TIMEOUT_MS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct VolleyConfiguration {
    base_url: Option<String>,
    timeout: Duration,
    default_headers: Headers,
    http_client: Option<Arc<dyn HttpClient + Send + Sync>>,
}

impl VolleyConfiguration {
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            default_headers: Headers::new(),
            http_client: None,
        }
    }

    /// Reads `VOLLEY_BASE_URL` and `VOLLEY_TIMEOUT_MS` from the environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, Error> {
        let mut configuration = Self::new();

        if let Some(base_url) = lookup(BASE_URL_VAR) {
            configuration.set_base_url(base_url);
        }

        if let Some(timeout) = lookup(TIMEOUT_MS_VAR) {
            let millis = timeout.trim().parse::<u64>().map_err(|_| {
                Error::InvalidConfiguration(format!(
                    "{} should be a number of milliseconds, got '{}'",
                    TIMEOUT_MS_VAR, timeout
                ))
            })?;
            configuration.set_timeout(Duration::from_millis(millis));
        }

        Ok(configuration)
    }

    pub fn set_base_url<S: Into<String>>(&mut self, base_url: S) {
        self.base_url = Some(base_url.into());
    }

    pub fn base_url(&self) -> Option<&String> {
        self.base_url.as_ref()
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Header sent with every request that does not set it itself.
    pub fn add_default_header<S1: AsRef<str>, S2: Into<String>>(&mut self, name: S1, value: S2) {
        self.default_headers.insert(name, value);
    }

    pub fn default_headers(&self) -> &Headers {
        &self.default_headers
    }

    pub fn http_client(&self) -> Arc<dyn HttpClient + Send + Sync> {
        self.http_client
            .clone()
            .unwrap_or_else(|| Arc::new(HyperHttpClient::new()))
    }

    pub fn set_http_client(&mut self, http_client: Arc<dyn HttpClient + Send + Sync>) {
        self.http_client = Some(http_client);
    }

    /// The snapshot every top-level chain starts from.
    pub fn root_session(&self) -> SessionContext {
        SessionContext::new(self.base_url.clone().unwrap_or_default())
    }
}

impl Default for VolleyConfiguration {
    fn default() -> Self {
        Self::new()
    }
}
