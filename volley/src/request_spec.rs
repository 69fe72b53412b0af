use crate::{
    body::{BodyValue, ParsedBody, ShapeError},
    data::{Headers, RequestData},
    error::Error,
    expectation::Expectation,
    session::SessionContext,
};
use hyper::{body::Bytes, Method, Uri};
use regex::Regex;
use std::{
    fmt::{self, Debug},
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

pub type ContinuationHook =
    Arc<dyn Fn(&ParsedBody, &SessionContext) -> Result<Vec<RequestSpec>, ShapeError> + Send + Sync>;

/// Dispatch state of a request. Clones of a spec observe the same state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SpecState {
    Built,
    /// Sent and waiting for the response.
    InFlight,
    /// Response received (or given up on) and evaluated.
    Resolved,
    /// The continuation ran and its requests are being dispatched.
    HookRun,
    Complete,
}

impl SpecState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SpecState::Built,
            1 => SpecState::InFlight,
            2 => SpecState::Resolved,
            3 => SpecState::HookRun,
            _ => SpecState::Complete,
        }
    }
}

/// Declaration of one HTTP call, its expectations and what to do with its
/// response.
///
/// A `RequestSpec` is dispatched at most once. Clones share the same dispatch
/// state, so dispatching a clone of an already dispatched spec fails with
/// [`Error::AlreadyDispatched`].
#[derive(Clone)]
pub struct RequestSpec {
    name: Option<String>,
    method: String,
    url: String,
    headers: Headers,
    body: Option<Bytes>,
    expectations: Vec<Expectation>,
    session_headers: Vec<String>,
    hook: Option<ContinuationHook>,
    surplus_hooks: usize,
    requires_json: bool,
    timeout: Option<Duration>,
    state: Arc<AtomicU8>,
}

impl RequestSpec {
    pub fn new<S1: Into<String>, S2: Into<String>>(method: S1, url: S2) -> Self {
        Self {
            name: None,
            method: method.into(),
            url: url.into(),
            headers: Headers::new(),
            body: None,
            expectations: Vec::new(),
            session_headers: Vec::new(),
            hook: None,
            surplus_hooks: 0,
            requires_json: false,
            timeout: None,
            state: Arc::new(AtomicU8::new(SpecState::Built as u8)),
        }
    }

    pub fn get<S: Into<String>>(url: S) -> Self {
        Self::new("GET", url)
    }

    pub fn post<S: Into<String>>(url: S) -> Self {
        Self::new("POST", url)
    }

    pub fn put<S: Into<String>>(url: S) -> Self {
        Self::new("PUT", url)
    }

    pub fn delete<S: Into<String>>(url: S) -> Self {
        Self::new("DELETE", url)
    }

    /// Label used in reports. Defaults to the method and URL.
    pub fn named<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn header<S1: AsRef<str>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn expect(mut self, expectation: Expectation) -> Self {
        self.expectations.push(expectation);
        self
    }

    pub fn expect_status(self, status_code: u16) -> Self {
        self.expect(Expectation::StatusEquals(status_code))
    }

    pub fn expect_header<S1: Into<String>, S2: Into<String>>(self, name: S1, value: S2) -> Self {
        self.expect(Expectation::HeaderEquals {
            name: name.into(),
            value: value.into(),
        })
    }

    pub fn expect_header_contains<S1: Into<String>, S2: Into<String>>(
        self,
        name: S1,
        substring: S2,
    ) -> Self {
        self.expect(Expectation::HeaderContains {
            name: name.into(),
            substring: substring.into(),
        })
    }

    pub fn expect_header_matches<S: Into<String>>(self, name: S, pattern: Regex) -> Self {
        self.expect(Expectation::HeaderMatches {
            name: name.into(),
            pattern,
        })
    }

    pub fn expect_body<S, F>(self, description: S, predicate: F) -> Self
    where
        S: Into<String>,
        F: Fn(&ParsedBody) -> Result<bool, ShapeError> + Send + Sync + 'static,
    {
        self.expect(Expectation::body_shape(description, predicate))
    }

    /// Like [`expect_body`](Self::expect_body), but the body must be JSON.
    pub fn expect_json<S, F>(self, description: S, predicate: F) -> Self
    where
        S: Into<String>,
        F: Fn(BodyValue<'_>) -> Result<bool, ShapeError> + Send + Sync + 'static,
    {
        self.expect_body(description, move |body| predicate(body.as_json()?))
    }

    /// Designates a response header whose value is carried into the session
    /// snapshot handed to this request's continuation.
    pub fn capture_session_header<S: AsRef<str>>(mut self, name: S) -> Self {
        let name = name.as_ref().to_lowercase();
        if !self.session_headers.contains(&name) {
            self.session_headers.push(name);
        }
        self
    }

    /// Overrides the configured request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attaches the continuation run once the response has been received and
    /// parsed. Only one continuation may be attached.
    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ParsedBody, &SessionContext) -> Result<Vec<RequestSpec>, ShapeError>
            + Send
            + Sync
            + 'static,
    {
        if self.hook.is_some() {
            self.surplus_hooks += 1;
        } else {
            self.hook = Some(Arc::new(hook));
        }
        self
    }

    /// Attaches a continuation that needs a JSON body. A response without a
    /// usable JSON body suppresses the continuation.
    pub fn after_json<F>(self, hook: F) -> Self
    where
        F: Fn(BodyValue<'_>, &SessionContext) -> Result<Vec<RequestSpec>, ShapeError>
            + Send
            + Sync
            + 'static,
    {
        let mut spec = self.after(move |body, session| hook(body.as_json()?, session));
        spec.requires_json = true;
        spec
    }

    pub fn name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.method, self.url))
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn expectations(&self) -> &[Expectation] {
        &self.expectations
    }

    pub fn session_headers(&self) -> &[String] {
        &self.session_headers
    }

    pub fn hook(&self) -> Option<&ContinuationHook> {
        self.hook.as_ref()
    }

    pub fn requires_json(&self) -> bool {
        self.requires_json
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn state(&self) -> SpecState {
        SpecState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_dispatched(&self) -> bool {
        self.state() != SpecState::Built
    }

    pub(crate) fn advance(&self, state: SpecState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Checks the declaration, then moves the spec from `Built` to `InFlight`.
    pub(crate) fn claim_dispatch(&self) -> Result<(), Error> {
        if self.surplus_hooks > 0 {
            return Err(Error::DuplicateHook(self.name()));
        }

        Method::from_bytes(self.method.as_bytes())
            .map_err(|_| Error::InvalidMethod(self.method.clone()))?;
        self.url
            .parse::<Uri>()
            .map_err(|_| Error::InvalidUri(self.url.clone()))?;

        let built = SpecState::Built as u8;
        let in_flight = SpecState::InFlight as u8;
        if self
            .state
            .compare_exchange(built, in_flight, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::AlreadyDispatched(self.name()));
        }

        Ok(())
    }

    /// The request as sent, with `defaults` filling in headers the spec does
    /// not set itself.
    pub(crate) fn request_data(&self, defaults: &Headers) -> RequestData {
        let mut headers = Headers::new();
        for (name, value) in defaults.iter() {
            if !self.headers.contains(name) {
                headers.append(name, value);
            }
        }
        for (name, value) in self.headers.iter() {
            headers.append(name, value);
        }

        RequestData {
            method: self.method.clone(),
            url: self.url.clone(),
            headers,
            body: self.body.clone(),
        }
    }
}

impl Debug for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpec")
            .field("name", &self.name())
            .field("headers", &self.headers)
            .field("expectations", &self.expectations)
            .field("session_headers", &self.session_headers)
            .field("has_hook", &self.hook.is_some())
            .field("state", &self.state())
            .finish()
    }
}
