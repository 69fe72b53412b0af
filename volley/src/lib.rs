mod body;
mod data;
mod error;
mod expectation;
mod http_client;
mod reporter;
mod request_spec;
mod runner;
mod scheduler;
mod session;
mod util;
mod verdict;
mod volley_configuration;

pub use body::{parse as parse_body, BodyValue, ParsedBody, ShapeError};
pub use data::{Headers, RequestData, ResponseData};
pub use error::Error;
pub use expectation::{evaluate, BodyPredicate, Expectation};
pub use http_client::{HttpClient, HyperHttpClient};
pub use reporter::{RunReport, RunReporter};
pub use request_spec::{ContinuationHook, RequestSpec, SpecState};
pub use runner::{init_logging, Runner};
pub use scheduler::{ChainNode, Scheduler};
pub use session::SessionContext;
pub use verdict::{ChainPath, Failure, FailureKind, Misuse, SpecIdentity, Verdict};
pub use volley_codegen::volley_test;
pub use volley_configuration::{VolleyConfiguration, BASE_URL_VAR, TIMEOUT_MS_VAR};

pub use async_trait::async_trait;
pub use hyper::body::Bytes;
pub use regex::Regex;
