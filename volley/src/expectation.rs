use crate::{
    body::{ParsedBody, ShapeError},
    data::ResponseData,
    verdict::{Failure, FailureKind, SpecIdentity, Verdict},
};
use regex::Regex;
use std::{
    fmt::{self, Debug, Display},
    sync::Arc,
};

const WELL_FORMED_BODY: &str = "body is well-formed";

pub type BodyPredicate = Arc<dyn Fn(&ParsedBody) -> Result<bool, ShapeError> + Send + Sync>;

#[derive(Clone)]
pub enum Expectation {
    StatusEquals(u16),
    HeaderEquals {
        name: String,
        value: String,
    },
    HeaderContains {
        name: String,
        substring: String,
    },
    HeaderMatches {
        name: String,
        pattern: Regex,
    },
    BodyShape {
        description: String,
        predicate: BodyPredicate,
    },
}

impl Expectation {
    pub fn body_shape<S, F>(description: S, predicate: F) -> Self
    where
        S: Into<String>,
        F: Fn(&ParsedBody) -> Result<bool, ShapeError> + Send + Sync + 'static,
    {
        Expectation::BodyShape {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    fn check(&self, response: &ResponseData, body: &ParsedBody) -> Option<Failure> {
        match self {
            Expectation::StatusEquals(code) => (response.status_code != *code).then(|| {
                self.failure(
                    FailureKind::AssertionFailure,
                    format!("got status {}", response.status_code),
                )
            }),
            Expectation::HeaderEquals { name, value } => {
                self.check_header(response, name, |actual| actual == value)
            }
            Expectation::HeaderContains { name, substring } => {
                self.check_header(response, name, |actual| actual.contains(substring.as_str()))
            }
            Expectation::HeaderMatches { name, pattern } => {
                self.check_header(response, name, |actual| pattern.is_match(actual))
            }
            Expectation::BodyShape { predicate, .. } => match predicate(body) {
                Ok(true) => None,
                Ok(false) => Some(self.failure(
                    FailureKind::AssertionFailure,
                    "predicate returned false",
                )),
                Err(e) => Some(self.failure(FailureKind::MalformedBody, e.to_string())),
            },
        }
    }

    fn check_header<F: Fn(&str) -> bool>(
        &self,
        response: &ResponseData,
        name: &str,
        accept: F,
    ) -> Option<Failure> {
        let values: Vec<&str> = response.headers.get_all(name).collect();

        if values.is_empty() {
            return Some(self.failure(FailureKind::AssertionFailure, "header is missing"));
        }

        if values.iter().any(|value| accept(value)) {
            None
        } else {
            Some(self.failure(
                FailureKind::AssertionFailure,
                format!("got '{}'", values.join(", ")),
            ))
        }
    }

    fn failure<S: Into<String>>(&self, kind: FailureKind, reason: S) -> Failure {
        Failure::new(self.to_string(), kind, reason)
    }
}

impl Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::StatusEquals(code) => write!(f, "status is {}", code),
            Expectation::HeaderEquals { name, value } => {
                write!(f, "header {} is '{}'", name.to_lowercase(), value)
            }
            Expectation::HeaderContains { name, substring } => {
                write!(f, "header {} contains '{}'", name.to_lowercase(), substring)
            }
            Expectation::HeaderMatches { name, pattern } => {
                write!(f, "header {} matches /{}/", name.to_lowercase(), pattern)
            }
            Expectation::BodyShape { description, .. } => write!(f, "body {}", description),
        }
    }
}

impl Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expectation({})", self)
    }
}

/// Checks every expectation against the response. Nothing short-circuits:
/// the verdict lists each violated expectation in declaration order.
///
/// A body that could not be parsed is a single `MalformedBody` failure, taking
/// the place of the first body check. It is reported even when no body check
/// was declared, and no predicate ever sees it.
pub fn evaluate(
    spec: SpecIdentity,
    response: &ResponseData,
    body: &ParsedBody,
    expectations: &[Expectation],
) -> Verdict {
    let malformed = match body {
        ParsedBody::Malformed(reason) => Some(reason),
        _ => None,
    };
    let mut malformed_reported = false;
    let mut failures = Vec::new();

    for expectation in expectations {
        match (expectation, malformed) {
            (Expectation::BodyShape { .. }, Some(reason)) => {
                if !malformed_reported {
                    failures.push(expectation.failure(FailureKind::MalformedBody, reason.clone()));
                    malformed_reported = true;
                }
            }
            _ => failures.extend(expectation.check(response, body)),
        }
    }

    if let (Some(reason), false) = (malformed, malformed_reported) {
        failures.push(Failure::new(
            WELL_FORMED_BODY,
            FailureKind::MalformedBody,
            reason.clone(),
        ));
    }

    Verdict::new(spec, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{body, data::Headers, verdict::ChainPath};
    use hyper::body::Bytes;

    fn identity() -> SpecIdentity {
        SpecIdentity {
            path: ChainPath::root(0),
            name: String::from("definitions"),
        }
    }

    fn response(status_code: u16, content_type: &str, body: &'static str) -> ResponseData {
        ResponseData {
            status_code,
            headers: vec![("Content-Type", content_type)].into_iter().collect::<Headers>(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    fn run(response: &ResponseData, expectations: &[Expectation]) -> Verdict {
        let parsed = body::parse(response.content_type(), &response.body);
        evaluate(identity(), response, &parsed, expectations)
    }

    fn definitions_checks() -> Vec<Expectation> {
        vec![
            Expectation::StatusEquals(200),
            Expectation::body_shape("has exactly one pipeline", |body| {
                Ok(body.as_json()?.at("pipeline")?.len()? == 1)
            }),
            Expectation::body_shape("has more than one stage", |body| {
                Ok(body.as_json()?.at("stages")?.len()? > 1)
            }),
        ]
    }

    #[test]
    fn header_containment_ignores_name_case_and_parameters() {
        let verdict = run(
            &response(200, "text/html; charset=utf-8", "<html></html>"),
            &[
                Expectation::StatusEquals(200),
                Expectation::HeaderContains {
                    name: String::from("content-type"),
                    substring: String::from("text/html"),
                },
            ],
        );

        assert!(verdict.passed());
        assert!(verdict.failures.is_empty());
    }

    #[test]
    fn one_satisfied_and_one_violated_yield_one_failure() {
        let verdict = run(
            &response(200, "text/html", ""),
            &[
                Expectation::StatusEquals(200),
                Expectation::HeaderEquals {
                    name: String::from("Content-Type"),
                    value: String::from("application/json"),
                },
            ],
        );

        assert!(!verdict.passed());
        assert_eq!(verdict.failures.len(), 1);
        assert_eq!(verdict.failures[0].kind, FailureKind::AssertionFailure);
        assert_eq!(verdict.failures[0].reason, "got 'text/html'");
    }

    #[test]
    fn well_shaped_definitions_pass() {
        let verdict = run(
            &response(
                200,
                "application/json",
                r#"{"pipeline":[{}],"stages":[{"name":"a"},{"name":"b"}]}"#,
            ),
            &definitions_checks(),
        );

        assert!(verdict.passed());
    }

    #[test]
    fn every_violated_shape_is_reported() {
        let verdict = run(
            &response(200, "application/json", r#"{"pipeline":[],"stages":[{}]}"#),
            &definitions_checks(),
        );

        assert!(!verdict.passed());
        assert_eq!(verdict.failures.len(), 2);
        assert_eq!(verdict.failures[0].expectation, "body has exactly one pipeline");
        assert_eq!(verdict.failures[1].expectation, "body has more than one stage");
    }

    #[test]
    fn malformed_body_is_a_body_shape_failure() {
        let verdict = run(
            &response(500, "application/json", "{\"pipeline\":"),
            &definitions_checks(),
        );

        assert_eq!(verdict.failures.len(), 2);
        assert_eq!(verdict.failures[0].kind, FailureKind::AssertionFailure);
        assert_eq!(verdict.failures[1].kind, FailureKind::MalformedBody);
        assert_eq!(verdict.failures[1].expectation, "body has exactly one pipeline");
    }

    #[test]
    fn malformed_body_fails_without_any_body_check() {
        let verdict = run(
            &response(200, "application/json", "{\"stages\":"),
            &[Expectation::StatusEquals(200)],
        );

        assert!(!verdict.passed());
        assert_eq!(verdict.failures.len(), 1);
        assert_eq!(verdict.failures[0].kind, FailureKind::MalformedBody);
        assert_eq!(verdict.failures[0].expectation, "body is well-formed");
    }

    #[test]
    fn shape_mismatch_inside_a_predicate_is_malformed_body() {
        let verdict = run(
            &response(200, "application/json", r#"{"pipeline":{}}"#),
            &[Expectation::body_shape("has stages", |body| {
                Ok(body.as_json()?.at("stages")?.len()? > 0)
            })],
        );

        assert_eq!(verdict.failures.len(), 1);
        assert_eq!(verdict.failures[0].kind, FailureKind::MalformedBody);
        assert_eq!(verdict.failures[0].reason, "at $.stages: field is missing");
    }

    #[test]
    fn missing_and_mismatching_headers_fail() {
        let verdict = run(
            &response(200, "image/svg+xml", "<svg/>"),
            &[
                Expectation::HeaderContains {
                    name: String::from("X-Missing"),
                    substring: String::from("x"),
                },
                Expectation::HeaderMatches {
                    name: String::from("content-type"),
                    pattern: Regex::new("^image/png$").unwrap(),
                },
            ],
        );

        assert_eq!(verdict.failures.len(), 2);
        assert_eq!(verdict.failures[0].reason, "header is missing");
        assert_eq!(
            verdict.failures[1].expectation,
            "header content-type matches /^image/png$/"
        );
    }
}
