use crate::{
    body::{self, ParsedBody},
    data::Headers,
    error::Error,
    expectation,
    http_client::HttpClient,
    reporter::RunReporter,
    request_spec::{RequestSpec, SpecState},
    session::SessionContext,
    verdict::{ChainPath, Failure, FailureKind, Misuse, SpecIdentity, Verdict},
    volley_configuration::VolleyConfiguration,
};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::time;
use tracing::{debug, info, info_span, warn, Instrument};

/// A dispatched request together with the requests its continuation produced.
#[derive(Debug, Clone)]
pub struct ChainNode {
    pub verdict: Verdict,
    /// Verdict of a continuation that could not read the body, if any.
    pub continuation: Option<Verdict>,
    pub dispatched_at: Instant,
    pub received_at: Option<Instant>,
    /// Snapshot handed to the continuation.
    pub session: SessionContext,
    pub hook_ran: bool,
    pub children: Vec<ChainNode>,
    /// Paths of continuation-produced requests that were declared incorrectly
    /// and never sent.
    pub misdeclared: Vec<ChainPath>,
}

impl ChainNode {
    /// This node and all of its descendants, parents first.
    pub fn nodes(&self) -> Vec<&ChainNode> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.nodes());
        }
        nodes
    }

    pub fn passed(&self) -> bool {
        self.verdict.passed()
            && self.continuation.as_ref().map_or(true, Verdict::passed)
            && self.misdeclared.is_empty()
            && self.children.iter().all(ChainNode::passed)
    }
}

/// Dispatches requests, evaluates their responses and recursively runs the
/// requests produced by their continuations.
///
/// Children are only built once their parent's response has been received and
/// parsed, and siblings run concurrently. Every verdict goes to the shared
/// [`RunReporter`].
#[derive(Debug, Clone)]
pub struct Scheduler {
    client: Arc<dyn HttpClient + Send + Sync>,
    reporter: Arc<RunReporter>,
    timeout: Duration,
    default_headers: Headers,
    root_session: SessionContext,
}

impl Scheduler {
    pub fn new(configuration: &VolleyConfiguration, reporter: Arc<RunReporter>) -> Self {
        Self {
            client: configuration.http_client(),
            reporter,
            timeout: configuration.timeout(),
            default_headers: configuration.default_headers().clone(),
            root_session: configuration.root_session(),
        }
    }

    pub fn reporter(&self) -> &Arc<RunReporter> {
        &self.reporter
    }

    /// Dispatches `spec` as the top-level request of chain number `chain`.
    ///
    /// A spec that is declared incorrectly is recorded as misuse with the
    /// reporter and returned as the error.
    pub async fn dispatch(&self, spec: RequestSpec, chain: usize) -> Result<ChainNode, Error> {
        self.dispatch_at(spec, ChainPath::root(chain), self.root_session.clone())
            .instrument(info_span!("chain", chain))
            .await
    }

    /// Dispatches every top-level chain concurrently and waits for all of them.
    /// Chains whose top-level spec is declared incorrectly are left out of the
    /// forest; the reporter already holds their misuse.
    pub async fn dispatch_all<I: IntoIterator<Item = RequestSpec>>(
        &self,
        specs: I,
    ) -> Result<Vec<ChainNode>, Error> {
        let chains = specs
            .into_iter()
            .enumerate()
            .map(|(chain, spec)| self.dispatch(spec, chain));

        let mut forest = Vec::new();
        for result in join_all(chains).await {
            match result {
                Ok(node) => forest.push(node),
                Err(e) if e.is_protocol_misuse() => {}
                Err(e) => return Err(e),
            }
        }

        Ok(forest)
    }

    fn dispatch_at(
        &self,
        spec: RequestSpec,
        path: ChainPath,
        inherited: SessionContext,
    ) -> BoxFuture<'_, Result<ChainNode, Error>> {
        async move {
            if let Err(e) = spec.claim_dispatch() {
                let identity = SpecIdentity {
                    path,
                    name: spec.name(),
                };
                self.reporter.record_misuse(Misuse::new(identity, &e))?;
                return Err(e);
            }
            self.reporter.admit()?;

            let result = self.run(spec, path, inherited).await;

            self.reporter.release()?;
            result
        }
        .boxed()
    }

    async fn run(
        &self,
        spec: RequestSpec,
        path: ChainPath,
        inherited: SessionContext,
    ) -> Result<ChainNode, Error> {
        let identity = SpecIdentity {
            path: path.clone(),
            name: spec.name(),
        };
        let request = spec.request_data(&self.default_headers);
        let timeout = spec.timeout_override().unwrap_or(self.timeout);

        debug!(spec = %identity, method = %request.method, url = %request.url, "in flight");
        let dispatched_at = Instant::now();
        let outcome = time::timeout(timeout, self.client.send(&request)).await;
        let received_at = Instant::now();
        spec.advance(SpecState::Resolved);

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let reason = e.to_string();
                return self.resolve_unanswered(&spec, identity, dispatched_at, inherited, reason);
            }
            Err(_) => {
                let reason = format!("timed out after {}ms", timeout.as_millis());
                return self.resolve_unanswered(&spec, identity, dispatched_at, inherited, reason);
            }
        };

        let body = body::parse(response.content_type(), &response.body);
        let mut verdict =
            expectation::evaluate(identity.clone(), &response, &body, spec.expectations());
        let session = inherited.derive(&response.headers, spec.session_headers());

        let hook = match spec.hook() {
            Some(hook) => match unusable_body(&body, spec.requires_json()) {
                Some(reason) => {
                    if !verdict.has_failure_of(FailureKind::MalformedBody) {
                        verdict = verdict.with_failure(Failure::new(
                            "body is readable by the continuation",
                            FailureKind::MalformedBody,
                            reason,
                        ));
                    }
                    None
                }
                None => Some(hook.clone()),
            },
            None => None,
        };

        self.report(&verdict, response.status_code)?;

        let mut node = ChainNode {
            verdict,
            continuation: None,
            dispatched_at,
            received_at: Some(received_at),
            session,
            hook_ran: false,
            children: Vec::new(),
            misdeclared: Vec::new(),
        };

        if let Some(hook) = hook {
            spec.advance(SpecState::HookRun);
            node.hook_ran = true;

            let session = node.session.clone();
            match hook(&body, &session) {
                Ok(children) => {
                    debug!(
                        spec = %identity,
                        children = children.len(),
                        "continuation produced requests"
                    );
                    let dispatches = children.into_iter().enumerate().map(|(index, child)| {
                        self.dispatch_at(child, path.child(index), session.clone())
                    });

                    // misdeclared children are already with the reporter
                    for (index, result) in join_all(dispatches).await.into_iter().enumerate() {
                        match result {
                            Ok(child) => node.children.push(child),
                            Err(e) if e.is_protocol_misuse() => {
                                node.misdeclared.push(path.child(index))
                            }
                            Err(e) => return Err(e),
                        }
                    }
                }
                Err(e) => {
                    let continuation = Verdict::new(
                        SpecIdentity {
                            path,
                            name: format!("{} [continuation]", identity.name),
                        },
                        vec![Failure::new(
                            "continuation reads the body",
                            FailureKind::MalformedBody,
                            e.to_string(),
                        )],
                    );
                    warn!(spec = %identity, error = %e, "continuation could not read the body");
                    self.reporter.record(continuation.clone())?;
                    node.continuation = Some(continuation);
                }
            }
        }

        spec.advance(SpecState::Complete);
        Ok(node)
    }

    /// Resolves a request that never produced a response. Its continuation is
    /// not run, so nothing below it is ever built.
    fn resolve_unanswered(
        &self,
        spec: &RequestSpec,
        identity: SpecIdentity,
        dispatched_at: Instant,
        session: SessionContext,
        reason: String,
    ) -> Result<ChainNode, Error> {
        warn!(spec = %identity, %reason, "no response");
        let verdict = Verdict::new(identity, vec![Failure::network(reason)]);
        self.reporter.record(verdict.clone())?;
        spec.advance(SpecState::Complete);

        Ok(ChainNode {
            verdict,
            continuation: None,
            dispatched_at,
            received_at: None,
            session,
            hook_ran: false,
            children: Vec::new(),
            misdeclared: Vec::new(),
        })
    }

    fn report(&self, verdict: &Verdict, status_code: u16) -> Result<(), Error> {
        if verdict.passed() {
            info!(spec = %verdict.spec, status_code, "passed");
        } else {
            for failure in &verdict.failures {
                warn!(spec = %verdict.spec, status_code, %failure, "failed");
            }
        }

        self.reporter.record(verdict.clone())
    }
}

fn unusable_body(body: &ParsedBody, requires_json: bool) -> Option<String> {
    match body {
        ParsedBody::Malformed(reason) => Some(reason.clone()),
        ParsedBody::Json(_) => None,
        other if requires_json => Some(format!("expected a JSON body, got {}", other.kind())),
        _ => None,
    }
}
