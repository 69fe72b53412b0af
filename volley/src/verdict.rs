use std::fmt::Display;

/// Position of a request inside the run: the index of its top-level chain
/// followed by the index of each continuation-produced request below it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainPath(Vec<usize>);

impl ChainPath {
    pub fn root(index: usize) -> Self {
        ChainPath(vec![index])
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        ChainPath(path)
    }

    pub fn depth(&self) -> usize {
        self.0.len() - 1
    }

    pub fn chain(&self) -> usize {
        self.0[0]
    }

    pub fn is_ancestor_of(&self, other: &ChainPath) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }
}

impl Display for ChainPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let segments: Vec<String> = self.0.iter().map(usize::to_string).collect();
        write!(f, "{}", segments.join("."))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecIdentity {
    pub path: ChainPath,
    pub name: String,
}

impl Display for SpecIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.path, self.name)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FailureKind {
    /// The transport failed or the response did not arrive in time.
    NetworkError,
    /// The response did not satisfy a declared expectation.
    AssertionFailure,
    /// A structured body could not be parsed or did not have the expected shape.
    MalformedBody,
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::NetworkError => write!(f, "network error"),
            FailureKind::AssertionFailure => write!(f, "assertion failure"),
            FailureKind::MalformedBody => write!(f, "malformed body"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Description of the violated expectation.
    pub expectation: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl Failure {
    pub fn new<S1: Into<String>, S2: Into<String>>(
        expectation: S1,
        kind: FailureKind,
        reason: S2,
    ) -> Self {
        Self {
            expectation: expectation.into(),
            kind,
            reason: reason.into(),
        }
    }

    pub fn network<S: Into<String>>(reason: S) -> Self {
        Self::new("response received", FailureKind::NetworkError, reason)
    }
}

impl Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.expectation, self.kind, self.reason)
    }
}

/// Outcome of one dispatched request. A verdict fails exactly when it
/// carries at least one failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub spec: SpecIdentity,
    pub failures: Vec<Failure>,
}

impl Verdict {
    pub fn new(spec: SpecIdentity, failures: Vec<Failure>) -> Self {
        Self { spec, failures }
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn with_failure(mut self, failure: Failure) -> Self {
        self.failures.push(failure);
        self
    }

    pub fn has_failure_of(&self, kind: FailureKind) -> bool {
        self.failures.iter().any(|failure| failure.kind == kind)
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            if self.passed() { "PASS" } else { "FAIL" },
            self.spec
        )?;

        for failure in &self.failures {
            write!(f, "\n    - {}", failure)?;
        }

        Ok(())
    }
}

/// A request that was never sent because its declaration is wrong, such as a
/// second hook, an invalid URL or a spec dispatched twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Misuse {
    pub spec: SpecIdentity,
    pub error: String,
}

impl Misuse {
    pub fn new<E: Display>(spec: SpecIdentity, error: &E) -> Self {
        Self {
            spec,
            error: error.to_string(),
        }
    }
}

impl Display for Misuse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MISUSE {}: {}", self.spec, self.error)
    }
}
