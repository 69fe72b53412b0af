use crate::{
    error::Error,
    verdict::{Failure, Misuse, SpecIdentity, Verdict},
};
use std::{fmt::Display, sync::Mutex};
use tracing::{debug, error};

#[derive(Debug, Default)]
struct ReporterState {
    verdicts: Vec<Verdict>,
    misuse: Vec<Misuse>,
    admitted: usize,
    outstanding: usize,
}

/// Collects the verdicts of every request in a run.
///
/// Completions from concurrent chains all funnel through one mutex. The
/// reporter also counts requests that were admitted for dispatch but whose
/// subtree has not finished, so a report can only be produced once the whole
/// forest is complete.
#[derive(Debug, Default)]
pub struct RunReporter {
    state: Mutex<ReporterState>,
}

impl RunReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, verdict: Verdict) -> Result<(), Error> {
        debug!(spec = %verdict.spec, passed = verdict.passed(), "verdict recorded");
        self.state.lock()?.verdicts.push(verdict);
        Ok(())
    }

    /// Records a request that could not be dispatched. It is logged right
    /// away and the rest of the run carries on.
    pub fn record_misuse(&self, misuse: Misuse) -> Result<(), Error> {
        error!(spec = %misuse.spec, error = %misuse.error, "request is declared incorrectly");
        self.state.lock()?.misuse.push(misuse);
        Ok(())
    }

    /// Registers a request whose subtree is about to run.
    pub(crate) fn admit(&self) -> Result<(), Error> {
        let mut state = self.state.lock()?;
        state.admitted += 1;
        state.outstanding += 1;
        Ok(())
    }

    /// Marks a request's subtree as finished.
    pub(crate) fn release(&self) -> Result<(), Error> {
        let mut state = self.state.lock()?;
        state.outstanding = state.outstanding.saturating_sub(1);
        Ok(())
    }

    pub fn outstanding(&self) -> Result<usize, Error> {
        Ok(self.state.lock()?.outstanding)
    }

    pub fn is_complete(&self) -> Result<bool, Error> {
        let state = self.state.lock()?;
        Ok(state.admitted > 0 && state.outstanding == 0)
    }

    pub fn finalize(&self) -> Result<RunReport, Error> {
        let state = self.state.lock()?;

        if (state.admitted == 0 && state.misuse.is_empty()) || state.outstanding > 0 {
            return Err(Error::RunNotComplete(state.outstanding));
        }

        let mut verdicts = state.verdicts.clone();
        verdicts.sort_by(|a, b| a.spec.cmp(&b.spec));
        let mut misuse = state.misuse.clone();
        misuse.sort_by(|a, b| a.spec.cmp(&b.spec));

        Ok(RunReport {
            overall_passed: misuse.is_empty() && verdicts.iter().all(Verdict::passed),
            verdicts,
            misuse,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub overall_passed: bool,
    /// Every verdict of the run, ordered by position in the chain forest.
    pub verdicts: Vec<Verdict>,
    /// Requests that were declared incorrectly and never sent.
    pub misuse: Vec<Misuse>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = (&SpecIdentity, &Failure)> {
        self.verdicts.iter().flat_map(|verdict| {
            verdict
                .failures
                .iter()
                .map(move |failure| (&verdict.spec, failure))
        })
    }

    pub fn failed_count(&self) -> usize {
        self.verdicts.iter().filter(|verdict| !verdict.passed()).count()
    }
}

impl Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for verdict in &self.verdicts {
            writeln!(f, "{}", verdict)?;
        }
        for misuse in &self.misuse {
            writeln!(f, "{}", misuse)?;
        }

        write!(
            f,
            "{}: {} request(s), {} failed",
            if self.overall_passed { "PASSED" } else { "FAILED" },
            self.verdicts.len(),
            self.failed_count()
        )?;

        if !self.misuse.is_empty() {
            write!(f, ", {} declared incorrectly", self.misuse.len())?;
        }

        Ok(())
    }
}
