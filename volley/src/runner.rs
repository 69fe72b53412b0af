use crate::{
    error::Error,
    reporter::{RunReport, RunReporter},
    request_spec::RequestSpec,
    scheduler::{ChainNode, Scheduler},
    volley_configuration::VolleyConfiguration,
};
use std::sync::{Arc, Once};
use tokio::runtime::Builder;
use tracing_subscriber::EnvFilter;

static INITIALIZE_LOGGING: Once = Once::new();

/// Installs the stderr `tracing` subscriber. `RUST_LOG` overrides the
/// default `volley=info` filter. Only the first call has an effect.
pub fn init_logging() {
    INITIALIZE_LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("volley=info"));

        if let Err(e) = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
        {
            eprintln!("Volley logging error: {}", e);
        }
    });
}

/// Runs a forest of chains and produces the final report.
#[derive(Debug, Clone)]
pub struct Runner {
    configuration: VolleyConfiguration,
}

impl Runner {
    pub fn new(configuration: VolleyConfiguration) -> Self {
        Self { configuration }
    }

    pub fn configuration(&self) -> &VolleyConfiguration {
        &self.configuration
    }

    /// Runs every chain to completion. Requests that are declared incorrectly
    /// end up in [`RunReport::misuse`] without stopping the other chains.
    pub async fn run<I: IntoIterator<Item = RequestSpec>>(
        &self,
        chains: I,
    ) -> Result<RunReport, Error> {
        self.run_forest(chains).await.map(|(_, report)| report)
    }

    /// Like [`run`](Self::run), also returning the tree of every chain.
    pub async fn run_forest<I: IntoIterator<Item = RequestSpec>>(
        &self,
        chains: I,
    ) -> Result<(Vec<ChainNode>, RunReport), Error> {
        let reporter = Arc::new(RunReporter::new());
        let scheduler = Scheduler::new(&self.configuration, reporter.clone());

        let forest = scheduler.dispatch_all(chains).await?;
        let report = reporter.finalize()?;

        Ok((forest, report))
    }

    /// Drives the run to completion on a single-threaded runtime.
    pub fn run_blocking<I: IntoIterator<Item = RequestSpec>>(
        &self,
        chains: I,
    ) -> Result<RunReport, Error> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(self.run(chains))
    }
}
