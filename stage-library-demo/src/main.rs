use clap::Parser;
use stage_library_demo::StageLibraryChainBuilder;
use std::{process, time::Duration};
use tracing::error;
use volley::{Runner, VolleyConfiguration, BASE_URL_VAR, TIMEOUT_MS_VAR};

#[derive(Parser, Debug)]
#[command(name = "stage-library-demo")]
#[command(about = "Checks the stage library endpoints of a data collector")]
struct Args {
    /// Base URL of the data collector
    #[arg(long, env = BASE_URL_VAR)]
    base_url: String,

    /// User to log in as
    #[arg(long, env = "VOLLEY_USERNAME", default_value = "admin")]
    username: String,

    /// Password of the user
    #[arg(long, env = "VOLLEY_PASSWORD", default_value = "admin", hide_env_values = true)]
    password: String,

    /// Per-request timeout in milliseconds
    #[arg(long, env = TIMEOUT_MS_VAR, default_value = "30000")]
    timeout_ms: u64,
}

fn main() {
    let args = Args::parse();
    volley::init_logging();

    let mut configuration = VolleyConfiguration::new();
    configuration.set_base_url(args.base_url);
    configuration.set_timeout(Duration::from_millis(args.timeout_ms));

    let chain = StageLibraryChainBuilder::new()
        .with_credentials(args.username, args.password)
        .build();
    let login = chain.login(&configuration.root_session());

    match Runner::new(configuration).run_blocking(vec![login]) {
        Ok(report) => {
            eprintln!("{}", report);
            let code = if !report.misuse.is_empty() {
                2
            } else if report.overall_passed {
                0
            } else {
                1
            };
            process::exit(code);
        }
        Err(e) => {
            error!(error = %e, misuse = e.is_protocol_misuse(), "run aborted");
            eprintln!("Volley Error: {}", e);
            process::exit(2);
        }
    }
}
