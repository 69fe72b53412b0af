#[cfg(test)]
mod fake_collector;

#[cfg(test)]
mod tests {
    use crate::fake_collector;
    use stage_library_demo::StageLibraryChainBuilder;
    use std::time::Duration;
    use volley::{
        volley_test, ChainNode, ChainPath, FailureKind, RequestSpec, Runner, SessionContext,
        VolleyConfiguration,
    };

    fn configure_png(config: &mut VolleyConfiguration) {
        fake_collector::start_once();
        config.set_base_url(fake_collector::base_url("png"));
    }

    fn configure_svg(config: &mut VolleyConfiguration) {
        fake_collector::start_once();
        config.set_base_url(fake_collector::base_url("svg"));
    }

    fn stage_library(scenario: &str) -> RequestSpec {
        StageLibraryChainBuilder::new()
            .with_credentials("admin", "admin")
            .build()
            .login(&SessionContext::new(fake_collector::base_url(scenario)))
    }

    fn run(chains: Vec<RequestSpec>, timeout: Duration) -> (Vec<ChainNode>, volley::RunReport) {
        fake_collector::start_once();
        let mut configuration = VolleyConfiguration::new();
        configuration.set_timeout(timeout);

        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(Runner::new(configuration).run_forest(chains))
            .unwrap()
    }

    #[volley_test("stage library with png icons", configure_png)]
    fn png_stage_library() -> Vec<RequestSpec> {
        vec![stage_library("png")]
    }

    #[volley_test("stage library with svg icons", configure_svg)]
    fn svg_stage_library() -> Vec<RequestSpec> {
        vec![stage_library("svg")]
    }

    #[test]
    fn the_whole_chain_runs_in_order() {
        let (forest, report) = run(vec![stage_library("png")], Duration::from_secs(5));

        assert!(report.overall_passed, "{}", report);
        let paths: Vec<String> = report
            .verdicts
            .iter()
            .map(|verdict| verdict.spec.path.to_string())
            .collect();
        assert_eq!(paths, vec!["0", "0.0", "0.0.0"]);

        let nodes = forest[0].nodes();
        for pair in nodes.windows(2) {
            let (parent, child) = (pair[0], pair[1]);
            assert!(child.dispatched_at >= parent.received_at.unwrap());
        }
        assert!(nodes[1].session.cookie().unwrap().starts_with("JSESSIONID=png-"));
    }

    #[test]
    fn concurrent_chains_keep_their_own_sessions() {
        let (forest, report) = run(
            vec![stage_library("png"), stage_library("svg"), stage_library("png")],
            Duration::from_secs(5),
        );

        assert!(report.overall_passed, "{}", report);
        assert_eq!(report.verdicts.len(), 9);

        let cookies: Vec<String> = forest
            .iter()
            .map(|chain| chain.session.cookie().unwrap().to_string())
            .collect();
        assert!(cookies[0].starts_with("JSESSIONID=png-"));
        assert!(cookies[1].starts_with("JSESSIONID=svg-"));
        assert_ne!(cookies[0], cookies[2]);
    }

    #[test]
    fn a_wrong_icon_type_fails_only_the_icon() {
        let (_, report) = run(vec![stage_library("mismatch")], Duration::from_secs(5));

        assert!(!report.overall_passed);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.path, ChainPath::root(0).child(0).child(0));
        assert_eq!(failures[0].1.kind, FailureKind::AssertionFailure);
        assert_eq!(
            failures[0].1.expectation,
            "header content-type contains 'image/png'"
        );
    }

    #[test]
    fn badly_shaped_definitions_are_all_reported() {
        let (forest, report) = run(vec![stage_library("empty")], Duration::from_secs(5));
        let definitions = &forest[0].children[0];

        assert!(!report.overall_passed);
        assert_eq!(definitions.verdict.failures.len(), 2);
        assert!(definitions.children.is_empty());

        let continuation = definitions.continuation.as_ref().unwrap();
        assert_eq!(continuation.failures[0].kind, FailureKind::MalformedBody);
        assert!(continuation.failures[0].reason.contains("library"));
    }

    #[test]
    fn a_slow_definitions_call_stops_the_chain() {
        let (forest, report) = run(vec![stage_library("slow")], Duration::from_millis(300));
        let login = &forest[0];
        let definitions = &login.children[0];

        assert!(login.verdict.passed());
        assert!(definitions.children.is_empty());
        assert!(!definitions.hook_ran);
        assert_eq!(definitions.verdict.failures.len(), 1);
        assert_eq!(
            definitions.verdict.failures[0].kind,
            FailureKind::NetworkError
        );
        assert_eq!(report.verdicts.len(), 2);
    }

    #[test]
    fn a_failed_login_still_continues_the_chain() {
        let login = StageLibraryChainBuilder::new()
            .with_credentials("admin", "wrong")
            .build()
            .login(&SessionContext::new(fake_collector::base_url("png")));

        let (forest, report) = run(vec![login], Duration::from_secs(5));

        assert!(!report.overall_passed);
        assert!(forest[0].hook_ran);
        assert_eq!(forest[0].verdict.failures[0].reason, "got status 401");

        let definitions = &forest[0].children[0];
        assert!(!definitions.verdict.passed());
        assert!(definitions.children.is_empty());
    }

    #[test]
    fn unreachable_hosts_are_network_errors() {
        let (forest, report) = run(
            vec![RequestSpec::get("http://127.0.0.1:9/login").expect_status(200)],
            Duration::from_secs(5),
        );

        assert!(!report.overall_passed);
        assert_eq!(forest[0].verdict.failures.len(), 1);
        assert_eq!(forest[0].verdict.failures[0].kind, FailureKind::NetworkError);
    }
}
