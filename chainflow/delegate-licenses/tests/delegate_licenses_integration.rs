use delegate_licenses::errors::DelegationError;
use delegate_licenses::handler::{SimulatedBackend, delegate_licenses};
use delegate_licenses::models::{
    DelegationProgress, DelegationResult, DelegationStrategy, SimulationFixture,
};

const OWNER: &str = "0xAbC0000000000000000000000000000000000001";
const DELEGATEE: &str = "0xDeF0000000000000000000000000000000000002";
const CHAIN_ID: u64 = 629274;

fn tokens(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn backend(fixture: SimulationFixture) -> SimulatedBackend {
    SimulatedBackend::new(OWNER, CHAIN_ID, fixture)
}

async fn run(
    backend: &SimulatedBackend,
    token_ids: &[String],
) -> Result<
    (
        delegate_licenses::models::DelegationOutcome,
        Vec<DelegationProgress>,
    ),
    DelegationError,
> {
    let mut reports: Vec<DelegationProgress> = Vec::new();
    let outcome = delegate_licenses(
        backend,
        OWNER,
        DELEGATEE,
        token_ids,
        CHAIN_ID,
        |progress, _results: &[DelegationResult]| reports.push(progress),
    )
    .await?;
    Ok((outcome, reports))
}

#[tokio::test]
async fn aggregated_success_marks_every_token_with_shared_hash() {
    let backend = backend(SimulationFixture::default());
    let (outcome, reports) = run(&backend, &tokens(&["1", "2", "3"])).await.unwrap();

    assert_eq!(outcome.strategy, DelegationStrategy::Aggregated);
    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.succeeded, 3);
    assert_eq!(outcome.failed, 0);

    let first_hash = outcome.results[0].hash.clone().unwrap();
    for result in &outcome.results {
        assert!(result.success);
        assert_eq!(result.hash.as_deref(), Some(first_hash.as_str()));
    }
    assert_eq!(reports.last().unwrap().percent, 100);
}

#[tokio::test]
async fn aggregated_revert_fails_every_token_together() {
    let backend = backend(SimulationFixture {
        revert_aggregate: true,
        ..SimulationFixture::default()
    });
    let (outcome, _) = run(&backend, &tokens(&["1", "2"])).await.unwrap();

    assert_eq!(outcome.strategy, DelegationStrategy::Aggregated);
    assert_eq!(outcome.succeeded, 0);
    assert_eq!(outcome.failed, 2);
    for result in &outcome.results {
        assert!(!result.success);
        assert!(result.hash.is_some());
        assert!(result.error.as_deref().unwrap().contains("reverted"));
    }
}

#[tokio::test]
async fn unsupported_aggregate_falls_back_to_sequential() {
    let backend = backend(SimulationFixture {
        aggregate_supported: false,
        ..SimulationFixture::default()
    });
    let (outcome, reports) = run(&backend, &tokens(&["1", "2", "3"])).await.unwrap();

    assert_eq!(outcome.strategy, DelegationStrategy::Sequential);
    assert_eq!(outcome.succeeded, 3);
    // One progress report per token, monotonic to 100.
    assert_eq!(reports.len(), 3);
    for window in reports.windows(2) {
        assert!(window[1].completed > window[0].completed);
    }
    assert_eq!(reports.last().unwrap().percent, 100);

    // Sequential hashes are per token, not shared.
    assert_ne!(outcome.results[0].hash, outcome.results[1].hash);
}

#[tokio::test]
async fn failed_aggregate_submission_falls_back_to_sequential() {
    let backend = backend(SimulationFixture {
        fail_aggregate_submit: true,
        ..SimulationFixture::default()
    });
    let (outcome, _) = run(&backend, &tokens(&["7", "8"])).await.unwrap();

    assert_eq!(outcome.strategy, DelegationStrategy::Sequential);
    assert_eq!(outcome.succeeded, 2);
}

#[tokio::test]
async fn already_delegated_token_fails_alone_in_sequential_mode() {
    // The bad token fails the aggregated simulation, routing the whole
    // batch to sequential where each token resolves on its own.
    let backend = backend(SimulationFixture {
        already_delegated: vec!["2".to_string()],
        ..SimulationFixture::default()
    });
    let (outcome, _) = run(&backend, &tokens(&["1", "2", "3"])).await.unwrap();

    assert_eq!(outcome.strategy, DelegationStrategy::Sequential);
    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.failed, 1);

    let failed = &outcome.results[1];
    assert_eq!(failed.token_id, "2");
    assert!(!failed.success);
    assert_eq!(
        failed.error.as_deref(),
        Some("License 2 is already delegated")
    );
    // Processing continued past the failure.
    assert!(outcome.results[2].success);
}

#[tokio::test]
async fn wrong_wallet_blocks_before_any_transaction() {
    let backend = SimulatedBackend::new(
        "0x9990000000000000000000000000000000000999",
        CHAIN_ID,
        SimulationFixture::default(),
    );
    let err = delegate_licenses(
        &backend,
        OWNER,
        DELEGATEE,
        &tokens(&["1"]),
        CHAIN_ID,
        |_, _| {},
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DelegationError::WrongWallet { .. }));
}

#[tokio::test]
async fn wrong_network_is_fatal_to_the_action() {
    let backend = SimulatedBackend::new(OWNER, 1, SimulationFixture::default());
    let err = delegate_licenses(
        &backend,
        OWNER,
        DELEGATEE,
        &tokens(&["1"]),
        CHAIN_ID,
        |_, _| {},
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DelegationError::WrongNetwork(_)));
}

#[tokio::test]
async fn invalid_delegatee_and_empty_token_list_are_rejected() {
    let backend = backend(SimulationFixture::default());

    let err = delegate_licenses(&backend, OWNER, "nope", &tokens(&["1"]), CHAIN_ID, |_, _| {})
        .await
        .unwrap_err();
    assert!(matches!(err, DelegationError::InvalidRequest(_)));

    let err = delegate_licenses(&backend, OWNER, DELEGATEE, &[], CHAIN_ID, |_, _| {})
        .await
        .unwrap_err();
    assert!(matches!(err, DelegationError::InvalidRequest(_)));
}

#[tokio::test]
async fn owner_check_is_case_insensitive() {
    let backend = backend(SimulationFixture::default());
    let outcome = delegate_licenses(
        &backend,
        &OWNER.to_lowercase(),
        DELEGATEE,
        &tokens(&["1"]),
        CHAIN_ID,
        |_, _| {},
    )
    .await
    .unwrap();
    assert_eq!(outcome.succeeded, 1);
}
