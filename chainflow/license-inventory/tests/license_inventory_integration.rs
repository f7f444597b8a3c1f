use async_trait::async_trait;
use license_inventory::errors::InventoryError;
use license_inventory::handler::{FixtureOwnershipSource, InventoryFetcher, OwnershipSource};
use license_inventory::models::FetchProgress;

const OWNER: &str = "0xAbC0000000000000000000000000000000000001";

fn token_ids(count: usize) -> Vec<String> {
    (1..=count).map(|i| i.to_string()).collect()
}

struct FailingCountSource;

#[async_trait]
impl OwnershipSource for FailingCountSource {
    async fn token_count(&self, _owner: &str) -> Result<u64, InventoryError> {
        Err(InventoryError::Onchain("balanceOf call failed".to_string()))
    }

    async fn token_by_index(&self, _owner: &str, _index: u64) -> Result<String, InventoryError> {
        unreachable!("count query fails first")
    }
}

#[tokio::test]
async fn empty_inventory_completes_at_full_progress() {
    let fetcher = InventoryFetcher::new(FixtureOwnershipSource::new(Vec::new(), Vec::new()), 50);
    let mut reports: Vec<FetchProgress> = Vec::new();

    let outcome = fetcher
        .fetch_licenses(OWNER, |progress, _| reports.push(progress))
        .await
        .unwrap();

    assert_eq!(outcome.total, 0);
    assert!(outcome.licenses.is_empty());
    assert!(!outcome.from_cache);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].percent, 100);
}

#[tokio::test]
async fn batched_fetch_drops_failed_indices_and_reaches_full_progress() {
    let source = FixtureOwnershipSource::new(token_ids(7), vec![4]);
    let fetcher = InventoryFetcher::new(source, 3);
    let mut reports: Vec<FetchProgress> = Vec::new();

    let outcome = fetcher
        .fetch_licenses(OWNER, |progress, _| reports.push(progress))
        .await
        .unwrap();

    assert_eq!(outcome.total, 7);
    assert_eq!(outcome.loaded, 6);
    assert_eq!(outcome.dropped, 1);
    assert_eq!(outcome.licenses.len(), 6);

    // One report per batch: ceil(7 / 3) = 3, monotonic, ending at 100.
    assert_eq!(reports.len(), 3);
    for window in reports.windows(2) {
        assert!(window[1].percent >= window[0].percent);
        assert!(window[1].scanned >= window[0].scanned);
    }
    assert_eq!(reports.last().unwrap().percent, 100);
}

#[tokio::test]
async fn partial_results_are_visible_between_batches() {
    let source = FixtureOwnershipSource::new(token_ids(10), Vec::new());
    let fetcher = InventoryFetcher::new(source, 4);
    let mut partial_lengths: Vec<usize> = Vec::new();

    let outcome = fetcher
        .fetch_licenses(OWNER, |_, partial| partial_lengths.push(partial.len()))
        .await
        .unwrap();

    assert_eq!(outcome.loaded, 10);
    assert_eq!(partial_lengths, vec![4, 8, 10]);
}

#[tokio::test]
async fn second_fetch_is_served_from_cache() {
    let source = FixtureOwnershipSource::new(token_ids(5), Vec::new());
    let fetcher = InventoryFetcher::new(source, 2);

    let first = fetcher.fetch_licenses(OWNER, |_, _| {}).await.unwrap();
    assert!(!first.from_cache);

    let mut reports: Vec<FetchProgress> = Vec::new();
    // Case-varied owner resolves to the same cache entry.
    let second = fetcher
        .fetch_licenses(&OWNER.to_uppercase().replace("0X", "0x"), |progress, _| {
            reports.push(progress)
        })
        .await
        .unwrap();

    assert!(second.from_cache);
    assert_eq!(second.licenses.len(), 5);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].percent, 100);
}

#[tokio::test]
async fn clearing_the_cache_forces_a_refetch() {
    let source = FixtureOwnershipSource::new(token_ids(3), Vec::new());
    let fetcher = InventoryFetcher::new(source, 2);

    let _ = fetcher.fetch_licenses(OWNER, |_, _| {}).await.unwrap();
    assert!(fetcher.cache().cached_at(OWNER).is_some());

    fetcher.cache().clear(OWNER);
    let again = fetcher.fetch_licenses(OWNER, |_, _| {}).await.unwrap();
    assert!(!again.from_cache);
}

#[tokio::test]
async fn failed_count_query_is_the_single_aggregate_error() {
    let fetcher = InventoryFetcher::new(FailingCountSource, 10);
    let err = fetcher.fetch_licenses(OWNER, |_, _| {}).await.unwrap_err();
    assert!(matches!(err, InventoryError::CountQuery(_)));
}

#[tokio::test]
async fn blank_owner_is_rejected() {
    let fetcher = InventoryFetcher::new(FixtureOwnershipSource::default(), 10);
    let err = fetcher.fetch_licenses("  ", |_, _| {}).await.unwrap_err();
    assert!(matches!(err, InventoryError::InvalidRequest(_)));
}
