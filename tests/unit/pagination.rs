//! Unit tests for station pagination

use asos_downloader::downloader::config::PAGE_PAUSE;
use asos_downloader::downloader::rate_limit::RecordingSleeper;
use asos_downloader::fetcher::asos_parser::ApiEnvelope;
use asos_downloader::fetcher::pagination::{PageOutcome, StationPaginator};
use asos_downloader::fetcher::retry::RetryController;
use asos_downloader::fetcher::{FetcherError, FetcherResult, PageRequest, PageSource};
use asos_downloader::StationId;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

use crate::support::mock_source::MockAsos;

fn q1() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2021, 3, 31).unwrap(),
    )
}

fn paginator(source: Arc<dyn PageSource>, sleeper: Arc<RecordingSleeper>) -> StationPaginator {
    StationPaginator::new(RetryController::new(source, sleeper.clone()), sleeper)
}

#[tokio::test]
async fn test_total_count_split_over_pages_yields_all_records_in_order() {
    for total in [1usize, 49, 50, 51, 2160, 2184] {
        let source = Arc::new(MockAsos::new(total));
        let sleeper = Arc::new(RecordingSleeper::new());
        let (start, end) = q1();

        let fetch = paginator(source.clone(), sleeper.clone())
            .fetch_station(&StationId::parse("108").unwrap(), start, end)
            .await;

        let expected_pages = total.div_ceil(50);
        assert_eq!(fetch.records.len(), total);
        assert_eq!(fetch.outcome, PageOutcome::TotalReached);
        assert_eq!(fetch.pages as usize, expected_pages);
        assert_eq!(fetch.total_count, Some(total as u64));
        assert_eq!(source.call_count(), expected_pages);
        assert_eq!(sleeper.count(), expected_pages - 1);

        // Page order preserved
        for (n, record) in fetch.records.iter().enumerate() {
            assert_eq!(record["tm"], format!("20210101 #{n:05}"));
        }

        let pages: Vec<u32> = source.calls().iter().map(|r| r.page_no).collect();
        assert_eq!(pages, (1..=expected_pages as u32).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_zero_total_is_end_of_data() {
    let source = Arc::new(MockAsos::new(0));
    let sleeper = Arc::new(RecordingSleeper::new());
    let (start, end) = q1();

    let fetch = paginator(source, sleeper.clone())
        .fetch_station(&StationId::parse("99").unwrap(), start, end)
        .await;

    assert!(fetch.records.is_empty());
    assert_eq!(fetch.outcome, PageOutcome::EndOfData);
    assert_eq!(sleeper.count(), 0);
}

/// Serves full pages, then fails page 3 with a given error
struct FailOnPage {
    page: u32,
    error: Option<FetcherError>,
}

#[async_trait]
impl PageSource for FailOnPage {
    async fn fetch_page(&self, request: &PageRequest) -> FetcherResult<ApiEnvelope> {
        if request.page_no == self.page {
            return match &self.error {
                Some(error) => Err(error.clone()),
                None => Ok(ApiEnvelope::without_body("LIMITED_NUMBER_OF_SERVICE_REQUESTS_EXCEEDS_ERROR")),
            };
        }
        MockAsos::new(500).fetch_page(request).await
    }
}

#[tokio::test]
async fn test_exhausted_retries_keep_partial_records() {
    let source = Arc::new(FailOnPage {
        page: 3,
        error: Some(FetcherError::HttpStatus(502)),
    });
    let sleeper = Arc::new(RecordingSleeper::new());
    let (start, end) = q1();

    let fetch = paginator(source, sleeper)
        .fetch_station(&StationId::parse("108").unwrap(), start, end)
        .await;

    assert_eq!(fetch.records.len(), 100);
    assert_eq!(fetch.outcome, PageOutcome::RetryExhausted);
    assert!(!fetch.outcome.is_clean());
}

#[tokio::test]
async fn test_missing_body_is_api_failure() {
    let source = Arc::new(FailOnPage { page: 2, error: None });
    let sleeper = Arc::new(RecordingSleeper::new());
    let (start, end) = q1();

    let fetch = paginator(source, sleeper)
        .fetch_station(&StationId::parse("108").unwrap(), start, end)
        .await;

    assert_eq!(fetch.records.len(), 50);
    assert_eq!(
        fetch.outcome,
        PageOutcome::ApiFailure("LIMITED_NUMBER_OF_SERVICE_REQUESTS_EXCEEDS_ERROR".into())
    );
}

#[tokio::test]
async fn test_fatal_and_malformed_stop_pagination() {
    let (start, end) = q1();

    let fatal = Arc::new(FailOnPage {
        page: 1,
        error: Some(FetcherError::Connection("reset".into())),
    });
    let sleeper = Arc::new(RecordingSleeper::new());
    let fetch = paginator(fatal, sleeper.clone())
        .fetch_station(&StationId::parse("108").unwrap(), start, end)
        .await;
    assert!(fetch.records.is_empty());
    assert!(matches!(fetch.outcome, PageOutcome::Fatal(_)));
    assert_eq!(sleeper.count(), 0);

    let malformed = Arc::new(FailOnPage {
        page: 2,
        error: Some(FetcherError::Parse("xml".into())),
    });
    let fetch = paginator(malformed, Arc::new(RecordingSleeper::new()))
        .fetch_station(&StationId::parse("108").unwrap(), start, end)
        .await;
    assert_eq!(fetch.records.len(), 50);
    assert_eq!(fetch.outcome, PageOutcome::Malformed("xml".into()));
}

#[tokio::test]
async fn test_page_pause_between_pages() {
    let source = Arc::new(MockAsos::new(120));
    let sleeper = Arc::new(RecordingSleeper::new());
    let (start, end) = q1();

    paginator(source, sleeper.clone())
        .fetch_station(&StationId::parse("108").unwrap(), start, end)
        .await;

    assert_eq!(sleeper.delays(), vec![PAGE_PAUSE, PAGE_PAUSE]);
}
