use super::*;
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use futures::stream;
use tokio::time::{sleep, timeout};

fn counting_cell(
    starts: Arc<AtomicUsize>,
    feed: impl Fn() -> BoxStream<'static, u32> + Send + Sync + 'static,
) -> ReplayCell<u32> {
    ReplayCell::new("test", Handle::current(), move || {
        starts.fetch_add(1, Ordering::SeqCst);
        feed()
    })
}

fn delayed(values: Vec<(u64, u32)>) -> BoxStream<'static, u32> {
    stream::iter(values)
        .then(|(delay_ms, value)| async move {
            sleep(Duration::from_millis(delay_ms)).await;
            value
        })
        .boxed()
}

#[tokio::test(start_paused = true)]
async fn source_is_not_started_until_first_subscriber() {
    let starts = Arc::new(AtomicUsize::new(0));
    let cell = counting_cell(Arc::clone(&starts), || delayed(vec![(10, 1)]));

    sleep(Duration::from_millis(100)).await;
    assert_eq!(starts.load(Ordering::SeqCst), 0);
    assert_eq!(cell.latest(), None);

    let mut values = cell.subscribe();
    assert_eq!(values.next().await, Some(1));
    assert_eq!(starts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_subscribers_share_one_source() {
    let starts = Arc::new(AtomicUsize::new(0));
    let cell = counting_cell(Arc::clone(&starts), || delayed(vec![(50, 7)]));

    let mut first = cell.subscribe();
    let mut second = cell.subscribe();
    let mut third = cell.subscribe();
    assert_eq!(cell.subscriber_count(), 3);

    assert_eq!(first.next().await, Some(7));
    assert_eq!(second.next().await, Some(7));
    assert_eq!(third.next().await, Some(7));
    assert_eq!(starts.load(Ordering::SeqCst), 1);
    assert_eq!(cell.connections(), 1);
}

#[tokio::test(start_paused = true)]
async fn late_subscriber_gets_latest_value_without_refetch() {
    let starts = Arc::new(AtomicUsize::new(0));
    let cell = counting_cell(Arc::clone(&starts), || delayed(vec![(10, 1), (10, 2)]));

    let mut early = cell.subscribe();
    assert_eq!(early.next().await, Some(1));
    assert_eq!(early.next().await, Some(2));

    let mut late = cell.subscribe();
    assert_eq!(late.next().await, Some(2));
    assert_eq!(starts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn completed_source_is_replayed_not_restarted() {
    let starts = Arc::new(AtomicUsize::new(0));
    let cell = counting_cell(Arc::clone(&starts), || delayed(vec![(10, 5)]));

    {
        let mut values = cell.subscribe();
        assert_eq!(values.next().await, Some(5));
        // let the forwarding task observe the end of the feed
        sleep(Duration::from_millis(1)).await;
    }
    assert!(cell.is_completed());
    assert_eq!(cell.subscriber_count(), 0);

    let mut again = cell.subscribe();
    assert_eq!(again.next().await, Some(5));
    assert_eq!(starts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn last_subscriber_leaving_releases_pending_source() {
    let starts = Arc::new(AtomicUsize::new(0));
    let cell = counting_cell(Arc::clone(&starts), || delayed(vec![(1_000, 9)]));

    let mut values = cell.subscribe();
    assert!(timeout(Duration::from_millis(100), values.next())
        .await
        .is_err());
    drop(values);
    assert_eq!(cell.subscriber_count(), 0);

    sleep(Duration::from_millis(2_000)).await;
    assert_eq!(cell.latest(), None, "aborted source must not publish");
    assert!(!cell.is_completed());

    let mut resubscribed = cell.subscribe();
    assert_eq!(resubscribed.next().await, Some(9));
    assert_eq!(starts.load(Ordering::SeqCst), 2);
    assert_eq!(cell.connections(), 2);
}

#[tokio::test(start_paused = true)]
async fn one_subscriber_leaving_keeps_source_for_the_rest() {
    let starts = Arc::new(AtomicUsize::new(0));
    let cell = counting_cell(Arc::clone(&starts), || delayed(vec![(100, 3)]));

    let first = cell.subscribe();
    let mut second = cell.subscribe();
    drop(first);

    assert_eq!(second.next().await, Some(3));
    assert_eq!(starts.load(Ordering::SeqCst), 1);
    assert_eq!(second.cell_label(), "test");
}

#[tokio::test(start_paused = true)]
async fn burst_of_values_reaches_every_subscriber_in_order() {
    let starts = Arc::new(AtomicUsize::new(0));
    let cell = counting_cell(Arc::clone(&starts), || {
        stream::iter([1, 2, 3]).chain(stream::pending()).boxed()
    });

    let mut first = cell.subscribe();
    let mut second = cell.subscribe();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(cell.latest(), Some(3));

    for expected in [1, 2, 3] {
        assert_eq!(first.next().await, Some(expected));
        assert_eq!(second.next().await, Some(expected));
    }
    assert!(timeout(Duration::from_millis(100), first.next())
        .await
        .is_err());

    let mut late = cell.subscribe();
    assert_eq!(late.next().await, Some(3));
    assert!(timeout(Duration::from_millis(100), late.next())
        .await
        .is_err());
    assert_eq!(starts.load(Ordering::SeqCst), 1);
}
