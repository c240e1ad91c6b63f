#[cfg(test)]
mod tests {
    use crate::{
        memory::{MemoryDestination, MemorySource, expected_image},
        utils::{fast_settings, transfer, transfer_with_cancel},
    };
    use engine_config::settings::{FailurePolicy, ReadStrategy, SettingsError};
    use engine_core::metrics::Metrics;
    use engine_processing::{
        error::TransferError,
        orchestrator::{RunState, TransferOrchestrator},
    };
    use model::records::{normalized::NormalizedRecord, raw::RawRecord};
    use std::{collections::HashSet, sync::Arc, time::Duration};
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    fn sorted(mut rows: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
        rows.sort_by(|a, b| (&a.part1, &a.part2).cmp(&(&b.part1, &b.part2)));
        rows
    }

    // 25 rows, write batch 10, sequential: batches of 10, 10, 5 in source order.
    #[tokio::test]
    async fn test_sequential_copy_is_exact_and_ordered() {
        let source = Arc::new(MemorySource::sequential(25));
        let destination = Arc::new(MemoryDestination::new());
        let settings = fast_settings()
            .source_batch_size(10)
            .write_batch_size(10)
            .build()
            .unwrap();

        let progress = transfer(&source, &destination, &settings).await.unwrap();

        assert_eq!(progress.rows_read, 25);
        assert_eq!(progress.rows_written, 25);
        assert_eq!(progress.batches_attempted, 3);
        assert_eq!(progress.batches_committed, 3);
        assert!(progress.is_complete_copy());
        assert!(progress.finished_at.is_some());
        assert_eq!(destination.commits(), vec![(1, 10), (2, 10), (3, 5)]);

        let rows: Vec<RawRecord> = (1..=25)
            .map(|id| RawRecord::new(id, format!("a{id}_b{id}")))
            .collect();
        assert_eq!(destination.rows(), expected_image(&rows, "_"));
    }

    #[tokio::test]
    async fn test_split_semantics_reach_destination() {
        let source = Arc::new(MemorySource::new(vec![
            RawRecord::new(7, "foo_bar_baz"),
            RawRecord::new(8, "nodelimiter"),
            RawRecord::new(9, "a_"),
            RawRecord::new(10, "_b"),
        ]));
        let destination = Arc::new(MemoryDestination::new());
        let settings = fast_settings().build().unwrap();

        transfer(&source, &destination, &settings).await.unwrap();

        assert_eq!(
            destination.rows(),
            vec![
                NormalizedRecord::new("foo", "bar"),
                NormalizedRecord::new("nodelimiter", ""),
                NormalizedRecord::new("a", ""),
                NormalizedRecord::new("", "b"),
            ]
        );
    }

    #[tokio::test]
    async fn test_custom_delimiter() {
        let source = Arc::new(MemorySource::new(vec![RawRecord::new(1, "left|right|x")]));
        let destination = Arc::new(MemoryDestination::new());
        let settings = fast_settings().delimiter("|").build().unwrap();

        transfer(&source, &destination, &settings).await.unwrap();
        assert_eq!(destination.rows(), vec![NormalizedRecord::new("left", "right")]);
    }

    // Batch sizes never exceed the configured size, independent of read size.
    #[tokio::test]
    async fn test_write_batches_are_independent_of_read_chunks() {
        let source = Arc::new(MemorySource::sequential(103));
        let destination = Arc::new(MemoryDestination::new());
        let settings = fast_settings()
            .source_batch_size(7)
            .write_batch_size(20)
            .build()
            .unwrap();

        transfer(&source, &destination, &settings).await.unwrap();

        let commits = destination.commits();
        assert_eq!(commits.len(), 6);
        assert!(commits.iter().all(|(_, rows)| *rows <= 20));
        assert_eq!(commits.last(), Some(&(6, 3)));
        assert_eq!(destination.rows().len(), 103);
    }

    #[tokio::test]
    async fn test_empty_source_writes_nothing() {
        let source = Arc::new(MemorySource::sequential(0));
        let destination = Arc::new(MemoryDestination::new());
        let settings = fast_settings().build().unwrap();

        let progress = transfer(&source, &destination, &settings).await.unwrap();
        assert_eq!(progress.rows_read, 0);
        assert_eq!(progress.batches_attempted, 0);
        assert!(destination.attempts().is_empty());
    }

    // Batch 2 of 3 fails in sequential mode: batch 1 stays committed, batch 3
    // is never attempted.
    #[tokio::test]
    async fn test_abort_on_write_failure_reports_partial_transfer() {
        let source = Arc::new(MemorySource::sequential(25));
        let destination = Arc::new(MemoryDestination::new().fail_on(2));
        let settings = fast_settings()
            .source_batch_size(10)
            .write_batch_size(10)
            .build()
            .unwrap();

        let err = transfer(&source, &destination, &settings)
            .await
            .unwrap_err();

        let (progress, cause) = match err {
            TransferError::PartialTransfer { progress, cause } => (progress, cause),
            other => panic!("expected PartialTransfer, got {other:?}"),
        };
        assert_eq!(progress.rows_written, 10);
        assert_eq!(progress.batches_committed, 1);
        assert_eq!(progress.batches_attempted, 2);
        assert!(progress.last_error.is_some());
        assert!(matches!(*cause, TransferError::WriteFailure { seq: 2, first_id: 11, last_id: 20, .. }));
        assert_eq!(destination.attempts(), vec![1, 2]);
        assert_eq!(destination.rows().len(), 10);
    }

    #[tokio::test]
    async fn test_first_batch_failure_is_not_partial() {
        let source = Arc::new(MemorySource::sequential(25));
        let destination = Arc::new(MemoryDestination::new().fail_on(1));
        let settings = fast_settings()
            .source_batch_size(10)
            .write_batch_size(10)
            .build()
            .unwrap();

        let err = transfer(&source, &destination, &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::WriteFailure { seq: 1, .. }));
        assert!(err.progress().is_none());
    }

    #[tokio::test]
    async fn test_best_effort_skips_failed_batch_and_continues() {
        let source = Arc::new(MemorySource::sequential(25));
        let destination = Arc::new(MemoryDestination::new().fail_on(2));
        let settings = fast_settings()
            .source_batch_size(10)
            .write_batch_size(10)
            .failure_policy(FailurePolicy::BestEffort)
            .build()
            .unwrap();

        let progress = transfer(&source, &destination, &settings).await.unwrap();

        assert_eq!(progress.rows_read, 25);
        assert_eq!(progress.rows_written, 15);
        assert_eq!(progress.batches_skipped, 1);
        assert_eq!(progress.rows_skipped, 10);
        assert_eq!(progress.unexplained_gap(), 0);
        assert!(!progress.is_complete_copy());
        assert!(
            progress
                .last_error
                .as_deref()
                .is_some_and(|e| e.contains("batch #2"))
        );
        assert_eq!(destination.attempts(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_transient_write_failures_are_retried() {
        let source = Arc::new(MemorySource::sequential(30));
        let destination = Arc::new(MemoryDestination::new().flaky_on(2, 2));
        let settings = fast_settings()
            .source_batch_size(10)
            .write_batch_size(10)
            .max_retries(3)
            .build()
            .unwrap();

        let progress = transfer(&source, &destination, &settings).await.unwrap();

        assert_eq!(progress.rows_written, 30);
        assert_eq!(destination.attempts(), vec![1, 2, 2, 2, 3]);
        assert_eq!(destination.rows().len(), 30);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_the_batch() {
        let source = Arc::new(MemorySource::sequential(10));
        let destination = Arc::new(MemoryDestination::new().flaky_on(1, 5));
        let settings = fast_settings().max_retries(2).build().unwrap();

        let err = transfer(&source, &destination, &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::WriteFailure { seq: 1, .. }));
        assert_eq!(destination.attempts(), vec![1, 1, 1]);
    }

    // A timed-out insert that actually committed is retried: the destination
    // ends up with duplicates, never with missing rows.
    #[tokio::test]
    async fn test_retry_after_ambiguous_commit_is_at_least_once() {
        let source = Arc::new(MemorySource::sequential(25));
        let destination = Arc::new(MemoryDestination::new().ambiguous_on(2));
        let settings = fast_settings()
            .source_batch_size(10)
            .write_batch_size(10)
            .build()
            .unwrap();

        let progress = transfer(&source, &destination, &settings).await.unwrap();

        assert_eq!(progress.rows_written, 25);
        let rows = destination.rows();
        assert_eq!(rows.len(), 35);
        let distinct: HashSet<_> = rows.iter().collect();
        assert_eq!(distinct.len(), 25);
        assert_eq!(destination.attempts(), vec![1, 2, 2, 3]);
    }

    #[tokio::test]
    async fn test_no_duplicates_without_failures() {
        let source = Arc::new(MemorySource::sequential(500));
        let destination = Arc::new(MemoryDestination::new());
        let settings = fast_settings()
            .source_batch_size(64)
            .write_batch_size(50)
            .concurrency_limit(4)
            .build()
            .unwrap();

        transfer(&source, &destination, &settings).await.unwrap();

        let rows = destination.rows();
        let distinct: HashSet<_> = rows.iter().collect();
        assert_eq!(rows.len(), 500);
        assert_eq!(distinct.len(), 500);
    }

    #[tokio::test]
    async fn test_concurrency_limit_is_never_exceeded() {
        let source = Arc::new(MemorySource::sequential(120));
        let destination =
            Arc::new(MemoryDestination::new().with_delay(Duration::from_millis(15)));
        let settings = fast_settings()
            .source_batch_size(40)
            .write_batch_size(5)
            .concurrency_limit(3)
            .build()
            .unwrap();
        let metrics = Metrics::new("concurrency");

        let mut orchestrator =
            TransferOrchestrator::new(source.clone(), destination.clone(), &settings)
                .unwrap()
                .with_metrics(metrics.clone());
        let progress = orchestrator.run().await.unwrap();

        assert_eq!(progress.rows_written, 120);
        assert!(destination.peak_in_flight() <= 3);
        assert!(metrics.peak_in_flight() <= 3);
        assert!(metrics.peak_in_flight() >= 2);
        assert_eq!(metrics.in_flight(), 0);

        let expected = sorted(expected_image(
            &(1..=120)
                .map(|id| RawRecord::new(id, format!("a{id}_b{id}")))
                .collect::<Vec<_>>(),
            "_",
        ));
        assert_eq!(sorted(destination.rows()), expected);
    }

    #[tokio::test]
    async fn test_sequential_mode_writes_one_batch_at_a_time() {
        let source = Arc::new(MemorySource::sequential(50));
        let destination =
            Arc::new(MemoryDestination::new().with_delay(Duration::from_millis(5)));
        let settings = fast_settings().write_batch_size(10).build().unwrap();

        transfer(&source, &destination, &settings).await.unwrap();

        assert_eq!(destination.peak_in_flight(), 1);
        let seqs: Vec<u64> = destination.commits().iter().map(|(seq, _)| *seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_concurrent_abort_drains_in_flight_writes() {
        let source = Arc::new(MemorySource::sequential(100));
        let destination = Arc::new(
            MemoryDestination::new()
                .with_delay(Duration::from_millis(10))
                .fail_on(3),
        );
        let settings = fast_settings()
            .source_batch_size(100)
            .write_batch_size(10)
            .concurrency_limit(4)
            .build()
            .unwrap();

        let err = transfer(&source, &destination, &settings)
            .await
            .unwrap_err();

        let progress = err.progress().cloned().unwrap();
        assert!(matches!(err.root_cause(), TransferError::WriteFailure { seq: 3, .. }));
        // Every attempted batch finished: committed, or the one that failed.
        assert_eq!(progress.batches_attempted, progress.batches_committed + 1);
        assert!(progress.batches_attempted < 10);
        assert_eq!(progress.rows_written as usize, destination.rows().len());
    }

    // Batch 1 fails while page 2 is still loading: the failure is seen before
    // the next batch would start, so nothing else is read or written.
    #[tokio::test]
    async fn test_abort_stops_before_next_dispatch_after_failure() {
        let source = Arc::new(
            MemorySource::sequential(50).with_fetch_delay(Duration::from_millis(20)),
        );
        let destination = Arc::new(MemoryDestination::new().fail_on(1));
        let settings = fast_settings()
            .source_batch_size(10)
            .write_batch_size(10)
            .concurrency_limit(4)
            .build()
            .unwrap();

        let err = transfer(&source, &destination, &settings)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::WriteFailure { seq: 1, .. }));
        assert_eq!(destination.attempts(), vec![1]);
        assert!(destination.commits().is_empty());
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_panicked_write_is_skipped_with_its_rows() {
        let source = Arc::new(MemorySource::sequential(30));
        let destination = Arc::new(MemoryDestination::new().panic_on(2));
        let settings = fast_settings()
            .source_batch_size(10)
            .write_batch_size(10)
            .failure_policy(FailurePolicy::BestEffort)
            .build()
            .unwrap();

        let progress = transfer(&source, &destination, &settings).await.unwrap();

        assert_eq!(progress.rows_read, 30);
        assert_eq!(progress.rows_written, 20);
        assert_eq!(progress.batches_skipped, 1);
        assert_eq!(progress.rows_skipped, 10);
        assert_eq!(progress.unexplained_gap(), 0);
        let last_error = progress.last_error.unwrap_or_default();
        assert!(last_error.contains("batch #2 (ids 11..=20)"), "{last_error}");
    }

    #[tokio::test]
    async fn test_panicked_write_aborts_with_batch_identity() {
        let source = Arc::new(MemorySource::sequential(30));
        let destination = Arc::new(MemoryDestination::new().panic_on(2));
        let settings = fast_settings()
            .source_batch_size(10)
            .write_batch_size(10)
            .build()
            .unwrap();

        let err = transfer(&source, &destination, &settings)
            .await
            .unwrap_err();

        assert_eq!(err.progress().map(|p| p.rows_written), Some(10));
        assert!(matches!(
            err.root_cause(),
            TransferError::WriteFailure {
                seq: 2,
                first_id: 11,
                last_id: 20,
                ..
            }
        ));
        assert_eq!(destination.attempts(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_streamed_mode_matches_paginated_mode() {
        let rows: Vec<RawRecord> = (1..=200u64)
            .filter(|id| id % 3 != 0)
            .map(|id| RawRecord::new(id * 10, format!("s{id}_t{id}_u")))
            .collect();

        let mut images = Vec::new();
        for strategy in [ReadStrategy::Paginated, ReadStrategy::Streamed] {
            let source = Arc::new(MemorySource::new(rows.clone()));
            let destination = Arc::new(MemoryDestination::new());
            let settings = fast_settings()
                .read_strategy(strategy)
                .source_batch_size(16)
                .write_batch_size(25)
                .build()
                .unwrap();

            let progress = transfer(&source, &destination, &settings).await.unwrap();
            assert_eq!(progress.rows_read, rows.len() as u64);
            if strategy == ReadStrategy::Streamed {
                assert_eq!(source.streams_opened(), 1);
                assert_eq!(source.fetches(), 0);
            }
            images.push(destination.rows());
        }

        assert_eq!(images[0], images[1]);
        assert_eq!(images[0], expected_image(&rows, "_"));
    }

    // The source disappears on the third page: the two batches already sealed
    // are committed and reported as partial progress.
    #[tokio::test]
    async fn test_source_failure_mid_run() {
        let source = Arc::new(MemorySource::sequential(50).fail_from_fetch(3));
        let destination = Arc::new(MemoryDestination::new());
        let settings = fast_settings()
            .source_batch_size(10)
            .write_batch_size(10)
            .build()
            .unwrap();

        let err = transfer(&source, &destination, &settings)
            .await
            .unwrap_err();

        let (progress, cause) = match err {
            TransferError::PartialTransfer { progress, cause } => (progress, cause),
            other => panic!("expected PartialTransfer, got {other:?}"),
        };
        assert_eq!(progress.rows_written, 20);
        assert!(matches!(*cause, TransferError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_source_failure_before_any_commit() {
        let source = Arc::new(MemorySource::sequential(50).fail_from_fetch(1));
        let destination = Arc::new(MemoryDestination::new());
        let settings = fast_settings().build().unwrap();

        let err = transfer(&source, &destination, &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::SourceUnavailable { .. }));
        assert!(destination.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_stream_failure_is_not_retried() {
        let source = Arc::new(MemorySource::sequential(100).fail_stream_after(2));
        let destination = Arc::new(MemoryDestination::new());
        let settings = fast_settings()
            .read_strategy(ReadStrategy::Streamed)
            .source_batch_size(10)
            .write_batch_size(10)
            .build()
            .unwrap();

        let err = transfer(&source, &destination, &settings)
            .await
            .unwrap_err();

        assert!(matches!(
            err.root_cause(),
            TransferError::SourceUnavailable { .. }
        ));
        assert_eq!(source.streams_opened(), 1);
        assert_eq!(err.progress().map(|p| p.rows_written), Some(20));
    }

    #[tokio::test]
    async fn test_row_limit_and_restart_point() {
        let source = Arc::new(MemorySource::sequential(100));
        let destination = Arc::new(MemoryDestination::new());
        let settings = fast_settings()
            .source_batch_size(10)
            .write_batch_size(10)
            .start_after_id(Some(40))
            .row_limit(Some(25))
            .build()
            .unwrap();

        let progress = transfer(&source, &destination, &settings).await.unwrap();

        assert_eq!(progress.rows_read, 25);
        assert_eq!(progress.rows_written, 25);
        let rows = destination.rows();
        assert_eq!(rows.first(), Some(&NormalizedRecord::new("a41", "b41")));
        assert_eq!(rows.last(), Some(&NormalizedRecord::new("a65", "b65")));
    }

    #[tokio::test]
    async fn test_null_text_is_counted_as_unmappable() {
        let source = Arc::new(MemorySource::new(vec![
            RawRecord::new(1, "a_b"),
            RawRecord::null(2),
            RawRecord::new(3, "c_d"),
            RawRecord::null(4),
        ]));
        let destination = Arc::new(MemoryDestination::new());
        let settings = fast_settings().build().unwrap();

        let progress = transfer(&source, &destination, &settings).await.unwrap();

        assert_eq!(progress.rows_read, 4);
        assert_eq!(progress.rows_written, 2);
        assert_eq!(progress.rows_unmappable, 2);
        assert_eq!(progress.unexplained_gap(), 0);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let source = Arc::new(MemorySource::sequential(10));
        let destination = Arc::new(MemoryDestination::new());
        let settings = fast_settings().build().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = transfer_with_cancel(&source, &destination, &settings, cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Cancelled { .. }));
        assert_eq!(source.fetches(), 0);
        assert!(destination.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_run_drains_and_stops_reading() {
        let cancel = CancellationToken::new();
        let source = Arc::new(MemorySource::sequential(100));
        let destination = Arc::new(MemoryDestination::new().cancel_after(1, cancel.clone()));
        let settings = fast_settings()
            .source_batch_size(10)
            .write_batch_size(10)
            .build()
            .unwrap();

        let err = transfer_with_cancel(&source, &destination, &settings, cancel)
            .await
            .unwrap_err();

        let progress = match err {
            TransferError::Cancelled { progress } => progress,
            other => panic!("expected Cancelled, got {other:?}"),
        };
        assert!(progress.rows_written >= 10);
        assert!(progress.rows_written < 100);
        assert_eq!(progress.batches_attempted, progress.batches_committed);
        assert_eq!(progress.rows_written as usize, destination.rows().len());
    }

    #[tokio::test]
    async fn test_orchestrator_runs_once() {
        let source = Arc::new(MemorySource::sequential(5));
        let destination = Arc::new(MemoryDestination::new());
        let settings = fast_settings().build().unwrap();

        let mut orchestrator =
            TransferOrchestrator::new(source.clone(), destination.clone(), &settings).unwrap();
        assert_eq!(orchestrator.state(), RunState::Idle);
        orchestrator.run().await.unwrap();
        assert_eq!(orchestrator.state(), RunState::Completed);

        assert!(matches!(
            orchestrator.run().await,
            Err(TransferError::InvalidRequest(_))
        ));
        assert_eq!(destination.rows().len(), 5);
    }

    #[test]
    fn test_invalid_settings_are_rejected_before_io() {
        assert!(matches!(
            fast_settings().write_batch_size(40_000).build(),
            Err(SettingsError::InvalidRequest(_))
        ));
        assert!(matches!(
            fast_settings().delimiter("").build(),
            Err(SettingsError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_run_logs_summary_and_skipped_batches() {
        let source = Arc::new(MemorySource::sequential(30));
        let destination = Arc::new(MemoryDestination::new().fail_on(2));
        let settings = fast_settings()
            .write_batch_size(10)
            .failure_policy(FailurePolicy::BestEffort)
            .build()
            .unwrap();

        transfer(&source, &destination, &settings).await.unwrap();

        assert!(logs_contain("Starting transfer"));
        assert!(logs_contain("Skipping batch after write failure"));
        assert!(logs_contain("batch_seq=2"));
        assert!(logs_contain("Transfer completed"));
    }
}
