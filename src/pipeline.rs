//! Intake pipeline - orchestrates one submission end to end
//!
//! ```text
//! Submission
//!     ↓
//! Record::from_submission()          (flatten, timestamp, classify)
//!     ↓  ── retry envelope ─────────────────────────────┐
//! get_or_create_sheet → reconcile → append → highlight  │
//!     ↓                                                 │ per-sheet lock
//! AnalysisSnapshot → analysis sheet                     │
//!     ↓                                                 │
//! QuickAnalysis → Notifier → prune                      │
//!     └─────────────────────────────────────────────────┘
//! ```
//!
//! The record is built once so every attempt writes the same row. Once the
//! append has succeeded, later attempts skip it; the priority highlight is
//! tracked the same way.

use crate::analysis::{read_sheet, write_analysis_sheet, AnalysisSnapshot, QuickAnalysis};
use crate::config::PipelineConfig;
use crate::error::IntakeError;
use crate::intake::{Classifier, DefaultClassifier, Record, Submission};
use crate::notify::{should_notify, Notification, Notifier};
use crate::retention::prune;
use crate::retry::RetryPolicy;
use crate::schema::reconcile;
use crate::sheet::{get_or_create_sheet, TabularStore};
use crate::writer::{add_priority_highlight, append_projected, priority_highlight, AppendedRow};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

/// One async mutex per sheet name
///
/// Holding a sheet's lock makes the holder its only mutator, which keeps
/// header reconciliation (read, merge, write) free of lost updates.
#[derive(Default)]
pub struct SinkLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SinkLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for `sheet`, created on first use
    pub fn lock_for(&self, sheet: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            // the map itself is always consistent
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.entry(sheet.to_string()).or_default().clone()
    }
}

/// Side effects of one request that must not repeat across attempts
#[derive(Debug, Default)]
struct RequestProgress {
    appended: OnceLock<AppendedRow>,
    highlighted: OnceLock<()>,
}

/// Result of a successfully processed submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub sheet: String,
    pub row_index: usize,
    pub attempts: u32,
    pub notified: bool,
    pub pruned: usize,
    pub quick_analysis: QuickAnalysis,
}

pub struct IntakePipeline {
    config: PipelineConfig,
    store: Arc<dyn TabularStore>,
    classifier: Arc<dyn Classifier>,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
    locks: SinkLocks,

    /// Timestamp function (for testing with fixed time)
    now_fn: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl IntakePipeline {
    /// Create a pipeline with the default classifier and system time
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn TabularStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let retry = RetryPolicy::new(config.max_retries, config.retry_delay());
        Self {
            config,
            store,
            classifier: Arc::new(DefaultClassifier),
            notifier,
            retry,
            locks: SinkLocks::new(),
            now_fn: Box::new(Utc::now),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_now_fn(mut self, now_fn: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>) -> Self {
        self.now_fn = now_fn;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TabularStore> {
        &self.store
    }

    /// Process one submission inside the retry envelope
    ///
    /// Failures are retried up to `max_retries` attempts in total; after
    /// that the last error is returned wrapped in
    /// `IntakeError::ExhaustedRetries`.
    pub async fn handle_submission(
        &self,
        submission: Submission,
    ) -> Result<SubmissionOutcome, IntakeError> {
        let record = Record::from_submission(&submission, self.classifier.as_ref(), (self.now_fn)());
        let sheet = self
            .config
            .primary_sheet_name(record.sheet_name(&self.config.default_form_name));

        log::debug!(
            "📥 Submission for '{}' with {} fields",
            sheet,
            record.fields().len()
        );

        let attempts = AtomicU32::new(0);
        let progress = RequestProgress::default();
        let (record, sheet_ref, attempts_ref, progress_ref) =
            (&record, sheet.as_str(), &attempts, &progress);

        let result = self
            .retry
            .run_if(
                move |attempt| async move {
                    attempts_ref.store(attempt, Ordering::SeqCst);
                    self.process(record, sheet_ref, progress_ref).await
                },
                IntakeError::is_transient,
            )
            .await;

        let attempts = attempts.load(Ordering::SeqCst);
        match result {
            Ok(mut outcome) => {
                outcome.attempts = attempts;
                log::info!(
                    "✅ Processed submission for '{}' (row {}, {} attempt(s))",
                    outcome.sheet,
                    outcome.row_index,
                    attempts
                );
                Ok(outcome)
            }
            Err(e) => {
                log::error!(
                    "❌ Submission for '{}' failed after {} attempts: {}",
                    sheet,
                    attempts,
                    e
                );
                Err(IntakeError::ExhaustedRetries {
                    attempts,
                    source: Box::new(e),
                })
            }
        }
    }

    /// One attempt of the full chain, under the sheet's lock
    async fn process(
        &self,
        record: &Record,
        sheet: &str,
        progress: &RequestProgress,
    ) -> Result<SubmissionOutcome, IntakeError> {
        let lock = self.locks.lock_for(sheet);
        let _guard = lock.lock().await;
        let store = self.store.as_ref();

        get_or_create_sheet(store, sheet).await?;
        let columns = reconcile(store, sheet, &record.keys()).await?;

        let append = match progress.appended.get() {
            Some(done) => {
                log::info!(
                    "Row {} already appended to '{}', skipping append",
                    done.row_index,
                    sheet
                );
                done
            }
            None => {
                let done = append_projected(store, sheet, &columns, record).await?;
                progress.appended.get_or_init(|| done)
            }
        };

        if progress.highlighted.get().is_none() {
            if let Some(rule) = priority_highlight(append) {
                add_priority_highlight(store, sheet, &rule, &append.cells).await?;
            }
            let _ = progress.highlighted.set(());
        }

        let (headers, rows) = read_sheet(store, sheet).await?;
        let threshold = self.config.anomaly_threshold;

        let snapshot = AnalysisSnapshot::compute(&headers, &rows, threshold);
        write_analysis_sheet(store, &self.config.analysis_sheet_name(sheet), &snapshot).await?;

        let quick = QuickAnalysis::compute(&headers, &rows, threshold);
        let notified = if should_notify(
            self.config.email_notification,
            self.config.notify_flagged_only,
            record,
            &quick,
        ) {
            let message = Notification::render(record, &quick, &store.sheet_url(sheet));
            self.notifier
                .send(&self.config.email_address, &message.subject, &message.body)
                .await?;
            log::debug!(
                "Notified {} via {}",
                self.config.email_address,
                self.notifier.backend_type()
            );
            true
        } else {
            false
        };

        let pruned = prune(store, sheet, self.config.data_retention_days, (self.now_fn)()).await?;

        Ok(SubmissionOutcome {
            sheet: sheet.to_string(),
            row_index: append.row_index,
            attempts: 0,
            notified,
            pruned,
            quick_analysis: quick,
        })
    }
}
