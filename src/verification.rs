//! Asynchronous identity verification
//!
//! Artisans upload a national ID photo; a background worker pulls
//! verification jobs off a queue, obtains quality metrics for the photo
//! through the [`PhotoAnalyzer`] port, and writes the resulting status and
//! confidence score back to the profile. The offer-submission path only
//! ever reads the resulting verified flag, it never blocks on this job.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::EscrowError;
use crate::models::VerificationStatus;
use crate::store::MarketStore;
use crate::EscrowResult;

/// Thresholds for the photo quality check
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Minimum Laplacian-variance sharpness before a photo counts as blurry
    pub min_sharpness: f64,
    /// Minimum width and height in pixels
    pub min_dimension_px: u32,
    /// Acceptable mean brightness range (0-255 grayscale)
    pub min_brightness: f64,
    pub max_brightness: f64,
    /// Capacity of the verification job queue
    pub queue_capacity: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            min_sharpness: 100.0,
            min_dimension_px: 200,
            min_brightness: 50.0,
            max_brightness: 200.0,
            queue_capacity: 64,
        }
    }
}

/// Quality metrics extracted from an uploaded ID photo
#[derive(Debug, Clone)]
pub struct IdPhotoMetrics {
    /// Laplacian variance; low values mean a blurry image
    pub sharpness: f64,
    pub faces_detected: u32,
    pub width: u32,
    pub height: u32,
    /// Mean grayscale brightness (0-255)
    pub mean_brightness: f64,
}

/// Port to whatever inspects the uploaded photo. Implementations live
/// outside the engine; the worker only consumes the metrics.
#[async_trait]
pub trait PhotoAnalyzer: Send + Sync {
    async fn analyze(&self, photo_url: &str) -> EscrowResult<IdPhotoMetrics>;
}

/// A queued verification job for one artisan profile
#[derive(Debug, Clone)]
pub struct VerificationJob {
    pub user_id: Uuid,
}

/// Producer half of the verification queue
#[derive(Clone)]
pub struct VerificationQueue {
    tx: mpsc::Sender<VerificationJob>,
}

impl VerificationQueue {
    pub async fn enqueue(&self, user_id: Uuid) -> EscrowResult<()> {
        self.tx
            .send(VerificationJob { user_id })
            .await
            .map_err(|_| EscrowError::internal("verification queue is closed"))
    }
}

/// Consumer half: processes jobs until every queue handle is dropped
pub struct VerificationWorker {
    store: Arc<MarketStore>,
    analyzer: Arc<dyn PhotoAnalyzer>,
    config: VerificationConfig,
    rx: mpsc::Receiver<VerificationJob>,
}

/// Create a connected queue/worker pair
pub fn verification_pipeline(
    store: Arc<MarketStore>,
    analyzer: Arc<dyn PhotoAnalyzer>,
    config: VerificationConfig,
) -> (VerificationQueue, VerificationWorker) {
    let (tx, rx) = mpsc::channel(config.queue_capacity);
    (
        VerificationQueue { tx },
        VerificationWorker {
            store,
            analyzer,
            config,
            rx,
        },
    )
}

/// Outcome of the quality evaluation
#[derive(Debug, Clone)]
struct QualityOutcome {
    accepted: bool,
    confidence: f64,
    detail: String,
}

impl VerificationWorker {
    /// Run until the queue closes. Job failures are logged and skipped;
    /// the profile is left untouched for a later retry.
    pub async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            if let Err(err) = self.process(&job).await {
                error!(user = %job.user_id, %err, "verification job failed");
            }
        }
        info!("verification worker stopped");
    }

    async fn process(&self, job: &VerificationJob) -> EscrowResult<()> {
        let photo_url = {
            let store = self.store.read().await;
            store.profile(job.user_id)?.national_id_photo.clone()
        };

        let Some(photo_url) = photo_url else {
            warn!(user = %job.user_id, "verification job without an ID photo on file");
            return Ok(());
        };

        let metrics = self.analyzer.analyze(&photo_url).await?;
        let outcome = self.evaluate(&metrics);

        let mut store = self.store.write().await;
        let profile = store.profile_mut(job.user_id)?;
        profile.id_confidence_score = outcome.confidence;
        profile.updated_at = chrono::Utc::now();
        if outcome.accepted {
            profile.verification_status = VerificationStatus::PendingReview;
            profile.rejection_reason = None;
        } else {
            profile.verification_status = VerificationStatus::Rejected;
            profile.rejection_reason = Some(outcome.detail.clone());
        }

        info!(
            user = %job.user_id,
            accepted = outcome.accepted,
            confidence = outcome.confidence,
            "ID photo quality check finished"
        );
        Ok(())
    }

    /// Apply the quality thresholds in order; the first failing check
    /// decides the rejection reason and confidence.
    fn evaluate(&self, metrics: &IdPhotoMetrics) -> QualityOutcome {
        if metrics.sharpness < self.config.min_sharpness {
            return QualityOutcome {
                accepted: false,
                confidence: 0.0,
                detail: "ID photo is too blurry, retake the photo".into(),
            };
        }

        if metrics.faces_detected == 0 {
            return QualityOutcome {
                accepted: false,
                confidence: 0.3,
                detail: "no face detected in the ID photo".into(),
            };
        }

        let min_dimension = metrics.width.min(metrics.height);
        if min_dimension < self.config.min_dimension_px {
            return QualityOutcome {
                accepted: false,
                confidence: 0.4,
                detail: "ID photo resolution is too low".into(),
            };
        }

        if metrics.mean_brightness < self.config.min_brightness
            || metrics.mean_brightness > self.config.max_brightness
        {
            return QualityOutcome {
                accepted: false,
                confidence: 0.5,
                detail: "ID photo lighting is outside the acceptable range".into(),
            };
        }

        // Weighted confidence: sharpness 40%, face presence 30%,
        // resolution 20%, brightness 10%.
        let confidence = ((metrics.sharpness / 500.0) * 0.4
            + (f64::from(metrics.faces_detected) / 2.0) * 0.3
            + (f64::from(min_dimension) / 500.0) * 0.2
            + (1.0 - (metrics.mean_brightness - 128.0).abs() / 128.0) * 0.1)
            .min(1.0);

        QualityOutcome {
            accepted: true,
            confidence,
            detail: "ID photo quality is acceptable".into(),
        }
    }
}
