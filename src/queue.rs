//! Serializes detections through one worker thread.
//!
//! The worker owns the models and the people counter's presence state, so
//! requests are answered strictly in arrival order and the state never needs
//! a lock. The worker exits once every [`DetectionQueue`] handle is dropped.

use anyhow::Result;
use biodetect_core::detect::{DetectionKind, Detectors, Report};
use image::RgbImage;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{Level, debug, info, span, warn};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("detection worker is not running")]
    WorkerGone,
    #[error(transparent)]
    Detection(anyhow::Error),
}

struct Job {
    kind: DetectionKind,
    image: RgbImage,
    reply: flume::Sender<Result<Report>>,
}

#[derive(Clone)]
pub struct DetectionQueue {
    jobs: flume::Sender<Job>,
}

impl DetectionQueue {
    pub fn spawn(detectors: Detectors) -> Result<(DetectionQueue, JoinHandle<()>)> {
        let (jobs, rx) = flume::unbounded();
        let worker = thread::Builder::new()
            .name("detection-worker".to_string())
            .spawn(move || run_worker(detectors, rx))?;

        Ok((DetectionQueue { jobs }, worker))
    }

    /// Queues a detection without waiting for it.
    pub fn enqueue(
        &self,
        kind: DetectionKind,
        image: RgbImage,
    ) -> Result<flume::Receiver<Result<Report>>, QueueError> {
        let (reply, response) = flume::bounded(1);
        self.jobs
            .send(Job { kind, image, reply })
            .map_err(|_| QueueError::WorkerGone)?;
        debug!("Queued {kind} detection, {} waiting", self.jobs.len());
        Ok(response)
    }

    pub async fn submit(&self, kind: DetectionKind, image: RgbImage) -> Result<Report, QueueError> {
        let response = self.enqueue(kind, image)?;
        response
            .recv_async()
            .await
            .map_err(|_| QueueError::WorkerGone)?
            .map_err(QueueError::Detection)
    }
}

fn run_worker(mut detectors: Detectors, jobs: flume::Receiver<Job>) {
    info!("Detection worker started");

    for job in jobs.iter() {
        let span = span!(Level::INFO, "detection_job", kind = job.kind.as_str());
        let _guard = span.enter();

        let result = detectors.run(job.kind, &job.image);
        if let Err(e) = &result {
            warn!("Detection failed: {e:?}");
        }
        if job.reply.send(result).is_err() {
            debug!("Requester went away before the result was ready");
        }
    }

    info!("Detection queue closed, worker exiting");
}
