//! Background query jobs.
//!
//! Slack expects an acknowledgement within a few seconds, so retrieval and
//! generation run on a fixed pool of tokio workers fed by a bounded channel.
//! Each worker computes the reply and POSTs `{"text": ...}` to the job's
//! `response_url`. Jobs are independent: no ordering, no cancellation, no
//! retry. Failures are logged where they happen.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::answer::{answer, top_k_listing};
use crate::config::{ReplyMode, TasksConfig};
use crate::services::Services;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Reply with the `k` best matching chunks.
    TopK {
        query: String,
        response_url: String,
        k: usize,
    },
    /// Reply with a model-generated answer.
    Answer { query: String, response_url: String },
}

impl Job {
    pub fn for_mode(mode: ReplyMode, query: String, response_url: String, k: usize) -> Self {
        match mode {
            ReplyMode::TopK => Job::TopK {
                query,
                response_url,
                k,
            },
            ReplyMode::Answer => Job::Answer {
                query,
                response_url,
            },
        }
    }

    pub fn query(&self) -> &str {
        match self {
            Job::TopK { query, .. } | Job::Answer { query, .. } => query,
        }
    }

    pub fn response_url(&self) -> &str {
        match self {
            Job::TopK { response_url, .. } | Job::Answer { response_url, .. } => response_url,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("task queue is full")]
    Full,
    #[error("task queue is closed")]
    Closed,
}

/// Producer side of the job channel. Cheap to clone.
#[derive(Clone)]
pub struct TaskQueue {
    sender: mpsc::Sender<Job>,
}

impl TaskQueue {
    /// A queue with no workers attached; the caller owns the receiver.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Spawn `settings.workers` workers draining a queue of
    /// `settings.queue_capacity` jobs.
    pub fn start(
        services: Arc<Services>,
        settings: &TasksConfig,
    ) -> Result<(Self, Vec<JoinHandle<()>>)> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.delivery_timeout_secs))
            .build()
            .context("Failed to build delivery client")?;

        let (queue, receiver) = Self::bounded(settings.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..settings.workers.max(1))
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    receiver.clone(),
                    services.clone(),
                    client.clone(),
                ))
            })
            .collect();

        tracing::info!(
            workers = settings.workers,
            capacity = settings.queue_capacity,
            "task workers started"
        );
        Ok((queue, handles))
    }

    /// Enqueue without waiting. Fails immediately when the queue is full.
    pub fn try_enqueue(&self, job: Job) -> Result<(), EnqueueError> {
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EnqueueError::Full,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }
}

async fn worker_loop(
    worker: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    services: Arc<Services>,
    client: reqwest::Client,
) {
    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(job) = job else {
            tracing::debug!(worker, "job channel closed; worker exiting");
            return;
        };

        let text = match run_job(&services, &job).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(worker, query = %job.query(), error = %e, "job failed");
                continue;
            }
        };

        if let Err(e) = deliver(&client, job.response_url(), &text).await {
            tracing::error!(
                worker,
                query = %job.query(),
                error = %e,
                "Failed to send final response"
            );
        }
    }
}

/// Compute the reply text for a job.
pub async fn run_job(services: &Services, job: &Job) -> Result<String> {
    match job {
        Job::TopK { query, k, .. } => top_k_listing(&services.retriever, query, *k).await,
        Job::Answer { query, .. } => {
            let model = services.model()?;
            let reply = answer(&services.retriever, model, query).await?;
            Ok(reply.to_reply_text())
        }
    }
}

/// POST `{"text": text}` to `url`. Non-2xx responses are errors.
pub async fn deliver(client: &reqwest::Client, url: &str, text: &str) -> Result<()> {
    let response = client
        .post(url)
        .json(&serde_json::json!({ "text": text }))
        .send()
        .await
        .with_context(|| format!("POST {} failed", url))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("{} returned {}: {}", url, status, body);
    }
    Ok(())
}
