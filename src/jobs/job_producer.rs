//! Enqueues jobs onto the Redis-backed queues.

use apalis::prelude::Storage;
use apalis_redis::RedisError;
use async_trait::async_trait;
use log::info;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use super::{AlertSend, Job, JobType, Queue};

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Error, Serialize)]
pub enum JobProducerError {
    #[error("Queue error: {0}")]
    QueueError(String),
}

impl From<RedisError> for JobProducerError {
    fn from(_: RedisError) -> Self {
        JobProducerError::QueueError("Queue error".to_string())
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait JobProducerTrait: Send + Sync {
    async fn produce_send_alert_job(
        &self,
        alert_job: AlertSend,
        scheduled_on: Option<i64>,
    ) -> Result<(), JobProducerError>;
}

#[derive(Debug)]
pub struct JobProducer {
    queue: Mutex<Queue>,
}

impl JobProducer {
    pub fn new(queue: Queue) -> Self {
        Self {
            queue: Mutex::new(queue),
        }
    }
}

#[async_trait]
impl JobProducerTrait for JobProducer {
    async fn produce_send_alert_job(
        &self,
        alert_job: AlertSend,
        scheduled_on: Option<i64>,
    ) -> Result<(), JobProducerError> {
        let mut queue = self.queue.lock().await;
        let job = Job::new(JobType::AlertSend, alert_job);

        match scheduled_on {
            Some(on) => {
                queue.alert_queue.schedule(job, on).await?;
            }
            None => {
                queue.alert_queue.push(job).await?;
            }
        }
        info!("Alert job produced successfully");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{AlertSeverity, OperatorAlert};

    // A queue stand-in that records which enqueue path was taken.
    #[derive(Clone, Debug, Default)]
    struct TestStorage {
        push_called: bool,
        schedule_called: bool,
    }

    struct TestJobProducer {
        queue: Mutex<TestStorage>,
    }

    impl TestJobProducer {
        fn new() -> Self {
            Self {
                queue: Mutex::new(TestStorage::default()),
            }
        }
    }

    #[async_trait]
    impl JobProducerTrait for TestJobProducer {
        async fn produce_send_alert_job(
            &self,
            alert_job: AlertSend,
            scheduled_on: Option<i64>,
        ) -> Result<(), JobProducerError> {
            let _ = Job::new(JobType::AlertSend, alert_job);
            let mut queue = self.queue.lock().await;
            match scheduled_on {
                Some(_) => queue.schedule_called = true,
                None => queue.push_called = true,
            }
            Ok(())
        }
    }

    fn fixture() -> AlertSend {
        AlertSend::new(OperatorAlert::new(
            "hub_rejection",
            "testchain",
            AlertSeverity::Warning,
            "event permanently rejected",
        ))
    }

    #[tokio::test]
    async fn test_alert_job_is_pushed_immediately() {
        let producer = TestJobProducer::new();
        producer
            .produce_send_alert_job(fixture(), None)
            .await
            .unwrap();
        assert!(producer.queue.lock().await.push_called);
    }

    #[tokio::test]
    async fn test_alert_job_is_scheduled() {
        let producer = TestJobProducer::new();
        producer
            .produce_send_alert_job(fixture(), Some(1000))
            .await
            .unwrap();
        assert!(producer.queue.lock().await.schedule_called);
    }
}
