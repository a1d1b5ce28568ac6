//! Job envelope shared by every queued task.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::services::OperatorAlert;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Job<T> {
    pub message_id: String,
    pub version: String,
    pub timestamp: String,
    pub job_type: JobType,
    pub data: T,
}

impl<T> Job<T> {
    pub fn new(job_type: JobType, data: T) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            version: "1.0".to_string(),
            timestamp: Utc::now().timestamp().to_string(),
            job_type,
            data,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Display, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobType {
    AlertSend,
}

/// Payload for an operator alert delivery job.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AlertSend {
    pub alert: OperatorAlert,
}

impl AlertSend {
    pub fn new(alert: OperatorAlert) -> Self {
        Self { alert }
    }
}
