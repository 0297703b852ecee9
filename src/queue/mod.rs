//! Queue-driven job execution
//!
//! A long-lived worker receives job messages, substitutes message
//! attributes into a configured command template, runs the command with the
//! message body on stdin, and emits a correlated status reply. The queue
//! transport sits behind [`JobQueue`]; the bundled implementation is a
//! shared-filesystem spool ([`dir_queue::DirQueue`]).

pub mod dir_queue;
pub mod dispatch;

pub use dir_queue::DirQueue;
pub use dispatch::JobDispatcher;

use crate::error::DepotResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One delivered job request
#[derive(Debug, Clone)]
pub struct JobMessage {
    /// Queue-assigned message id, echoed back as the reply correlation id
    pub id: String,
    /// Opaque payload passed to the command's stdin
    pub body: String,
    /// Named string parameters for template substitution
    pub attributes: HashMap<String, String>,
    /// Transport handle used to delete this delivery
    pub receipt: String,
}

/// Outcome of one executed job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "error")]
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Error => "error",
        }
    }
}

/// Correlated status reply for one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReply {
    pub status: JobStatus,
    /// Id of the originating request message
    pub request_id: String,
}

impl JobReply {
    /// The reply body: JSON `{"status": "OK"}` / `{"status": "error"}`
    pub fn body(&self) -> DepotResult<String> {
        #[derive(Serialize)]
        struct Body<'a> {
            status: &'a str,
        }
        Ok(serde_json::to_string(&Body {
            status: self.status.as_str(),
        })?)
    }
}

/// Queue transport: long-poll receive, explicit delete, correlated replies.
///
/// `receive` returns at most one message and holds no visibility claim on
/// it — an undeleted message stays deliverable to other consumers.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn receive(&self) -> DepotResult<Option<JobMessage>>;
    async fn delete(&self, receipt: &str) -> DepotResult<()>;
    async fn reply(&self, reply: &JobReply) -> DepotResult<()>;
}

/// Substitute `%name%` tokens in every template argument with the matching
/// message attribute. Attributes with an empty value are ignored and leave
/// their token unchanged.
pub fn substitute_template(
    template: &[String],
    attributes: &HashMap<String, String>,
) -> Vec<String> {
    let mut command: Vec<String> = template.to_vec();
    for (name, value) in attributes {
        if value.is_empty() {
            continue;
        }
        let token = format!("%{}%", name);
        for arg in &mut command {
            if arg.contains(&token) {
                *arg = arg.replace(&token, value);
            }
        }
    }
    command
}
