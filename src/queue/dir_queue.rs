//! Shared-filesystem spool queue
//!
//! Messages are JSON files in a request directory, received oldest-first
//! with long polling and zero visibility hold (a received-but-undeleted
//! message stays visible to every consumer). Replies are written to a
//! separate response directory carrying the originating message id in a
//! `RequestId` attribute. Writers stage to a dot-prefixed temp name and
//! rename, so readers never observe a partial message.

use crate::error::{DepotError, DepotResult};
use crate::queue::{JobMessage, JobQueue, JobReply};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default long-poll window, matching the hosted-queue configuration
pub const DEFAULT_WAIT: Duration = Duration::from_secs(20);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Serialize, Deserialize)]
struct MessageFile {
    id: String,
    body: String,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReplyFile {
    attributes: HashMap<String, String>,
    body: String,
}

/// Filesystem spool implementation of [`JobQueue`]
pub struct DirQueue {
    request_dir: PathBuf,
    response_dir: PathBuf,
    wait: Duration,
    poll_interval: Duration,
}

impl DirQueue {
    pub fn new(request_dir: impl Into<PathBuf>, response_dir: impl Into<PathBuf>) -> Self {
        Self {
            request_dir: request_dir.into(),
            response_dir: response_dir.into(),
            wait: DEFAULT_WAIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the long-poll window (mainly for tests)
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn request_dir(&self) -> &Path {
        &self.request_dir
    }

    /// Enqueue a request message; returns the assigned message id.
    ///
    /// Producer-side helper: the worker itself only receives.
    pub fn enqueue(
        &self,
        body: impl Into<String>,
        attributes: HashMap<String, String>,
    ) -> DepotResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let message = MessageFile {
            id: id.clone(),
            body: body.into(),
            attributes,
        };
        let name = format!("{:020}-{}.json", Utc::now().timestamp_millis(), id);
        write_atomic(&self.request_dir, &name, &serde_json::to_vec(&message)?)?;
        Ok(id)
    }

    /// Oldest pending message file name, if any
    fn oldest_pending(&self) -> DepotResult<Option<String>> {
        let entries = match std::fs::read_dir(&self.request_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DepotError::io(
                    format!("reading queue {}", self.request_dir.display()),
                    e,
                ))
            }
        };

        let mut names: Vec<String> = entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| !n.starts_with('.') && n.ends_with(".json"))
            .collect();
        names.sort();
        Ok(names.into_iter().next())
    }

    /// Read one spooled message; `None` if another consumer deleted it
    /// between listing and reading.
    fn read_message(&self, name: &str) -> DepotResult<Option<JobMessage>> {
        let path = self.request_dir.join(name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DepotError::queue(
                    format!("reading message {}", path.display()),
                    e.to_string(),
                ))
            }
        };
        let message: MessageFile = serde_json::from_str(&content)
            .map_err(|e| DepotError::queue(format!("parsing message {}", name), e.to_string()))?;
        Ok(Some(JobMessage {
            id: message.id,
            body: message.body,
            attributes: message.attributes,
            receipt: name.to_string(),
        }))
    }
}

#[async_trait]
impl JobQueue for DirQueue {
    /// Long-poll for up to one message, zero visibility hold
    async fn receive(&self) -> DepotResult<Option<JobMessage>> {
        let deadline = tokio::time::Instant::now() + self.wait;
        loop {
            if let Some(name) = self.oldest_pending()? {
                match self.read_message(&name)? {
                    Some(message) => {
                        debug!("Received message file {}", name);
                        return Ok(Some(message));
                    }
                    // Another consumer took it; the listing has moved on
                    None => continue,
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn delete(&self, receipt: &str) -> DepotResult<()> {
        let path = self.request_dir.join(receipt);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            // Another consumer already deleted it; deletion is idempotent
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DepotError::queue(
                format!("deleting message {}", path.display()),
                e.to_string(),
            )),
        }
    }

    async fn reply(&self, reply: &JobReply) -> DepotResult<()> {
        let file = ReplyFile {
            attributes: HashMap::from([("RequestId".to_string(), reply.request_id.clone())]),
            body: reply.body()?,
        };
        let name = format!(
            "{:020}-{}.json",
            Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4()
        );
        write_atomic(&self.response_dir, &name, &serde_json::to_vec(&file)?)
    }
}

/// Write under a dot-prefixed temp name, then rename into place
fn write_atomic(dir: &Path, name: &str, data: &[u8]) -> DepotResult<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| DepotError::io(format!("creating {}", dir.display()), e))?;
    let tmp = dir.join(format!(".{}", name));
    let path = dir.join(name);
    std::fs::write(&tmp, data)
        .map_err(|e| DepotError::io(format!("writing {}", tmp.display()), e))?;
    std::fs::rename(&tmp, &path)
        .map_err(|e| DepotError::io(format!("publishing {}", path.display()), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::JobStatus;
    use tempfile::TempDir;

    fn queue(dir: &TempDir) -> DirQueue {
        DirQueue::new(dir.path().join("requests"), dir.path().join("responses"))
            .with_wait(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn receive_empty_returns_none_after_wait() {
        let dir = TempDir::new().unwrap();
        assert!(queue(&dir).receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn enqueue_then_receive_round_trips() {
        let dir = TempDir::new().unwrap();
        let q = queue(&dir);
        let id = q
            .enqueue("payload", HashMap::from([("K".to_string(), "v".to_string())]))
            .unwrap();

        let message = q.receive().await.unwrap().unwrap();
        assert_eq!(message.id, id);
        assert_eq!(message.body, "payload");
        assert_eq!(message.attributes.get("K").map(String::as_str), Some("v"));
    }

    #[tokio::test]
    async fn receive_is_oldest_first_and_non_destructive() {
        let dir = TempDir::new().unwrap();
        let q = queue(&dir);
        let first = q.enqueue("one", HashMap::new()).unwrap();
        // Distinct spool timestamps keep ordering deterministic
        tokio::time::sleep(Duration::from_millis(5)).await;
        q.enqueue("two", HashMap::new()).unwrap();

        let a = q.receive().await.unwrap().unwrap();
        assert_eq!(a.id, first);
        // Zero visibility hold: the same message is still deliverable
        let b = q.receive().await.unwrap().unwrap();
        assert_eq!(b.id, first);

        q.delete(&a.receipt).await.unwrap();
        let c = q.receive().await.unwrap().unwrap();
        assert_eq!(c.body, "two");
    }

    #[tokio::test]
    async fn message_deleted_by_another_consumer_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let q = queue(&dir);
        q.enqueue("x", HashMap::new()).unwrap();

        // The file a listing named can be gone by the time it is read
        let gone = q.read_message("00000000000000000000-gone.json").unwrap();
        assert!(gone.is_none());

        // The surviving message is still delivered
        let message = q.receive().await.unwrap().unwrap();
        assert_eq!(message.body, "x");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let q = queue(&dir);
        q.enqueue("x", HashMap::new()).unwrap();
        let message = q.receive().await.unwrap().unwrap();
        q.delete(&message.receipt).await.unwrap();
        q.delete(&message.receipt).await.unwrap();
    }

    #[tokio::test]
    async fn reply_carries_correlation_attribute() {
        let dir = TempDir::new().unwrap();
        let q = queue(&dir);
        q.reply(&JobReply {
            status: JobStatus::Ok,
            request_id: "msg-42".to_string(),
        })
        .await
        .unwrap();

        let responses: Vec<_> = std::fs::read_dir(dir.path().join("responses"))
            .unwrap()
            .flatten()
            .collect();
        assert_eq!(responses.len(), 1);

        let content = std::fs::read_to_string(responses[0].path()).unwrap();
        let reply: ReplyFile = serde_json::from_str(&content).unwrap();
        assert_eq!(
            reply.attributes.get("RequestId").map(String::as_str),
            Some("msg-42")
        );
        assert_eq!(reply.body, r#"{"status":"OK"}"#);
    }
}
