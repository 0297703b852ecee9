//! Job dispatch loop
//!
//! One message at a time: receive, substitute attributes into the command
//! template, run the command with the message body on stdin, then delete
//! the request and enqueue a correlated reply. Delete-then-reply happens
//! unconditionally — a failed command still removes its message, so this
//! component never re-runs failed jobs on its own.

use crate::error::{DepotError, DepotResult};
use crate::queue::{substitute_template, JobMessage, JobQueue, JobReply, JobStatus};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

/// Runs a command template per received message and replies with its status
pub struct JobDispatcher<Q: JobQueue> {
    queue: Q,
    template: Vec<String>,
}

impl<Q: JobQueue> JobDispatcher<Q> {
    pub fn new(queue: Q, template: Vec<String>) -> DepotResult<Self> {
        if template.is_empty() {
            return Err(DepotError::User(
                "A command to run per message is required".to_string(),
            ));
        }
        Ok(Self { queue, template })
    }

    /// Blocking receive loop; only transport errors terminate it
    pub async fn run(&self) -> DepotResult<()> {
        info!("Listening for job messages");
        loop {
            match self.queue.receive().await? {
                Some(message) => {
                    self.process(message).await?;
                }
                None => continue,
            }
        }
    }

    /// Handle one message end to end; returns the executed command's status
    pub async fn process(&self, message: JobMessage) -> DepotResult<JobStatus> {
        let command = substitute_template(&self.template, &message.attributes);
        info!("Got a message; running `{}`", command.join(" "));

        let status = run_command(&command, &message.body).await?;
        match status {
            JobStatus::Ok => info!("{} succeeded", command[0]),
            JobStatus::Error => warn!("{} failed", command[0]),
        }

        // Delete before replying, success or not; failed jobs are not retried
        self.queue.delete(&message.receipt).await?;
        self.queue
            .reply(&JobReply {
                status,
                request_id: message.id,
            })
            .await?;
        Ok(status)
    }
}

/// Run the substituted command with `input` on stdin; only the exit code
/// is captured, output streams pass through.
async fn run_command(command: &[String], input: &str) -> DepotResult<JobStatus> {
    let mut child = Command::new(&command[0])
        .args(&command[1..])
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| DepotError::command_failed(command.join(" "), e))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .await
            .map_err(|e| DepotError::command_failed(command.join(" "), e))?;
        // Closing stdin lets commands that read to EOF finish
        drop(stdin);
    }

    let status = child
        .wait()
        .await
        .map_err(|e| DepotError::command_failed(command.join(" "), e))?;

    if status.success() {
        Ok(JobStatus::Ok)
    } else {
        warn!("Command exited with {:?}", status.code());
        Ok(JobStatus::Error)
    }
}
