//! NATS publisher for decision replies

use anyhow::Result;
use async_nats::{Client, Subject};
use serde::Serialize;
use tracing::debug;

/// Sends rendered decisions back to the requester
#[derive(Clone)]
pub struct DecisionProducer {
    client: Client,
    subject: String,
}

impl DecisionProducer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Reply to the request inbox when present, otherwise publish on the
    /// decision subject.
    pub async fn respond<T: Serialize>(&self, reply_to: Option<Subject>, body: &T) -> Result<()> {
        let payload = serde_json::to_vec(body)?;

        let target = reply_target(reply_to, &self.subject);

        debug!(subject = %target, bytes = payload.len(), "Publishing reply");
        self.client.publish(target, payload.into()).await?;

        Ok(())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// The request inbox when the caller asked for a reply, else the fallback subject.
pub fn reply_target(reply_to: Option<Subject>, fallback: &str) -> Subject {
    reply_to.unwrap_or_else(|| Subject::from(fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_goes_to_inbox() {
        let target = reply_target(Some(Subject::from("_INBOX.abc123")), "loan.decisions");
        assert_eq!(target.as_str(), "_INBOX.abc123");
    }

    #[test]
    fn test_fire_and_forget_goes_to_decision_subject() {
        let target = reply_target(None, "loan.decisions");
        assert_eq!(target.as_str(), "loan.decisions");
    }
}
