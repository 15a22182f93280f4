//! Fire-and-forget command dispatch to the controller's HTTP endpoint.
//!
//! Commands run outside the monitor lock on snapshots of the channel
//! numbers, so a slow controller can never stall telemetry processing. The
//! controller's own feedback arrives through telemetry like any other state
//! change; a reply here only says whether the call was accepted.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use fieldsync_api::sink::{Notifier, NoticeLevel};

use crate::services::registry::AxisChannels;

/// Function command codes of the axis blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisCommand {
    Start,
    Stop,
    Home,
}

impl AxisCommand {
    pub fn code(&self) -> u32 {
        match self {
            AxisCommand::Start => 1,
            AxisCommand::Stop => 2,
            AxisCommand::Home => 3,
        }
    }
}

/// Function command codes of the valve blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveCommand {
    ToWork,
    ToBase,
}

impl ValveCommand {
    pub fn code(&self) -> u32 {
        match self {
            ValveCommand::ToWork => 1,
            ValveCommand::ToBase => 2,
        }
    }
}

/// Command code of the positioning block reached through `move_no`.
const CMD_MOVE_ABSOLUTE: u32 = 10;

/// Reply of one POST, reduced to what the command path looks at.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub status_text: String,
    pub data: Value,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Narrow HTTP surface the command path depends on. Production wraps
/// `reqwest`, tests substitute canned replies.
#[async_trait]
pub trait HttpPost: Send + Sync {
    async fn post(&self, url: &str, body: Value) -> Result<HttpReply, TransportError>;
}

pub struct ReqwestPost {
    client: reqwest::Client,
}

impl ReqwestPost {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestPost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpPost for ReqwestPost {
    async fn post(&self, url: &str, body: Value) -> Result<HttpReply, TransportError> {
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|err| TransportError(err.to_string()))?;
        let status = response.status();
        // A reply body is optional, most rejections carry none
        let data = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok(HttpReply {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            data,
        })
    }
}

pub struct CommandClient {
    base_url: String,
    http: Arc<dyn HttpPost>,
    notifier: Arc<dyn Notifier>,
}

impl CommandClient {
    pub fn new(base_url: impl Into<String>, http: Arc<dyn HttpPost>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            base_url: base_url.into(),
            http,
            notifier,
        }
    }

    /// Issues one controller function call. Any 2xx reply is acceptance;
    /// everything else is reported and answered with `false`, never retried.
    pub async fn function_call(&self, function_no: u32, command: u32, inputs: Vec<Value>) -> bool {
        if function_no == 0 {
            tracing::warn!(command, "command dropped, function channel not configured");
            self.notifier
                .notify(NoticeLevel::Warning, "Device commands are not configured");
            return false;
        }

        let url = format!(
            "{}/v1/commands/functioncall",
            self.base_url.trim_end_matches('/')
        );
        let body = json!({
            "functionNo": function_no,
            "functionCommand": command,
            "functionInvokerCommand": "Start",
            "inputs": inputs,
        });

        match self.http.post(&url, body).await {
            Ok(reply) if reply.is_success() => true,
            Ok(reply) => {
                tracing::error!(
                    function_no,
                    command,
                    status = reply.status,
                    "controller rejected function call"
                );
                self.notifier.notify(
                    NoticeLevel::Error,
                    &format!(
                        "Command rejected by controller ({} {})",
                        reply.status, reply.status_text
                    ),
                );
                false
            }
            Err(err) => {
                tracing::error!(function_no, command, %err, "function call not delivered");
                self.notifier.notify(
                    NoticeLevel::Error,
                    "Command could not be delivered to the controller",
                );
                false
            }
        }
    }

    pub async fn axis_command(&self, channels: AxisChannels, command: AxisCommand) -> bool {
        self.function_call(channels.axis_no, command.code(), Vec::new())
            .await
    }

    /// Absolute move on the axis positioning block.
    pub async fn move_axis(&self, channels: AxisChannels, target: f32) -> bool {
        self.function_call(channels.move_no, CMD_MOVE_ABSOLUTE, vec![json!(target)])
            .await
    }

    pub async fn valve_command(&self, function_no: u32, command: ValveCommand) -> bool {
        self.function_call(function_no, command.code(), Vec::new())
            .await
    }
}
