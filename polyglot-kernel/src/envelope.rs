//! JSON envelopes
//!
//!     Commands and events cross a transport as JSON objects:
//!
//!         {"commandType": "SubmitCode", "command": {"code": "...", "targetKernelName": "csharp"},
//!          "token": "9f0c...", "id": "...", "originUri": null}
//!
//!         {"eventType": "CommandSucceeded", "event": {}, "command": { <command envelope> }}
//!
//!     Tokens survive the round trip, which is what lets a proxy match remote events to local
//!     commands.

use crate::commands::{CommandPayload, KernelCommand};
use crate::events::{EventPayload, KernelEvent};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelCommandEnvelope {
    pub command_type: String,
    pub command: Value,
    pub token: String,
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_uri: Option<String>,
}

impl KernelCommandEnvelope {
    pub fn from_command(command: &KernelCommand) -> Result<Self, serde_json::Error> {
        let (command_type, mut body) = split_tagged(
            serde_json::to_value(&command.payload)?,
            "commandType",
            "command",
        );
        if let (Value::Object(fields), Some(target)) = (&mut body, &command.target_kernel_name) {
            fields.insert("targetKernelName".to_string(), Value::String(target.clone()));
        }
        Ok(Self {
            command_type,
            command: body,
            token: command.token.clone(),
            id: command.id,
            origin_uri: command.origin_uri.clone(),
        })
    }

    pub fn target_kernel_name(&self) -> Option<&str> {
        self.command.get("targetKernelName").and_then(Value::as_str)
    }

    pub fn payload(&self) -> Result<CommandPayload, serde_json::Error> {
        let mut tagged = Map::new();
        tagged.insert(
            "commandType".to_string(),
            Value::String(self.command_type.clone()),
        );
        tagged.insert("command".to_string(), self.command.clone());
        serde_json::from_value(Value::Object(tagged))
    }

    /// A root command carrying this envelope's token.
    pub fn into_command(self) -> Result<KernelCommand, serde_json::Error> {
        let payload = self.payload()?;
        let mut command = KernelCommand::with_token(self.token.clone(), payload);
        command.id = self.id;
        command.target_kernel_name = self.target_kernel_name().map(str::to_string);
        command.origin_uri = self.origin_uri;
        Ok(command)
    }

    pub fn serialize(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn deserialize(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelEventEnvelope {
    pub event_type: String,
    pub event: Value,
    pub command: KernelCommandEnvelope,
}

impl KernelEventEnvelope {
    pub fn from_event(event: &KernelEvent) -> Result<Self, serde_json::Error> {
        let (event_type, body) =
            split_tagged(serde_json::to_value(&event.payload)?, "eventType", "event");
        Ok(Self {
            event_type,
            event: body,
            command: KernelCommandEnvelope::from_command(&event.command)?,
        })
    }

    pub fn payload(&self) -> Result<EventPayload, serde_json::Error> {
        let mut tagged = Map::new();
        tagged.insert(
            "eventType".to_string(),
            Value::String(self.event_type.clone()),
        );
        tagged.insert("event".to_string(), self.event.clone());
        serde_json::from_value(Value::Object(tagged))
    }

    /// Rebuild the event against an already known command.
    pub fn into_event(self, command: Arc<KernelCommand>) -> Result<KernelEvent, serde_json::Error> {
        Ok(KernelEvent::new(command, self.payload()?))
    }

    pub fn serialize(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn deserialize(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn split_tagged(value: Value, tag: &str, content: &str) -> (String, Value) {
    match value {
        Value::Object(mut fields) => {
            let kind = fields
                .remove(tag)
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            let body = fields
                .remove(content)
                .unwrap_or_else(|| Value::Object(Map::new()));
            (kind, body)
        }
        other => (String::new(), other),
    }
}
