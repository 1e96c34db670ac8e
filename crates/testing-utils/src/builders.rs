//! Test data builders

use std::collections::HashSet;

use serde_json::json;
use taskrelay_core::models::{Command, CommandType, Host};

/// Builder for test commands
pub struct CommandBuilder {
    command_type: CommandType,
    body: serde_json::Value,
}

impl CommandBuilder {
    pub fn new() -> Self {
        Self {
            command_type: CommandType::TaskExecuteRequest,
            body: json!({"task_instance_id": 1, "task_type": "shell"}),
        }
    }

    pub fn kill() -> Self {
        Self::new()
            .with_command_type(CommandType::TaskKillRequest)
            .with_body(json!({"task_instance_id": 1}))
    }

    pub fn with_command_type(mut self, command_type: CommandType) -> Self {
        self.command_type = command_type;
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> Command {
        Command::new(self.command_type, self.body)
    }
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `10.0.0.{n}:1234`
pub fn worker_host(n: u8) -> Host {
    Host::new(format!("10.0.0.{n}"), 1234)
}

pub fn host_set(hosts: &[Host]) -> HashSet<Host> {
    hosts.iter().cloned().collect()
}
