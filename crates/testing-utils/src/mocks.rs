//! Mock implementations of the dispatch collaborators
//!
//! In-memory doubles for the registry, transport, retry delay and response
//! processors. All of them are safe to share across concurrent dispatch calls.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use taskrelay_core::{
    errors::TransportError,
    models::{Command, CommandType, Host},
    traits::{NodeCandidateResolver, ResponseProcessor, RetryDelay, TransportSender},
    DispatchError, DispatchResult,
};

/// In-memory worker group registry
#[derive(Debug, Default)]
pub struct MockNodeResolver {
    groups: Mutex<HashMap<String, HashSet<Host>>>,
    failure: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl MockNodeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(self, group: &str, hosts: HashSet<Host>) -> Self {
        self.groups.lock().unwrap().insert(group.to_string(), hosts);
        self
    }

    /// Every subsequent `resolve` fails with a registry error
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeCandidateResolver for MockNodeResolver {
    async fn resolve(&self, group_id: &str) -> DispatchResult<HashSet<Host>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(DispatchError::registry_error(message));
        }

        Ok(self
            .groups
            .lock()
            .unwrap()
            .get(group_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone)]
enum HostScript {
    Succeed,
    FailAlways,
    FailTimes(u32),
}

/// Transport whose result per host is scripted up front
///
/// Hosts without a script succeed. Every attempt is appended to a shared log
/// so tests can assert the exact order in which hosts were tried.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<Host, HostScript>>,
    sent: Mutex<Vec<(Host, String)>>,
    processors: Mutex<HashMap<CommandType, Arc<dyn ResponseProcessor>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_always(&self, host: &Host) {
        self.scripts
            .lock()
            .unwrap()
            .insert(host.clone(), HostScript::FailAlways);
    }

    /// Fail the next `times` attempts on `host`, then succeed
    pub fn fail_times(&self, host: &Host, times: u32) {
        self.scripts
            .lock()
            .unwrap()
            .insert(host.clone(), HostScript::FailTimes(times));
    }

    pub fn succeed_always(&self, host: &Host) {
        self.scripts
            .lock()
            .unwrap()
            .insert(host.clone(), HostScript::Succeed);
    }

    /// Hosts in the order they were attempted, one entry per attempt
    pub fn attempted_hosts(&self) -> Vec<Host> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(host, _)| host.clone())
            .collect()
    }

    /// Hosts in first-attempt order, without repeats
    pub fn distinct_hosts(&self) -> Vec<Host> {
        let mut seen = HashSet::new();
        self.attempted_hosts()
            .into_iter()
            .filter(|host| seen.insert(host.clone()))
            .collect()
    }

    pub fn attempts_for(&self, host: &Host) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, _)| h == host)
            .count()
    }

    pub fn total_attempts(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent_command_ids(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, id)| id.clone())
            .collect()
    }

    pub fn registered_processors(&self) -> HashSet<CommandType> {
        self.processors.lock().unwrap().keys().copied().collect()
    }

    pub fn processor(&self, command_type: CommandType) -> Option<Arc<dyn ResponseProcessor>> {
        self.processors.lock().unwrap().get(&command_type).cloned()
    }
}

#[async_trait]
impl TransportSender for ScriptedTransport {
    async fn send(&self, host: &Host, command: &Command) -> Result<(), TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((host.clone(), command.id.clone()));

        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(host) {
            None | Some(HostScript::Succeed) => Ok(()),
            Some(HostScript::FailAlways) => {
                Err(TransportError::Connection(format!("{host} unreachable")))
            }
            Some(HostScript::FailTimes(remaining)) => {
                if *remaining == 0 {
                    Ok(())
                } else {
                    *remaining -= 1;
                    Err(TransportError::Timeout(format!("{host} timed out")))
                }
            }
        }
    }

    fn register_processor(&self, command_type: CommandType, processor: Arc<dyn ResponseProcessor>) {
        self.processors
            .lock()
            .unwrap()
            .insert(command_type, processor);
    }
}

/// Retry delay that records requested waits and returns immediately
#[derive(Debug, Default)]
pub struct RecordingDelay {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetryDelay for RecordingDelay {
    async fn wait(&self, delay: Duration) {
        self.waits.lock().unwrap().push(delay);
    }
}

/// Response processor that keeps every command it receives
#[derive(Debug)]
pub struct RecordingProcessor {
    name: String,
    received: Mutex<Vec<(Host, Command)>>,
}

impl RecordingProcessor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<(Host, Command)> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseProcessor for RecordingProcessor {
    async fn process(&self, host: &Host, command: Command) {
        self.received.lock().unwrap().push((host.clone(), command));
    }

    fn name(&self) -> &str {
        &self.name
    }
}
