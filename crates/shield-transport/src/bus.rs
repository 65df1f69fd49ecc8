//! Transport contract and the in-memory bus.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::{TransportError, TransportResult};
use crate::message::{AgentRef, Message, MessageType};

const INBOX_CAPACITY: usize = 1024;

/// Discovery and point-to-point delivery, as seen by one agent.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The agent this handle sends as.
    fn local_agent(&self) -> &AgentRef;

    /// Registered agents holding every capability in `capabilities`.
    async fn find_agents_by_capability(
        &self,
        capabilities: &[&str],
    ) -> TransportResult<Vec<AgentRef>>;

    async fn send(
        &self,
        to: &AgentRef,
        message_type: MessageType,
        payload: serde_json::Value,
    ) -> TransportResult<Message>;

    /// Drain messages delivered to this agent since the last call.
    async fn receive_inbound(&self) -> TransportResult<Vec<Message>>;
}

struct Registration {
    agent: AgentRef,
    inbox: mpsc::Sender<Message>,
}

/// Process-local registry and router. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct InMemoryBus {
    agents: Arc<RwLock<BTreeMap<String, Registration>>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `agent` and return its endpoint.
    pub async fn connect(&self, agent: AgentRef) -> TransportResult<BusEndpoint> {
        let mut agents = self.agents.write().await;
        if agents.contains_key(&agent.agent_id) {
            return Err(TransportError::DuplicateAgent(agent.agent_id));
        }
        let (sender, receiver) = mpsc::channel(INBOX_CAPACITY);
        agents.insert(
            agent.agent_id.clone(),
            Registration {
                agent: agent.clone(),
                inbox: sender,
            },
        );
        debug!(
            agent_id = %agent.agent_id,
            capabilities = ?agent.capabilities,
            "Agent registered"
        );
        Ok(BusEndpoint {
            bus: self.clone(),
            agent,
            inbox: Mutex::new(receiver),
        })
    }

    /// Remove an agent; later sends to it fail with `UnknownAgent`.
    pub async fn disconnect(&self, agent_id: &str) -> bool {
        let removed = self.agents.write().await.remove(agent_id).is_some();
        if removed {
            debug!(agent_id = %agent_id, "Agent deregistered");
        }
        removed
    }

    pub async fn agents(&self) -> Vec<AgentRef> {
        self.agents
            .read()
            .await
            .values()
            .map(|r| r.agent.clone())
            .collect()
    }

    async fn lookup(&self, capabilities: &[&str]) -> Vec<AgentRef> {
        self.agents
            .read()
            .await
            .values()
            .filter(|r| r.agent.has_all(capabilities))
            .map(|r| r.agent.clone())
            .collect()
    }

    async fn deliver(&self, message: Message) -> TransportResult<()> {
        let agents = self.agents.read().await;
        let registration = agents
            .get(&message.to)
            .ok_or_else(|| TransportError::UnknownAgent(message.to.clone()))?;
        let to = message.to.clone();
        match registration.inbox.try_send(message) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(agent_id = %to, "Inbox full, dropping message");
                Err(TransportError::InboxFull(to))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(TransportError::Disconnected(to)),
        }
    }
}

/// One agent's handle on an [`InMemoryBus`].
pub struct BusEndpoint {
    bus: InMemoryBus,
    agent: AgentRef,
    inbox: Mutex<mpsc::Receiver<Message>>,
}

impl BusEndpoint {
    pub fn bus(&self) -> &InMemoryBus {
        &self.bus
    }
}

#[async_trait]
impl Transport for BusEndpoint {
    fn local_agent(&self) -> &AgentRef {
        &self.agent
    }

    async fn find_agents_by_capability(
        &self,
        capabilities: &[&str],
    ) -> TransportResult<Vec<AgentRef>> {
        Ok(self.bus.lookup(capabilities).await)
    }

    async fn send(
        &self,
        to: &AgentRef,
        message_type: MessageType,
        payload: serde_json::Value,
    ) -> TransportResult<Message> {
        let message = Message::new(&self.agent.agent_id, &to.agent_id, message_type, payload);
        self.bus.deliver(message.clone()).await?;
        debug!(
            from = %message.from,
            to = %message.to,
            message_type = %message.message_type,
            message_id = %message.id,
            "Message sent"
        );
        Ok(message)
    }

    async fn receive_inbound(&self) -> TransportResult<Vec<Message>> {
        let mut inbox = self.inbox.lock().await;
        let mut messages = Vec::new();
        while let Ok(message) = inbox.try_recv() {
            messages.push(message);
        }
        Ok(messages)
    }
}
