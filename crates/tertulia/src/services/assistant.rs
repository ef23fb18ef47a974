use std::collections::HashMap;
use std::sync::Arc;

use tertulia_core::tool::ToolRegistry;
use tertulia_core::{Agent, AgentBuilder, ModelClient};
use tokio::sync::Mutex;

use crate::config::AssistantSettings;
use crate::error::ApiError;

pub const DEFAULT_SESSION: &str = "default";

/// The tool-using assistant behind `/chat`, one memory per session.
pub struct AssistantService {
    model_client: ModelClient,
    tools: Arc<ToolRegistry>,
    settings: AssistantSettings,
    sessions: Mutex<SessionTable>,
}

/// Live agents keyed by session, bounded by dropping the least recently
/// used one. A dropped handle ends its actor, so the session's memory goes
/// with it.
#[derive(Default)]
struct SessionTable {
    agents: HashMap<String, (Agent, u64)>,
    clock: u64,
}

impl SessionTable {
    fn get(&mut self, id: &str) -> Option<Agent> {
        self.clock += 1;
        let (agent, last_used) = self.agents.get_mut(id)?;
        *last_used = self.clock;
        Some(agent.clone())
    }

    fn insert(&mut self, id: String, agent: Agent, capacity: usize) {
        while self.agents.len() >= capacity.max(1) {
            let Some(oldest) = self
                .agents
                .iter()
                .min_by_key(|(_, (_, last_used))| *last_used)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            debug!("dropping idle session `{oldest}`");
            self.agents.remove(&oldest);
        }
        self.clock += 1;
        self.agents.insert(id, (agent, self.clock));
    }
}

impl AssistantService {
    pub fn new(
        model_client: ModelClient,
        tools: Arc<ToolRegistry>,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            model_client,
            tools,
            settings,
            sessions: Default::default(),
        }
    }

    pub async fn chat(&self, session: &str, message: &str) -> Result<String, ApiError> {
        let agent = self.session(session).await;
        let reply = agent.chat(message).await?;
        debug!(
            "session `{session}` used {} tokens",
            reply.usage.total_tokens()
        );
        Ok(reply.text)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.agents.len()
    }

    // The lock only guards the table, turns run on the agent's own task.
    async fn session(&self, id: &str) -> Agent {
        let mut sessions = self.sessions.lock().await;
        if let Some(agent) = sessions.get(id) {
            return agent;
        }
        info!("starting session `{id}`");
        let agent = AgentBuilder::with_model_client(self.model_client.clone())
            .system_prompt(&self.settings.system_prompt)
            .memory_capacity(self.settings.memory_capacity)
            .max_tool_rounds(self.settings.max_tool_rounds)
            .tools(self.tools.clone())
            .build();
        sessions.insert(id.to_owned(), agent.clone(), self.settings.max_sessions);
        agent
    }
}
