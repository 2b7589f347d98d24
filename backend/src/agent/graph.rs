//! ReAct agent graph
//!
//! Two nodes, run in a loop: call the model with the available tools, then
//! execute whatever tool calls it asked for and feed the results back. The
//! loop ends when the model answers without tool calls or `max_steps` model
//! calls have been made.

use super::prompts::{agent_system_prompt, STEP_LIMIT_ANSWER};
use super::tools::Tool;
use crate::error::ProviderError;
use crate::providers::{Message, ProviderRouter, ToolCall, ToolSpec};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Input to an agent run
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// User message
    pub message: String,
    /// Model id, routed through `ProviderRouter`
    pub model: String,
}

/// A long-running agent producing a message transcript
#[async_trait]
pub trait AgentGraph: Send + Sync {
    /// Run the agent to completion
    ///
    /// Returns the full transcript; the final answer is the last assistant
    /// message without tool calls. Implementations should check `cancel`
    /// between steps.
    async fn run(
        &self,
        request: AgentRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<Message>, ProviderError>;
}

/// Model + tools loop
pub struct ReactAgent {
    providers: Arc<ProviderRouter>,
    tools: Vec<Arc<dyn Tool>>,
    max_steps: usize,
}

impl ReactAgent {
    /// Create an agent without tools
    pub fn new(providers: Arc<ProviderRouter>, max_steps: usize) -> Self {
        Self {
            providers,
            tools: Vec::new(),
            max_steps: max_steps.max(1),
        }
    }

    /// Offer `tool` to the model
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    async fn run_tool(&self, call: &ToolCall) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.spec().name == call.name) else {
            warn!(tool = %call.name, "Model requested unknown tool");
            return format!("Error: unknown tool '{}'", call.name);
        };

        match tool.call(&call.arguments).await {
            Ok(output) => output,
            // The model sees the failure and can recover
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call failed");
                format!("Error: {}", e)
            }
        }
    }
}

#[async_trait]
impl AgentGraph for ReactAgent {
    async fn run(
        &self,
        request: AgentRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<Message>, ProviderError> {
        let routed = self.providers.route(&request.model)?;
        let specs: Vec<ToolSpec> = self.tools.iter().map(|t| t.spec()).collect();
        let mut messages = vec![Message::user(request.message)];

        info!(
            provider = routed.provider.name(),
            model = %routed.model,
            tools = specs.len(),
            "Starting agent run"
        );

        for step in 1..=self.max_steps {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }

            let mut prompt = Vec::with_capacity(messages.len() + 1);
            prompt.push(Message::system(agent_system_prompt()));
            prompt.extend(messages.iter().cloned());

            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                response = routed.provider.invoke(&routed.model, &prompt, &specs) => response?,
            };

            debug!(
                step = step,
                tool_calls = response.tool_calls.len(),
                "Agent model step"
            );

            if !response.has_tool_calls() {
                messages.push(response);
                return Ok(messages);
            }

            if step == self.max_steps {
                info!(max_steps = self.max_steps, "Agent hit step limit");
                messages.push(Message::assistant(STEP_LIMIT_ANSWER));
                return Ok(messages);
            }

            let calls = response.tool_calls.clone();
            messages.push(response);
            for call in &calls {
                let output = self.run_tool(call).await;
                messages.push(Message::tool(call.id.clone(), output));
            }
        }

        Ok(messages)
    }
}
