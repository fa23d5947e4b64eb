//! Thought / Action / Observation loop over a chat model.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use super::actions::Toolbox;
use super::llm::{ChatMessage, ChatModel, ChatRequest, LlmError};
use super::prompts;

pub const STOP_SEQUENCE: &str = "\nObservation:";
pub const MAX_OBSERVATION_CHARS: usize = 2000;
const MAX_STEP_TOKENS: u32 = 1024;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("no final answer after {0} iterations")]
    IterationLimit(usize),
}

/// One model turn, as read from its raw output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Final(String),
    Act { action: String, input: String },
    Malformed,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentStep {
    pub action: String,
    pub input: String,
    pub observation: String,
}

#[derive(Debug, Clone)]
pub struct AgentRun {
    pub final_answer: String,
    pub steps: Vec<AgentStep>,
}

/// Reads one model turn. A `Final Answer:` wins unless an `Action:` line comes first.
pub fn parse_step(output: &str) -> Step {
    // anything past a hallucinated observation is ignored
    let output = output.split(STOP_SEQUENCE).next().unwrap_or(output);

    let final_at = output.find("Final Answer:");
    let action_at = output.find("Action:");

    match (final_at, action_at) {
        (Some(f), a) if a.map_or(true, |a| f < a) => {
            Step::Final(output[f + "Final Answer:".len()..].trim().to_string())
        }
        (_, Some(a)) => {
            let rest = &output[a + "Action:".len()..];
            let action = rest.lines().next().unwrap_or("").trim().to_string();
            let Some(i) = rest.find("Action Input:") else {
                return Step::Malformed;
            };
            let input = rest[i + "Action Input:".len()..].trim().to_string();
            if action.is_empty() {
                return Step::Malformed;
            }
            Step::Act { action, input }
        }
        _ => Step::Malformed,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub struct MenuAgent {
    model: Arc<dyn ChatModel>,
    toolbox: Toolbox,
    max_iterations: usize,
    timeout: Duration,
}

impl MenuAgent {
    pub fn new(model: Arc<dyn ChatModel>, toolbox: Toolbox, max_iterations: usize, timeout: Duration) -> Self {
        Self {
            model,
            toolbox,
            max_iterations: max_iterations.max(1),
            timeout,
        }
    }

    /// Runs the loop until the model declares a final answer.
    pub async fn run(&self, question: &str) -> Result<AgentRun, AgentError> {
        let system = prompts::agent_system(&self.toolbox.enabled());
        let mut scratchpad = String::new();
        let mut steps = Vec::new();

        for iteration in 1..=self.max_iterations {
            let request = ChatRequest {
                messages: vec![
                    ChatMessage::system(system.as_str()),
                    ChatMessage::user(format!("Question: {question}\nThought:{scratchpad}")),
                ],
                stop: vec![STOP_SEQUENCE.to_string()],
                max_tokens: Some(MAX_STEP_TOKENS),
            };
            let output = self.complete(&request).await?;

            let observation = match parse_step(&output) {
                Step::Final(answer) => {
                    info!("Menu agent finished after {} iteration(s)", iteration);
                    return Ok(AgentRun { final_answer: answer, steps });
                }
                Step::Act { action, input } => {
                    debug!("Agent iteration {}: {} {}", iteration, action, input);
                    let observation = truncate(&self.toolbox.observe(&action, &input).await, MAX_OBSERVATION_CHARS);
                    steps.push(AgentStep {
                        action,
                        input,
                        observation: observation.clone(),
                    });
                    observation
                }
                Step::Malformed => {
                    debug!("Agent iteration {}: malformed output", iteration);
                    "Invalid Format: reply with either 'Action:' and 'Action Input:' lines, or 'Final Answer:'."
                        .to_string()
                }
            };

            scratchpad.push(' ');
            scratchpad.push_str(output.trim());
            scratchpad.push_str("\nObservation: ");
            scratchpad.push_str(&observation);
            scratchpad.push_str("\nThought:");
        }

        Err(AgentError::IterationLimit(self.max_iterations))
    }

    /// A single prompt with no tools.
    pub async fn ask(&self, prompt: String) -> Result<String, LlmError> {
        let request = ChatRequest {
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: Some(64),
            ..Default::default()
        };
        self.complete(&request).await
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        tokio::time::timeout(self.timeout, self.model.complete(request))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))?
    }
}
