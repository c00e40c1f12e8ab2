//! System and per-round prompt composition.

use super::command::{FINAL_ANSWER_PREFIX, FUNCTION_CALL_PREFIX};
use super::dispatch::Observation;
use crate::tools::{ParamType, ToolCatalog, ToolDescriptor};

/// Directive appended after each round's observations.
pub const NEXT_ACTION_DIRECTIVE: &str = "  What should I do next?";

const MAX_EXAMPLES: usize = 3;

/// Builds the system prompt once per run and the task prompt per round.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_prompt: String,
}

impl PromptBuilder {
    pub fn new(catalog: &ToolCatalog) -> Self {
        Self::with_guidance(catalog, &[])
    }

    /// Like [`PromptBuilder::new`], with extra operating guidance lines.
    pub fn with_guidance(catalog: &ToolCatalog, guidance: &[String]) -> Self {
        Self {
            system_prompt: build_system_prompt(catalog, guidance),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// The complete prompt sent to the model for a round.
    pub fn round_prompt(&self, query: &str) -> String {
        format!("{}\n\nQuery: {}", self.system_prompt, query)
    }
}

/// Extend the task prompt with one round's observation.
pub fn next_query(previous: &str, observation: &Observation) -> String {
    format!(
        "{previous}\n\n{}{NEXT_ACTION_DIRECTIVE}",
        observation.flatten()
    )
}

fn build_system_prompt(catalog: &ToolCatalog, guidance: &[String]) -> String {
    let mut prompt = String::from(
        "You are an agent solving problems in iterations. \
         You have access to the following tools.\n\nAvailable tools:\n",
    );
    prompt.push_str(&catalog.describe());

    prompt.push_str(&format!(
        "\n\nYou must respond with EXACTLY ONE line in one of these formats (no additional text):\n\
         1. For function calls:\n   {FUNCTION_CALL_PREFIX} function_name|param1|param2|...\n\
         2. For final answers:\n   {FINAL_ANSWER_PREFIX} [answer]\n"
    ));

    prompt.push_str(
        "\nImportant:\n\
         - Pass parameters positionally, in the order listed for each tool\n\
         - Write array parameters as comma-separated integers, e.g. [1,2,3]\n\
         - When a function returns multiple values, process all of them\n\
         - Only give a final answer once every necessary step is complete\n\
         - Do not repeat function calls with the same parameters\n",
    );
    for line in guidance {
        prompt.push_str("- ");
        prompt.push_str(line.trim());
        prompt.push('\n');
    }

    prompt.push_str("\nExamples:\n");
    for tool in catalog.tools().iter().take(MAX_EXAMPLES) {
        prompt.push_str("- ");
        prompt.push_str(&example_call(tool));
        prompt.push('\n');
    }
    prompt.push_str(&format!("- {FINAL_ANSWER_PREFIX} [42]\n"));

    prompt.push_str(&format!(
        "\nDO NOT include any explanations or additional text.\n\
         Your entire response should be a single line starting with either \
         {FUNCTION_CALL_PREFIX} or {FINAL_ANSWER_PREFIX}"
    ));
    prompt
}

fn example_call(tool: &ToolDescriptor) -> String {
    let mut call = format!("{FUNCTION_CALL_PREFIX} {}", tool.name);
    for param in &tool.parameters {
        call.push('|');
        call.push_str(match param.param_type {
            ParamType::Integer => "5",
            ParamType::Number => "2.5",
            ParamType::Array => "[1,2,3]",
            ParamType::String | ParamType::Other(_) => "text",
        });
    }
    call
}
