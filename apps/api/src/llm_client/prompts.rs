// Cross-cutting prompt fragments.
// Each module that talks to the model keeps its own prompts.rs alongside it.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Reminder appended to prompts whose output feeds a user-facing assistant message.
pub const HONESTY_INSTRUCTION: &str = "\
    Be explicit about gaps and weaknesses. Do NOT inflate scores or praise. \
    Base every statement on the candidate data provided; never invent experience.";

/// Builds a system prompt from a role description plus the JSON-only rule.
pub fn json_system(role: &str) -> String {
    format!("{role} {JSON_ONLY_SYSTEM}")
}
