// Shared prompt fragments.
// Each module that needs LLM calls defines its own prompts.rs alongside it.

/// System prompt fragment for callers that expect a bare JSON array back.
pub const JSON_ARRAY_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with a single valid JSON array only. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps suggestions grounded in what the user actually told us.
pub const PROFILE_GROUNDING_INSTRUCTION: &str = "\
    Base every suggestion on the user's stated profile and the existing roadmap. \
    Do NOT repeat a step that is already in the roadmap. \
    Do NOT invent credentials, employers, or experience the user has not mentioned.";
