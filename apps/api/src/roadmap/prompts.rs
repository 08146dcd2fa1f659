// Roadmap personalization prompt templates.

pub const PERSONALIZE_SYSTEM: &str = "\
You are a career coach who extends learning roadmaps. \
Every suggested step is an object with exactly the keys \"order\" (integer), \"label\" (string) \
and \"estTime\" (string). An empty array is not allowed.";

pub const PERSONALIZE_PROMPT_TEMPLATE: &str = r#"A user is following the "{roadmap_id}" career roadmap.

CURRENT STEPS (JSON):
{steps}

USER PROFILE (JSON):
{profile}

Suggest up to {max_steps} ADDITIONAL steps that would make this roadmap fit the user better.

OUTPUT SCHEMA (return exactly this structure):
[
  {"order": 1, "label": "short imperative description of the step", "estTime": "e.g. 2 weeks"}
]

RULES:
1. Return between 1 and {max_steps} new steps.
2. "order" is the position among YOUR suggestions, starting at 1.
3. "estTime" is a short human duration such as "3 days" or "2 weeks".
4. Return ONLY the JSON array — nothing else, no code fences.

{grounding}"#;
