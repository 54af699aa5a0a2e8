// Prompt constants for the job ranking step.

/// Role description for ranking; combined with the JSON-only rule via `json_system`.
pub const RANKING_ROLE: &str = "You are an experienced technical recruiter who matches \
    candidates to open positions and scores every match honestly.";

/// Ranking prompt template.
/// Replace: {profile_json}, {jobs_json}, {honesty_instruction}
pub const RANKING_PROMPT_TEMPLATE: &str = r#"Score how well the candidate below fits each job.

Return a JSON object with this EXACT schema (no extra fields):
{
  "rankings": [
    {
      "job_id": "adzuna-4412",
      "score": 82,
      "reason": "Strong Python and Django overlap; no Kubernetes experience.",
      "keywords": ["Python", "Django", "PostgreSQL"]
    }
  ]
}

SCORING (0-100):
- Skills alignment carries the most weight.
- Seniority and domain alignment come next.
- Location, remote preference and other secondary factors come last.

RULES:
- Include one entry per job, using the job's "id" value verbatim as "job_id".
- "keywords" lists the candidate skills that appear in the job.
- "reason" is one or two sentences and names the biggest gap, if any.

{honesty_instruction}

CANDIDATE PROFILE:
{profile_json}

JOBS:
{jobs_json}"#;
