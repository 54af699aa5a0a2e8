// Prompt constants and fixed user-facing copy for the workflow.

pub const ORCHESTRATOR_ROLE: &str = "You are the routing brain of a career assistant. \
    You classify what the user wants so the right specialist can handle it.";

/// Intent classification prompt.
/// Replace: {message}, {context_json}
pub const INTENT_PROMPT_TEMPLATE: &str = r#"Classify the user's latest request.

Return a JSON object with this EXACT schema:
{
  "intent": "analyze_cv",
  "confidence": 0.92,
  "reply": null,
  "application_status": null,
  "notes": null
}

INTENTS (pick exactly one):
- "analyze_cv": the user wants feedback on, or a score for, their CV.
- "find_jobs": the user wants job suggestions or matches.
- "track_application": the user applied somewhere, or an application changed status.
- "enhance_letter": the user wants a cover letter improved.
- "general": anything else. Put a short, helpful answer in "reply".

For "track_application" set "application_status" to one of
"saved", "applied", "interviewing", "offered", "accepted", "rejected", "withdrawn"
when the message states it, and copy any details the user gave into "notes".

"confidence" is between 0 and 1.

CONTEXT AVAILABLE:
{context_json}

USER MESSAGE:
{message}"#;

pub const CV_EVALUATION_ROLE: &str = "You are a senior recruiter who reviews CVs \
    and gives candid, actionable feedback.";

/// CV evaluation prompt.
/// Replace: {cv_json}, {target_job_json}, {honesty_instruction}
pub const CV_EVALUATION_PROMPT_TEMPLATE: &str = r#"Evaluate the CV below.

Return a JSON object with this EXACT schema:
{
  "overall_score": 72,
  "strengths": ["Clear impact metrics in recent roles"],
  "improvements": ["Add a skills section grouped by domain"],
  "summary": "Solid mid-level backend profile held back by a vague summary."
}

"overall_score" is between 0 and 100. Give 3-5 strengths and 3-5 improvements.
If a target job is given, judge the CV against it.

{honesty_instruction}

CV:
{cv_json}

TARGET JOB:
{target_job_json}"#;

pub const LETTER_ROLE: &str = "You are an expert editor of job application cover letters.";

/// Cover letter enhancement prompt.
/// Replace: {letter}, {target_job_json}, {profile_json}, {honesty_instruction}
pub const LETTER_PROMPT_TEMPLATE: &str = r#"Improve the cover letter below.

Return a JSON object with this EXACT schema:
{
  "enhanced_letter": "Dear hiring team, ...",
  "changes": ["Opened with the most relevant achievement"]
}

Keep the author's voice. Keep it under 400 words. Tailor it to the target job when one is given.
List every substantive change in "changes".

{honesty_instruction}

CANDIDATE PROFILE:
{profile_json}

TARGET JOB:
{target_job_json}

COVER LETTER:
{letter}"#;

pub const GREETING: &str = "Hi! Tell me what you would like to do: review your CV, \
    find matching jobs, track an application, or polish a cover letter.";

pub const CAPABILITIES: &str = "I can review your CV, find jobs that match it, \
    keep track of your applications, and improve your cover letters.";

pub const NEED_CV: &str = "Please select the CV you want me to work with first.";

pub const NEED_USER: &str = "Please sign in so I can save this to your account.";

pub const NEED_TARGET_JOB: &str = "Which job is this about? Share the job title and company \
    (or pick one from your matches) and I will record it.";

pub const NEED_COVER_LETTER: &str = "Please paste the cover letter you would like me to improve.";

pub const GENERIC_FAILURE: &str = "Sorry, something went wrong on my side. Please try again in a moment.";

pub const RANKING_FAILURE: &str = "Sorry, I could not rank jobs for you right now. Please try again.";

pub const NO_JOBS_FOUND: &str = "I could not find any jobs matching your profile right now. \
    Try a different job title or location.";
