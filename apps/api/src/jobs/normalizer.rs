//! Job Normalizer — pure mapping from source-specific records to `NormalizedJob`.
//!
//! No I/O and no state. Everything here is defensive: a malformed date or an
//! empty salary yields `None`, never an error.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::jobs::models::{JobMatchResult, JobSourceKind, LocationParts, NormalizedJob};
use crate::jobs::sources::adzuna::AdzunaJob;
use crate::jobs::sources::arbeitnow::ArbeitnowJob;
use crate::jobs::sources::remoteok::RemoteOkJob;

/// Phrases that mark a posting as remote-friendly.
const REMOTE_KEYWORDS: &[&str] = &[
    "remote",
    "work from home",
    "work-from-home",
    "wfh",
    "distributed",
    "anywhere",
    "telecommute",
    "home office",
    "home-office",
];

/// Default description budget used when building ranking prompts.
pub const DEFAULT_DESCRIPTION_CHARS: usize = 500;

// ────────────────────────────────────────────────────────────────────────────
// Per-source mappings
// ────────────────────────────────────────────────────────────────────────────

pub fn normalize_adzuna(job: &AdzunaJob, country_code: &str) -> NormalizedJob {
    let location = job
        .location
        .as_ref()
        .and_then(|l| {
            l.display_name
                .clone()
                .filter(|d| !d.trim().is_empty())
                .or_else(|| (!l.area.is_empty()).then(|| l.area.join(", ")))
        })
        .unwrap_or_else(|| country_code.to_uppercase());

    let company = job
        .company
        .as_ref()
        .and_then(|c| c.display_name.clone())
        .unwrap_or_else(|| "Unknown company".to_string());

    let description = clean_text(&job.description);
    let contract = [job.contract_time.as_deref(), job.contract_type.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    NormalizedJob {
        id: prefixed_id(JobSourceKind::Adzuna, &job.id),
        source_job_id: job.id.clone(),
        source: JobSourceKind::Adzuna,
        title: clean_text(&job.title),
        company,
        remote: detect_remote(&[&job.title, &description, &location, &contract]),
        description,
        url: job.redirect_url.clone(),
        location,
        salary: format_salary(job.salary_min, job.salary_max),
        posted_date: job.created.as_deref().and_then(parse_date),
        search_category: None,
    }
}

pub fn normalize_arbeitnow(job: &ArbeitnowJob) -> NormalizedJob {
    let description = clean_text(&job.description);
    let job_types = job.job_types.join(" ");
    let location = if job.location.trim().is_empty() {
        "Germany".to_string()
    } else {
        job.location.trim().to_string()
    };

    NormalizedJob {
        id: prefixed_id(JobSourceKind::Arbeitnow, &job.slug),
        source_job_id: job.slug.clone(),
        source: JobSourceKind::Arbeitnow,
        title: clean_text(&job.title),
        company: job.company_name.trim().to_string(),
        remote: job.remote || detect_remote(&[&job.title, &description, &job_types]),
        description,
        url: job.url.clone(),
        location,
        salary: None,
        posted_date: job.created_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
        search_category: None,
    }
}

pub fn normalize_remoteok(job: &RemoteOkJob) -> NormalizedJob {
    let url = job
        .url
        .clone()
        .or_else(|| job.apply_url.clone())
        .unwrap_or_else(|| format!("https://remoteok.com/remote-jobs/{}", job.id));
    let location = if job.location.trim().is_empty() {
        "Remote".to_string()
    } else {
        job.location.trim().to_string()
    };

    NormalizedJob {
        id: prefixed_id(JobSourceKind::RemoteOk, &job.id),
        source_job_id: job.id.clone(),
        source: JobSourceKind::RemoteOk,
        title: clean_text(&job.position),
        company: job.company.trim().to_string(),
        description: clean_text(&job.description),
        url,
        location,
        salary: format_salary(job.salary_min, job.salary_max),
        // every listing on this board is remote
        remote: true,
        posted_date: job.date.as_deref().and_then(parse_date),
        search_category: None,
    }
}

fn prefixed_id(source: JobSourceKind, source_id: &str) -> String {
    format!("{}-{}", source.id_prefix(), source_id)
}

/// Strips a source prefix from an aggregated job id (`adzuna-123` → `123`).
pub fn strip_source_prefix(id: &str) -> &str {
    for kind in JobSourceKind::all().iter().chain([JobSourceKind::Mock].iter()) {
        if let Some(rest) = id
            .strip_prefix(kind.id_prefix())
            .and_then(|r| r.strip_prefix('-'))
        {
            return rest;
        }
    }
    id
}

// ────────────────────────────────────────────────────────────────────────────
// Field helpers
// ────────────────────────────────────────────────────────────────────────────

/// True when any of the given text fields mentions a remote-work keyword.
pub fn detect_remote(fields: &[&str]) -> bool {
    fields.iter().any(|field| {
        let lower = field.to_lowercase();
        REMOTE_KEYWORDS.iter().any(|kw| lower.contains(kw))
    })
}

/// Formats an optional salary range. Non-positive amounts count as missing.
///
/// `"$X - $Y"`, `"$X+"`, `"Up to $Y"`, or `None`.
pub fn format_salary(min: Option<f64>, max: Option<f64>) -> Option<String> {
    let min = min.filter(|v| v.is_finite() && *v > 0.0);
    let max = max.filter(|v| v.is_finite() && *v > 0.0);
    match (min, max) {
        (Some(lo), Some(hi)) => Some(format!("${} - ${}", format_amount(lo), format_amount(hi))),
        (Some(lo), None) => Some(format!("${}+", format_amount(lo))),
        (None, Some(hi)) => Some(format!("Up to ${}", format_amount(hi))),
        (None, None) => None,
    }
}

/// Rounds to whole units and inserts thousands separators.
fn format_amount(amount: f64) -> String {
    let digits = (amount.round() as u64).to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Parses the date formats the sources emit. Anything else is `None`.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Cuts `text` to at most `max_chars` characters, preferring a sentence end.
///
/// A sentence boundary is used when it keeps at least half the budget;
/// otherwise the cut falls on the last word boundary and gets an ellipsis.
pub fn truncate_description(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();
    let sentence_end = cut
        .char_indices()
        .filter(|(_, c)| matches!(c, '.' | '!' | '?'))
        .map(|(i, c)| i + c.len_utf8())
        .last();

    if let Some(end) = sentence_end {
        if cut[..end].chars().count() >= max_chars / 2 {
            return cut[..end].to_string();
        }
    }

    let word_end = cut.rfind(char::is_whitespace).unwrap_or(cut.len());
    format!("{}...", cut[..word_end].trim_end())
}

/// Merges a normalized job with the ranking verdict.
pub fn to_job_match_result(
    job: NormalizedJob,
    score: f64,
    reason: impl Into<String>,
    keywords: Vec<String>,
) -> JobMatchResult {
    JobMatchResult {
        job,
        match_score: score.clamp(0.0, 100.0),
        match_reason: reason.into(),
        keyword_matches: keywords,
    }
}

/// Splits `"City, State, Country"` heuristically by comma count.
///
/// One part is a city, two parts are city + state (two-letter code) or
/// city + country, three or more parts are city, state, country (last).
pub fn split_location(location: &str) -> LocationParts {
    let parts: Vec<&str> = location
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    match parts.as_slice() {
        [] => LocationParts::default(),
        [city] => LocationParts {
            city: Some(city.to_string()),
            ..Default::default()
        },
        [city, second] if is_state_code(second) => LocationParts {
            city: Some(city.to_string()),
            state: Some(second.to_string()),
            country: None,
        },
        [city, country] => LocationParts {
            city: Some(city.to_string()),
            state: None,
            country: Some(country.to_string()),
        },
        [city, state, .., country] => LocationParts {
            city: Some(city.to_string()),
            state: Some(state.to_string()),
            country: Some(country.to_string()),
        },
    }
}

fn is_state_code(part: &str) -> bool {
    part.len() == 2 && part.chars().all(|c| c.is_ascii_uppercase())
}

/// Removes HTML tags and entities left in source descriptions and collapses whitespace.
fn clean_text(raw: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
    let stripped = tags.replace_all(raw, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::sources::adzuna::{AdzunaCompany, AdzunaLocation};

    fn adzuna_job() -> AdzunaJob {
        AdzunaJob {
            id: "4412".to_string(),
            title: "<strong>Python</strong> Developer".to_string(),
            description: "Build data pipelines. Hybrid &amp; flexible.".to_string(),
            redirect_url: "https://adzuna.example/4412".to_string(),
            company: Some(AdzunaCompany {
                display_name: Some("Initech".to_string()),
            }),
            location: Some(AdzunaLocation {
                display_name: None,
                area: vec!["Netherlands".to_string(), "Breda".to_string()],
            }),
            salary_min: Some(45000.0),
            salary_max: Some(60000.0),
            created: Some("2024-05-01T09:30:00Z".to_string()),
            contract_time: Some("full_time".to_string()),
            contract_type: None,
        }
    }

    #[test]
    fn test_normalize_adzuna_maps_fields() {
        let job = normalize_adzuna(&adzuna_job(), "nl");
        assert_eq!(job.id, "adzuna-4412");
        assert_eq!(job.source_job_id, "4412");
        assert_eq!(job.title, "Python Developer");
        assert_eq!(job.company, "Initech");
        assert_eq!(job.location, "Netherlands, Breda");
        assert_eq!(job.salary.as_deref(), Some("$45,000 - $60,000"));
        assert_eq!(job.description, "Build data pipelines. Hybrid & flexible.");
        assert!(!job.remote);
        assert!(job.posted_date.is_some());
    }

    #[test]
    fn test_normalize_remoteok_is_always_remote() {
        let job = normalize_remoteok(&RemoteOkJob {
            id: "1001".to_string(),
            company: "Hooli".to_string(),
            position: "SRE".to_string(),
            description: "<p>On-call rotation.</p>".to_string(),
            location: String::new(),
            tags: vec![],
            salary_min: Some(0.0),
            salary_max: Some(0.0),
            date: Some("not a date".to_string()),
            url: None,
            apply_url: None,
        });
        assert!(job.remote);
        assert_eq!(job.id, "remoteok-1001");
        assert_eq!(job.location, "Remote");
        assert_eq!(job.salary, None);
        assert_eq!(job.posted_date, None);
        assert_eq!(job.url, "https://remoteok.com/remote-jobs/1001");
    }

    #[test]
    fn test_normalize_arbeitnow_honours_remote_flag_and_timestamp() {
        let job = normalize_arbeitnow(&ArbeitnowJob {
            slug: "backend-dev-berlin-123".to_string(),
            company_name: "Globex".to_string(),
            title: "Backend Developer".to_string(),
            description: "Kotlin services.".to_string(),
            remote: true,
            url: "https://arbeitnow.example/123".to_string(),
            tags: vec![],
            job_types: vec!["full time".to_string()],
            location: "Berlin".to_string(),
            created_at: Some(1_714_550_400),
        });
        assert!(job.remote);
        assert_eq!(job.id, "arbeitnow-backend-dev-berlin-123");
        assert_eq!(
            job.posted_date.map(|d| d.date_naive().to_string()),
            Some("2024-05-01".to_string())
        );
    }

    #[test]
    fn test_detect_remote_keywords() {
        assert!(detect_remote(&["We are a fully distributed team"]));
        assert!(detect_remote(&["Office in Paris", "Work From Home on Fridays"]));
        assert!(!detect_remote(&["On-site in Munich", "full_time"]));
    }

    #[test]
    fn test_format_salary_variants() {
        assert_eq!(format_salary(Some(50000.0), Some(70000.0)).as_deref(), Some("$50,000 - $70,000"));
        assert_eq!(format_salary(Some(50000.0), Some(50000.0)).as_deref(), Some("$50,000 - $50,000"));
        assert_eq!(format_salary(Some(1234567.4), None).as_deref(), Some("$1,234,567+"));
        assert_eq!(format_salary(None, Some(900.0)).as_deref(), Some("Up to $900"));
        assert_eq!(format_salary(None, None), None);
        assert_eq!(format_salary(Some(0.0), Some(-5.0)), None);
    }

    #[test]
    fn test_parse_date_is_defensive() {
        assert!(parse_date("2024-03-04T10:00:00Z").is_some());
        assert!(parse_date("2024-03-04T10:00:00").is_some());
        assert!(parse_date("2024-03-04").is_some());
        assert!(parse_date("").is_none());
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("2024-13-45").is_none());
    }

    #[test]
    fn test_truncate_prefers_sentence_boundary() {
        let text = "First sentence here. Second sentence is quite a bit longer than the first.";
        assert_eq!(truncate_description(text, 40), "First sentence here.");
    }

    #[test]
    fn test_truncate_falls_back_to_word_boundary() {
        let text = "A very long description without any sentence punctuation at all in it";
        let out = truncate_description(text, 30);
        assert!(out.ends_with("..."), "{out}");
        assert!(out.chars().count() <= 33);
    }

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_description("  Short.  ", 100), "Short.");
    }

    #[test]
    fn test_split_location_by_comma_count() {
        assert_eq!(
            split_location("Breda, Netherlands"),
            LocationParts {
                city: Some("Breda".into()),
                state: None,
                country: Some("Netherlands".into())
            }
        );
        assert_eq!(
            split_location("San Francisco, CA"),
            LocationParts {
                city: Some("San Francisco".into()),
                state: Some("CA".into()),
                country: None
            }
        );
        assert_eq!(
            split_location("Austin, Texas, USA"),
            LocationParts {
                city: Some("Austin".into()),
                state: Some("Texas".into()),
                country: Some("USA".into())
            }
        );
        assert_eq!(split_location(" , "), LocationParts::default());
    }

    #[test]
    fn test_strip_source_prefix() {
        assert_eq!(strip_source_prefix("adzuna-123"), "123");
        assert_eq!(strip_source_prefix("remoteok-77"), "77");
        assert_eq!(strip_source_prefix("arbeitnow-dev-berlin-1"), "dev-berlin-1");
        assert_eq!(strip_source_prefix("unprefixed"), "unprefixed");
    }

    #[test]
    fn test_to_job_match_result_clamps_score() {
        let job = normalize_remoteok(&RemoteOkJob {
            id: "5".to_string(),
            company: "Acme".to_string(),
            position: "Dev".to_string(),
            description: String::new(),
            location: "Worldwide".to_string(),
            tags: vec![],
            salary_min: None,
            salary_max: None,
            date: None,
            url: Some("https://remoteok.com/5".to_string()),
            apply_url: None,
        });
        let result = to_job_match_result(job, 140.0, "great", vec!["rust".into()]);
        assert_eq!(result.match_score, 100.0);
        assert_eq!(result.keyword_matches, vec!["rust".to_string()]);
    }
}
