//! Typed view over the opaque CV document supplied by the caller.
//!
//! CV documents come from an editor we do not control, so every field is
//! optional and both `snake_case` and `camelCase` keys are accepted. Nothing
//! here fails: unknown shapes simply produce an emptier profile.

use serde::Serialize;
use serde_json::Value;

const SUMMARY_EXPERIENCE: usize = 3;
const SUMMARY_SKILLS: usize = 15;
const SUMMARY_EDUCATION: usize = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

impl ExperienceEntry {
    fn is_current(&self) -> bool {
        match self.end_date.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(end) => matches!(end.to_lowercase().as_str(), "present" | "current" | "now"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EducationEntry {
    pub degree: Option<String>,
    pub field: Option<String>,
    pub institution: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandidateProfile {
    pub name: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    pub experience: Vec<ExperienceEntry>,
    pub skills: Vec<String>,
    pub education: Vec<EducationEntry>,
}

/// Bounded projection sent to the model instead of the raw CV.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary<'a> {
    pub location: Option<&'a str>,
    pub experience: &'a [ExperienceEntry],
    pub skills: &'a [String],
    pub education: &'a [EducationEntry],
}

impl CandidateProfile {
    pub fn from_cv(cv: &Value) -> Self {
        let personal = field(cv, &["personal_info", "personalInfo", "personal", "contact"]);
        let location = personal
            .and_then(|p| text(p, &["location", "address"]))
            .or_else(|| {
                let p = personal?;
                let parts: Vec<String> = [text(p, &["city"]), text(p, &["country"])]
                    .into_iter()
                    .flatten()
                    .collect();
                (!parts.is_empty()).then(|| parts.join(", "))
            })
            .or_else(|| text(cv, &["location"]));

        Self {
            name: personal
                .and_then(|p| text(p, &["full_name", "fullName", "name"]))
                .or_else(|| text(cv, &["name"])),
            location,
            summary: text(cv, &["summary", "profile", "about"])
                .or_else(|| personal.and_then(|p| text(p, &["summary"]))),
            experience: list(cv, &["experience", "experiences", "work_experience", "workExperience"])
                .iter()
                .filter_map(parse_experience)
                .collect(),
            skills: parse_skills(cv),
            education: list(cv, &["education"])
                .iter()
                .map(|e| EducationEntry {
                    degree: text(e, &["degree", "title"]),
                    field: text(e, &["field", "field_of_study", "fieldOfStudy", "major"]),
                    institution: text(e, &["institution", "school", "university"]),
                })
                .collect(),
        }
    }

    /// The current role if one is open-ended, else the first listed role.
    pub fn latest_title(&self) -> Option<&str> {
        self.experience
            .iter()
            .find(|e| e.is_current())
            .or_else(|| self.experience.first())
            .map(|e| e.title.as_str())
    }

    pub fn summary(&self) -> ProfileSummary<'_> {
        ProfileSummary {
            location: self.location.as_deref(),
            experience: &self.experience[..self.experience.len().min(SUMMARY_EXPERIENCE)],
            skills: &self.skills[..self.skills.len().min(SUMMARY_SKILLS)],
            education: &self.education[..self.education.len().min(SUMMARY_EDUCATION)],
        }
    }
}

fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| value.get(*k))
        .filter(|v| !v.is_null())
}

fn text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn list<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    field(value, keys)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn parse_experience(entry: &Value) -> Option<ExperienceEntry> {
    Some(ExperienceEntry {
        title: text(entry, &["title", "position", "job_title", "jobTitle", "role"])?,
        company: text(entry, &["company", "employer", "organization"]),
        start_date: text(entry, &["start_date", "startDate", "from"]),
        end_date: text(entry, &["end_date", "endDate", "to"]),
        description: text(entry, &["description", "summary"]),
    })
}

/// Skills arrive as strings, `{name}` objects, or `{category: [..]}` groups.
fn parse_skills(cv: &Value) -> Vec<String> {
    let mut skills = Vec::new();
    match field(cv, &["skills"]) {
        Some(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::String(s) => skills.push(s.trim().to_string()),
                    Value::Object(_) => {
                        if let Some(name) = text(item, &["name", "skill"]) {
                            skills.push(name);
                        }
                        skills.extend(
                            list(item, &["items", "skills"])
                                .iter()
                                .filter_map(Value::as_str)
                                .map(|s| s.trim().to_string()),
                        );
                    }
                    _ => {}
                }
            }
        }
        Some(Value::Object(groups)) => {
            for group in groups.values() {
                if let Some(items) = group.as_array() {
                    skills.extend(items.iter().filter_map(Value::as_str).map(|s| s.trim().to_string()));
                }
            }
        }
        _ => {}
    }
    skills.retain(|s| !s.is_empty());
    skills
}
