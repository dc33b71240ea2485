use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured resume as returned by the parse endpoints. Every section is
/// optional and absent sections are left out of the JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedResume {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_info: Option<PersonalInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<Vec<Experience>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<Vec<Education>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Skills>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certifications: Option<Vec<Certification>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awards: Option<Vec<Award>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publications: Option<Vec<Publication>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volunteer: Option<Vec<Volunteer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_sections: Option<Vec<AdditionalSection>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsibilities: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpa: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_of_study: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skills {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technologies: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Award {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volunteer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalSection {
    pub title: String,
    pub content: String,
}

impl ParsedResume {
    /// Builds a resume from an untrusted model reply. Fields of the wrong type
    /// and empty strings are dropped; the rest of the reply is kept.
    pub fn from_reply(reply: &Value) -> Self {
        Self {
            personal_info: reply
                .get("personalInfo")
                .filter(|v| v.is_object())
                .map(|v| PersonalInfo {
                    name: text(v, "name"),
                    email: text(v, "email"),
                    phone: text(v, "phone"),
                    location: text(v, "location"),
                    linkedin: text(v, "linkedin"),
                    website: text(v, "website"),
                    github: text(v, "github"),
                }),
            summary: text(reply, "summary"),
            experience: entries(reply, "experience", |v| Experience {
                title: text(v, "title"),
                company: text(v, "company"),
                location: text(v, "location"),
                start_date: text(v, "startDate"),
                end_date: text(v, "endDate"),
                current: v.get("current").and_then(Value::as_bool),
                description: text(v, "description"),
                responsibilities: strings(v, "responsibilities"),
            }),
            education: entries(reply, "education", |v| Education {
                degree: text(v, "degree"),
                institution: text(v, "institution"),
                location: text(v, "location"),
                graduation_date: text(v, "graduationDate"),
                gpa: text(v, "gpa"),
                field_of_study: text(v, "fieldOfStudy"),
            }),
            skills: reply.get("skills").filter(|v| v.is_object()).map(|v| Skills {
                technical: strings(v, "technical"),
                soft: strings(v, "soft"),
                languages: strings(v, "languages"),
                tools: strings(v, "tools"),
            }),
            certifications: entries(reply, "certifications", |v| Certification {
                name: text(v, "name"),
                issuer: text(v, "issuer"),
                date: text(v, "date"),
                credential_id: text(v, "credentialId"),
            }),
            projects: entries(reply, "projects", |v| Project {
                name: text(v, "name"),
                description: text(v, "description"),
                technologies: strings(v, "technologies"),
                link: text(v, "link"),
            }),
            awards: entries(reply, "awards", |v| Award {
                name: text(v, "name"),
                issuer: text(v, "issuer"),
                date: text(v, "date"),
                description: text(v, "description"),
            }),
            publications: entries(reply, "publications", |v| Publication {
                title: text(v, "title"),
                publisher: text(v, "publisher"),
                date: text(v, "date"),
                link: text(v, "link"),
            }),
            volunteer: entries(reply, "volunteer", |v| Volunteer {
                organization: text(v, "organization"),
                role: text(v, "role"),
                start_date: text(v, "startDate"),
                end_date: text(v, "endDate"),
                description: text(v, "description"),
            }),
            additional_sections: entries(reply, "additionalSections", |v| AdditionalSection {
                title: text(v, "title").unwrap_or_default(),
                content: text(v, "content").unwrap_or_default(),
            }),
        }
    }
}

/// Non-empty string field. Numbers are kept as text (a GPA often comes back as 3.8).
fn text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn strings(value: &Value, key: &str) -> Option<Vec<String>> {
    let items = value.get(key)?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .collect(),
    )
}

fn entries<T>(value: &Value, key: &str, build: impl Fn(&Value) -> T) -> Option<Vec<T>> {
    let items = value.get(key)?.as_array()?;
    Some(items.iter().filter(|v| v.is_object()).map(build).collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_reply_keeps_well_typed_fields() {
        let resume = ParsedResume::from_reply(&json!({
            "personalInfo": {"name": "Rana Haddad", "email": "", "github": "github.com/rana"},
            "summary": "Backend engineer",
            "experience": [{
                "title": "Engineer",
                "current": "yes",
                "responsibilities": ["Built APIs", 42, ""]
            }],
            "education": [{"degree": "BSc", "gpa": 3.8}],
            "skills": {"technical": ["Rust"], "soft": "Leadership"}
        }));

        let info = resume.personal_info.unwrap();
        assert_eq!(info.name.as_deref(), Some("Rana Haddad"));
        assert_eq!(info.email, None);
        assert_eq!(info.github.as_deref(), Some("github.com/rana"));
        assert_eq!(resume.summary.as_deref(), Some("Backend engineer"));

        let job = &resume.experience.unwrap()[0];
        assert_eq!(job.current, None);
        assert_eq!(job.responsibilities.as_deref(), Some(&["Built APIs".to_string()][..]));

        assert_eq!(resume.education.unwrap()[0].gpa.as_deref(), Some("3.8"));
        let skills = resume.skills.unwrap();
        assert_eq!(skills.technical, Some(vec!["Rust".to_string()]));
        assert_eq!(skills.soft, None);
        assert!(resume.projects.is_none());
    }

    #[test]
    fn test_from_reply_ignores_wrongly_shaped_sections() {
        let resume = ParsedResume::from_reply(&json!({
            "personalInfo": "Rana",
            "summary": 7,
            "experience": {"title": "Engineer"},
            "additionalSections": [{"title": "Hobbies"}, "loose text"]
        }));
        assert!(resume.personal_info.is_none());
        assert_eq!(resume.summary.as_deref(), Some("7"));
        assert!(resume.experience.is_none());
        assert_eq!(
            resume.additional_sections,
            Some(vec![AdditionalSection {
                title: "Hobbies".to_string(),
                content: String::new(),
            }])
        );
    }

    #[test]
    fn test_serializes_camel_case_and_skips_absent_sections() {
        let resume = ParsedResume {
            experience: Some(vec![Experience {
                start_date: Some("2020".to_string()),
                current: Some(true),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let value = serde_json::to_value(&resume).unwrap();
        assert_eq!(value["experience"][0]["startDate"], "2020");
        assert_eq!(value["experience"][0]["current"], true);
        assert!(value.get("personalInfo").is_none());
        assert!(value["experience"][0].get("title").is_none());
    }
}
