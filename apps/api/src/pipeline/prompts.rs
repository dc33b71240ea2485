// Prompt constants for title suggestion, match scoring and resume parsing.
// Titles and scoring are sent with llm_client::prompts::JSON_ONLY_SYSTEM as the system prompt.

/// Title suggestion prompt. Replace `{resume_text}` before sending.
pub const SUGGEST_TITLES_PROMPT: &str = r#"Analyze the following resume and suggest the job titles this candidate is most suitable for.
Return between 1 and 3 titles, most suitable first. Use short, common titles that a job board search would match.

Return a JSON object with this EXACT schema:
{
  "jobs": ["Software Engineer", "Backend Developer"]
}

Resume text:
{resume_text}"#;

/// First turn of the scoring conversation. Replace `{resume_text}`.
pub const SCORE_RESUME_TURN: &str = "Here is a resume:\n{resume_text}";

/// Second turn. Replace `{postings}` with the JSON array of postings.
pub const SCORE_POSTINGS_TURN: &str = "Here are some job postings, each identified by its jobId:\n{postings}";

/// Final instruction turn.
pub const SCORE_INSTRUCTIONS: &str = r#"Evaluate how well the resume matches each job posting.

Return a JSON array with one element per posting worth considering, using this EXACT schema:
[
  {
    "jobId": 1,
    "matchScore": 87,
    "strengths": ["..."],
    "weaknesses": ["..."],
    "missingRequirements": ["..."],
    "recommendations": ["..."]
  }
]

Rules:
- jobId MUST be one of the jobId values given above.
- matchScore is an integer from 0 to 100.
- Omit postings that are clearly unrelated to the candidate."#;

/// System prompt for structured resume parsing.
pub const PARSE_RESUME_SYSTEM: &str = r#"You extract structured data from resumes.
Respond with one JSON object using exactly these field names (case-sensitive):

{
  "personalInfo": {"name": "", "email": "", "phone": "", "location": "", "linkedin": "", "website": "", "github": ""},
  "summary": "",
  "experience": [{"title": "", "company": "", "location": "", "startDate": "", "endDate": "", "current": false, "description": "", "responsibilities": [""]}],
  "education": [{"degree": "", "institution": "", "location": "", "graduationDate": "", "gpa": "", "fieldOfStudy": ""}],
  "skills": {"technical": [""], "soft": [""], "languages": [""], "tools": [""]},
  "certifications": [{"name": "", "issuer": "", "date": "", "credentialId": ""}],
  "projects": [{"name": "", "description": "", "technologies": [""], "link": ""}],
  "awards": [{"name": "", "issuer": "", "date": "", "description": ""}],
  "publications": [{"title": "", "publisher": "", "date": "", "link": ""}],
  "volunteer": [{"organization": "", "role": "", "startDate": "", "endDate": "", "description": ""}],
  "additionalSections": [{"title": "", "content": ""}]
}

Rules:
- Omit any section the resume does not contain. Do not invent fields.
- "current" is a JSON boolean.
- Output the JSON object only: no markdown, no code fences, no commentary."#;

/// Resume parsing user turn. Replace `{resume_text}` before sending.
pub const PARSE_RESUME_PROMPT: &str = r#"Parse this resume into the JSON structure described in the system prompt.

Resume text:
{resume_text}"#;
