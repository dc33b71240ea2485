//! Canned postings, scores and a parsed resume served when `TESTING_MODE` is on.
//! The scores go through the same ranking code as live results.

use super::capabilities::MatchScore;
use crate::models::resume::{
    Award, Certification, Education, Experience, PersonalInfo, Project, Skills,
};
use crate::models::{ParsedResume, Posting};

fn posting(
    sequence_id: u64,
    title: &str,
    company: &str,
    location: &str,
    date_posted: &str,
    description: &str,
) -> Posting {
    Posting {
        sequence_id,
        title: title.to_string(),
        link: format!("https://example.com/job/{sequence_id}"),
        description: description.to_string(),
        company: Some(company.to_string()),
        location: Some(location.to_string()),
        date_posted: Some(date_posted.to_string()),
    }
}

pub fn fixture_postings() -> Vec<Posting> {
    vec![
        posting(1, "Senior Full Stack Developer", "Tech Innovations Inc.", "Beirut, Lebanon", "2025-10-28",
            "Build and maintain web applications with React, Node.js and TypeScript in an agile team."),
        posting(2, "Frontend Developer - React", "Digital Solutions Ltd.", "Remote", "2025-10-27",
            "Create responsive interfaces in React with TypeScript and Redux alongside design and backend teams."),
        posting(3, "Backend Node.js Engineer", "StartupXYZ", "Beirut, Lebanon", "2025-10-26",
            "Design RESTful APIs on Node.js and Express, tune MongoDB and PostgreSQL queries."),
        posting(4, "Software Engineer - JavaScript", "Global Tech Corp", "Hybrid - Beirut", "2025-10-25",
            "Work across frontend and backend projects in JavaScript and TypeScript."),
        posting(5, "DevOps Engineer", "CloudTech Solutions", "Remote", "2025-10-24",
            "Own Docker, Kubernetes and CI/CD pipelines on AWS and Azure."),
        posting(6, "Full Stack Developer - MERN Stack", "WebDev Agency", "Beirut, Lebanon", "2025-10-23",
            "Ship MongoDB, Express, React and Node.js applications end to end. 3+ years required."),
        posting(7, "Software Developer - TypeScript", "Enterprise Systems Inc.", "Remote", "2025-10-22",
            "Develop scalable enterprise applications in TypeScript with cross-functional teams."),
        posting(8, "Junior Web Developer", "TechStart Lebanon", "Beirut, Lebanon", "2025-10-21",
            "Grow as a web developer working with HTML, CSS and JavaScript under senior guidance."),
    ]
}

fn score(
    job_id: u64,
    match_score: f64,
    strengths: &[&str],
    weaknesses: &[&str],
    missing: &[&str],
    recommendations: &[&str],
) -> MatchScore {
    let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
    MatchScore {
        job_id,
        match_score,
        strengths: owned(strengths),
        weaknesses: owned(weaknesses),
        missing_requirements: owned(missing),
        recommendations: owned(recommendations),
    }
}

pub fn fixture_scores() -> Vec<MatchScore> {
    vec![
        score(1, 92.0,
            &["Five years of full-stack work fits the senior scope", "React and TypeScript match the main stack"],
            &["Little GraphQL exposure"],
            &["GraphQL"],
            &["Lead with the e-commerce platform's system design"]),
        score(4, 88.0,
            &["Strong JavaScript and TypeScript across the stack"],
            &["Mostly product-focused experience"],
            &[],
            &["Show a backend project with measurable performance gains"]),
        score(2, 85.0,
            &["Modern React with hooks and Redux"],
            &["Role is frontend only"],
            &["Design system ownership"],
            &["Add a UI portfolio link"]),
        score(6, 72.0,
            &["Hands-on MERN experience"],
            &["Limited MongoDB schema design"],
            &["MongoDB performance tuning"],
            &["Mention document modelling work explicitly"]),
        score(3, 58.0,
            &["Express and REST API experience"],
            &["No PostgreSQL tuning on record"],
            &["Query optimization"],
            &["Highlight database work from previous roles"]),
        score(5, 45.0,
            &["CI/CD pipeline setup"],
            &["No Kubernetes in production"],
            &["Kubernetes", "Azure"],
            &["Pursue a cloud certification"]),
        score(7, 38.0,
            &["TypeScript proficiency"],
            &["Enterprise domain unfamiliar"],
            &["Enterprise integration patterns"],
            &["Frame past work in enterprise terms"]),
        score(8, 25.0,
            &["Solid web fundamentals"],
            &["Overqualified for a junior role"],
            &[],
            &["Target senior positions instead"]),
    ]
}

fn list(items: &[&str]) -> Option<Vec<String>> {
    Some(items.iter().map(|s| s.to_string()).collect())
}

fn some(s: &str) -> Option<String> {
    Some(s.to_string())
}

pub fn fixture_parsed_resume() -> ParsedResume {
    ParsedResume {
        personal_info: Some(PersonalInfo {
            name: some("John Doe"),
            email: some("john.doe@email.com"),
            phone: some("+961-123-4567"),
            location: some("Beirut, Lebanon"),
            linkedin: some("linkedin.com/in/johndoe"),
            website: some("johndoe.dev"),
            github: some("github.com/johndoe"),
        }),
        summary: some(
            "Full stack developer with 5+ years building scalable web applications in \
             JavaScript, TypeScript, React, Node.js and cloud services.",
        ),
        experience: Some(vec![
            Experience {
                title: some("Senior Software Engineer"),
                company: some("Tech Innovations Inc."),
                location: some("Beirut, Lebanon"),
                start_date: some("January 2020"),
                end_date: some("Present"),
                current: Some(true),
                description: some("Leads a microservices platform serving 1M+ users"),
                responsibilities: list(&[
                    "Led the move to a microservices architecture",
                    "Mentored a team of 5 junior developers",
                    "Cut deployment time by 60% with CI/CD pipelines",
                ]),
            },
            Experience {
                title: some("Software Engineer"),
                company: some("StartupXYZ"),
                location: some("Beirut, Lebanon"),
                start_date: some("June 2018"),
                end_date: some("December 2019"),
                current: Some(false),
                description: some("Full-stack development on a React and Node.js product"),
                responsibilities: list(&[
                    "Built RESTful APIs with Node.js and Express",
                    "Improved database query performance by 40%",
                ]),
            },
        ]),
        education: Some(vec![Education {
            degree: some("Bachelor of Science in Computer Science"),
            institution: some("American University of Beirut"),
            location: some("Beirut, Lebanon"),
            graduation_date: some("May 2018"),
            gpa: some("3.8"),
            field_of_study: some("Computer Science"),
        }]),
        skills: Some(Skills {
            technical: list(&["JavaScript", "TypeScript", "Python", "React", "Node.js", "PostgreSQL"]),
            soft: list(&["Leadership", "Communication", "Problem Solving"]),
            languages: list(&["English (Fluent)", "Arabic (Native)", "French (Intermediate)"]),
            tools: list(&["Git", "Docker", "Kubernetes", "AWS"]),
        }),
        certifications: Some(vec![Certification {
            name: some("AWS Certified Solutions Architect - Associate"),
            issuer: some("Amazon Web Services"),
            date: some("2021"),
            credential_id: some("AWS-ASA-123456"),
        }]),
        projects: Some(vec![Project {
            name: some("E-commerce Platform"),
            description: some("Full-stack shop handling 10K+ daily transactions"),
            technologies: list(&["React", "Node.js", "MongoDB", "Stripe API"]),
            link: some("github.com/johndoe/ecommerce-platform"),
        }]),
        awards: Some(vec![Award {
            name: some("Best Innovation Award"),
            issuer: some("Tech Innovations Inc."),
            date: some("2022"),
            description: some("Recognized for the microservices architecture"),
        }]),
        publications: None,
        volunteer: None,
        additional_sections: None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_every_fixture_score_names_a_fixture_posting() {
        let ids: HashSet<u64> = fixture_postings().iter().map(|p| p.sequence_id).collect();
        assert_eq!(ids.len(), 8);
        assert!(fixture_scores().iter().all(|s| ids.contains(&s.job_id)));
    }

    #[test]
    fn test_fixture_resume_survives_reply_normalization() {
        let resume = fixture_parsed_resume();
        let reply = serde_json::to_value(&resume).unwrap();
        assert_eq!(ParsedResume::from_reply(&reply), resume);
    }
}
