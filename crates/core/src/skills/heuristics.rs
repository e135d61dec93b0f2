//! Keyword heuristics over mission text.
//!
//! Everything here is deterministic and total: any string yields an
//! answer.

use std::sync::OnceLock;

use regex::Regex;

use crate::plan::{Complexity, PhaseFlags, ProjectDomain};

const SIMPLE_TERMS: &[&str] = &["simple", "basic", "minimal", "prototype", "mvp", "small"];
const COMPLEX_TERMS: &[&str] = &[
    "complex",
    "enterprise",
    "scalable",
    "distributed",
    "advanced",
    "sophisticated",
    "microservice",
    "real-time",
    "high availability",
];

/// Domain keywords, checked in order; first match wins.
const DOMAIN_TERMS: &[(ProjectDomain, &[&str])] = &[
    (
        ProjectDomain::Blockchain,
        &["blockchain", "smart contract", "defi", "nft", "web3", "crypto"],
    ),
    (
        ProjectDomain::Ecommerce,
        &["ecommerce", "e-commerce", "shop", "store", "marketplace", "checkout", "cart"],
    ),
    (
        ProjectDomain::Mobile,
        &["mobile", "ios", "android", "react native", "flutter"],
    ),
    (
        ProjectDomain::Ai,
        &["machine learning", " ml ", "artificial intelligence", " ai ", "chatbot", "llm", "neural"],
    ),
    (
        ProjectDomain::Iot,
        &["iot", "sensor", "embedded", "device fleet", "firmware"],
    ),
    (
        ProjectDomain::Enterprise,
        &["enterprise", "erp", "crm", "compliance", "workflow"],
    ),
    (
        ProjectDomain::Web,
        &["web", "website", "blog", "portal", "dashboard", "saas", "cms"],
    ),
];

/// Terms that imply skills, independent of domain.
const SKILL_TERMS: &[(&str, &[&str])] = &[
    ("backend", &["backend_development", "api_design"]),
    ("api", &["api_development", "backend_development"]),
    ("frontend", &["frontend_development", "javascript"]),
    ("ui", &["ui_design", "frontend_development"]),
    ("database", &["database_design", "sql"]),
    ("auth", &["security", "backend_development"]),
    ("login", &["security", "backend_development"]),
    ("payment", &["payment_integration", "security"]),
    ("testing", &["testing", "test_automation"]),
    ("design", &["ui_design", "ux_design", "system_design"]),
    ("analysis", &["business_analysis", "technical_analysis"]),
    ("deploy", &["devops", "deployment"]),
    ("cloud", &["devops", "infrastructure"]),
    ("research", &["research", "analysis"]),
    ("architecture", &["architecture", "system_design"]),
];

fn timeline_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"(?i)\bwithin\s+(\d{1,3})\s+weeks?\b").expect("Invalid within pattern"),
            Regex::new(r"(?i)\btimeline:?\s*(\d{1,3})\s+weeks?\b").expect("Invalid timeline pattern"),
            Regex::new(r"(?i)\b(\d{1,3})[\s-]weeks?\s+(?:project|timeline|deadline|sprint)")
                .expect("Invalid duration pattern"),
            Regex::new(r"(?i)\bin\s+(\d{1,3})\s+weeks?\b").expect("Invalid in-weeks pattern"),
        ]
    })
}

fn contains_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| haystack.contains(t))
}

/// Lowercased with padding so word-ish terms like " ai " match at the edges.
fn normalized(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { ' ' })
        .collect();
    format!(" {} ", cleaned)
}

pub fn complexity(text: &str) -> Complexity {
    let text = normalized(text);
    if contains_any(&text, COMPLEX_TERMS) {
        Complexity::Complex
    } else if contains_any(&text, SIMPLE_TERMS) {
        Complexity::Simple
    } else {
        Complexity::Medium
    }
}

pub fn domain(text: &str) -> ProjectDomain {
    let text = normalized(text);
    DOMAIN_TERMS
        .iter()
        .find(|(_, terms)| contains_any(&text, terms))
        .map(|(domain, _)| *domain)
        .unwrap_or(ProjectDomain::General)
}

/// A timeline stated in the mission, e.g. "within 6 weeks".
pub fn explicit_weeks(text: &str) -> Option<u32> {
    timeline_patterns()
        .iter()
        .filter_map(|re| re.captures(text))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .find(|weeks| *weeks > 0)
}

pub fn phases(text: &str, complexity: Complexity) -> PhaseFlags {
    let text = normalized(text);
    let beyond_simple = complexity != Complexity::Simple;
    PhaseFlags {
        research: contains_any(&text, &["research", "analysis", "investigate", "discovery"])
            || complexity == Complexity::Complex,
        development: contains_any(
            &text,
            &["develop", "build", "create", "implement", "make", "write"],
        ) || !contains_any(&text, &["research only", "analysis only"]),
        testing: contains_any(&text, &["test", "quality", " qa "]) || beyond_simple,
        deployment: contains_any(&text, &["deploy", "launch", "release", "go-live", "publish"])
            || beyond_simple,
    }
}

/// Skills the domain calls for, before task-level detail.
pub fn domain_skills(domain: ProjectDomain) -> &'static [&'static str] {
    match domain {
        ProjectDomain::Blockchain => &["solidity", "blockchain_architecture", "security_audit"],
        ProjectDomain::Ecommerce => &["payment_integration", "backend_development", "ux_design"],
        ProjectDomain::Mobile => &["mobile_development", "mobile_ui", "api_design"],
        ProjectDomain::Ai => &["machine_learning", "data_modeling", "python"],
        ProjectDomain::Iot => &["embedded_systems", "infrastructure", "monitoring"],
        ProjectDomain::Enterprise => &["system_design", "integration_testing", "business_analysis"],
        ProjectDomain::Web => &["frontend_development", "backend_development", "database_design"],
        ProjectDomain::General => &["backend_development", "testing"],
    }
}

pub fn domain_technologies(domain: ProjectDomain) -> &'static [&'static str] {
    match domain {
        ProjectDomain::Blockchain => &["Solidity", "Ethereum", "Hardhat"],
        ProjectDomain::Ecommerce => &["PostgreSQL", "Stripe", "React"],
        ProjectDomain::Mobile => &["React Native", "REST API"],
        ProjectDomain::Ai => &["Python", "PyTorch", "Vector database"],
        ProjectDomain::Iot => &["MQTT", "Time-series database"],
        ProjectDomain::Enterprise => &["Kubernetes", "PostgreSQL", "SSO"],
        ProjectDomain::Web => &["React", "REST API", "PostgreSQL"],
        ProjectDomain::General => &["REST API", "PostgreSQL"],
    }
}

/// Skills mentioned directly by the text, in first-seen order.
pub fn mentioned_skills(text: &str) -> Vec<String> {
    let text = normalized(text);
    let mut skills: Vec<String> = Vec::new();
    for (term, mapped) in SKILL_TERMS {
        if text.contains(term) {
            for skill in mapped.iter() {
                if !skills.iter().any(|s| s == skill) {
                    skills.push(skill.to_string());
                }
            }
        }
    }
    skills
}

pub fn risk_factors(text: &str, complexity: Complexity, domain: ProjectDomain) -> Vec<String> {
    let lowered = normalized(text);
    let mut risks = Vec::new();
    if complexity == Complexity::Complex {
        risks.push("High technical complexity may extend integration time".to_string());
    }
    if matches!(domain, ProjectDomain::Blockchain | ProjectDomain::Ecommerce) {
        risks.push("Security-sensitive flows require an external review".to_string());
    }
    if contains_any(&lowered, &["auth", "login", "password", "payment"]) {
        risks.push("Handling credentials or payments needs careful threat modelling".to_string());
    }
    if explicit_weeks(text).map(|w| w < complexity.default_weeks()).unwrap_or(false) {
        risks.push("Requested timeline is shorter than typical for this scope".to_string());
    }
    risks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complexity_keywords() {
        assert_eq!(complexity("Create a simple blog"), Complexity::Simple);
        assert_eq!(
            complexity("A scalable, distributed event bus"),
            Complexity::Complex
        );
        assert_eq!(complexity("A recipe sharing site"), Complexity::Medium);
        // Complex wins when both appear.
        assert_eq!(
            complexity("A simple front for an enterprise ledger"),
            Complexity::Complex
        );
    }

    #[test]
    fn test_domain_detection() {
        assert_eq!(domain("NFT marketplace on Ethereum"), ProjectDomain::Blockchain);
        assert_eq!(domain("An online store with checkout"), ProjectDomain::Ecommerce);
        assert_eq!(domain("Android app for runners"), ProjectDomain::Mobile);
        assert_eq!(domain("Create a simple blog"), ProjectDomain::Web);
        assert_eq!(domain("Tidy the garage"), ProjectDomain::General);
    }

    #[test]
    fn test_ai_term_needs_word_boundary() {
        assert_ne!(domain("Email campaign tool"), ProjectDomain::Ai);
        assert_eq!(domain("An AI tutor"), ProjectDomain::Ai);
    }

    #[test]
    fn test_explicit_weeks() {
        assert_eq!(explicit_weeks("Ship it within 6 weeks please"), Some(6));
        assert_eq!(explicit_weeks("Timeline: 10 weeks"), Some(10));
        assert_eq!(explicit_weeks("a 3-week sprint"), Some(3));
        assert_eq!(explicit_weeks("no deadline"), None);
        assert_eq!(explicit_weeks("within 0 weeks"), None);
    }

    #[test]
    fn test_phases_for_simple_mission() {
        let flags = phases("Create a simple blog", Complexity::Simple);
        assert!(flags.development);
        assert!(!flags.research);
        assert!(!flags.testing);
    }

    #[test]
    fn test_mentioned_skills_dedup() {
        let skills = mentioned_skills("backend API with auth and login");
        assert!(skills.contains(&"security".to_string()));
        let unique: std::collections::HashSet<_> = skills.iter().collect();
        assert_eq!(unique.len(), skills.len());
    }
}
