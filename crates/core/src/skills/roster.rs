//! The people resource allocation draws from.

use crate::plan::{Member, Seniority};

struct RosterEntry {
    name: &'static str,
    seniority: Seniority,
    skills: &'static [&'static str],
}

const ROSTER: &[RosterEntry] = &[
    RosterEntry {
        name: "Alice Johnson",
        seniority: Seniority::Senior,
        skills: &["backend_development", "system_design", "architecture", "python", "api_design"],
    },
    RosterEntry {
        name: "Bob Chen",
        seniority: Seniority::Senior,
        skills: &["frontend_development", "javascript", "react", "ui_design"],
    },
    RosterEntry {
        name: "Carol Davis",
        seniority: Seniority::Senior,
        skills: &[
            "fullstack_development",
            "backend_development",
            "frontend_development",
            "database_design",
        ],
    },
    RosterEntry {
        name: "David Wilson",
        seniority: Seniority::Mid,
        skills: &["backend_development", "database_administration", "sql", "api_development"],
    },
    RosterEntry {
        name: "Eva Rodriguez",
        seniority: Seniority::Mid,
        skills: &["frontend_development", "javascript", "testing", "mobile_ui"],
    },
    RosterEntry {
        name: "Frank Kim",
        seniority: Seniority::Mid,
        skills: &["backend_development", "api_design", "integration_testing", "security"],
    },
    RosterEntry {
        name: "Grace Liu",
        seniority: Seniority::Specialist,
        skills: &["ux_design", "ui_design", "research", "user_experience"],
    },
    RosterEntry {
        name: "Henry Brown",
        seniority: Seniority::Specialist,
        skills: &["devops", "infrastructure", "deployment", "monitoring"],
    },
    RosterEntry {
        name: "Iris Taylor",
        seniority: Seniority::Specialist,
        skills: &["testing", "test_automation", "uat_coordination", "integration_testing"],
    },
    RosterEntry {
        name: "Jack Moore",
        seniority: Seniority::Analyst,
        skills: &["business_analysis", "communication", "research", "documentation"],
    },
    RosterEntry {
        name: "Kate Singh",
        seniority: Seniority::Analyst,
        skills: &["technical_analysis", "data_modeling", "analysis", "machine_learning"],
    },
];

/// Everyone available, in roster order.
pub fn available() -> Vec<Member> {
    ROSTER
        .iter()
        .map(|entry| Member {
            name: entry.name.to_string(),
            seniority: entry.seniority,
            skills: entry.skills.iter().map(|s| s.to_string()).collect(),
        })
        .collect()
}
