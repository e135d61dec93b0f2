//! Mission text and the analysis derived from it.

use std::fmt;

use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{require_non_empty, Validate};
use crate::error::ArtifactError;

/// Free-text problem statement. Immutable once accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Mission(String);

impl Mission {
    /// Accepts any non-blank text, trimmed.
    pub fn new(text: impl AsRef<str>) -> Result<Self, ArtifactError> {
        let text = text.as_ref().trim();
        if text.is_empty() {
            return Err(ArtifactError::EmptyMission);
        }
        Ok(Self(text.to_string()))
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Mission {
    type Error = ArtifactError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Mission::new(value)
    }
}

impl From<Mission> for String {
    fn from(mission: Mission) -> String {
        mission.0
    }
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, LLMOutput,
)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    Complex,
}

impl Complexity {
    /// Baseline duration when the mission names no timeline.
    pub fn default_weeks(self) -> u32 {
        match self {
            Complexity::Simple => 4,
            Complexity::Medium => 8,
            Complexity::Complex => 12,
        }
    }

    pub fn team_size(self) -> u32 {
        match self {
            Complexity::Simple => 2,
            Complexity::Medium => 4,
            Complexity::Complex => 6,
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Complexity::Simple => "simple",
            Complexity::Medium => "medium",
            Complexity::Complex => "complex",
        })
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, LLMOutput,
)]
#[serde(rename_all = "snake_case")]
pub enum ProjectDomain {
    Blockchain,
    Ecommerce,
    Mobile,
    Ai,
    Iot,
    Enterprise,
    Web,
    #[default]
    General,
}

impl fmt::Display for ProjectDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectDomain::Blockchain => "blockchain",
            ProjectDomain::Ecommerce => "ecommerce",
            ProjectDomain::Mobile => "mobile",
            ProjectDomain::Ai => "ai",
            ProjectDomain::Iot => "iot",
            ProjectDomain::Enterprise => "enterprise",
            ProjectDomain::Web => "web",
            ProjectDomain::General => "general",
        };
        f.write_str(name)
    }
}

/// Which delivery phases the mission calls for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct PhaseFlags {
    pub research: bool,
    pub development: bool,
    pub testing: bool,
    pub deployment: bool,
}

/// Longest schedule a plan may span, ten years.
pub const MAX_WEEKS: u32 = 520;

/// Output of the mission analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct MissionAnalysis {
    /// The mission text this analysis was derived from
    #[serde(default)]
    pub mission: String,
    pub complexity: Complexity,
    pub domain: ProjectDomain,
    /// Expected delivery time in weeks
    pub estimated_weeks: u32,
    #[serde(default)]
    pub key_technologies: Vec<String>,
    /// Skill identifiers in snake_case, e.g. "backend_development"
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub phases: PhaseFlags,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    pub recommended_team_size: u32,
}

impl MissionAnalysis {
    /// `estimated_weeks` clamped into the schedulable range.
    pub fn schedule_weeks(&self) -> u32 {
        self.estimated_weeks.clamp(1, MAX_WEEKS)
    }
}

impl Validate for MissionAnalysis {
    fn validate(&self) -> Result<(), ArtifactError> {
        require_non_empty("mission", &self.mission)?;
        if self.estimated_weeks == 0 || self.estimated_weeks > MAX_WEEKS {
            return Err(ArtifactError::InvalidValue {
                field: "estimated_weeks".into(),
                reason: format!("must be between 1 and {} weeks", MAX_WEEKS),
            });
        }
        if self.recommended_team_size == 0 {
            return Err(ArtifactError::InvalidValue {
                field: "recommended_team_size".into(),
                reason: "must be at least one person".into(),
            });
        }
        Ok(())
    }
}
