//! # Service Cards
//!
//! A worker's self-description, served at [`WELL_KNOWN_PATH`].

use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Discovery path every service answers on.
pub const WELL_KNOWN_PATH: &str = "/.well-known/agent.json";

/// Path of the message endpoint relative to a service's base address.
pub const SEND_MESSAGE_PATH: &str = "/api/send_message";

/// Where to reach a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEndpoints {
    pub base_url: String,
    #[serde(alias = "send_message")]
    pub send_message_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCard {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub endpoints: CardEndpoints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
}

impl ServiceCard {
    /// Card for a service listening at `base_url`.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        capabilities: Vec<String>,
        base_url: &str,
    ) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: description.into(),
            capabilities,
            endpoints: CardEndpoints {
                base_url: base.to_string(),
                send_message_url: format!("{}{}", base, SEND_MESSAGE_PATH),
            },
            contact: None,
            agent_type: None,
        }
    }

    pub fn with_agent_type(mut self, agent_type: impl Into<String>) -> Self {
        self.agent_type = Some(agent_type.into());
        self
    }

    /// Checks the fields discovery depends on. Returns the parsed
    /// message endpoint on success.
    pub fn validate(&self) -> Result<Url, String> {
        if self.name.trim().is_empty() {
            return Err("missing name".to_string());
        }
        if self.capabilities.iter().all(|c| c.trim().is_empty()) {
            return Err("empty capability set".to_string());
        }
        parse_http_url(&self.endpoints.base_url).map_err(|e| format!("base_url: {}", e))?;
        parse_http_url(&self.endpoints.send_message_url)
            .map_err(|e| format!("send_message_url: {}", e))
    }

    /// Message endpoint, assuming the card was validated.
    pub fn send_message_url(&self) -> &str {
        &self.endpoints.send_message_url
    }
}

fn parse_http_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("'{}' is not a URL ({})", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_card_is_valid() {
        let card = ServiceCard::new(
            "Task Breakdown Service",
            "Breaks milestones into tasks",
            vec!["task_breakdown".into()],
            "http://127.0.0.1:9003/",
        );
        assert_eq!(
            card.send_message_url(),
            "http://127.0.0.1:9003/api/send_message"
        );
        assert!(card.validate().is_ok());
    }

    #[test]
    fn test_accepts_legacy_endpoint_key() {
        let card: ServiceCard = serde_json::from_value(json!({
            "name": "Milestone Service",
            "version": "1.0.0",
            "capabilities": ["timeline_planning"],
            "endpoints": {
                "base_url": "http://localhost:9002",
                "send_message": "http://localhost:9002/api/send_message"
            }
        }))
        .unwrap();
        assert!(card.validate().is_ok());
    }

    #[test]
    fn test_rejects_incomplete_cards() {
        let mut card = ServiceCard::new("x", "", vec!["a".into()], "http://h:1");
        card.capabilities.clear();
        assert!(card.validate().unwrap_err().contains("capability"));

        let mut card = ServiceCard::new(" ", "", vec!["a".into()], "http://h:1");
        assert!(card.validate().unwrap_err().contains("name"));

        card.name = "ok".into();
        card.endpoints.send_message_url = "ftp://h/x".into();
        assert!(card.validate().is_err());
    }
}
