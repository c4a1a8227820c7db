//! Where a lifecycle event was raised from: a web request or a console process.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Named authentication context a principal was established under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guard {
    Vendors,
    Moderators,
    SupportAgents,
}

impl Guard {
    pub fn as_str(self) -> &'static str {
        match self {
            Guard::Vendors => "vendors",
            Guard::Moderators => "moderators",
            Guard::SupportAgents => "support_agents",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "vendors" | "vendor" => Some(Guard::Vendors),
            "moderators" | "moderator" => Some(Guard::Moderators),
            "support_agents" | "support_agent" => Some(Guard::SupportAgents),
            _ => None,
        }
    }
}

impl std::fmt::Display for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A principal authenticated by the caller's auth layer under one guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub guard: Guard,
    pub subject_id: String,
    #[serde(default)]
    pub claims: HashMap<String, String>,
}

impl Credential {
    pub fn new(guard: Guard, subject_id: impl Into<String>) -> Self {
        Self {
            guard,
            subject_id: subject_id.into(),
            claims: HashMap::new(),
        }
    }

    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    pub fn claim(&self, name: &str) -> Option<String> {
        self.claims.get(name).cloned()
    }
}

/// Request metadata available while serving a web request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebRequest {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    /// Inbound correlation id (`X-Request-ID`), if the client sent one.
    pub request_id: Option<String>,
    pub session_id: Option<String>,
    pub route: Option<String>,
    pub method: Option<String>,
    pub url: Option<String>,
    pub referrer: Option<String>,
    pub credentials: Vec<Credential>,
}

/// Console or background process that raised the event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleInvocation {
    pub command: Option<String>,
}

impl ConsoleInvocation {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
        }
    }

    /// Command name from the process arguments (first argument after the binary).
    pub fn from_args() -> Self {
        Self {
            command: std::env::args().nth(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Web(WebRequest),
    Console(ConsoleInvocation),
}

/// Coarse origin of an invocation, used for skip policy and tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationSource {
    Web,
    Console,
}

impl InvocationSource {
    pub fn as_str(self) -> &'static str {
        match self {
            InvocationSource::Web => "web",
            InvocationSource::Console => "console",
        }
    }
}

impl Invocation {
    pub fn source(&self) -> InvocationSource {
        match self {
            Invocation::Web(_) => InvocationSource::Web,
            Invocation::Console(_) => InvocationSource::Console,
        }
    }

    pub fn credentials(&self) -> &[Credential] {
        match self {
            Invocation::Web(req) => &req.credentials,
            Invocation::Console(_) => &[],
        }
    }

    /// First credential established under `guard`.
    pub fn credential(&self, guard: Guard) -> Option<&Credential> {
        self.credentials().iter().find(|c| c.guard == guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_parse_accepts_singular_and_plural() {
        assert_eq!(Guard::parse("Vendors"), Some(Guard::Vendors));
        assert_eq!(Guard::parse("support-agent"), Some(Guard::SupportAgents));
        assert_eq!(Guard::parse("admins"), None);
    }

    #[test]
    fn console_invocation_has_no_credentials() {
        let inv = Invocation::Console(ConsoleInvocation::new("posts:import"));
        assert!(inv.credentials().is_empty());
        assert!(inv.credential(Guard::Vendors).is_none());
        assert_eq!(inv.source(), InvocationSource::Console);
    }

    #[test]
    fn credential_lookup_takes_first_under_guard() {
        let inv = Invocation::Web(WebRequest {
            credentials: vec![
                Credential::new(Guard::Moderators, "m-1"),
                Credential::new(Guard::Vendors, "v-1"),
                Credential::new(Guard::Vendors, "v-2"),
            ],
            ..Default::default()
        });
        let vendor = inv.credential(Guard::Vendors).map(|c| c.subject_id.as_str());
        assert_eq!(vendor, Some("v-1"));
        assert!(inv.credential(Guard::SupportAgents).is_none());
    }
}
