//! Actor resolution across authentication guards, in priority order.

use activity_types::{Credential, Guard, Invocation, UserInfo};

/// Resolves the current principal under one guard.
pub trait ActorResolver: Send + Sync {
    fn guard(&self) -> Guard;

    /// The principal authenticated under this guard, if any.
    fn resolve(&self, invocation: &Invocation) -> Option<UserInfo>;
}

/// First claim present among `names`.
fn claim(cred: &Credential, names: &[&str]) -> Option<String> {
    names.iter().find_map(|n| cred.claim(n))
}

pub struct VendorResolver;

impl ActorResolver for VendorResolver {
    fn guard(&self) -> Guard {
        Guard::Vendors
    }

    fn resolve(&self, invocation: &Invocation) -> Option<UserInfo> {
        let cred = invocation.credential(self.guard())?;
        Some(UserInfo::Vendor {
            id: cred.subject_id.clone(),
            company: claim(cred, &["company", "company_name"]),
            contact: claim(cred, &["contact", "contact_email"]),
        })
    }
}

pub struct ModeratorResolver;

impl ActorResolver for ModeratorResolver {
    fn guard(&self) -> Guard {
        Guard::Moderators
    }

    fn resolve(&self, invocation: &Invocation) -> Option<UserInfo> {
        let cred = invocation.credential(self.guard())?;
        Some(UserInfo::Moderator {
            id: cred.subject_id.clone(),
            nickname: claim(cred, &["nickname"]),
            level: claim(cred, &["level", "moderator_level"]),
        })
    }
}

pub struct SupportAgentResolver;

impl ActorResolver for SupportAgentResolver {
    fn guard(&self) -> Guard {
        Guard::SupportAgents
    }

    fn resolve(&self, invocation: &Invocation) -> Option<UserInfo> {
        let cred = invocation.credential(self.guard())?;
        Some(UserInfo::SupportAgent {
            id: cred.subject_id.clone(),
            department: claim(cred, &["department"]),
            shift: claim(cred, &["shift"]),
        })
    }
}

/// Ordered resolver list; the first resolver reporting a principal wins.
pub struct ActorChain {
    resolvers: Vec<Box<dyn ActorResolver>>,
}

impl ActorChain {
    pub fn new(resolvers: Vec<Box<dyn ActorResolver>>) -> Self {
        Self { resolvers }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Append a resolver with the lowest priority so far.
    pub fn with(mut self, resolver: impl ActorResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    pub fn guards(&self) -> Vec<Guard> {
        self.resolvers.iter().map(|r| r.guard()).collect()
    }

    /// `None` means anonymous.
    pub fn resolve(&self, invocation: &Invocation) -> Option<UserInfo> {
        self.resolvers.iter().find_map(|r| r.resolve(invocation))
    }
}

impl Default for ActorChain {
    /// vendors, then moderators, then support agents.
    fn default() -> Self {
        Self::empty()
            .with(VendorResolver)
            .with(ModeratorResolver)
            .with(SupportAgentResolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use activity_types::{ConsoleInvocation, WebRequest};

    fn web(credentials: Vec<Credential>) -> Invocation {
        Invocation::Web(WebRequest {
            credentials,
            ..Default::default()
        })
    }

    #[test]
    fn no_credentials_is_anonymous() {
        let chain = ActorChain::default();
        assert_eq!(chain.resolve(&web(vec![])), None);
        assert_eq!(
            chain.resolve(&Invocation::Console(ConsoleInvocation::default())),
            None
        );
    }

    #[test]
    fn vendor_outranks_support_agent() {
        let inv = web(vec![
            Credential::new(Guard::SupportAgents, "s1").with_claim("department", "billing"),
            Credential::new(Guard::Vendors, "v1")
                .with_claim("company_name", "Acme")
                .with_claim("contact_email", "ops@acme.test"),
        ]);
        let user = ActorChain::default().resolve(&inv).unwrap();
        assert_eq!(
            user,
            UserInfo::Vendor {
                id: "v1".to_string(),
                company: Some("Acme".to_string()),
                contact: Some("ops@acme.test".to_string()),
            }
        );
    }

    #[test]
    fn chain_order_is_the_priority() {
        let inv = web(vec![
            Credential::new(Guard::Vendors, "v1"),
            Credential::new(Guard::Moderators, "m1").with_claim("nickname", "mod"),
        ]);
        let chain = ActorChain::empty()
            .with(ModeratorResolver)
            .with(VendorResolver);
        assert_eq!(chain.guards(), vec![Guard::Moderators, Guard::Vendors]);
        assert_eq!(chain.resolve(&inv).unwrap().actor_type(), "moderator");
    }

    #[test]
    fn support_agent_claims_are_mapped() {
        let inv = web(vec![Credential::new(Guard::SupportAgents, "s9")
            .with_claim("department", "billing")
            .with_claim("shift", "night")]);
        let user = ActorChain::default().resolve(&inv).unwrap();
        assert_eq!(user.actor_type(), "support_agent");
        assert_eq!(user.id(), "s9");
    }
}
