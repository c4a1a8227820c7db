//! Request or console context captured at event time.

use activity_types::{ActivityContext, ConsoleContext, Invocation, RequestContext, WebRequest};
use uuid::Uuid;

const UNKNOWN_COMMAND: &str = "unknown";

/// Builds the record context from the invocation. Missing details become `None`; never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextCollector;

impl ContextCollector {
    pub fn collect(&self, invocation: &Invocation) -> ActivityContext {
        match invocation {
            Invocation::Web(req) => ActivityContext::Request(Self::request_context(req)),
            Invocation::Console(console) => ActivityContext::Console(ConsoleContext::new(
                console
                    .command
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .unwrap_or(UNKNOWN_COMMAND),
            )),
        }
    }

    fn request_context(req: &WebRequest) -> RequestContext {
        let request_id = req
            .request_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        RequestContext {
            ip: req.ip.clone(),
            user_agent: req.user_agent.clone(),
            request_id,
            session_id: req.session_id.clone(),
            route: req.route.clone(),
            method: req.method.clone(),
            url: req.url.clone(),
            referrer: req.referrer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use activity_types::ConsoleInvocation;

    #[test]
    fn web_request_keeps_inbound_request_id() {
        let inv = Invocation::Web(WebRequest {
            ip: Some("10.0.0.1".to_string()),
            request_id: Some("req-1".to_string()),
            method: Some("POST".to_string()),
            ..Default::default()
        });
        match ContextCollector.collect(&inv) {
            ActivityContext::Request(ctx) => {
                assert_eq!(ctx.request_id, "req-1");
                assert_eq!(ctx.ip.as_deref(), Some("10.0.0.1"));
                assert_eq!(ctx.session_id, None);
            }
            other => panic!("expected request context, got {:?}", other),
        }
    }

    #[test]
    fn missing_request_id_gets_fresh_uuid() {
        let inv = Invocation::Web(WebRequest {
            request_id: Some("  ".to_string()),
            ..Default::default()
        });
        let ActivityContext::Request(ctx) = ContextCollector.collect(&inv) else {
            panic!("expected request context");
        };
        assert!(Uuid::parse_str(&ctx.request_id).is_ok());
    }

    #[test]
    fn console_without_command_is_unknown() {
        let ctx = ContextCollector.collect(&Invocation::Console(ConsoleInvocation::default()));
        assert_eq!(
            ctx,
            ActivityContext::Console(ConsoleContext::new("unknown"))
        );

        let ctx = ContextCollector.collect(&Invocation::Console(ConsoleInvocation::new(
            "posts:import",
        )));
        assert_eq!(
            ctx,
            ActivityContext::Console(ConsoleContext::new("posts:import"))
        );
    }
}
