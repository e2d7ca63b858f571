use std::sync::Arc;

use anyhow::Context;
use authgate_adapters::{Gate, MemoryNavigator, UserQuery};
use authgate_core::GateOutcome;
use authgate_runtime::GuardContext;

use crate::pout;

#[derive(Debug, Clone, Default)]
pub struct CheckArgs {
    pub roles: Vec<String>,
    pub backend_check: bool,
    pub route: Option<String>,
    pub middleware: Option<String>,
    pub redirect_to: Option<String>,
}

pub async fn cmd_can_access(
    ctx: &GuardContext,
    route: &str,
    middleware: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let allowed = ctx
        .try_can_access(route, middleware)
        .await
        .with_context(|| format!("access check for {route} failed"))?;

    pout(
        json,
        serde_json::json!({"route": route, "middleware": middleware, "allowed": allowed}),
        &format!("{route}: {}", if allowed { "allowed" } else { "denied" }),
    )
}

pub async fn cmd_has_role(ctx: &GuardContext, roles: Vec<String>, json: bool) -> anyhow::Result<()> {
    let user = ctx.fetch_user().await;
    let held = ctx.has_role(roles.clone());

    let user_roles = user.as_ref().and_then(|u| u.roles()).map(<[String]>::to_vec);
    let text = match (&user, held) {
        (None, _) => "not authenticated".to_string(),
        (Some(_), true) => format!("yes: holds one of {}", roles.join(", ")),
        (Some(_), false) => format!("no: holds none of {}", roles.join(", ")),
    };
    pout(
        json,
        serde_json::json!({
            "authenticated": user.is_some(),
            "requested": roles,
            "user_roles": user_roles,
            "has_role": held,
        }),
        &text,
    )
}

/// Evaluate the gate once for the given route and print the decision. No
/// navigation is performed.
pub async fn cmd_check(ctx: &GuardContext, args: CheckArgs, json: bool) -> anyhow::Result<()> {
    let navigator = Arc::new(MemoryNavigator::new(args.route.as_deref().unwrap_or("/")));
    let query = Arc::new(UserQuery::new(ctx.clone()));

    let mut gate = Gate::new(query, navigator)
        .roles(args.roles)
        .backend_check(args.backend_check);
    if let Some(middleware) = args.middleware {
        gate = gate.middleware(middleware);
    }
    if let Some(target) = args.redirect_to {
        gate = gate.redirect_to(target);
    }

    let outcome = gate.evaluate().await;
    pout(json, serde_json::to_value(&outcome)?, &summarize(&outcome))
}

fn summarize(outcome: &GateOutcome) -> String {
    match outcome {
        GateOutcome::Pending => "pending".to_string(),
        GateOutcome::Render => "render".to_string(),
        GateOutcome::Redirect {
            target,
            navigation,
            reason,
        } => format!("redirect to {target} ({navigation:?}): {reason:?}"),
        GateOutcome::Fallback { reason } => format!("blocked ({reason:?}); render fallback"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate_core::{BlockReason, Navigation};

    #[test]
    fn summaries_name_the_reason() {
        let redirect = GateOutcome::Redirect {
            target: "/login".to_string(),
            navigation: Navigation::ClientRoute,
            reason: BlockReason::Unauthenticated,
        };
        assert_eq!(summarize(&redirect), "redirect to /login (ClientRoute): Unauthenticated");
        assert_eq!(
            summarize(&GateOutcome::Fallback {
                reason: BlockReason::MissingRole
            }),
            "blocked (MissingRole); render fallback"
        );
    }

    #[test]
    fn outcome_json_is_tagged() {
        let value = serde_json::to_value(GateOutcome::Fallback {
            reason: BlockReason::BackendDenied,
        })
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({"outcome": "fallback", "reason": "backend_denied"})
        );
    }
}
