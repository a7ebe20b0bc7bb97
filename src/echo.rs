use crate::action::ActionHandler;
use crate::context::Context;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Stash key collecting every action invoked so far in the current dispatch.
pub const CHAIN_STASH_KEY: &str = "echo.chain";

/// Action body that echoes the dispatch back as JSON.
///
/// Each invocation appends `{action, args}` to the stash under
/// [`CHAIN_STASH_KEY`], so a chained request reports every link it ran
/// through. The response of the last invocation wins.
#[must_use]
pub fn echo_handler(private_path: impl Into<String>, status: u16) -> ActionHandler {
    let private_path: String = private_path.into();
    Arc::new(move |ctx: &mut Context, args: &[String]| {
        let link = json!({ "action": private_path, "args": args });
        let slot = ctx
            .stash_mut()
            .entry(CHAIN_STASH_KEY.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        let chain = match slot {
            Value::Array(links) => {
                links.push(link);
                Value::Array(links.clone())
            }
            other => {
                *other = Value::Array(vec![link]);
                other.clone()
            }
        };

        let request = ctx.request();
        let query: Map<String, Value> = request
            .query_params
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
            .collect();
        let body = json!({
            "action": private_path,
            "request_id": request.request_id.to_string(),
            "method": request.method.as_str(),
            "path": request.path,
            "args": args,
            "captures": ctx.captures(),
            "chain": chain,
            "query": query,
            "body": request.body,
        });
        ctx.response_mut().set_json(status, body);
        Ok(())
    })
}
