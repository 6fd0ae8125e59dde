//! Tool Router - builds the rmcp ToolRouter from the catalog.
//!
//! Used by the STDIO and TCP transports, which carry no `Authorization`
//! header: every route calls the façade with the configured access token.

use std::sync::Arc;

use futures::FutureExt;
use rmcp::handler::server::tool::{ToolCallContext, ToolRoute, ToolRouter};

use crate::domains::spotify::Credential;
use crate::domains::spotify::endpoint::ToolDescriptor;

use super::facade::SpotifyToolFacade;
use super::registry::to_tool;

/// Build the tool router with one route per catalog entry.
pub fn build_tool_router<S>(
    facade: Arc<SpotifyToolFacade>,
    access_token: Option<&str>,
) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    let credential = access_token.and_then(|token| Credential::new(token).ok());

    facade
        .catalog()
        .descriptors()
        .fold(ToolRouter::new(), |router, descriptor| {
            router.with_route(create_route(descriptor, facade.clone(), credential.clone()))
        })
}

fn create_route<S>(
    descriptor: &'static ToolDescriptor,
    facade: Arc<SpotifyToolFacade>,
    credential: Option<Credential>,
) -> ToolRoute<S>
where
    S: Send + Sync + 'static,
{
    ToolRoute::new_dyn(to_tool(descriptor), move |ctx: ToolCallContext<'_, S>| {
        let args = ctx.arguments.clone().unwrap_or_default();
        let facade = facade.clone();
        let credential = credential.clone();
        async move {
            Ok(facade
                .call_tool(descriptor.name, args, credential.as_ref())
                .await)
        }
        .boxed()
    })
}
