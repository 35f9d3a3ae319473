//! Node sub-adapter: get and list a single node synthesized from the
//! engine's own system info, since k2d runs against one host.

use k2d_convert::engine::node::synthesize_node;
use k2d_util::error::{Error, Result};
use k8s_openapi::api::core::v1::Node;

use crate::context::AdapterContext;

pub async fn get(ctx: &AdapterContext, name: &str) -> Result<Node> {
    let info = ctx.gateway.system_info().await?;
    if info.node_name != name {
        return Err(Error::not_found(format!("node {name}")));
    }
    Ok(synthesize_node(&info, &ctx.advertise_ip, ctx.start_time))
}

pub async fn list(ctx: &AdapterContext) -> Result<Vec<Node>> {
    let info = ctx.gateway.system_info().await?;
    Ok(vec![synthesize_node(&info, &ctx.advertise_ip, ctx.start_time)])
}
