//! Pod metrics: CPU total-usage and memory usage, read straight from the
//! engine's own stats snapshot. k2d keeps no metrics history of its own.

use k2d_util::error::Result;
use k2d_util::naming;

use crate::context::AdapterContext;

#[derive(Debug, Clone, Copy)]
pub struct PodMetrics {
    pub cpu_usage_nanos: u64,
    pub memory_usage_bytes: u64,
}

pub async fn get(ctx: &AdapterContext, namespace: &str, name: &str) -> Result<PodMetrics> {
    let container_name = naming::container_name(namespace, name);
    let stats = ctx.gateway.stats(&container_name).await?;
    Ok(PodMetrics {
        cpu_usage_nanos: stats.cpu_stats.cpu_usage.total_usage,
        memory_usage_bytes: stats.memory_stats.usage.unwrap_or(0),
    })
}
