//! Pod log streaming with optional timestamps, follow, and tail-line
//! limits. Streams may block for long intervals, so the caller's
//! cancellation context is threaded through to the gateway.

use futures::Stream;
use k2d_util::error::Result;
use k2d_util::naming;
use tokio_util::sync::CancellationToken;

use crate::context::AdapterContext;

pub async fn stream<'a>(
    ctx: &'a AdapterContext,
    namespace: &str,
    name: &str,
    timestamps: bool,
    follow: bool,
    tail: Option<&str>,
    cancel: CancellationToken,
) -> Result<impl Stream<Item = Result<String>> + 'a> {
    let container_name = naming::container_name(namespace, name);
    ctx.gateway.logs(&container_name, timestamps, follow, tail, cancel).await
}
