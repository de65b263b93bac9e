//! Outbound request seam.

use dirchain_block::BlockRequest;

use crate::Result;

/// Hands block requests to the host node's network layer.
///
/// Requests are fire-and-forget at the protocol level: no response is
/// awaited here, and replies arrive independently through the engine's
/// inbound payload channel. The seam is still fallible so the dispatcher
/// can tell "never sent" from "sent": a failed send leaves the height out
/// of the in-flight set, and the next scan cycle rediscovers it.
///
/// Implementations must not assume any lock is held while they run; the
/// dispatcher calls [`send_block_request`](RequestSender::send_block_request)
/// with no engine state locked.
#[async_trait::async_trait]
pub trait RequestSender: Send + Sync {
    /// Send one block request towards peers.
    async fn send_block_request(&self, request: BlockRequest) -> Result<()>;
}
