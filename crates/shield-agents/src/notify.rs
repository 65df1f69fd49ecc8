use serde::Serialize;
use shield_transport::{MessageType, Transport};
use tracing::{debug, warn};

use crate::error::AgentResult;

/// Send `body` to every agent advertising `capability`.
///
/// Lookup failures are returned; per-recipient delivery failures are logged
/// and skipped. Returns the number of agents reached.
pub(crate) async fn broadcast<T: Serialize>(
    transport: &dyn Transport,
    capability: &str,
    message_type: MessageType,
    body: &T,
) -> AgentResult<usize> {
    let payload = serde_json::to_value(body)
        .map_err(shield_transport::TransportError::from)?;
    let recipients = transport.find_agents_by_capability(&[capability]).await?;

    let mut delivered = 0;
    for agent in &recipients {
        match transport.send(agent, message_type, payload.clone()).await {
            Ok(_) => delivered += 1,
            Err(err) => warn!(
                to = %agent.agent_id,
                message_type = %message_type,
                error = %err,
                "Notification not delivered"
            ),
        }
    }
    debug!(
        capability = %capability,
        message_type = %message_type,
        recipients = recipients.len(),
        delivered,
        "Broadcast complete"
    );
    Ok(delivered)
}
