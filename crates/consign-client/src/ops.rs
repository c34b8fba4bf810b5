//! Operation result types for the Consign client.

use consign_proto::consign::v1::UpdateOrdersResponse;

/// Result of a bulk update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    /// IDs the orders were stored under, in the order they were sent.
    pub order_ids: Vec<String>,
    /// Server-provided summary line.
    pub summary: String,
}

impl From<UpdateOrdersResponse> for UpdateResult {
    fn from(response: UpdateOrdersResponse) -> Self {
        Self {
            order_ids: response.order_ids,
            summary: response.summary,
        }
    }
}
