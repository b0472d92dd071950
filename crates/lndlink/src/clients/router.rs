//! `routerrpc` client for route fee estimation.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::credentials::Macaroon;
use crate::transport::{ConnectionRef, RpcError};

/// Fee and time-lock estimate for reaching a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFeeEstimate {
    /// Estimated routing fee in millisatoshis.
    pub routing_fee_msat: i64,
    /// Estimated total time-lock delta in blocks.
    pub time_lock_delay: i64,
}

/// Client for the router sub-server.
#[derive(Clone)]
pub struct RouterClient {
    conn: ConnectionRef,
    macaroon: Macaroon,
}

impl RouterClient {
    /// Create a client over `conn`.
    #[must_use]
    pub fn new(conn: ConnectionRef, macaroon: Macaroon) -> Self {
        Self { conn, macaroon }
    }

    /// Estimate the cost of paying `amt_sat` to `dest`.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] if the call fails.
    pub async fn estimate_route_fee(
        &self,
        dest: [u8; 33],
        amt_sat: i64,
    ) -> Result<RouteFeeEstimate, RpcError> {
        self.conn
            .call(
                "routerrpc.EstimateRouteFee",
                &self.macaroon,
                &json!({ "dest": hex::encode(dest), "amt_sat": amt_sat }),
            )
            .await
    }
}
