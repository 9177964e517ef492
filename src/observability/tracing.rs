//! Cycle spans.
//!
//! Every synthesis cycle runs inside one `synthesis` span carrying a fresh
//! UUID, so all events of a cycle can be correlated in JSON output.

use tracing::Span;
use uuid::Uuid;

/// A new `synthesis` span with a random cycle id.
pub fn cycle_span() -> Span {
    let cycle_id = Uuid::new_v4();
    tracing::info_span!("synthesis", %cycle_id)
}
