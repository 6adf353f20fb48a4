//! Classification engine
//!
//! ```text
//! broker subscriber ──► IngestHandle ──► ingest worker ─┐
//! POST /api/simulate ──────────────────────────────────┤
//!                                                       ▼
//!                  RuleStore ──snapshot──►  Coordinator ──► classify()
//!                                              │
//!                        device Registry ◄─────┼─────► assignment Registry
//!                                              ▼
//!                                        AssignmentSink ──► device_data
//! ```

pub mod classifier;
pub mod registry;
pub mod rule_store;
pub mod coordinator;
pub mod ingest;
pub mod sink;

pub use classifier::{classify, Classification, MatchSource, NAME_HINTS};
pub use registry::Registry;
pub use rule_store::RuleStore;
pub use coordinator::{Coordinator, CoordinatorStats, IngestOutcome, RuleUpdate};
pub use ingest::{
    ingest_channel, parse_payload, run_ingest_worker, simulate, topic_matches,
    InboundMessage, IngestHandle,
};
pub use sink::{run_sink_writer, sink_channel, AssignmentSink, ChannelSink, NullSink};
