/// Bet slip operations and ledger submission.
pub mod betting;
/// OpenAPI documentation generation.
pub mod documentation;
/// Boundary turning loose transport and REST payloads into typed input.
pub mod event_normalizer;
/// Health check service.
pub mod health_service;
/// Upstream betting ledger client.
pub mod ledger;
/// Upstream game query client.
pub mod query;
/// Round ingestion, reconciliation and projections.
pub mod round_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Push transport client with reconnect and resync.
pub mod transport;
