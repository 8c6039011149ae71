//! Conduit - adaptive multi-backend content router
//!
//! Chooses which storage backend should handle a unit of content by scoring
//! every candidate on a small set of factors, then learns from reported
//! outcomes how much each factor should matter.
//!
//! ```
//! use conduit::config::ConduitConfig;
//! use conduit::registry::BackendCapabilities;
//! use conduit::service::{RecordOutcomeRequest, RouterService, SelectBackendRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! let service = RouterService::new(&ConduitConfig::default(), CancellationToken::new()).unwrap();
//! service.register_backend("ipfs", BackendCapabilities::default()).unwrap();
//! service.register_backend("s3", BackendCapabilities::default()).unwrap();
//!
//! let decision = service
//!     .select_backend(SelectBackendRequest::new("image/jpeg", 2048))
//!     .unwrap();
//!
//! let mut outcome = RecordOutcomeRequest::new(&decision.backend_id, true, 42.0);
//! outcome.request_id = Some(decision.request_id);
//! service.record_outcome(outcome).unwrap();
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod insights;
pub mod logging;
pub mod metrics;
pub mod outcomes;
pub mod registry;
pub mod scoring;
pub mod service;
pub mod streaming;
pub mod weights;
