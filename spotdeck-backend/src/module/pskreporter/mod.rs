//! PSKReporter streaming pipeline
//!
//! Subscribes to the telemetry broker for one operator callsign and keeps
//! rolling heard-by-others / heard-by-me report sets.

pub mod ingestor;
pub mod message;
pub mod store;
pub mod transport;

pub use ingestor::{IngestorSettings, PskReporterIngestor, normalize_operator};
pub use message::{TelemetryMessage, decode_message, heard_by_me_topic, heard_by_others_topic};
pub use store::{Classified, ReportStore};
pub use transport::{MqttTransport, SessionInfo, TelemetryTransport, TransportEvent, next_backoff};
