//! prometheus alertmanager receiver that relays alerts as adaptive cards into
//! webex teams rooms
//!
//! Features:
//! - forwards different webhook url paths to different webex destinations
//! - per connector configurable tera templates for the card and the request
//! - rendered cards are checked against the adaptive card schema

pub mod alert;
pub mod card;
pub mod connector;
pub mod delivery;
pub mod log;
pub mod metrics;
pub mod request_template;
pub mod router;
pub mod service;
pub mod settings;
pub mod telemetry_endpoint;
pub mod template;
