//! data structures for deserializing incoming alertmanager webhook messages
//!
//! See <https://prometheus.io/docs/alerting/latest/configuration/#webhook_config>
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// whether an alert (or the whole group) is firing or resolved
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
	/// the alert condition is currently true
	Firing,
	/// the alert condition is no longer true
	Resolved,
}

/// Message posted by alertmanager to a webhook receiver.
///
/// Labels and annotations are kept in ordered maps so templates iterating over
/// them always produce the same output. Missing fields decode to their empty
/// value, only the status is required.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::missing_docs_in_private_items)]
pub struct AlertWebhookMessage {
	#[serde(default)]
	pub version: String,
	#[serde(default)]
	pub group_key: String,
	#[serde(default)]
	pub truncated_alerts: u64,

	#[serde(default)]
	pub receiver: String,
	pub status: Status,
	#[serde(default)]
	pub alerts: Vec<Alert>,
	#[serde(default)]
	pub group_labels: BTreeMap<String, String>,
	#[serde(default)]
	pub common_labels: BTreeMap<String, String>,
	#[serde(default)]
	pub common_annotations: BTreeMap<String, String>,
	#[serde(rename = "externalURL", default)]
	pub external_url: String,
}

/// a single alert of an [AlertWebhookMessage]
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::missing_docs_in_private_items)]
pub struct Alert {
	pub status: Status,
	#[serde(default)]
	pub labels: BTreeMap<String, String>,
	#[serde(default)]
	pub annotations: BTreeMap<String, String>,
	#[serde(default)]
	pub starts_at: Option<DateTime<Utc>>,
	#[serde(default)]
	pub ends_at: Option<DateTime<Utc>>,
	#[serde(rename = "generatorURL", default)]
	pub generator_url: String,
	#[serde(default)]
	pub fingerprint: String,
}

impl AlertWebhookMessage {
	/// Returns a copy of the message where every `_` in free-text fields is
	/// prefixed with a backslash, so webex markdown doesn't treat it as an
	/// emphasis delimiter.
	///
	/// Free-text fields are the receiver, and the values of all label and
	/// annotation maps. Keys stay untouched so templates can still look them up,
	/// urls stay untouched so links keep working.
	pub fn escape_underscores(&self) -> Self {
		let mut escaped = self.clone();

		escaped.receiver = escape(&escaped.receiver);
		escape_values(&mut escaped.group_labels);
		escape_values(&mut escaped.common_labels);
		escape_values(&mut escaped.common_annotations);

		for alert in escaped.alerts.iter_mut() {
			escape_values(&mut alert.labels);
			escape_values(&mut alert.annotations);
		}

		escaped
	}
}

/// prefix every underscore with a backslash
fn escape(text: &str) -> String {
	text.replace('_', "\\_")
}

/// escape all values of a label or annotation map in place
fn escape_values(map: &mut BTreeMap<String, String>) {
	for value in map.values_mut() {
		*value = escape(value);
	}
}
