//! prometheus meters of the request pipeline
//!
//! The meters exist independent of any registry so the pipeline can be used
//! without [register] being called, e.g. in tests.
use once_cell::sync::Lazy;
use prometheus::{
	exponential_buckets, histogram_opts, opts, Histogram, HistogramVec, IntCounter, IntCounterVec,
	Registry,
};

/// namespace of all meters
const NAMESPACE: &str = "webex_relay";

#[allow(clippy::expect_used)]
static METRICS: Lazy<Metrics> =
	Lazy::new(|| Metrics::new().expect("metric descriptors are statically valid"));

#[derive(Debug, Clone)]
/// prometheus meters
pub struct Metrics {
	/// number of decoded alertmanager messages per request path
	pub received_alerts: IntCounterVec,
	/// number of inbound requests that couldn't be decoded
	pub decode_errors: IntCounterVec,
	/// number of pipeline failures per request path and kind
	pub post_errors: IntCounterVec,
	/// time spent rendering cards
	pub render_duration: Histogram,
	/// number of rendered cards violating the card schema
	pub schema_violations: IntCounter,
	/// total number of outbound requests
	pub delivery_requests: IntCounterVec,
	/// outbound requests that failed or returned a non success status
	pub delivery_failures: IntCounterVec,
	/// time spent by outbound requests
	pub delivery_duration: HistogramVec,
}

impl Metrics {
	/// construct the meters
	fn new() -> Result<Self, prometheus::Error> {
		let received_alerts = IntCounterVec::new(
			opts!("received_alerts", "total number of decoded alertmanager messages")
				.namespace(NAMESPACE)
				.subsystem("receiver"),
			&["request_path"],
		)?;

		let decode_errors = IntCounterVec::new(
			opts!("decode_errors", "number of requests with malformed alertmanager messages")
				.namespace(NAMESPACE)
				.subsystem("receiver"),
			&["request_path"],
		)?;

		let post_errors = IntCounterVec::new(
			opts!("post_errors", "number of alerts that couldn't be rendered or delivered")
				.namespace(NAMESPACE)
				.subsystem("receiver"),
			&["request_path", "kind"],
		)?;

		let render_duration = Histogram::with_opts(
			histogram_opts!(
				"duration_seconds",
				"time spent rendering a card in seconds",
				exponential_buckets(0.0001, 2., 12)?
			)
			.namespace(NAMESPACE)
			.subsystem("render"),
		)?;

		let schema_violations = IntCounter::with_opts(
			opts!("schema_violations", "number of rendered cards violating the card schema")
				.namespace(NAMESPACE)
				.subsystem("render"),
		)?;

		let delivery_requests = IntCounterVec::new(
			opts!("requests_total", "total number of http requests")
				.namespace(NAMESPACE)
				.subsystem("delivery"),
			&["host"],
		)?;

		let delivery_failures = IntCounterVec::new(
			opts!("requests_failed", "number of failed http requests")
				.namespace(NAMESPACE)
				.subsystem("delivery"),
			&["host", "status_code"],
		)?;

		let delivery_duration = HistogramVec::new(
			histogram_opts!(
				"request_duration_seconds",
				"total time of a http request in seconds",
				exponential_buckets(0.01, 2., 12)?
			)
			.namespace(NAMESPACE)
			.subsystem("delivery"),
			&["host"],
		)?;

		Ok(Self {
			received_alerts,
			decode_errors,
			post_errors,
			render_duration,
			schema_violations,
			delivery_requests,
			delivery_failures,
			delivery_duration,
		})
	}
}

/// the process wide meters
pub fn global() -> &'static Metrics {
	&METRICS
}

/// register all meters on `registry`
pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
	let metrics = global();

	registry.register(Box::new(metrics.received_alerts.clone()))?;
	registry.register(Box::new(metrics.decode_errors.clone()))?;
	registry.register(Box::new(metrics.post_errors.clone()))?;
	registry.register(Box::new(metrics.render_duration.clone()))?;
	registry.register(Box::new(metrics.schema_violations.clone()))?;
	registry.register(Box::new(metrics.delivery_requests.clone()))?;
	registry.register(Box::new(metrics.delivery_failures.clone()))?;
	registry.register(Box::new(metrics.delivery_duration.clone()))?;

	Ok(())
}
