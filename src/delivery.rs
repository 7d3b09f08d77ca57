//! Posts request bodies to webex. Doesn't know anything about templates.
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use thiserror::Error;
use url::Url;

use crate::metrics;

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
/// settings of the connection pool shared by all connectors
pub struct HttpClientSettings {
	/// how long idle connections are kept in the pool
	#[serde_as(as = "DurationSeconds<f64>")]
	pub idle_conn_timeout: Duration,
	/// maximum number of idle connections per host
	pub max_idle_conns: usize,
	/// timeout for establishing a connection including the tls handshake
	#[serde_as(as = "DurationSeconds<f64>")]
	pub tls_handshake_timeout: Duration,
}

impl Default for HttpClientSettings {
	fn default() -> Self {
		Self {
			idle_conn_timeout: Duration::from_secs(90),
			max_idle_conns: 100,
			tls_handshake_timeout: Duration::from_secs(30),
		}
	}
}

/// No usable http response was received. Status codes of received responses
/// are never errors.
#[derive(Error, Debug)]
pub enum DeliveryError {
	/// connection, dns, timeout or cancellation error
	#[error("http client failed: {0}")]
	Transport(#[source] reqwest::Error),
	/// a response arrived but its body couldn't be read
	#[error("failed reading http response body: {source}")]
	Body {
		/// status code of the response
		status: u16,
		/// underlying error
		#[source]
		source: reqwest::Error,
	},
}

/// response of the destination, whatever its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
	/// http status code
	pub status: u16,
	/// raw response body
	pub body: String,
}

#[derive(Debug, Clone)]
/// Http client shared by all connectors. Cloning is cheap, clones share the
/// connection pool.
pub struct DeliveryClient {
	/// pooled http client
	client: reqwest::Client,
}

impl DeliveryClient {
	/// construct http client
	pub fn new(settings: &HttpClientSettings) -> Result<Self, reqwest::Error> {
		let client = reqwest::Client::builder()
			.pool_idle_timeout(settings.idle_conn_timeout)
			.pool_max_idle_per_host(settings.max_idle_conns)
			.connect_timeout(settings.tls_handshake_timeout)
			.tcp_keepalive(Duration::from_secs(30))
			.build()?;

		Ok(Self { client })
	}

	/// Posts `body` to `url` authorized by the bearer `token`.
	///
	/// Makes exactly one attempt. Dropping the returned future aborts the
	/// request.
	pub async fn send(&self, body: String, url: &str, token: &str) -> Result<Delivery, DeliveryError> {
		let metrics = metrics::global();
		let host = host_of(url);

		metrics.delivery_requests.with_label_values(&[host.as_str()]).inc();
		let _timer = metrics.delivery_duration.with_label_values(&[host.as_str()]).start_timer();

		let response = self
			.client
			.post(url)
			.bearer_auth(token)
			.header(CONTENT_TYPE, "application/json")
			.body(body)
			.send()
			.await
			.map_err(|err| {
				metrics.delivery_failures.with_label_values(&[host.as_str(), ""]).inc();
				DeliveryError::Transport(err)
			})?;

		let status = response.status();
		if !status.is_success() {
			metrics.delivery_failures.with_label_values(&[host.as_str(), status.as_str()]).inc();
		}

		let body = response
			.text()
			.await
			.map_err(|source| DeliveryError::Body { status: status.as_u16(), source })?;

		Ok(Delivery { status: status.as_u16(), body })
	}
}

/// host part of `url` used as metric label
fn host_of(url: &str) -> String {
	Url::parse(url).ok().and_then(|url| url.host_str().map(str::to_owned)).unwrap_or_default()
}
