//! Here we expose prometheus metrics and the active connectors
use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use axum::{
	body::Body,
	http::{header::CONTENT_TYPE, Response, StatusCode},
	routing::get,
	Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;

use crate::connector::ConnectorSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryEndpointSettings {
	pub bind_address: IpAddr,
	pub port: u16,
}

impl TelemetryEndpointSettings {
	pub fn to_socket_addr(&self) -> SocketAddr {
		SocketAddr::new(self.bind_address, self.port)
	}
}

async fn metrics_handler() -> Response<Body> {
	let mut buffer = vec![];
	let encoder = TextEncoder::new();
	let metric_families = prometheus::gather();

	let response = match encoder.encode(&metric_families, &mut buffer) {
		Ok(()) => Response::builder()
			.status(StatusCode::OK)
			.header(CONTENT_TYPE, encoder.format_type())
			.body(Body::from(buffer)),
		Err(err) => {
			tracing::error!("failed to encode metrics: {:?}", err);
			Response::builder().status(StatusCode::INTERNAL_SERVER_ERROR).body(Body::empty())
		}
	};

	response.unwrap_or_else(|_| Response::new(Body::empty()))
}

/// router serving `/metrics` and `/config`, the latter lists `connectors`
/// without their access tokens
pub fn router(connectors: &'static [ConnectorSettings]) -> Router {
	Router::new()
		.route("/metrics", get(metrics_handler))
		.route("/config", get(move || async move { Json(connectors) }))
}

pub async fn run_telemetry_endpoint(
	settings: &TelemetryEndpointSettings,
	connectors: &'static [ConnectorSettings],
) -> Result<()> {
	axum::Server::try_bind(&settings.to_socket_addr())
		.context("failed to bind telemetry endpoint")?
		.serve(router(connectors).into_make_service())
		.await
		.context("telemetry endpoint crashed")?;

	Ok(())
}
