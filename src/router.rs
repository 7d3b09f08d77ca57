//! http endpoint receiving alertmanager webhook messages
//!
//! Every connector gets its own `POST` route. The response always carries a
//! [PostResponse](crate::service::PostResponse), also when rendering or
//! delivery failed.
use std::{
	collections::HashSet,
	future::Future,
	net::{IpAddr, SocketAddr},
	sync::Arc,
};

use anyhow::{Context, Result};
use axum::{
	body::Bytes,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::post,
	Json, Router,
};
use serde::Deserialize;

use crate::{alert::AlertWebhookMessage, connector::ConfigError, metrics, service::Service};

/// characters axum treats as path parameters or wildcards
const PATH_PATTERN_CHARS: [char; 2] = [':', '*'];

#[derive(Debug, Deserialize, Clone)]
/// listen address of the alertmanager webhook receiver
pub struct AlertReceiverSettings {
	/// ip to bind to
	pub bind_address: IpAddr,
	/// port to bind to
	pub port: u16,
}

impl AlertReceiverSettings {
	/// combined listen address
	pub fn to_socket_addr(&self) -> SocketAddr {
		SocketAddr::new(self.bind_address, self.port)
	}
}

/// binds a request path to the service handling it
#[derive(Clone)]
pub struct Route {
	/// inbound path, starting with `/`
	pub request_path: String,
	/// service relaying messages received on `request_path`
	pub service: Arc<dyn Service>,
}

impl std::fmt::Debug for Route {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Route").field("request_path", &self.request_path).finish_non_exhaustive()
	}
}

/// Builds the router serving all `routes`.
///
/// Fails if two routes share a request path, or a path doesn't start with `/`
/// or contains a path parameter or wildcard.
pub fn register_routes(routes: Vec<Route>) -> Result<Router, ConfigError> {
	let mut paths = HashSet::new();
	let mut router = Router::new();

	for Route { request_path, service } in routes {
		if !request_path.starts_with('/') || request_path.contains(PATH_PATTERN_CHARS) {
			return Err(ConfigError::InvalidRequestPath(request_path));
		}
		if !paths.insert(request_path.clone()) {
			return Err(ConfigError::DuplicateRequestPath(request_path));
		}

		tracing::info!("registering route {}", request_path);

		let path = request_path.clone();
		router = router.route(
			&request_path,
			post(move |body: Bytes| receive(path.clone(), Arc::clone(&service), body)),
		);
	}

	Ok(router)
}

/// Decode the message, relay it and encode the outcome. The content type of the
/// request is ignored.
async fn receive(request_path: String, service: Arc<dyn Service>, body: Bytes) -> Response {
	let metrics = metrics::global();

	let message = match serde_json::from_slice::<AlertWebhookMessage>(&body) {
		Ok(message) => message,
		Err(err) => {
			metrics.decode_errors.with_label_values(&[request_path.as_str()]).inc();
			tracing::warn!(request_path = request_path.as_str(), "failed to deserialize alert: {}", err);
			return (StatusCode::BAD_REQUEST, format!("failed to deserialize alert: {err}"))
				.into_response();
		}
	};

	metrics.received_alerts.with_label_values(&[request_path.as_str()]).inc();

	let response = match service.post(message).await {
		Ok(response) => response,
		Err(err) => {
			metrics.post_errors.with_label_values(&[request_path.as_str(), err.kind()]).inc();
			tracing::error!(request_path = request_path.as_str(), "{:?}", err);
			err.into_response()
		}
	};

	Json(response).into_response()
}

/// Serves `router` on `addr` until `shutdown` resolves.
pub async fn run_receiver(
	router: Router,
	addr: SocketAddr,
	shutdown: impl Future<Output = ()>,
) -> Result<()> {
	tracing::info!("alertmanager webhook receiver listening on {}", addr);

	axum::Server::try_bind(&addr)
		.context(format!("failed to bind {addr}"))?
		.serve(router.into_make_service())
		.with_graceful_shutdown(shutdown)
		.await
		.context("alertmanager webhook receiver crashed")?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use wiremock::{matchers::method, Mock, MockServer, ResponseTemplate};

	use super::*;
	use crate::{
		card::{schema::CardSchema, LoggingConverter, TemplatedConverter},
		service::{
			tests::{service, StaticConverter},
			PostResponse,
		},
	};

	const FIXTURE: &str = include_str!("../tests/fixtures/prometheus_fire_request.json");

	fn route(request_path: &str, webhook_url: &str) -> Route {
		Route {
			request_path: request_path.to_owned(),
			service: Arc::new(service(Box::new(StaticConverter("{}")), webhook_url)),
		}
	}

	/// serve `router` on a random port, returning its base url
	fn serve(router: Router) -> String {
		let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
			.serve(router.into_make_service());
		let addr = server.local_addr();
		tokio::spawn(server);

		format!("http://{addr}")
	}

	async fn post(url: String, body: &'static str) -> reqwest::Response {
		reqwest::Client::new()
			.post(url)
			.header("content-type", "application/json")
			.body(body)
			.send()
			.await
			.unwrap()
	}

	#[test]
	fn rejects_duplicate_request_paths() {
		let routes = vec![
			route("/alertmanager", "http://127.0.0.1:1"),
			route("/other", "http://127.0.0.1:1"),
			route("/alertmanager", "http://127.0.0.1:2"),
		];

		assert_eq!(
			register_routes(routes).err(),
			Some(ConfigError::DuplicateRequestPath("/alertmanager".to_owned()))
		);
	}

	#[test]
	fn rejects_relative_request_paths() {
		let routes = vec![route("alertmanager", "http://127.0.0.1:1")];

		assert_eq!(
			register_routes(routes).err(),
			Some(ConfigError::InvalidRequestPath("alertmanager".to_owned()))
		);
	}

	#[test]
	fn rejects_request_path_patterns() {
		for path in ["/a/:x", "/alerts/*rest", "/a:b"] {
			assert_eq!(
				register_routes(vec![route(path, "http://127.0.0.1:1")]).err(),
				Some(ConfigError::InvalidRequestPath(path.to_owned()))
			);
		}

		let routes = vec![route("/a/:x", "http://127.0.0.1:1"), route("/a/:y", "http://127.0.0.1:1")];
		assert_eq!(
			register_routes(routes).err(),
			Some(ConfigError::InvalidRequestPath("/a/:x".to_owned()))
		);
	}

	#[tokio::test]
	async fn dispatches_by_request_path() {
		let first = MockServer::start().await;
		let second = MockServer::start().await;

		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_string("first"))
			.expect(1)
			.mount(&first)
			.await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_string("second"))
			.expect(1)
			.mount(&second)
			.await;

		let router = register_routes(vec![
			route("/first", &first.uri()),
			route("/second", &second.uri()),
		])
		.unwrap();
		let base = serve(router);

		let response = post(format!("{base}/second"), FIXTURE).await;
		assert_eq!(response.status(), reqwest::StatusCode::OK);
		let response: PostResponse = response.json().await.unwrap();
		assert_eq!(response.message, "second");

		let response: PostResponse =
			post(format!("{base}/first"), FIXTURE).await.json().await.unwrap();
		assert_eq!(response.message, "first");
	}

	#[tokio::test]
	async fn malformed_payload_is_a_bad_request() {
		let base = serve(register_routes(vec![route("/alertmanager", "http://127.0.0.1:1")]).unwrap());

		let response = post(format!("{base}/alertmanager"), "{ not json").await;
		assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

		let response = post(format!("{base}/alertmanager"), r#"{"alerts": 1}"#).await;
		assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
	}

	#[tokio::test]
	async fn minimal_payload_is_relayed() {
		let server = MockServer::start().await;

		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_string("12345"))
			.expect(2)
			.mount(&server)
			.await;

		let base = serve(register_routes(vec![route("/alertmanager", &server.uri())]).unwrap());

		let response =
			post(format!("{base}/alertmanager"), r#"{"receiver":"r","status":"firing","alerts":[]}"#)
				.await;
		assert_eq!(response.status(), reqwest::StatusCode::OK);

		let without_ends_at = r#"{
			"receiver": "r",
			"status": "firing",
			"alerts": [{"status": "firing", "labels": {"alertname": "up"}, "startsAt": "2018-03-07T06:33:21Z"}]
		}"#;
		let response: PostResponse =
			post(format!("{base}/alertmanager"), without_ends_at).await.json().await.unwrap();
		assert_eq!(response.status, 200);
		assert_eq!(response.message, "12345");
	}

	#[tokio::test]
	async fn content_type_is_not_required() {
		let server = MockServer::start().await;

		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_string("12345"))
			.expect(1)
			.mount(&server)
			.await;

		let base = serve(register_routes(vec![route("/alertmanager", &server.uri())]).unwrap());

		let response = reqwest::Client::new()
			.post(format!("{base}/alertmanager"))
			.body(FIXTURE)
			.send()
			.await
			.unwrap();
		assert_eq!(response.status(), reqwest::StatusCode::OK);

		let response: PostResponse = response.json().await.unwrap();
		assert_eq!(response.message, "12345");
	}

	#[tokio::test]
	async fn unknown_path_is_not_found() {
		let base = serve(register_routes(vec![route("/alertmanager", "http://127.0.0.1:1")]).unwrap());

		let response = post(format!("{base}/elsewhere"), FIXTURE).await;
		assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn pipeline_failure_is_still_ok() {
		let url = crate::delivery::tests::refused_url();
		let base = serve(register_routes(vec![route("/alertmanager", &url)]).unwrap());

		let response = post(format!("{base}/alertmanager"), FIXTURE).await;
		assert_eq!(response.status(), reqwest::StatusCode::OK);

		let response: PostResponse = response.json().await.unwrap();
		assert_eq!(response.webhook_url, url);
		assert_eq!(response.status, 0);
		assert!(!response.message.is_empty());
	}

	#[tokio::test]
	async fn schema_validation_does_not_change_response() {
		let server = MockServer::start().await;

		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_string("12345"))
			.mount(&server)
			.await;

		let schema = Arc::new(
			CardSchema::from_file(concat!(
				env!("CARGO_MANIFEST_DIR"),
				"/resources/adaptive-card-schema.json"
			))
			.unwrap(),
		);

		let decorated = |template: &str| {
			let inner = TemplatedConverter::parse(template, false).unwrap();
			let converter =
				LoggingConverter::new(tracing::Span::none(), Arc::clone(&schema), Box::new(inner));
			Arc::new(service(Box::new(converter), &server.uri())) as Arc<dyn Service>
		};

		let router = register_routes(vec![
			Route {
				request_path: "/valid".to_owned(),
				service: decorated(
					r#"{"type": "AdaptiveCard", "version": "1.2", "body": [{"type": "TextBlock", "text": "{{ receiver }}"}]}"#,
				),
			},
			Route {
				request_path: "/invalid".to_owned(),
				service: decorated(r#"{"type": "NotACard", "text": "{{ receiver }}"}"#),
			},
		])
		.unwrap();
		let base = serve(router);

		let valid: PostResponse =
			post(format!("{base}/valid"), FIXTURE).await.json().await.unwrap();
		let invalid: PostResponse =
			post(format!("{base}/invalid"), FIXTURE).await.json().await.unwrap();

		assert_eq!(valid, invalid);
		assert_eq!(valid.status, 200);
	}
}
