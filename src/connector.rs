//! Connectors bind one inbound request path to one webex destination.
//!
//! Every connector gets its own card template, request template and logging
//! context, while the http client and card schema are shared.
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{
	card::{schema::CardSchema, Converter, LoggingConverter, TemplatedConverter},
	delivery::DeliveryClient,
	request_template::RequestTemplate,
	router::Route,
	service::{LoggingService, Service, SimpleService},
};

/// Invalid connector configuration. Always fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
	/// two connectors share the same inbound path
	#[error("found duplicate use of request path '{0}'")]
	DuplicateRequestPath(String),
	/// request path can't be used as route
	#[error("request path '{0}' must start with '/' and must not contain ':' or '*'")]
	InvalidRequestPath(String),
	/// one of the connector fields is empty
	#[error("'{field}' is required for request path '{request_path}'")]
	MissingField {
		/// name of the empty field
		field: &'static str,
		/// request path of the affected connector
		request_path: String,
	},
	/// webhook url doesn't parse
	#[error("invalid webhook url '{url}' for request path '{request_path}': {reason}")]
	InvalidWebhookUrl {
		/// the configured url
		url: String,
		/// request path of the affected connector
		request_path: String,
		/// parser error
		reason: String,
	},
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
/// settings of a single connector
pub struct ConnectorSettings {
	/// inbound path alertmanager posts to
	#[serde(default)]
	pub request_path: String,
	/// destination the rendered card is posted to
	#[serde(default)]
	pub webhook_url: String,
	/// bearer token sent to the destination
	#[serde(default, skip_serializing)]
	pub access_token: String,
	/// webex room the card is posted into
	#[serde(default)]
	pub room_id: String,
	/// tera template rendering the adaptive card
	#[serde(default)]
	pub template_file: String,
	/// tera template wrapping the card into the request body
	#[serde(default)]
	pub request_template_file: Option<String>,
	/// prefix underscores in alert texts with a backslash
	#[serde(default)]
	pub escape_underscores: bool,
}

impl ConnectorSettings {
	/// make sure the request path starts with a `/`
	pub fn normalize_request_path(&mut self) {
		if !self.request_path.is_empty() && !self.request_path.starts_with('/') {
			self.request_path.insert(0, '/');
		}
	}

	/// Checks that all required fields are set and the webhook url parses.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.request_path.is_empty() {
			return Err(ConfigError::MissingField {
				field: "request_path",
				request_path: String::new(),
			});
		}

		let required = [
			("webhook_url", &self.webhook_url),
			("access_token", &self.access_token),
			("room_id", &self.room_id),
			("template_file", &self.template_file),
		];

		for (field, value) in required {
			if value.is_empty() {
				return Err(ConfigError::MissingField {
					field,
					request_path: self.request_path.clone(),
				});
			}
		}

		Url::parse(&self.webhook_url).map_err(|err| ConfigError::InvalidWebhookUrl {
			url: self.webhook_url.clone(),
			request_path: self.request_path.clone(),
			reason: err.to_string(),
		})?;

		Ok(())
	}
}

/// Builds the fully decorated route of a connector.
///
/// Fails if the settings are invalid or one of the templates doesn't parse.
pub fn build_route(
	settings: &ConnectorSettings,
	schema: &Arc<CardSchema>,
	client: &DeliveryClient,
) -> Result<Route> {
	settings.validate()?;

	let span = tracing::info_span!(
		"connector",
		request_path = settings.request_path.as_str(),
		template_file = settings.template_file.as_str(),
		escape_underscores = settings.escape_underscores,
	);

	let converter = TemplatedConverter::from_file(&settings.template_file, settings.escape_underscores)
		.context(format!("failed to load card template for {}", settings.request_path))?;
	let converter: Box<dyn Converter> =
		Box::new(LoggingConverter::new(span.clone(), Arc::clone(schema), Box::new(converter)));

	let request_template = match &settings.request_template_file {
		Some(path) => RequestTemplate::from_file(path),
		None => RequestTemplate::builtin(),
	}
	.context(format!("failed to load request template for {}", settings.request_path))?;

	let service = SimpleService::new(
		converter,
		request_template,
		client.clone(),
		settings.webhook_url.clone(),
		settings.access_token.clone(),
		settings.room_id.clone(),
	);
	let service: Arc<dyn Service> = Arc::new(LoggingService::new(span, Box::new(service)));

	Ok(Route { request_path: settings.request_path.clone(), service })
}

/// builds the routes of all configured connectors
pub fn build_routes(
	connectors: &[ConnectorSettings],
	schema: &Arc<CardSchema>,
	client: &DeliveryClient,
) -> Result<Vec<Route>> {
	connectors.iter().map(|settings| build_route(settings, schema, client)).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::delivery::HttpClientSettings;

	fn settings() -> ConnectorSettings {
		ConnectorSettings {
			request_path: "/alertmanager".to_owned(),
			webhook_url: "https://webexapis.com/v1/messages".to_owned(),
			access_token: "token".to_owned(),
			room_id: "room".to_owned(),
			template_file: concat!(
				env!("CARGO_MANIFEST_DIR"),
				"/resources/default-message-card.tmpl"
			)
			.to_owned(),
			request_template_file: None,
			escape_underscores: false,
		}
	}

	#[test]
	fn normalizes_request_path() {
		let mut settings = settings();
		settings.request_path = "alertmanager".to_owned();
		settings.normalize_request_path();
		assert_eq!(settings.request_path, "/alertmanager");

		settings.normalize_request_path();
		assert_eq!(settings.request_path, "/alertmanager");
	}

	#[test]
	fn rejects_missing_fields() {
		let mut missing_room = settings();
		missing_room.room_id.clear();
		assert_eq!(
			missing_room.validate(),
			Err(ConfigError::MissingField {
				field: "room_id",
				request_path: "/alertmanager".to_owned()
			})
		);

		let mut missing_path = settings();
		missing_path.request_path.clear();
		assert!(matches!(
			missing_path.validate(),
			Err(ConfigError::MissingField { field: "request_path", .. })
		));

		let mut missing_token = settings();
		missing_token.access_token.clear();
		assert!(matches!(
			missing_token.validate(),
			Err(ConfigError::MissingField { field: "access_token", .. })
		));
	}

	#[test]
	fn rejects_invalid_webhook_url() {
		let mut settings = settings();
		settings.webhook_url = "not a url".to_owned();

		assert!(matches!(settings.validate(), Err(ConfigError::InvalidWebhookUrl { .. })));
	}

	#[test]
	fn access_token_is_not_serialized() {
		let json = serde_json::to_value(settings()).unwrap();

		assert!(json.get("access_token").is_none());
		assert_eq!(json["room_id"], "room");
	}

	#[test]
	fn builds_route_from_valid_settings() {
		let schema = Arc::new(CardSchema::from_file(concat!(
			env!("CARGO_MANIFEST_DIR"),
			"/resources/adaptive-card-schema.json"
		))
		.unwrap());
		let client = DeliveryClient::new(&HttpClientSettings::default()).unwrap();

		let route = build_route(&settings(), &schema, &client).unwrap();
		assert_eq!(route.request_path, "/alertmanager");

		let mut broken = settings();
		broken.template_file = "/does/not/exist.tmpl".to_owned();
		assert!(build_route(&broken, &schema, &client).is_err());
	}
}
