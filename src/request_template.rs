//! wraps a rendered card into the body of the webex messages api request
use std::sync::Arc;

use serde::Serialize;
use tera::Tera;

use crate::template::{self, TemplateParseError};

/// name the request template is registered under
const REQUEST_TEMPLATE: &str = "request";

/// envelope used when a connector doesn't configure its own request template
const BUILTIN_TEMPLATE: &str = include_str!("../resources/webex-teams-request.tmpl");

/// variables available in the request template
#[derive(Debug, Serialize)]
struct RequestData<'a> {
	/// target room
	room_id: &'a str,
	/// rendered card
	card: &'a str,
}

/// pre-parsed request envelope template
#[derive(Debug, Clone)]
pub struct RequestTemplate {
	/// holds the template under [REQUEST_TEMPLATE]
	tera: Arc<Tera>,
}

impl RequestTemplate {
	/// load the request template from `path`
	pub fn from_file(path: &str) -> Result<Self, TemplateParseError> {
		Ok(Self { tera: Arc::new(template::from_file(REQUEST_TEMPLATE, path)?) })
	}

	/// the built-in webex messages api envelope
	pub fn builtin() -> Result<Self, TemplateParseError> {
		Self::parse(BUILTIN_TEMPLATE)
	}

	/// parse the request template from a string
	pub fn parse(content: &str) -> Result<Self, TemplateParseError> {
		Ok(Self { tera: Arc::new(template::from_raw(REQUEST_TEMPLATE, content)?) })
	}

	/// Renders the request body for `card`, with `room_id` and `card` bound as
	/// template variables.
	pub fn build(&self, room_id: &str, card: &str) -> Result<String, tera::Error> {
		let context = tera::Context::from_serialize(RequestData { room_id, card })?;

		self.tera.render(REQUEST_TEMPLATE, &context)
	}
}
