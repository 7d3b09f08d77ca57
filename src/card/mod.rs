//! Renders alertmanager webhook messages into adaptive cards via tera templates.
//!
//! The rendered card is handed to the [service](crate::service) which wraps it
//! into the request body.
use std::sync::Arc;

use tera::Tera;
use thiserror::Error;

use crate::{
	alert::AlertWebhookMessage,
	template::{self, TemplateParseError},
};

pub mod logging;
pub mod schema;

pub use logging::LoggingConverter;

/// name the card template is registered under
const CARD_TEMPLATE: &str = "card";

/// rendering a single alert failed
#[derive(Error, Debug)]
pub enum RenderError {
	/// tera failed to execute the template
	#[error("failed to render card template")]
	Template(#[from] tera::Error),
}

/// Converts an alertmanager message into a serialized card.
pub trait Converter: Send + Sync {
	/// render `alert` into a card
	fn convert(&self, alert: &AlertWebhookMessage) -> Result<String, RenderError>;
}

/// [Converter] rendering a pre-parsed tera template
#[derive(Debug, Clone)]
pub struct TemplatedConverter {
	/// holds the card template under [CARD_TEMPLATE]
	tera: Arc<Tera>,
	/// escape underscores in free-text fields before rendering
	escape_underscores: bool,
}

impl TemplatedConverter {
	/// load the card template from `path`
	pub fn from_file(path: &str, escape_underscores: bool) -> Result<Self, TemplateParseError> {
		let tera = template::from_file(CARD_TEMPLATE, path)?;

		Ok(Self { tera: Arc::new(tera), escape_underscores })
	}

	/// parse the card template from a string
	pub fn parse(content: &str, escape_underscores: bool) -> Result<Self, TemplateParseError> {
		let tera = template::from_raw(CARD_TEMPLATE, content)?;

		Ok(Self { tera: Arc::new(tera), escape_underscores })
	}
}

impl Converter for TemplatedConverter {
	fn convert(&self, alert: &AlertWebhookMessage) -> Result<String, RenderError> {
		let context = if self.escape_underscores {
			tera::Context::from_serialize(alert.escape_underscores())?
		} else {
			tera::Context::from_serialize(alert)?
		};

		Ok(self.tera.render(CARD_TEMPLATE, &context)?)
	}
}
