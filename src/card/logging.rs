//! logging decorator for [Converter]
use std::sync::Arc;

use tokio::time::Instant;
use tracing::Span;

use super::{schema::CardSchema, Converter, RenderError};
use crate::{alert::AlertWebhookMessage, metrics};

/// Wraps a [Converter], checks every rendered card against the card schema and
/// logs the outcome. Never changes what the inner converter returns.
pub struct LoggingConverter {
	/// span carrying the connector context
	span: Span,
	/// schema the rendered cards are checked against
	schema: Arc<CardSchema>,
	/// decorated converter
	next: Box<dyn Converter>,
}

impl LoggingConverter {
	/// decorate `next`
	pub fn new(span: Span, schema: Arc<CardSchema>, next: Box<dyn Converter>) -> Self {
		Self { span, schema, next }
	}

	/// log schema violations of a rendered card as warnings
	fn check_schema(&self, card: &str) {
		match self.schema.validate(card) {
			Ok(()) => {
				tracing::debug!(card, "the rendered card is valid");
			}
			Err(violations) => {
				metrics::global().schema_violations.inc();
				tracing::warn!("the rendered card is not valid, see errors:");
				for violation in violations.iter() {
					tracing::warn!(violation = violation.as_str(), "card schema violation");
				}
			}
		}
	}
}

impl Converter for LoggingConverter {
	fn convert(&self, alert: &AlertWebhookMessage) -> Result<String, RenderError> {
		let _enter = self.span.enter();
		let begin = Instant::now();

		let result = self.next.convert(alert);

		let took = begin.elapsed();
		metrics::global().render_duration.observe(took.as_secs_f64());

		match &result {
			Ok(card) => self.check_schema(card),
			Err(err) => tracing::warn!("failed to render card: {:?}", err),
		}

		tracing::debug!(?alert, ?took, "converted alert");

		result
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::card::{
		tests::{fixture, DEFAULT_TEMPLATE},
		TemplatedConverter,
	};

	fn schema() -> Arc<CardSchema> {
		Arc::new(
			CardSchema::from_file(concat!(
				env!("CARGO_MANIFEST_DIR"),
				"/resources/adaptive-card-schema.json"
			))
			.unwrap(),
		)
	}

	fn decorate(inner: TemplatedConverter) -> LoggingConverter {
		LoggingConverter::new(Span::none(), schema(), Box::new(inner))
	}

	#[test]
	fn passes_through_valid_card() {
		let inner = TemplatedConverter::from_file(DEFAULT_TEMPLATE, false).unwrap();
		let expected = inner.convert(&fixture()).unwrap();

		let card = decorate(inner).convert(&fixture()).unwrap();

		assert_eq!(card, expected);
		assert_eq!(schema().validate(&card), Ok(()));
	}

	#[test]
	fn passes_through_schema_invalid_card() {
		let inner = TemplatedConverter::parse(r#"{"type": "{{ receiver }}"}"#, false).unwrap();

		let card = decorate(inner).convert(&fixture()).unwrap();

		assert_eq!(card, r#"{"type": "webex_teams_receiver"}"#);
		assert!(schema().validate(&card).is_err());
	}

	#[test]
	fn passes_through_render_errors() {
		let inner = TemplatedConverter::parse("{{ missing }}", false).unwrap();

		assert!(decorate(inner).convert(&fixture()).is_err());
	}
}
