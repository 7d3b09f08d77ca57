//! logging decorator for [Service]
use async_trait::async_trait;
use tracing::{Instrument, Span};

use super::{PostError, PostResponse, Service};
use crate::alert::AlertWebhookMessage;

/// Wraps a [Service] and logs the outcome of every post at debug level.
pub struct LoggingService {
	/// span carrying the connector context
	span: Span,
	/// decorated service
	next: Box<dyn Service>,
}

impl LoggingService {
	/// decorate `next`
	pub fn new(span: Span, next: Box<dyn Service>) -> Self {
		Self { span, next }
	}
}

#[async_trait]
impl Service for LoggingService {
	async fn post(&self, message: AlertWebhookMessage) -> Result<PostResponse, PostError> {
		let result = self.next.post(message).instrument(self.span.clone()).await;

		self.span.in_scope(|| match &result {
			Ok(response) => tracing::debug!(
				response_message = response.message.as_str(),
				response_status = response.status,
				webhook_url = response.webhook_url.as_str(),
				"posted alert"
			),
			Err(err) => {
				let response = err.response();
				tracing::debug!(
					response_message = response.message.as_str(),
					response_status = response.status,
					webhook_url = response.webhook_url.as_str(),
					err = ?err,
					"failed to post alert"
				)
			}
		});

		result
	}
}
