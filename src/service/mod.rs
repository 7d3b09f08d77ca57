//! The alertmanager to webex teams service of a single connector.
//!
//! Renders the card, wraps it into the request body and delivers it. Every
//! failure is turned into a [PostError] carrying the partially populated
//! [PostResponse], so callers can always answer with a response.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
	alert::AlertWebhookMessage,
	card::{Converter, RenderError},
	delivery::{Delivery, DeliveryClient, DeliveryError},
	request_template::RequestTemplate,
};

pub mod logging;

pub use logging::LoggingService;

/// Outcome of one delivery attempt, returned to alertmanager.
///
/// `status` is the http status of the destination, `0` if no response was
/// received. `message` is the response body or the error text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostResponse {
	/// destination the card was posted to
	pub webhook_url: String,
	/// http status returned by the destination
	pub status: u16,
	/// response body or error text
	pub message: String,
}

/// Failure of one pipeline stage. Non success status codes of the destination
/// are not failures.
#[derive(Error, Debug)]
pub enum PostError {
	/// the card couldn't be rendered, nothing was sent
	#[error("failed to render webhook message")]
	Render(#[source] RenderError),
	/// the request body couldn't be rendered, nothing was sent
	#[error("execute request template failed")]
	Template {
		/// response with the webhook url set
		response: PostResponse,
		/// tera error
		#[source]
		source: tera::Error,
	},
	/// the destination couldn't be reached
	#[error("failed to deliver card")]
	Delivery {
		/// response carrying the error text
		response: PostResponse,
		/// transport error
		#[source]
		source: DeliveryError,
	},
}

impl PostError {
	/// the partially populated response
	pub fn response(&self) -> PostResponse {
		match self {
			PostError::Render(_) => PostResponse::default(),
			PostError::Template { response, .. } | PostError::Delivery { response, .. } => {
				response.clone()
			}
		}
	}

	/// consumes the error, returning the partially populated response
	pub fn into_response(self) -> PostResponse {
		match self {
			PostError::Render(_) => PostResponse::default(),
			PostError::Template { response, .. } | PostError::Delivery { response, .. } => response,
		}
	}

	/// short name of the failed stage, used as metric label
	pub fn kind(&self) -> &'static str {
		match self {
			PostError::Render(_) => "render",
			PostError::Template { .. } => "template",
			PostError::Delivery { .. } => "delivery",
		}
	}
}

/// Alertmanager to webex teams service.
#[async_trait]
pub trait Service: Send + Sync {
	/// relay one alertmanager message
	async fn post(&self, message: AlertWebhookMessage) -> Result<PostResponse, PostError>;
}

/// [Service] posting every message once to a fixed destination
pub struct SimpleService {
	/// renders the card
	converter: Box<dyn Converter>,
	/// wraps the card into the request body
	request_template: RequestTemplate,
	/// shared http client
	client: DeliveryClient,
	/// destination
	webhook_url: String,
	/// bearer token for the destination
	access_token: String,
	/// room the card is posted into
	room_id: String,
}

impl SimpleService {
	/// construct service
	pub fn new(
		converter: Box<dyn Converter>,
		request_template: RequestTemplate,
		client: DeliveryClient,
		webhook_url: String,
		access_token: String,
		room_id: String,
	) -> Self {
		Self { converter, request_template, client, webhook_url, access_token, room_id }
	}
}

#[async_trait]
impl Service for SimpleService {
	async fn post(&self, message: AlertWebhookMessage) -> Result<PostResponse, PostError> {
		let card = self.converter.convert(&message).map_err(PostError::Render)?;

		let mut response = PostResponse { webhook_url: self.webhook_url.clone(), ..Default::default() };

		let body = match self.request_template.build(&self.room_id, &card) {
			Ok(body) => body,
			Err(source) => return Err(PostError::Template { response, source }),
		};

		match self.client.send(body, &self.webhook_url, &self.access_token).await {
			Ok(Delivery { status, body }) => {
				response.status = status;
				response.message = body;
				Ok(response)
			}
			Err(source) => {
				if let DeliveryError::Body { status, .. } = &source {
					response.status = *status;
				}
				response.message = source.to_string();
				Err(PostError::Delivery { response, source })
			}
		}
	}
}
