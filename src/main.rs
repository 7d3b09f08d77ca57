use std::sync::Arc;

use anyhow::{Context, Result};
use webex_relay::{
	card::schema::CardSchema, connector, delivery::DeliveryClient, log, metrics, router,
	settings::Settings, telemetry_endpoint,
};

/// exit the complete program if one thread panics
fn setup_panic_handler() {
	let default_panic = std::panic::take_hook();
	std::panic::set_hook(Box::new(move |info| {
		default_panic(info);
		std::process::exit(1);
	}));
}

/// resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			tracing::error!("failed to listen for ctrl-c: {:?}", err);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(err) => {
				tracing::error!("failed to listen for SIGTERM: {:?}", err);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	tracing::info!("shutting down");
}

/// the entry point of the program
#[tokio::main]
pub async fn main() -> Result<()> {
	setup_panic_handler();

	let settings = Settings::init()?;

	log::setup_logging(&settings.log).context("could not setup logging")?;

	metrics::register(prometheus::default_registry()).context("failed to register metrics")?;

	let schema = Arc::new(
		CardSchema::from_file(&settings.card_schema).context("failed to load card schema")?,
	);

	let client =
		DeliveryClient::new(&settings.http_client).context("failed to construct http client")?;

	let routes = connector::build_routes(&settings.connectors, &schema, &client)?;
	let app = router::register_routes(routes)?;

	tokio::spawn(async move {
		if let Err(err) =
			telemetry_endpoint::run_telemetry_endpoint(&settings.telemetry_endpoint, &settings.connectors)
				.await
		{
			tracing::error!("{:?}", err);
			std::process::exit(1);
		}
	});

	router::run_receiver(app, settings.alert_webhook_receiver.to_socket_addr(), shutdown_signal())
		.await
}
