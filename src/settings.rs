//! command line arguments and config file
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use config::{Config, Environment, File};
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::{
	connector::ConnectorSettings, delivery::HttpClientSettings, log::LogSettings,
	router::AlertReceiverSettings, telemetry_endpoint::TelemetryEndpointSettings,
};

static SETTINGS: OnceCell<Settings> = OnceCell::new();

/// prefix of environment variables overriding config values, e.g.
/// `WEBEX_RELAY__LOG__LEVEL=debug`
const ENV_PREFIX: &str = "WEBEX_RELAY";

#[derive(Debug, Clone, Deserialize)]
/// process wide settings, loaded once at startup
pub struct Settings {
	/// listener for alertmanager webhook requests
	pub alert_webhook_receiver: AlertReceiverSettings,
	/// listener for metrics and config introspection
	pub telemetry_endpoint: TelemetryEndpointSettings,
	/// log level and format
	pub log: LogSettings,
	/// shared outbound http client
	pub http_client: HttpClientSettings,
	/// path of the json schema rendered cards are validated against
	pub card_schema: String,
	/// configured connectors, each one inbound path to one webex destination
	pub connectors: Vec<ConnectorSettings>,
}

impl Settings {
	/// Loads settings from command line, config file and environment. Later
	/// calls return the already loaded settings.
	pub fn init() -> Result<&'static Self> {
		SETTINGS.get_or_try_init(|| {
			let opts = command().get_matches();
			Self::load(&opts).context("failed to load config and command line arguments")
		})
	}

	/// Builds settings from parsed command line arguments.
	///
	/// Without `--config` a single connector is built from the connector flags.
	pub fn load(opts: &ArgMatches) -> Result<Self> {
		let config_path = opts.value_of("config");

		let mut builder = Config::builder()
			.set_default("alert_webhook_receiver.bind_address", "0.0.0.0")?
			.set_default("alert_webhook_receiver.port", 2000_i64)?
			.set_default("telemetry_endpoint.bind_address", "0.0.0.0")?
			.set_default("telemetry_endpoint.port", 2001_i64)?
			.set_default("log.level", "info")?
			.set_default("log.format", "fmt")?
			.set_default("http_client.idle_conn_timeout", 90.0_f64)?
			.set_default("http_client.max_idle_conns", 100_i64)?
			.set_default("http_client.tls_handshake_timeout", 30.0_f64)?
			.set_default("card_schema", "resources/adaptive-card-schema.json")?
			.set_default("connectors", Vec::<String>::new())?;

		if let Some(path) = config_path {
			builder = builder.add_source(File::with_name(path));
		}

		let conf = builder
			.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
			.set_override_option("log.level", opts.value_of("level"))?
			.set_override_option("log.format", opts.value_of("log-format"))?
			.set_override_option("alert_webhook_receiver.port", opts.value_of("port"))?
			.build()
			.context("can't load config")?;

		let mut settings: Settings = conf.try_deserialize().context("can't load config")?;

		if config_path.is_none() {
			settings.connectors = vec![connector_from_flags(opts)];
		}

		for connector in settings.connectors.iter_mut() {
			connector.normalize_request_path();
		}

		Ok(settings)
	}
}

/// the single connector described by command line flags
fn connector_from_flags(opts: &ArgMatches) -> ConnectorSettings {
	let value = |name: &str| opts.value_of(name).unwrap_or_default().to_owned();

	ConnectorSettings {
		request_path: value("request-path"),
		webhook_url: value("webhook-url"),
		access_token: value("access-token"),
		room_id: value("room-id"),
		template_file: value("template-file"),
		request_template_file: opts.value_of("request-template-file").map(str::to_owned),
		escape_underscores: opts.is_present("escape-underscores"),
	}
}

/// command line interface
pub fn command() -> Command<'static> {
	Command::new(clap::crate_name!())
		.version(clap::crate_version!())
		.about(clap::crate_description!())
		.args([
			Arg::new("config")
				.help("path of config file describing the connectors")
				.takes_value(true)
				.short('c')
				.long("config")
				.env("CONFIG_FILE"),
			Arg::new("level")
				.help("log level")
				.possible_values(["error", "warn", "info", "debug", "trace"])
				.ignore_case(true)
				.takes_value(true)
				.long("log"),
			Arg::new("log-format")
				.help("log output format")
				.possible_values(["fmt", "json"])
				.takes_value(true)
				.long("log-format"),
			Arg::new("port")
				.help("port of the alertmanager webhook receiver")
				.takes_value(true)
				.long("port"),
			Arg::new("request-path")
				.help("request path alertmanager posts to")
				.takes_value(true)
				.long("request-path")
				.env("REQUEST_PATH")
				.default_value("alertmanager"),
			Arg::new("webhook-url")
				.help("webex teams messages api endpoint")
				.takes_value(true)
				.long("webhook-url")
				.env("WEBEX_WEBHOOK_URL")
				.default_value("https://webexapis.com/v1/messages"),
			Arg::new("access-token")
				.help("bearer token used to authorize against the webhook")
				.takes_value(true)
				.long("access-token")
				.env("WEBEX_ACCESS_TOKEN")
				.hide_env_values(true),
			Arg::new("room-id")
				.help("webex teams room the cards are posted to")
				.takes_value(true)
				.long("room-id")
				.env("WEBEX_ROOM_ID"),
			Arg::new("template-file")
				.help("tera template rendering the adaptive card")
				.takes_value(true)
				.long("template-file")
				.env("TEMPLATE_FILE")
				.default_value("resources/default-message-card.tmpl"),
			Arg::new("request-template-file")
				.help("tera template wrapping the card into the request body, defaults to the built-in one")
				.takes_value(true)
				.long("request-template-file")
				.env("REQUEST_TEMPLATE_FILE"),
			Arg::new("escape-underscores")
				.help("prefix all '_' in alert texts with '\\'")
				.long("escape-underscores")
				.env("ESCAPE_UNDERSCORES"),
		])
}
