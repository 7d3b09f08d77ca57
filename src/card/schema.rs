//! json schema rendered cards are checked against
use std::{fs, io};

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use thiserror::Error;

/// the card schema couldn't be loaded
#[derive(Error, Debug)]
pub enum SchemaError {
	/// schema file couldn't be read
	#[error("failed to read card schema '{path}'")]
	Read {
		/// path of the schema file
		path: String,
		/// io error
		#[source]
		source: io::Error,
	},
	/// schema file isn't json
	#[error("card schema is not valid json")]
	Json(#[from] serde_json::Error),
	/// schema itself is invalid
	#[error("failed to compile card schema: {0}")]
	Compile(String),
}

/// Compiled card schema. Compiled once at startup and shared between all
/// connectors.
pub struct CardSchema {
	/// compiled draft 7 schema
	schema: JSONSchema,
}

impl std::fmt::Debug for CardSchema {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CardSchema").finish_non_exhaustive()
	}
}

impl CardSchema {
	/// read and compile the schema at `path`
	pub fn from_file(path: &str) -> Result<Self, SchemaError> {
		let content = fs::read_to_string(path)
			.map_err(|source| SchemaError::Read { path: path.to_owned(), source })?;

		Self::from_value(&serde_json::from_str(&content)?)
	}

	/// compile `schema`
	pub fn from_value(schema: &Value) -> Result<Self, SchemaError> {
		let schema = JSONSchema::options()
			.with_draft(Draft::Draft7)
			.compile(schema)
			.map_err(|err| SchemaError::Compile(err.to_string()))?;

		Ok(Self { schema })
	}

	/// Checks a rendered card. Returns a description of every violation if the
	/// card isn't json or doesn't match the schema.
	pub fn validate(&self, card: &str) -> Result<(), Vec<String>> {
		let card: Value = serde_json::from_str(card)
			.map_err(|err| vec![format!("card is not valid json: {err}")])?;

		self.schema.validate(&card).map_err(|errors| {
			errors
				.map(|error| match error.instance_path.to_string() {
					path if path.is_empty() => error.to_string(),
					path => format!("{path}: {error}"),
				})
				.collect()
		})
	}
}
