//! loading of tera templates from disk or from strings
use tera::Tera;
use thiserror::Error;

/// A template couldn't be read or parsed. Always fatal at startup.
#[derive(Error, Debug)]
#[error("failed to parse template '{origin}'")]
pub struct TemplateParseError {
	/// file path of the template, or `<builtin>`
	pub origin: String,
	/// underlying tera error
	#[source]
	pub source: tera::Error,
}

/// Returns a [Tera] instance holding the template file `path` under `name`.
pub fn from_file(name: &str, path: &str) -> Result<Tera, TemplateParseError> {
	let mut tera = Tera::default();

	tera.add_template_file(path, Some(name))
		.map_err(|source| TemplateParseError { origin: path.to_owned(), source })?;

	Ok(tera)
}

/// Returns a [Tera] instance holding `content` under `name`.
pub fn from_raw(name: &str, content: &str) -> Result<Tera, TemplateParseError> {
	let mut tera = Tera::default();

	tera.add_raw_template(name, content)
		.map_err(|source| TemplateParseError { origin: String::from("<builtin>"), source })?;

	Ok(tera)
}
