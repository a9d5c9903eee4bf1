use std::fmt::{Debug, Display};

use ::serde::Serialize;
use axum::{
	http::{header, StatusCode},
	response::{IntoResponse, Response},
};
use log::*;

use crate::{db, trace::Traced};


pub fn json_response(status_code: u16, json: &impl Serialize) -> Response {
	match serde_json::to_string(json) {
		Ok(body) => (
			status(status_code),
			[(header::CONTENT_TYPE, "application/json")],
			body,
		)
			.into_response(),
		Err(e) => server_error_response(e, "Unable to serialize response"),
	}
}

pub fn error_response<S>(status_code: u16, message: S) -> Response
where
	S: Into<String>,
{
	let string: String = message.into();
	if status_code >= 400 {
		warn!("HTTP {} error: {}", status_code, &string);
	}
	(
		status(status_code),
		[(header::CONTENT_TYPE, "text/plain")],
		string,
	)
		.into_response()
}

pub fn not_found_error_response(message: &str) -> Response { error_response(404, message) }

pub fn server_error_response<E>(e: E, message: &str) -> Response
where
	E: Debug + Display,
{
	error!("{}: {:?}", message, e);
	error_response(500, format!("{}: {}", message, e))
}

/// Responds with the status code that fits the store error.
pub fn db_error_response(e: Traced<db::Error>, message: &str) -> Response {
	let status_code = match &*e {
		db::Error::NotFound(..) => 404,
		db::Error::UniquenessViolation(_)
		| db::Error::ReferentialBlock(_)
		| db::Error::LinkConflict { .. }
		| db::Error::ScenarioBusy(_) => 409,
		db::Error::CrossTypeMismatch { .. }
		| db::Error::InvalidDecimal(_)
		| db::Error::IncompatibleUnits { .. }
		| db::Error::CategoryMismatch { .. }
		| db::Error::InvalidProgress(_) => 422,
		db::Error::OrmError(_) | db::Error::Serialization(_) =>
			return server_error_response(e, message),
	};
	error_response(status_code, format!("{}: {}", message, e))
}

fn status(code: u16) -> StatusCode {
	StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
