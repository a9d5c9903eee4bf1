use std::{fmt, ops, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
	sea_query::{ArrayType, Nullable, ValueType, ValueTypeErr},
	ColIdx, ColumnType, DbErr, QueryResult, TryGetError, TryGetable, Value,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;


/// A decimal number that is persisted as its exact textual representation.
///
/// SQLite has no fixed point column type, so storing the value as text is the
/// only way to get back exactly the digits that went in.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ExactDecimal(pub Decimal);

#[derive(Clone, Debug, Error, PartialEq)]
pub enum DecimalError {
	#[error("{field} has more than {max} decimal places")]
	TooManyDecimalPlaces { field: &'static str, max: u32 },
	#[error("{field} has more than {max} digits before the decimal point")]
	TooManyWholeDigits { field: &'static str, max: u32 },
	#[error("{field} can not be zero")]
	Zero { field: &'static str },
	#[error("{field} is out of range")]
	OutOfRange { field: &'static str },
}


pub fn now() -> DateTime<Utc> { Utc::now() }

/// Checks a decimal against a `(max_digits, decimal_places)` column
/// declaration.
pub fn check_decimal(
	field: &'static str, value: &Decimal, max_digits: u32, decimal_places: u32,
) -> Result<(), DecimalError> {
	let normalized = value.normalize();
	let decimals = normalized.scale();
	let digits = if normalized.is_zero() {
		0
	} else {
		normalized.mantissa().unsigned_abs().to_string().len() as u32
	};
	let whole_digits = digits.saturating_sub(decimals);

	if decimals > decimal_places {
		return Err(DecimalError::TooManyDecimalPlaces {
			field,
			max: decimal_places,
		});
	}
	if whole_digits > max_digits - decimal_places {
		return Err(DecimalError::TooManyWholeDigits {
			field,
			max: max_digits - decimal_places,
		});
	}
	Ok(())
}


impl ExactDecimal {
	pub const ONE: Self = Self(Decimal::ONE);
	pub const ZERO: Self = Self(Decimal::ZERO);

	pub fn new(num: i64, scale: u32) -> Self { Self(Decimal::new(num, scale)) }
}

impl fmt::Display for ExactDecimal {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { fmt::Display::fmt(&self.0, f) }
}

/// Parsing never rounds. Values needing more than the 28 significant digits
/// a `Decimal` holds are rejected instead.
impl FromStr for ExactDecimal {
	type Err = rust_decimal::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self(Decimal::from_str_exact(s)?)) }
}

impl From<Decimal> for ExactDecimal {
	fn from(other: Decimal) -> Self { Self(other) }
}

impl From<i64> for ExactDecimal {
	fn from(other: i64) -> Self { Self(Decimal::from(other)) }
}

impl ops::Deref for ExactDecimal {
	type Target = Decimal;

	fn deref(&self) -> &Self::Target { &self.0 }
}

impl TryGetable for ExactDecimal {
	fn try_get_by<I: ColIdx>(res: &QueryResult, index: I) -> Result<Self, TryGetError> {
		let string = <String as TryGetable>::try_get_by(res, index)?;
		Decimal::from_str_exact(&string).map(Self).map_err(|e| {
			TryGetError::DbErr(DbErr::TryIntoErr {
				from: "String",
				into: "ExactDecimal",
				source: Box::new(e),
			})
		})
	}
}

impl From<ExactDecimal> for Value {
	fn from(other: ExactDecimal) -> Self { Value::String(Some(Box::new(other.0.to_string()))) }
}

impl From<&ExactDecimal> for Value {
	fn from(other: &ExactDecimal) -> Self { Value::String(Some(Box::new(other.0.to_string()))) }
}

impl Nullable for ExactDecimal {
	fn null() -> Value { Value::String(None) }
}

impl ValueType for ExactDecimal {
	fn try_from(v: Value) -> Result<Self, ValueTypeErr> {
		match v {
			Value::String(Some(string)) =>
				Decimal::from_str_exact(&string).map(Self).map_err(|_| ValueTypeErr),
			_ => Err(ValueTypeErr),
		}
	}

	fn type_name() -> String { "ExactDecimal".to_owned() }

	fn array_type() -> ArrayType { ArrayType::String }

	fn column_type() -> ColumnType { ColumnType::String(Some(64)) }
}
