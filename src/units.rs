//! Conversion of values between the unit definitions of one unit type.
//!
//! Every definition relates to the base unit of its type through an affine
//! transformation: `base = (value + offset) * scale_factor`. Converting from
//! one definition to another goes through the base unit.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
	common::DecimalError,
	db::{self, Error},
	entity::unit_definition,
	trace,
};


/// Expresses a value of the given definition in the base unit.
pub fn to_base(value: Decimal, definition: &unit_definition::Model) -> db::Result<Decimal> {
	match value
		.checked_add(*definition.offset)
		.and_then(|v| v.checked_mul(*definition.scale_factor))
	{
		Some(v) => Ok(v),
		None => out_of_range(),
	}
}

/// Expresses a value of the base unit in the given definition.
pub fn from_base(base: Decimal, definition: &unit_definition::Model) -> db::Result<Decimal> {
	match base
		.checked_div(*definition.scale_factor)
		.and_then(|v| v.checked_sub(*definition.offset))
	{
		Some(v) => Ok(v),
		None => out_of_range(),
	}
}

pub fn convert(
	value: Decimal, from: &unit_definition::Model, to: &unit_definition::Model,
) -> db::Result<Decimal> {
	if from.unit_type_id != to.unit_type_id {
		return trace::err(Error::IncompatibleUnits {
			from: from.unit_definition_id,
			to: to.unit_definition_id,
		});
	}

	let base = to_base(value, from)?;
	let converted = from_base(base, to)?;
	Ok(round_to_precision(converted, to.precision))
}

/// Rounds half away from zero to the given number of decimal places. A
/// negative precision leaves the value as is.
pub fn round_to_precision(value: Decimal, precision: i32) -> Decimal {
	if precision < 0 {
		return value;
	}
	value.round_dp_with_strategy(precision as u32, RoundingStrategy::MidpointAwayFromZero)
}

fn out_of_range<T>() -> db::Result<T> {
	trace::err(Error::InvalidDecimal(DecimalError::OutOfRange {
		field: "value",
	}))
}


#[cfg(test)]
mod tests {
	use std::str::FromStr;

	use super::*;
	use crate::{
		db::ReferenceStore,
		test::{self, definition},
	};

	fn dec(s: &str) -> Decimal { Decimal::from_str(s).unwrap() }

	#[test]
	fn test_round_to_precision() {
		assert_eq!(round_to_precision(dec("1.23456"), 4), dec("1.2346"));
		assert_eq!(round_to_precision(dec("-2.5"), 0), dec("-3"));
		assert_eq!(round_to_precision(dec("7.125"), -1), dec("7.125"));
	}

	#[tokio::test]
	async fn test_convert_between_definitions() {
		let db = test::load_database("convert").await;

		let length = db.create_unit_type("Length", None).await.unwrap();
		let temperature = db.create_unit_type("Temperature", None).await.unwrap();
		let meter = db
			.create_unit_definition(definition("m", length.unit_type_id, "1", "0", true))
			.await
			.unwrap();
		let foot = db
			.create_unit_definition(definition("ft", length.unit_type_id, "0.3048", "0", false))
			.await
			.unwrap();
		let kelvin = db
			.create_unit_definition(definition("K", temperature.unit_type_id, "1", "0", true))
			.await
			.unwrap();
		let celsius = db
			.create_unit_definition(definition(
				"degC",
				temperature.unit_type_id,
				"1",
				"273.15",
				false,
			))
			.await
			.unwrap();

		let meters = db
			.convert_value(dec("1000"), foot.unit_definition_id, meter.unit_definition_id)
			.await
			.unwrap();
		assert_eq!(meters, dec("304.8"));
		let feet = db
			.convert_value(meters, meter.unit_definition_id, foot.unit_definition_id)
			.await
			.unwrap();
		assert_eq!(feet, dec("1000"));

		let kelvins = convert(dec("25"), &celsius, &kelvin).unwrap();
		assert_eq!(kelvins, dec("298.15"));
		assert_eq!(convert(kelvins, &kelvin, &celsius).unwrap(), dec("25"));

		let error = db
			.convert_value(dec("1"), meter.unit_definition_id, kelvin.unit_definition_id)
			.await
			.unwrap_err();
		assert!(matches!(&*error, Error::IncompatibleUnits { .. }));
	}

	#[tokio::test]
	async fn test_zero_scale_factor_is_rejected() {
		let db = test::load_database("zero_scale").await;

		let length = db.create_unit_type("Length", None).await.unwrap();
		let error = db
			.create_unit_definition(definition("nothing", length.unit_type_id, "0", "0", false))
			.await
			.unwrap_err();
		assert!(matches!(
			&*error,
			Error::InvalidDecimal(DecimalError::Zero { .. })
		));
	}
}
