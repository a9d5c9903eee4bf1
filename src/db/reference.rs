//! Storage of the unit reference data: unit systems, unit types, unit
//! categories, unit definitions and the mapping that tells which definition a
//! system uses for a category.

use async_trait::async_trait;
use log::*;
use rust_decimal::Decimal;
use sea_orm::{prelude::*, *};

use super::{expect_found, Error, PersistenceHandle, Result};
use crate::{
	common::{check_decimal, now, DecimalError, ExactDecimal},
	entity::{unit_category, unit_definition, unit_system, unit_system_category_definition, unit_type},
	trace, units,
};


#[derive(Clone, Debug)]
pub struct NewUnitDefinition {
	pub name: String,
	pub unit_type_id: i64,
	pub scale_factor: ExactDecimal,
	pub offset: ExactDecimal,
	pub is_base: bool,
	pub alias_text: Option<String>,
	pub precision: i32,
	pub calculation_method: Option<i32>,
	pub created_by: Option<i64>,
}


fn check_unit_definition_decimals(scale_factor: &ExactDecimal, offset: &ExactDecimal) -> Result<()> {
	check_decimal("scale_factor", scale_factor, 20, 10)?;
	check_decimal("offset", offset, 20, 10)?;
	if scale_factor.is_zero() {
		return trace::err(Error::InvalidDecimal(DecimalError::Zero {
			field: "scale_factor",
		}));
	}
	Ok(())
}


#[async_trait]
pub trait ReferenceStore: PersistenceHandle {
	async fn create_unit_system(
		&self, name: &str, created_by: Option<i64>,
	) -> Result<unit_system::Model> {
		let timestamp = now();
		let record = unit_system::ActiveModel {
			unit_system_id: NotSet,
			unit_system_name: Set(name.to_string()),
			created_date: Set(timestamp),
			modified_date: Set(timestamp),
			created_by: Set(created_by),
			modified_by: Set(created_by),
		};
		Ok(record.insert(self.inner()).await?)
	}

	async fn rename_unit_system(
		&self, id: i64, name: &str, modified_by: Option<i64>,
	) -> Result<unit_system::Model> {
		let existing = expect_found(self.find_unit_system(id).await?, "unit system", id)?;
		let mut record: unit_system::ActiveModel = existing.into();
		record.unit_system_name = Set(name.to_string());
		record.modified_date = Set(now());
		record.modified_by = Set(modified_by);
		Ok(record.update(self.inner()).await?)
	}

	async fn find_unit_system(&self, id: i64) -> Result<Option<unit_system::Model>> {
		Ok(unit_system::Entity::find_by_id(id).one(self.inner()).await?)
	}

	async fn find_unit_system_by_name(&self, name: &str) -> Result<Option<unit_system::Model>> {
		Ok(unit_system::Entity::find()
			.filter(unit_system::Column::UnitSystemName.eq(name))
			.one(self.inner())
			.await?)
	}

	async fn list_unit_systems(&self) -> Result<Vec<unit_system::Model>> {
		Ok(unit_system::Entity::find()
			.order_by_asc(unit_system::Column::UnitSystemName)
			.all(self.inner())
			.await?)
	}

	/// Deletes a unit system, together with its category mappings.
	async fn delete_unit_system(&self, id: i64) -> Result<bool> {
		let result = unit_system::Entity::delete_by_id(id)
			.exec(self.inner())
			.await?;
		Ok(result.rows_affected > 0)
	}

	async fn create_unit_type(&self, name: &str, created_by: Option<i64>) -> Result<unit_type::Model> {
		let timestamp = now();
		let record = unit_type::ActiveModel {
			unit_type_id: NotSet,
			unit_type_name: Set(name.to_string()),
			created_date: Set(timestamp),
			modified_date: Set(timestamp),
			created_by: Set(created_by),
			modified_by: Set(created_by),
		};
		Ok(record.insert(self.inner()).await?)
	}

	async fn rename_unit_type(
		&self, id: i64, name: &str, modified_by: Option<i64>,
	) -> Result<unit_type::Model> {
		let existing = expect_found(self.find_unit_type(id).await?, "unit type", id)?;
		let mut record: unit_type::ActiveModel = existing.into();
		record.unit_type_name = Set(name.to_string());
		record.modified_date = Set(now());
		record.modified_by = Set(modified_by);
		Ok(record.update(self.inner()).await?)
	}

	async fn find_unit_type(&self, id: i64) -> Result<Option<unit_type::Model>> {
		Ok(unit_type::Entity::find_by_id(id).one(self.inner()).await?)
	}

	async fn list_unit_types(&self) -> Result<Vec<unit_type::Model>> {
		Ok(unit_type::Entity::find()
			.order_by_asc(unit_type::Column::UnitTypeName)
			.all(self.inner())
			.await?)
	}

	/// Deletes a unit type, but only if no unit definitions or unit categories
	/// refer to it anymore.
	async fn delete_unit_type(&self, id: i64) -> Result<bool> {
		let definitions = unit_definition::Entity::find()
			.filter(unit_definition::Column::UnitTypeId.eq(id))
			.count(self.inner())
			.await?;
		let categories = unit_category::Entity::find()
			.filter(unit_category::Column::UnitTypeId.eq(id))
			.count(self.inner())
			.await?;
		if definitions > 0 || categories > 0 {
			debug!(
				"Refusing to delete unit type {}: {} definitions and {} categories depend on it.",
				id, definitions, categories
			);
			return trace::err(Error::ReferentialBlock(format!(
				"unit type {} ({} unit definitions, {} unit categories)",
				id, definitions, categories
			)));
		}

		let result = unit_type::Entity::delete_by_id(id)
			.exec(self.inner())
			.await?;
		Ok(result.rows_affected > 0)
	}

	async fn create_unit_definition(
		&self, definition: NewUnitDefinition,
	) -> Result<unit_definition::Model> {
		check_unit_definition_decimals(&definition.scale_factor, &definition.offset)?;

		let timestamp = now();
		let record = unit_definition::ActiveModel {
			unit_definition_id: NotSet,
			unit_definition_name: Set(definition.name),
			unit_type_id: Set(definition.unit_type_id),
			scale_factor: Set(definition.scale_factor),
			offset: Set(definition.offset),
			is_base: Set(definition.is_base),
			alias_text: Set(definition.alias_text),
			precision: Set(definition.precision),
			created_date: Set(timestamp),
			modified_date: Set(timestamp),
			created_by: Set(definition.created_by),
			modified_by: Set(definition.created_by),
			calculation_method: Set(definition.calculation_method),
		};
		Ok(record.insert(self.inner()).await?)
	}

	/// Stores all editable fields of the given unit definition.
	async fn update_unit_definition(
		&self, definition: unit_definition::Model, modified_by: Option<i64>,
	) -> Result<unit_definition::Model> {
		check_unit_definition_decimals(&definition.scale_factor, &definition.offset)?;
		let existing = expect_found(
			self.find_unit_definition(definition.unit_definition_id)
				.await?,
			"unit definition",
			definition.unit_definition_id,
		)?;

		let mut record: unit_definition::ActiveModel = existing.into();
		record.unit_definition_name = Set(definition.unit_definition_name);
		record.unit_type_id = Set(definition.unit_type_id);
		record.scale_factor = Set(definition.scale_factor);
		record.offset = Set(definition.offset);
		record.is_base = Set(definition.is_base);
		record.alias_text = Set(definition.alias_text);
		record.precision = Set(definition.precision);
		record.calculation_method = Set(definition.calculation_method);
		record.modified_date = Set(now());
		record.modified_by = Set(modified_by);
		Ok(record.update(self.inner()).await?)
	}

	async fn find_unit_definition(&self, id: i64) -> Result<Option<unit_definition::Model>> {
		Ok(unit_definition::Entity::find_by_id(id)
			.one(self.inner())
			.await?)
	}

	async fn list_unit_definitions(
		&self, unit_type_id: Option<i64>,
	) -> Result<Vec<unit_definition::Model>> {
		let mut query = unit_definition::Entity::find();
		if let Some(id) = unit_type_id {
			query = query.filter(unit_definition::Column::UnitTypeId.eq(id));
		}
		Ok(query
			.order_by_asc(unit_definition::Column::UnitDefinitionName)
			.all(self.inner())
			.await?)
	}

	async fn delete_unit_definition(&self, id: i64) -> Result<bool> {
		let result = unit_definition::Entity::delete_by_id(id)
			.exec(self.inner())
			.await?;
		Ok(result.rows_affected > 0)
	}

	/// Finds the base unit of a unit type. If more than one definition is
	/// flagged as base, the oldest one wins.
	async fn find_base_unit_definition(
		&self, unit_type_id: i64,
	) -> Result<Option<unit_definition::Model>> {
		Ok(unit_definition::Entity::find()
			.filter(unit_definition::Column::UnitTypeId.eq(unit_type_id))
			.filter(unit_definition::Column::IsBase.eq(true))
			.order_by_asc(unit_definition::Column::UnitDefinitionId)
			.one(self.inner())
			.await?)
	}

	async fn create_unit_category(
		&self, name: &str, unit_type_id: i64, created_by: Option<i64>,
	) -> Result<unit_category::Model> {
		let timestamp = now();
		let record = unit_category::ActiveModel {
			unit_category_id: NotSet,
			unit_type_id: Set(unit_type_id),
			unit_category_name: Set(name.to_string()),
			created_date: Set(timestamp),
			modified_date: Set(timestamp),
			created_by: Set(created_by),
			modified_by: Set(created_by),
		};
		Ok(record.insert(self.inner()).await?)
	}

	async fn update_unit_category(
		&self, category: unit_category::Model, modified_by: Option<i64>,
	) -> Result<unit_category::Model> {
		let existing = expect_found(
			self.find_unit_category(category.unit_category_id).await?,
			"unit category",
			category.unit_category_id,
		)?;

		let mut record: unit_category::ActiveModel = existing.into();
		record.unit_category_name = Set(category.unit_category_name);
		record.unit_type_id = Set(category.unit_type_id);
		record.modified_date = Set(now());
		record.modified_by = Set(modified_by);
		Ok(record.update(self.inner()).await?)
	}

	async fn find_unit_category(&self, id: i64) -> Result<Option<unit_category::Model>> {
		Ok(unit_category::Entity::find_by_id(id)
			.one(self.inner())
			.await?)
	}

	async fn list_unit_categories(
		&self, unit_type_id: Option<i64>,
	) -> Result<Vec<unit_category::Model>> {
		let mut query = unit_category::Entity::find();
		if let Some(id) = unit_type_id {
			query = query.filter(unit_category::Column::UnitTypeId.eq(id));
		}
		Ok(query
			.order_by_asc(unit_category::Column::UnitCategoryName)
			.all(self.inner())
			.await?)
	}

	async fn delete_unit_category(&self, id: i64) -> Result<bool> {
		let result = unit_category::Entity::delete_by_id(id)
			.exec(self.inner())
			.await?;
		Ok(result.rows_affected > 0)
	}

	/// Records that `unit_system` expresses `unit_category` in
	/// `unit_definition`. The definition must measure the same unit type as the
	/// category.
	async fn assign_unit_definition(
		&self, unit_system_id: i64, unit_category_id: i64, unit_definition_id: i64,
		created_by: Option<i64>,
	) -> Result<unit_system_category_definition::Model> {
		let category = expect_found(
			self.find_unit_category(unit_category_id).await?,
			"unit category",
			unit_category_id,
		)?;
		let definition = expect_found(
			self.find_unit_definition(unit_definition_id).await?,
			"unit definition",
			unit_definition_id,
		)?;
		if category.unit_type_id != definition.unit_type_id {
			return trace::err(Error::CategoryMismatch {
				unit_category_id,
				unit_definition_id,
			});
		}

		let timestamp = now();
		let record = unit_system_category_definition::ActiveModel {
			unit_system_category_definition_id: NotSet,
			unit_system_id: Set(unit_system_id),
			unit_category_id: Set(unit_category_id),
			unit_definition_id: Set(unit_definition_id),
			created_date: Set(timestamp),
			modified_date: Set(timestamp),
			created_by: Set(created_by),
			modified_by: Set(created_by),
		};
		Ok(record.insert(self.inner()).await?)
	}

	async fn find_unit_system_category_definition(
		&self, id: i64,
	) -> Result<Option<unit_system_category_definition::Model>> {
		Ok(unit_system_category_definition::Entity::find_by_id(id)
			.one(self.inner())
			.await?)
	}

	async fn list_unit_system_category_definitions(
		&self, unit_system_id: i64,
	) -> Result<Vec<unit_system_category_definition::Model>> {
		Ok(unit_system_category_definition::Entity::find()
			.filter(unit_system_category_definition::Column::UnitSystemId.eq(unit_system_id))
			.order_by_asc(unit_system_category_definition::Column::UnitSystemId)
			.order_by_asc(unit_system_category_definition::Column::UnitCategoryId)
			.all(self.inner())
			.await?)
	}

	async fn delete_unit_system_category_definition(&self, id: i64) -> Result<bool> {
		let result = unit_system_category_definition::Entity::delete_by_id(id)
			.exec(self.inner())
			.await?;
		Ok(result.rows_affected > 0)
	}

	/// Looks up the unit definition that a unit system uses for a unit
	/// category. When a system maps more than one definition onto a category,
	/// the one that was assigned first is returned.
	async fn find_unit_definition_for(
		&self, unit_system_id: i64, unit_category_id: i64,
	) -> Result<Option<unit_definition::Model>> {
		Ok(unit_definition::Entity::find()
			.join(
				JoinType::InnerJoin,
				unit_system_category_definition::Relation::UnitDefinition
					.def()
					.rev(),
			)
			.filter(unit_system_category_definition::Column::UnitSystemId.eq(unit_system_id))
			.filter(unit_system_category_definition::Column::UnitCategoryId.eq(unit_category_id))
			.order_by_asc(unit_system_category_definition::Column::UnitSystemCategoryDefinitionId)
			.one(self.inner())
			.await?)
	}

	/// Converts a value from one unit definition into another, rounded to the
	/// precision of the target.
	async fn convert_value(
		&self, value: Decimal, from_id: i64, to_id: i64,
	) -> Result<Decimal> {
		let from = expect_found(self.find_unit_definition(from_id).await?, "unit definition", from_id)?;
		let to = expect_found(self.find_unit_definition(to_id).await?, "unit definition", to_id)?;
		units::convert(value, &from, &to)
	}
}

impl<T> ReferenceStore for T where T: PersistenceHandle {}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::test::{self, definition};

	#[tokio::test]
	async fn test_unique_names() {
		let db = test::load_database("unique_names").await;

		db.create_unit_system("Oil Field", None).await.unwrap();
		let error = db.create_unit_system("Oil Field", None).await.unwrap_err();
		assert!(matches!(&*error, Error::UniquenessViolation(_)));

		let length = db.create_unit_type("Length", None).await.unwrap();
		let error = db.create_unit_type("Length", None).await.unwrap_err();
		assert!(matches!(&*error, Error::UniquenessViolation(_)));

		// Definition names only need to be unique within their unit type
		let area = db.create_unit_type("Area", None).await.unwrap();
		db.create_unit_definition(definition("m", length.unit_type_id, "1", "0", true))
			.await
			.unwrap();
		db.create_unit_definition(definition("m", area.unit_type_id, "1", "0", true))
			.await
			.unwrap();
		let error = db
			.create_unit_definition(definition("m", length.unit_type_id, "1", "0", false))
			.await
			.unwrap_err();
		assert!(matches!(&*error, Error::UniquenessViolation(_)));
	}

	#[tokio::test]
	async fn test_delete_unit_type_is_protected() {
		let db = test::load_database("protect_unit_type").await;

		let length = db.create_unit_type("Length", None).await.unwrap();
		let meter = db
			.create_unit_definition(definition("m", length.unit_type_id, "1", "0", true))
			.await
			.unwrap();
		let error = db.delete_unit_type(length.unit_type_id).await.unwrap_err();
		assert!(matches!(&*error, Error::ReferentialBlock(_)));

		db.delete_unit_definition(meter.unit_definition_id)
			.await
			.unwrap();
		let category = db
			.create_unit_category("Depth", length.unit_type_id, None)
			.await
			.unwrap();
		let error = db.delete_unit_type(length.unit_type_id).await.unwrap_err();
		assert!(matches!(&*error, Error::ReferentialBlock(_)));

		db.delete_unit_category(category.unit_category_id)
			.await
			.unwrap();
		assert!(db.delete_unit_type(length.unit_type_id).await.unwrap());
		assert!(db
			.find_unit_type(length.unit_type_id)
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn test_decimal_round_trip() {
		let db = test::load_database("decimal_round_trip").await;

		let temperature = db.create_unit_type("Temperature", None).await.unwrap();
		let created = db
			.create_unit_definition(definition(
				"degF",
				temperature.unit_type_id,
				"0.5555555556",
				"459.6700000000",
				false,
			))
			.await
			.unwrap();
		let loaded = db
			.find_unit_definition(created.unit_definition_id)
			.await
			.unwrap()
			.expect("definition missing");
		assert_eq!(loaded, created);
		assert_eq!(loaded.scale_factor.to_string(), "0.5555555556");
		assert_eq!(loaded.offset.to_string(), "459.6700000000");

		let error = db
			.create_unit_definition(definition(
				"bad",
				temperature.unit_type_id,
				"0.00000000001",
				"0",
				false,
			))
			.await
			.unwrap_err();
		assert!(matches!(&*error, Error::InvalidDecimal(_)));
	}

	#[tokio::test]
	async fn test_unit_lookup() {
		let db = test::load_database("unit_lookup").await;

		let oil_field = db.create_unit_system("Oil Field", None).await.unwrap();
		let metric = db.create_unit_system("Norwegian S.I.", None).await.unwrap();
		let length = db.create_unit_type("Length", None).await.unwrap();
		let meter = db
			.create_unit_definition(definition("m", length.unit_type_id, "1", "0", true))
			.await
			.unwrap();
		let feet = db
			.create_unit_definition(definition("ft", length.unit_type_id, "0.3048", "0", false))
			.await
			.unwrap();
		let depth = db
			.create_unit_category("Depth", length.unit_type_id, None)
			.await
			.unwrap();

		db.assign_unit_definition(
			oil_field.unit_system_id,
			depth.unit_category_id,
			feet.unit_definition_id,
			None,
		)
		.await
		.unwrap();
		db.assign_unit_definition(
			metric.unit_system_id,
			depth.unit_category_id,
			meter.unit_definition_id,
			None,
		)
		.await
		.unwrap();
		let error = db
			.assign_unit_definition(
				metric.unit_system_id,
				depth.unit_category_id,
				meter.unit_definition_id,
				None,
			)
			.await
			.unwrap_err();
		assert!(matches!(&*error, Error::UniquenessViolation(_)));

		let found = db
			.find_unit_definition_for(oil_field.unit_system_id, depth.unit_category_id)
			.await
			.unwrap();
		assert_eq!(found, Some(feet.clone()));
		let found = db
			.find_unit_definition_for(metric.unit_system_id, depth.unit_category_id)
			.await
			.unwrap();
		assert_eq!(found, Some(meter.clone()));

		// Removing the system takes its mappings with it
		assert!(db
			.delete_unit_system(oil_field.unit_system_id)
			.await
			.unwrap());
		assert!(db
			.list_unit_system_category_definitions(oil_field.unit_system_id)
			.await
			.unwrap()
			.is_empty());

		let base = db
			.find_base_unit_definition(length.unit_type_id)
			.await
			.unwrap();
		assert_eq!(base, Some(meter));
	}

	#[tokio::test]
	async fn test_modified_date_moves_on_update() {
		let db = test::load_database("modified_date").await;

		let system = db.create_unit_system("Oil Field", Some(1)).await.unwrap();
		assert_eq!(system.created_date, system.modified_date);
		let renamed = db
			.rename_unit_system(system.unit_system_id, "Field", Some(2))
			.await
			.unwrap();
		assert_eq!(renamed.created_date, system.created_date);
		assert!(renamed.modified_date >= system.modified_date);
		assert_eq!(renamed.created_by, Some(1));
		assert_eq!(renamed.modified_by, Some(2));
	}
}
