//! Storage of data sources, object types, object instances and the properties
//! of object types.

use async_trait::async_trait;
use log::*;
use sea_orm::{prelude::*, *};

use super::{expect_found, PersistenceHandle, ReferenceStore, Result};
use crate::entity::{data_source, object_instance, object_type, object_type_property, unit_category};


#[derive(Clone, Debug, Default)]
pub struct NewObjectTypeProperty {
	pub object_type_id: i64,
	pub name: String,
	pub category: String,
	pub tag: Option<String>,
	pub openserver: Option<String>,
	pub unit_category_id: Option<i64>,
}


#[async_trait]
pub trait CatalogStore: PersistenceHandle {
	async fn create_data_source(&self, name: &str) -> Result<data_source::Model> {
		let record = data_source::ActiveModel {
			id: NotSet,
			data_source_name: Set(name.to_string()),
		};
		Ok(record.insert(self.inner()).await?)
	}

	async fn find_data_source(&self, id: i64) -> Result<Option<data_source::Model>> {
		Ok(data_source::Entity::find_by_id(id).one(self.inner()).await?)
	}

	async fn list_data_sources(&self) -> Result<Vec<data_source::Model>> {
		Ok(data_source::Entity::find()
			.order_by_asc(data_source::Column::DataSourceName)
			.all(self.inner())
			.await?)
	}

	async fn rename_data_source(&self, id: i64, name: &str) -> Result<data_source::Model> {
		let existing = expect_found(self.find_data_source(id).await?, "data source", id)?;
		let mut record: data_source::ActiveModel = existing.into();
		record.data_source_name = Set(name.to_string());
		Ok(record.update(self.inner()).await?)
	}

	/// Deletes a data source. Fails as long as components or main records
	/// still refer to it.
	async fn delete_data_source(&self, id: i64) -> Result<bool> {
		let result = data_source::Entity::delete_by_id(id)
			.exec(self.inner())
			.await?;
		Ok(result.rows_affected > 0)
	}

	async fn create_object_type(&self, name: &str) -> Result<object_type::Model> {
		let record = object_type::ActiveModel {
			object_type_id: NotSet,
			object_type_name: Set(name.to_string()),
		};
		Ok(record.insert(self.inner()).await?)
	}

	async fn find_object_type(&self, id: i64) -> Result<Option<object_type::Model>> {
		Ok(object_type::Entity::find_by_id(id).one(self.inner()).await?)
	}

	async fn list_object_types(&self) -> Result<Vec<object_type::Model>> {
		Ok(object_type::Entity::find()
			.order_by_asc(object_type::Column::ObjectTypeName)
			.all(self.inner())
			.await?)
	}

	/// Deletes an object type along with its instances, properties and the
	/// main records of those.
	async fn delete_object_type(&self, id: i64) -> Result<bool> {
		let result = object_type::Entity::delete_by_id(id)
			.exec(self.inner())
			.await?;
		Ok(result.rows_affected > 0)
	}

	async fn create_object_instance(
		&self, name: &str, object_type_id: i64,
	) -> Result<object_instance::Model> {
		let record = object_instance::ActiveModel {
			object_instance_id: NotSet,
			object_type_id: Set(object_type_id),
			object_instance_name: Set(name.to_string()),
		};
		Ok(record.insert(self.inner()).await?)
	}

	async fn update_object_instance(
		&self, instance: object_instance::Model,
	) -> Result<object_instance::Model> {
		let existing = expect_found(
			self.find_object_instance(instance.object_instance_id)
				.await?,
			"object instance",
			instance.object_instance_id,
		)?;
		let mut record: object_instance::ActiveModel = existing.into();
		record.object_type_id = Set(instance.object_type_id);
		record.object_instance_name = Set(instance.object_instance_name);
		Ok(record.update(self.inner()).await?)
	}

	async fn find_object_instance(&self, id: i64) -> Result<Option<object_instance::Model>> {
		Ok(object_instance::Entity::find_by_id(id)
			.one(self.inner())
			.await?)
	}

	async fn list_object_instances(
		&self, object_type_id: Option<i64>,
	) -> Result<Vec<object_instance::Model>> {
		let mut query = object_instance::Entity::find();
		if let Some(id) = object_type_id {
			query = query.filter(object_instance::Column::ObjectTypeId.eq(id));
		}
		Ok(query
			.order_by_asc(object_instance::Column::ObjectInstanceName)
			.all(self.inner())
			.await?)
	}

	async fn delete_object_instance(&self, id: i64) -> Result<bool> {
		let result = object_instance::Entity::delete_by_id(id)
			.exec(self.inner())
			.await?;
		Ok(result.rows_affected > 0)
	}

	/// Resolves the unit that belongs to a unit category: the base definition
	/// of the category's unit type. No category, or a unit type without base
	/// definition, resolves to no unit at all.
	async fn resolve_unit(&self, unit_category_id: Option<i64>) -> Result<Option<i64>> {
		let category_id = match unit_category_id {
			None => return Ok(None),
			Some(id) => id,
		};
		let category = expect_found(
			unit_category::Entity::find_by_id(category_id)
				.one(self.inner())
				.await?,
			"unit category",
			category_id,
		)?;

		let base = self
			.find_base_unit_definition(category.unit_type_id)
			.await?;
		if base.is_none() {
			warn!(
				"Unit type {} of category {} has no base unit.",
				category.unit_type_id, category_id
			);
		}
		Ok(base.map(|d| d.unit_definition_id))
	}

	async fn create_object_type_property(
		&self, property: NewObjectTypeProperty,
	) -> Result<object_type_property::Model> {
		let unit_id = self.resolve_unit(property.unit_category_id).await?;
		let record = object_type_property::ActiveModel {
			object_type_property_id: NotSet,
			object_type_id: Set(property.object_type_id),
			object_type_property_name: Set(property.name),
			object_type_property_category: Set(property.category),
			tag: Set(property.tag),
			openserver: Set(property.openserver),
			unit_category_id: Set(property.unit_category_id),
			unit_id: Set(unit_id),
		};
		Ok(record.insert(self.inner()).await?)
	}

	/// Stores the given property. Whatever `unit_id` the caller passes in is
	/// ignored, it always gets resolved again from the unit category.
	async fn update_object_type_property(
		&self, property: object_type_property::Model,
	) -> Result<object_type_property::Model> {
		let existing = expect_found(
			self.find_object_type_property(property.object_type_property_id)
				.await?,
			"object type property",
			property.object_type_property_id,
		)?;
		let unit_id = self.resolve_unit(property.unit_category_id).await?;

		let mut record: object_type_property::ActiveModel = existing.into();
		record.object_type_id = Set(property.object_type_id);
		record.object_type_property_name = Set(property.object_type_property_name);
		record.object_type_property_category = Set(property.object_type_property_category);
		record.tag = Set(property.tag);
		record.openserver = Set(property.openserver);
		record.unit_category_id = Set(property.unit_category_id);
		record.unit_id = Set(unit_id);
		Ok(record.update(self.inner()).await?)
	}

	async fn find_object_type_property(
		&self, id: i64,
	) -> Result<Option<object_type_property::Model>> {
		Ok(object_type_property::Entity::find_by_id(id)
			.one(self.inner())
			.await?)
	}

	async fn list_object_type_properties(
		&self, object_type_id: i64,
	) -> Result<Vec<object_type_property::Model>> {
		Ok(object_type_property::Entity::find()
			.filter(object_type_property::Column::ObjectTypeId.eq(object_type_id))
			.order_by_asc(object_type_property::Column::ObjectTypePropertyName)
			.all(self.inner())
			.await?)
	}

	async fn delete_object_type_property(&self, id: i64) -> Result<bool> {
		let result = object_type_property::Entity::delete_by_id(id)
			.exec(self.inner())
			.await?;
		Ok(result.rows_affected > 0)
	}
}

impl<T> CatalogStore for T where T: PersistenceHandle {}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		db::Error,
		test::{self, definition},
	};

	#[tokio::test]
	async fn test_property_unit_resolution() {
		let db = test::load_database("property_unit").await;

		let length = db.create_unit_type("Length", None).await.unwrap();
		let pressure = db.create_unit_type("Pressure", None).await.unwrap();
		db.create_unit_definition(definition("ft", length.unit_type_id, "0.3048", "0", false))
			.await
			.unwrap();
		let meter = db
			.create_unit_definition(definition("m", length.unit_type_id, "1", "0", true))
			.await
			.unwrap();
		let bar = db
			.create_unit_definition(definition("bar", pressure.unit_type_id, "1", "0", true))
			.await
			.unwrap();
		let depth = db
			.create_unit_category("Depth", length.unit_type_id, None)
			.await
			.unwrap();
		let whp = db
			.create_unit_category("Wellhead pressure", pressure.unit_type_id, None)
			.await
			.unwrap();

		let well = db.create_object_type("Well").await.unwrap();
		let property = db
			.create_object_type_property(NewObjectTypeProperty {
				object_type_id: well.object_type_id,
				name: "MD".to_string(),
				category: "Geometry".to_string(),
				unit_category_id: Some(depth.unit_category_id),
				..Default::default()
			})
			.await
			.unwrap();
		assert_eq!(property.unit_id, Some(meter.unit_definition_id));

		// Switching category switches the unit
		let mut changed = property.clone();
		changed.unit_category_id = Some(whp.unit_category_id);
		let saved = db.update_object_type_property(changed).await.unwrap();
		assert_eq!(saved.unit_id, Some(bar.unit_definition_id));

		// Saving again changes nothing
		let again = db
			.update_object_type_property(saved.clone())
			.await
			.unwrap();
		assert_eq!(again, saved);

		// The unit can't be forced
		let mut forced = saved.clone();
		forced.unit_id = Some(meter.unit_definition_id);
		let saved = db.update_object_type_property(forced).await.unwrap();
		assert_eq!(saved.unit_id, Some(bar.unit_definition_id));

		// No category, no unit
		let mut cleared = saved.clone();
		cleared.unit_category_id = None;
		let saved = db.update_object_type_property(cleared).await.unwrap();
		assert_eq!(saved.unit_id, None);

		let loaded = db
			.find_object_type_property(saved.object_type_property_id)
			.await
			.unwrap();
		assert_eq!(loaded, Some(saved));
	}

	#[tokio::test]
	async fn test_property_without_base_unit() {
		let db = test::load_database("property_no_base").await;

		let angle = db.create_unit_type("Angle", None).await.unwrap();
		db.create_unit_definition(definition("deg", angle.unit_type_id, "1", "0", false))
			.await
			.unwrap();
		let category = db
			.create_unit_category("Inclination", angle.unit_type_id, None)
			.await
			.unwrap();
		let well = db.create_object_type("Well").await.unwrap();
		let property = db
			.create_object_type_property(NewObjectTypeProperty {
				object_type_id: well.object_type_id,
				name: "Inclination".to_string(),
				category: "Geometry".to_string(),
				unit_category_id: Some(category.unit_category_id),
				..Default::default()
			})
			.await
			.unwrap();
		assert_eq!(property.unit_id, None);
	}

	#[tokio::test]
	async fn test_property_names_unique_per_type() {
		let db = test::load_database("property_names").await;

		let well = db.create_object_type("Well").await.unwrap();
		let pipe = db.create_object_type("Pipe").await.unwrap();
		let new_property = |object_type_id| NewObjectTypeProperty {
			object_type_id,
			name: "Pressure".to_string(),
			category: "Flow".to_string(),
			..Default::default()
		};
		db.create_object_type_property(new_property(well.object_type_id))
			.await
			.unwrap();
		db.create_object_type_property(new_property(pipe.object_type_id))
			.await
			.unwrap();
		let error = db
			.create_object_type_property(new_property(well.object_type_id))
			.await
			.unwrap_err();
		assert!(matches!(&*error, Error::UniquenessViolation(_)));
	}

	#[tokio::test]
	async fn test_instances_cascade_with_type() {
		let db = test::load_database("instance_cascade").await;

		let well = db.create_object_type("Well").await.unwrap();
		let instance = db
			.create_object_instance("W-1", well.object_type_id)
			.await
			.unwrap();
		assert_eq!(
			db.list_object_instances(Some(well.object_type_id))
				.await
				.unwrap(),
			vec![instance.clone()]
		);

		assert!(db.delete_object_type(well.object_type_id).await.unwrap());
		assert!(db
			.find_object_instance(instance.object_instance_id)
			.await
			.unwrap()
			.is_none());
	}
}
