//! Storage of the main records: single values of an object instance's
//! property as delivered by a data source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{prelude::*, *};
use serde::Serialize;

use super::{expect_found, CatalogStore, Error, PersistenceHandle, Result};
use crate::{
	common::{check_decimal, ExactDecimal},
	entity::{data_source, main_record},
	trace,
};


#[derive(Clone, Debug)]
pub struct NewMainRecord {
	pub data_source_name_id: i64,
	pub data_source_id: i64,
	pub object_type_id: i64,
	pub object_instance_id: i64,
	pub object_type_property_id: i64,
	pub value: Option<ExactDecimal>,
	pub date_time: Option<DateTime<Utc>>,
	pub sub_data_source: Option<String>,
	pub description: Option<String>,
}

/// Narrows down a listing of main records. Empty fields don't filter.
#[derive(Clone, Debug, Default)]
pub struct MainRecordFilter {
	pub data_source_name_id: Option<i64>,
	pub object_instance_id: Option<i64>,
	pub object_type_property_id: Option<i64>,
	pub from: Option<DateTime<Utc>>,
	pub until: Option<DateTime<Utc>>,
}

/// The identifying part of a main record, as it is handed to other services.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FactSummary {
	pub data_source_id: i64,
	pub object_instance_id: i64,
	pub date_time: Option<String>,
	pub object_type_id: i64,
	pub object_type_property_id: i64,
	pub data_source_name: String,
}


#[async_trait]
pub trait FactStore: PersistenceHandle {
	/// Makes sure a record is consistent before it gets written: the instance
	/// has to be of the record's object type and the value has to fit its
	/// column.
	async fn validate_main_record(
		&self, object_type_id: i64, object_instance_id: i64, value: Option<&ExactDecimal>,
	) -> Result<()> {
		let instance = expect_found(
			self.find_object_instance(object_instance_id).await?,
			"object instance",
			object_instance_id,
		)?;
		if instance.object_type_id != object_type_id {
			return trace::err(Error::CrossTypeMismatch {
				object_instance_id,
				expected: object_type_id,
				actual: instance.object_type_id,
			});
		}
		if let Some(value) = value {
			check_decimal("value", value, 38, 28)?;
		}
		Ok(())
	}

	async fn insert_main_record(&self, record: NewMainRecord) -> Result<main_record::Model> {
		self.validate_main_record(
			record.object_type_id,
			record.object_instance_id,
			record.value.as_ref(),
		)
		.await?;

		let model = main_record::ActiveModel {
			data_set_id: NotSet,
			data_source_name_id: Set(record.data_source_name_id),
			data_source_id: Set(record.data_source_id),
			object_type_id: Set(record.object_type_id),
			object_instance_id: Set(record.object_instance_id),
			object_type_property_id: Set(record.object_type_property_id),
			value: Set(record.value),
			date_time: Set(record.date_time),
			sub_data_source: Set(record.sub_data_source),
			description: Set(record.description),
		};
		Ok(model.insert(self.inner()).await?)
	}

	async fn update_main_record(&self, record: main_record::Model) -> Result<main_record::Model> {
		let existing = expect_found(
			self.find_main_record(record.data_set_id).await?,
			"main record",
			record.data_set_id,
		)?;
		self.validate_main_record(
			record.object_type_id,
			record.object_instance_id,
			record.value.as_ref(),
		)
		.await?;

		let mut model: main_record::ActiveModel = existing.into();
		model.data_source_name_id = Set(record.data_source_name_id);
		model.data_source_id = Set(record.data_source_id);
		model.object_type_id = Set(record.object_type_id);
		model.object_instance_id = Set(record.object_instance_id);
		model.object_type_property_id = Set(record.object_type_property_id);
		model.value = Set(record.value);
		model.date_time = Set(record.date_time);
		model.sub_data_source = Set(record.sub_data_source);
		model.description = Set(record.description);
		Ok(model.update(self.inner()).await?)
	}

	async fn find_main_record(&self, id: i64) -> Result<Option<main_record::Model>> {
		Ok(main_record::Entity::find_by_id(id).one(self.inner()).await?)
	}

	async fn list_main_records(&self, filter: MainRecordFilter) -> Result<Vec<main_record::Model>> {
		let mut query = main_record::Entity::find();
		if let Some(id) = filter.data_source_name_id {
			query = query.filter(main_record::Column::DataSourceNameId.eq(id));
		}
		if let Some(id) = filter.object_instance_id {
			query = query.filter(main_record::Column::ObjectInstanceId.eq(id));
		}
		if let Some(id) = filter.object_type_property_id {
			query = query.filter(main_record::Column::ObjectTypePropertyId.eq(id));
		}
		if let Some(from) = filter.from {
			query = query.filter(main_record::Column::DateTime.gte(from));
		}
		if let Some(until) = filter.until {
			query = query.filter(main_record::Column::DateTime.lt(until));
		}
		Ok(query
			.order_by_desc(main_record::Column::DataSourceId)
			.order_by_asc(main_record::Column::DataSourceNameId)
			.all(self.inner())
			.await?)
	}

	async fn delete_main_record(&self, id: i64) -> Result<bool> {
		let result = main_record::Entity::delete_by_id(id)
			.exec(self.inner())
			.await?;
		Ok(result.rows_affected > 0)
	}

	async fn summarize_main_record(&self, record: &main_record::Model) -> Result<FactSummary> {
		let data_source = expect_found(
			data_source::Entity::find_by_id(record.data_source_name_id)
				.one(self.inner())
				.await?,
			"data source",
			record.data_source_name_id,
		)?;
		Ok(FactSummary {
			data_source_id: record.data_source_id,
			object_instance_id: record.object_instance_id,
			date_time: record.date_time.map(|d| d.to_rfc3339()),
			object_type_id: record.object_type_id,
			object_type_property_id: record.object_type_property_id,
			data_source_name: data_source.data_source_name,
		})
	}
}

impl<T> FactStore for T where T: PersistenceHandle {}
