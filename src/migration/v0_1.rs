use async_trait::async_trait;
use sea_orm::{prelude::*, sea_query::*, DatabaseTransaction, Schema};

use super::MigrationTrait;
use crate::{entity::*, trace};


pub struct Migration;


async fn create_table<E>(tx: &DatabaseTransaction, schema: &Schema, entity: E) -> trace::Result<(), DbErr>
where
	E: EntityTrait,
{
	let stat = schema
		.create_table_from_entity(entity)
		.if_not_exists()
		.to_owned();
	tx.execute(tx.get_database_backend().build(&stat)).await?;
	Ok(())
}

/// Creates an index over the given columns, which is what the composite
/// natural keys are enforced with.
async fn create_index<E, C>(
	tx: &DatabaseTransaction, name: &str, entity: E, columns: &[C], unique: bool,
) -> trace::Result<(), DbErr>
where
	E: EntityTrait,
	C: ColumnTrait,
{
	let mut stat = Index::create();
	stat.name(name).table(entity).if_not_exists();
	for column in columns {
		stat.col(*column);
	}
	if unique {
		stat.unique();
	}
	tx.execute(tx.get_database_backend().build(&stat)).await?;
	Ok(())
}


#[async_trait]
impl MigrationTrait for Migration {
	async fn run(&self, tx: &DatabaseTransaction) -> trace::Result<(), DbErr> {
		let schema = Schema::new(tx.get_database_backend());

		// Referenced tables go first
		create_table(tx, &schema, user::Entity).await?;
		create_table(tx, &schema, unit_system::Entity).await?;
		create_table(tx, &schema, unit_type::Entity).await?;
		create_table(tx, &schema, unit_definition::Entity).await?;
		create_table(tx, &schema, unit_category::Entity).await?;
		create_table(tx, &schema, unit_system_category_definition::Entity).await?;
		create_table(tx, &schema, data_source::Entity).await?;
		create_table(tx, &schema, object_type::Entity).await?;
		create_table(tx, &schema, object_instance::Entity).await?;
		create_table(tx, &schema, object_type_property::Entity).await?;
		create_table(tx, &schema, scenario_component::Entity).await?;
		create_table(tx, &schema, server::Entity).await?;
		create_table(tx, &schema, scenario::Entity).await?;
		create_table(tx, &schema, scenario_log::Entity).await?;
		create_table(tx, &schema, scenario_component_link::Entity).await?;
		create_table(tx, &schema, main_record::Entity).await?;
		create_table(tx, &schema, task::Entity).await?;

		create_index(
			tx,
			"unit_definition_name_type",
			unit_definition::Entity,
			&[
				unit_definition::Column::UnitDefinitionName,
				unit_definition::Column::UnitTypeId,
			],
			true,
		)
		.await?;
		create_index(
			tx,
			"unit_category_name_type",
			unit_category::Entity,
			&[
				unit_category::Column::UnitCategoryName,
				unit_category::Column::UnitTypeId,
			],
			true,
		)
		.await?;
		create_index(
			tx,
			"unit_system_category_definition_triple",
			unit_system_category_definition::Entity,
			&[
				unit_system_category_definition::Column::UnitSystemId,
				unit_system_category_definition::Column::UnitCategoryId,
				unit_system_category_definition::Column::UnitDefinitionId,
			],
			true,
		)
		.await?;
		create_index(
			tx,
			"object_type_property_type_name",
			object_type_property::Entity,
			&[
				object_type_property::Column::ObjectTypeId,
				object_type_property::Column::ObjectTypePropertyName,
			],
			true,
		)
		.await?;
		create_index(
			tx,
			"scenario_component_link_pair",
			scenario_component_link::Entity,
			&[
				scenario_component_link::Column::ScenarioId,
				scenario_component_link::Column::ComponentId,
			],
			true,
		)
		.await?;
		create_index(
			tx,
			"mainclass_data_source",
			main_record::Entity,
			&[
				main_record::Column::DataSourceNameId,
				main_record::Column::DataSourceId,
			],
			false,
		)
		.await?;
		create_index(
			tx,
			"mainclass_type_property",
			main_record::Entity,
			&[
				main_record::Column::ObjectTypeId,
				main_record::Column::ObjectTypePropertyId,
			],
			false,
		)
		.await?;
		create_index(
			tx,
			"scenariolog_scenario_timestamp",
			scenario_log::Entity,
			&[
				scenario_log::Column::ScenarioId,
				scenario_log::Column::Timestamp,
			],
			false,
		)
		.await?;
		create_index(
			tx,
			"worker_task_state",
			task::Entity,
			&[task::Column::State, task::Column::Created],
			false,
		)
		.await?;
		Ok(())
	}
}
