use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::workflow::errors::{FluoError, Result as FluoResult};
use crate::workflow::models::Workflow;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "workflows")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub definition: String, // JSON rendering of the workflow graph
    pub is_active: bool,
    pub created_at: i64, // Unix epoch microseconds
    pub updated_at: i64, // Unix epoch microseconds
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::executions::Entity")]
    Executions,
}

impl Related<super::executions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Executions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Materialise the stored JSON definition into an executable workflow.
    pub fn to_workflow(&self) -> FluoResult<Workflow> {
        let workflow: Workflow = serde_json::from_str(&self.definition)?;
        if workflow.id != self.id {
            return Err(FluoError::Validation(format!(
                "Stored definition id '{}' does not match row id '{}'",
                workflow.id, self.id
            )));
        }
        Ok(workflow)
    }
}
