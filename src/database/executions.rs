use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, QueryOrder, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::workflow::errors::Result as FluoResult;
use crate::workflow::models::ExecutionRecord;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "executions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub workflow_id: String,
    pub status: String, // 'PENDING', 'IN_PROGRESS', 'COMPLETED', 'FAILED'
    pub started_at: i64, // Unix epoch microseconds
    pub completed_at: Option<i64>, // Unix epoch microseconds
    pub log: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::workflows::Entity",
        from = "Column::WorkflowId",
        to = "super::workflows::Column::Id"
    )]
    Workflow,
}

impl Related<super::workflows::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Workflow.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Storage collaborator for the execution records the engine derives.
pub struct ExecutionRepo {
    db: Arc<DatabaseConnection>,
}

impl ExecutionRepo {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, record: &ExecutionRecord) -> FluoResult<()> {
        let model = ActiveModel {
            id: Set(record.id.clone()),
            workflow_id: Set(record.workflow_id.clone()),
            status: Set(record.status.as_str().to_string()),
            started_at: Set(record.started_at.timestamp_micros()),
            completed_at: Set(record.completed_at.map(|t| t.timestamp_micros())),
            log: Set(record.log.clone()),
        };
        model.insert(&*self.db).await?;
        Ok(())
    }

    pub async fn list(&self, workflow_id: Option<&str>, limit: u64) -> FluoResult<Vec<Model>> {
        let mut query = Entity::find().order_by_desc(Column::StartedAt).limit(limit);
        if let Some(workflow_id) = workflow_id {
            query = query.filter(Column::WorkflowId.eq(workflow_id));
        }
        Ok(query.all(&*self.db).await?)
    }
}
