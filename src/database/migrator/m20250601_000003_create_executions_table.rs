use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Executions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Executions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Executions::WorkflowId).string().not_null())
                    .col(ColumnDef::new(Executions::Status).string().not_null())
                    .col(
                        ColumnDef::new(Executions::StartedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Executions::CompletedAt).big_integer())
                    .col(ColumnDef::new(Executions::Log).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_executions_workflow_id")
                    .table(Executions::Table)
                    .col(Executions::WorkflowId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Executions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Executions {
    Table,
    Id,
    WorkflowId,
    Status,
    StartedAt,
    CompletedAt,
    Log,
}
