use crate::{
    destination::DataDestination,
    error::ConnectorError,
    sql::{
        base::{dialect::Postgres, query::QueryGenerator, table::DestTable},
        postgres::adapter::PgAdapter,
    },
};
use async_trait::async_trait;
use model::records::batch::Batch;
use tokio_postgres::types::ToSql;
use tracing::trace;

pub struct PgDestination {
    adapter: PgAdapter,
    table: DestTable,
    dialect: Postgres,
}

impl PgDestination {
    pub fn new(adapter: PgAdapter, table: DestTable) -> Self {
        Self {
            adapter,
            table,
            dialect: Postgres,
        }
    }
}

#[async_trait]
impl DataDestination for PgDestination {
    fn describe(&self) -> String {
        format!("postgres:{}", self.table.table)
    }

    async fn write_batch(&self, batch: &Batch) -> Result<(), ConnectorError> {
        if batch.is_empty() {
            return Ok(());
        }

        let sql = QueryGenerator::new(&self.dialect).insert_values(&self.table, batch.len());
        let params: Vec<&(dyn ToSql + Sync)> = batch
            .records()
            .iter()
            .flat_map(|r| [&r.part1 as &(dyn ToSql + Sync), &r.part2 as &(dyn ToSql + Sync)])
            .collect();

        let client = self.adapter.client();
        let inserted = client.execute(sql.as_str(), &params).await?;
        trace!(seq = batch.seq(), inserted, "Postgres insert acknowledged");
        Ok(())
    }
}
