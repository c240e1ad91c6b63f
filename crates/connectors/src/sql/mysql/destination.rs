use crate::{
    destination::DataDestination,
    error::ConnectorError,
    sql::{
        base::{dialect::MySql, query::QueryGenerator, table::DestTable},
        mysql::{adapter::MySqlAdapter, params::MySqlParamStore},
    },
};
use async_trait::async_trait;
use model::records::batch::Batch;
use mysql_async::prelude::*;

pub struct MySqlDestination {
    adapter: MySqlAdapter,
    table: DestTable,
    dialect: MySql,
}

impl MySqlDestination {
    pub fn new(adapter: MySqlAdapter, table: DestTable) -> Self {
        Self {
            adapter,
            table,
            dialect: MySql,
        }
    }
}

#[async_trait]
impl DataDestination for MySqlDestination {
    fn describe(&self) -> String {
        format!("mysql:{}", self.table.table)
    }

    async fn write_batch(&self, batch: &Batch) -> Result<(), ConnectorError> {
        if batch.is_empty() {
            return Ok(());
        }

        let sql = QueryGenerator::new(&self.dialect).insert_values(&self.table, batch.len());
        let params = MySqlParamStore::from_batch(batch).into_params();

        // One checkout per batch: concurrent writes use separate connections.
        let mut conn = self.adapter.get_conn().await?;
        conn.exec_drop(sql, params).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ConnectorError> {
        self.adapter.disconnect().await
    }
}
