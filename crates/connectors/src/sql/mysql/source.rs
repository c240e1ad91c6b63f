use crate::{
    error::ConnectorError,
    source::DataSource,
    sql::{
        base::{dialect::MySql, query::QueryGenerator, table::SourceTable},
        mysql::{adapter::MySqlAdapter, params::MySqlParamStore},
    },
    stream::RecordStream,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use model::{
    pagination::{cursor::Cursor, page::Page},
    records::raw::RawRecord,
};
use mysql_async::{Row, from_row_opt, prelude::*};
use std::time::Instant;
use tracing::debug;

pub struct MySqlDataSource {
    /// The MySQL adapter used to interact with the database.
    adapter: MySqlAdapter,

    /// Table and column names to read.
    table: SourceTable,

    dialect: MySql,
}

impl MySqlDataSource {
    pub fn new(adapter: MySqlAdapter, table: SourceTable) -> Self {
        Self {
            adapter,
            table,
            dialect: MySql,
        }
    }

    fn select_sql(&self, cursor: &Cursor, limited: bool) -> String {
        QueryGenerator::new(&self.dialect).select_after(&self.table, cursor, limited)
    }
}

fn decode_row(row: Row) -> Result<RawRecord, ConnectorError> {
    let (id, text) = from_row_opt::<(u64, Option<String>)>(row)
        .map_err(|err| ConnectorError::Decode(err.to_string()))?;
    Ok(RawRecord { id, text })
}

#[async_trait]
impl DataSource for MySqlDataSource {
    fn describe(&self) -> String {
        format!("mysql:{}", self.table.table)
    }

    async fn fetch_page(&self, cursor: Cursor, limit: usize) -> Result<Page, ConnectorError> {
        let start = Instant::now();
        let sql = self.select_sql(&cursor, true);
        let params = MySqlParamStore::keyset(&cursor, Some(limit)).into_params();

        let mut conn = self.adapter.get_conn().await?;
        let rows: Vec<Row> = conn.exec(sql, params).await?;
        let records = rows
            .into_iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            table = %self.table.table,
            %cursor,
            rows = records.len(),
            took_ms = start.elapsed().as_millis() as u64,
            "Fetched page"
        );

        Ok(Page::from_fetch(records, limit))
    }

    async fn open_stream(
        &self,
        cursor: Cursor,
        chunk_size: usize,
    ) -> Result<RecordStream, ConnectorError> {
        let sql = self.select_sql(&cursor, false);
        let params = MySqlParamStore::keyset(&cursor, None).into_params();
        let table = self.table.table.clone();
        let chunk_size = chunk_size.max(1);

        // Check out the connection here so connect failures surface at open time.
        let mut conn = self.adapter.get_conn().await?;

        Ok(RecordStream::spawn(move |tx| async move {
            let mut rows = conn.exec_stream::<Row, _, _>(sql, params).await?;
            let mut chunk = Vec::with_capacity(chunk_size);
            let mut total = 0usize;

            while let Some(row) = rows.next().await {
                chunk.push(decode_row(row?)?);
                if chunk.len() == chunk_size {
                    total += chunk.len();
                    tx.send(std::mem::replace(&mut chunk, Vec::with_capacity(chunk_size)))
                        .await?;
                }
            }

            if !chunk.is_empty() {
                total += chunk.len();
                tx.send(chunk).await?;
            }

            debug!(table = %table, rows = total, "MySQL record stream exhausted");
            Ok::<(), ConnectorError>(())
        }))
    }

    async fn close(&self) -> Result<(), ConnectorError> {
        self.adapter.disconnect().await
    }
}
