use crate::{
    error::ConnectorError,
    source::DataSource,
    sql::{
        base::{dialect::Postgres, query::QueryGenerator, table::SourceTable},
        postgres::adapter::PgAdapter,
    },
    stream::RecordStream,
};
use async_trait::async_trait;
use futures_util::{StreamExt, pin_mut};
use model::{
    pagination::{cursor::Cursor, page::Page},
    records::raw::RawRecord,
};
use std::time::Instant;
use tokio_postgres::{Row, types::ToSql};
use tracing::debug;

pub struct PgDataSource {
    adapter: PgAdapter,
    table: SourceTable,
    dialect: Postgres,
}

impl PgDataSource {
    pub fn new(adapter: PgAdapter, table: SourceTable) -> Self {
        Self {
            adapter,
            table,
            dialect: Postgres,
        }
    }

    fn select_sql(&self, cursor: &Cursor, limited: bool) -> String {
        QueryGenerator::new(&self.dialect).select_after(&self.table, cursor, limited)
    }
}

/// Bind values for `QueryGenerator::select_after`: cursor id, then limit.
fn keyset_params(cursor: &Cursor, limit: Option<usize>) -> Vec<i64> {
    let mut params = Vec::with_capacity(2);
    if let Some(id) = cursor.after_id() {
        params.push(i64::try_from(id).unwrap_or(i64::MAX));
    }
    if let Some(limit) = limit {
        params.push(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    params
}

fn decode_row(row: &Row) -> Result<RawRecord, ConnectorError> {
    let id: i64 = row.try_get(0)?;
    let id = u64::try_from(id)
        .map_err(|_| ConnectorError::Decode(format!("negative id {id} in source table")))?;
    let text: Option<String> = row.try_get(1)?;
    Ok(RawRecord { id, text })
}

#[async_trait]
impl DataSource for PgDataSource {
    fn describe(&self) -> String {
        format!("postgres:{}", self.table.table)
    }

    async fn fetch_page(&self, cursor: Cursor, limit: usize) -> Result<Page, ConnectorError> {
        let start = Instant::now();
        let sql = self.select_sql(&cursor, true);
        let values = keyset_params(&cursor, Some(limit));
        let params: Vec<&(dyn ToSql + Sync)> =
            values.iter().map(|v| v as &(dyn ToSql + Sync)).collect();

        let client = self.adapter.client();
        let rows = client.query(sql.as_str(), &params).await?;
        let records = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;

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
        let values = keyset_params(&cursor, None);
        let client = self.adapter.client();
        let table = self.table.table.clone();
        let chunk_size = chunk_size.max(1);

        // Prepare eagerly so a bad table or connection fails at open time.
        let statement = client.prepare(&sql).await?;

        Ok(RecordStream::spawn(move |tx| async move {
            let params: Vec<Box<dyn ToSql + Sync + Send>> = values
                .into_iter()
                .map(|v| Box::new(v) as Box<dyn ToSql + Sync + Send>)
                .collect();
            let rows = client.query_raw(&statement, params).await?;
            pin_mut!(rows);

            let mut chunk = Vec::with_capacity(chunk_size);
            let mut total = 0usize;

            while let Some(row) = rows.next().await {
                chunk.push(decode_row(&row?)?);
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

            debug!(table = %table, rows = total, "Postgres record stream exhausted");
            Ok::<(), ConnectorError>(())
        }))
    }
}
