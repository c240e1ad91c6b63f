// Tests against live databases. Run with `--ignored` once the MySQL and
// Postgres containers are up.
#[cfg(test)]
mod tests {
    use crate::utils::{fast_settings, mysql_url, pg_url};
    use connectors::sql::{base::table::DestTable, postgres::adapter::PgAdapter};
    use engine_config::settings::ReadStrategy;
    use engine_runtime::{Endpoints, run_transfer};
    use mysql_async::{Pool, prelude::Queryable};
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    const ROWS: u64 = 2_500;

    async fn seed_mysql_source(pool: &Pool) {
        let mut conn = pool.get_conn().await.expect("mysql connection");
        conn.query_drop("DROP TABLE IF EXISTS origin_table")
            .await
            .expect("drop origin_table");
        conn.query_drop(
            "CREATE TABLE origin_table (id BIGINT UNSIGNED PRIMARY KEY, title VARCHAR(255) NULL)",
        )
        .await
        .expect("create origin_table");

        // Leave gaps in the id sequence.
        let rows: Vec<(u64, String)> = (1..=ROWS)
            .map(|n| (n * 3, format!("left{n}_right{n}_tail")))
            .collect();
        conn.exec_batch(
            "INSERT INTO origin_table (id, title) VALUES (?, ?)",
            rows.iter().map(|(id, title)| (*id, title.as_str())),
        )
        .await
        .expect("seed origin_table");
        conn.query_drop("INSERT INTO origin_table (id, title) VALUES (1, NULL)")
            .await
            .expect("seed null row");
    }

    async fn reset_mysql_destination(pool: &Pool, table: &str) {
        let mut conn = pool.get_conn().await.expect("mysql connection");
        conn.query_drop(format!("DROP TABLE IF EXISTS {table}"))
            .await
            .expect("drop destination");
        conn.query_drop(format!(
            "CREATE TABLE {table} (title1 VARCHAR(255) NOT NULL, title2 VARCHAR(255) NOT NULL)"
        ))
        .await
        .expect("create destination");
    }

    async fn mysql_count(pool: &Pool, table: &str) -> u64 {
        let mut conn = pool.get_conn().await.expect("mysql connection");
        conn.query_first::<u64, _>(format!("SELECT COUNT(*) FROM {table}"))
            .await
            .expect("count rows")
            .unwrap_or_default()
    }

    #[traced_test]
    #[tokio::test]
    #[ignore = "requires a running MySQL server"]
    async fn test_mysql_to_mysql_paginated_and_streamed() {
        let pool = Pool::from_url(mysql_url()).expect("mysql pool");
        seed_mysql_source(&pool).await;

        for (strategy, table) in [
            (ReadStrategy::Paginated, "destination_paged"),
            (ReadStrategy::Streamed, "destination_streamed"),
        ] {
            reset_mysql_destination(&pool, table).await;
            let settings = fast_settings()
                .read_strategy(strategy)
                .source_batch_size(300)
                .write_batch_size(250)
                .concurrency_limit(3)
                .dest_table(DestTable {
                    table: table.to_string(),
                    ..DestTable::default()
                })
                .build()
                .unwrap();

            let progress = run_transfer(
                settings,
                &Endpoints::new(mysql_url(), mysql_url()),
                CancellationToken::new(),
            )
            .await
            .expect("transfer ran");

            assert_eq!(progress.rows_read, ROWS + 1);
            assert_eq!(progress.rows_written, ROWS);
            assert_eq!(progress.rows_unmappable, 1);
            assert_eq!(mysql_count(&pool, table).await, ROWS);
        }

        pool.disconnect().await.expect("disconnect");
    }

    #[traced_test]
    #[tokio::test]
    #[ignore = "requires running MySQL and Postgres servers"]
    async fn test_mysql_to_postgres() {
        let pool = Pool::from_url(mysql_url()).expect("mysql pool");
        seed_mysql_source(&pool).await;

        let pg = PgAdapter::connect(&pg_url()).await.expect("postgres");
        let client = pg.client();
        client
            .batch_execute(
                "DROP TABLE IF EXISTS destination_table;
                 CREATE TABLE destination_table (title1 TEXT NOT NULL, title2 TEXT NOT NULL);",
            )
            .await
            .expect("create destination");

        let settings = fast_settings()
            .source_batch_size(500)
            .write_batch_size(1000)
            .concurrency_limit(2)
            .build()
            .unwrap();

        let progress = run_transfer(
            settings,
            &Endpoints::new(mysql_url(), pg_url()),
            CancellationToken::new(),
        )
        .await
        .expect("transfer ran");
        assert_eq!(progress.rows_written, ROWS);

        let row = client
            .query_one(
                "SELECT COUNT(*), COUNT(*) FILTER (WHERE title2 LIKE 'right%') FROM destination_table",
                &[],
            )
            .await
            .expect("count rows");
        let (total, split): (i64, i64) = (row.get(0), row.get(1));
        assert_eq!(total as u64, ROWS);
        assert_eq!(split as u64, ROWS);

        pool.disconnect().await.expect("disconnect");
    }
}
