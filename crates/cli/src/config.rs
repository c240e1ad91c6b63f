use crate::{commands::TransferArgs, env::EnvManager, error::CliError};
use connectors::sql::base::table::{DestTable, SourceTable};
use engine_config::settings::{FailurePolicy, ReadStrategy, TransferSettings};
use engine_runtime::Endpoints;
use std::time::Duration;

/// Merges flags over `ROWSHIFT_*` variables over built-in defaults.
pub fn resolve(
    args: &TransferArgs,
    env: &EnvManager,
) -> Result<(TransferSettings, Endpoints), CliError> {
    let source_url = args
        .source_url
        .clone()
        .or_else(|| env.get("ROWSHIFT_SOURCE_URL").map(str::to_string))
        .ok_or(CliError::MissingOption("--source-url"))?;
    let destination_url = args
        .destination_url
        .clone()
        .or_else(|| env.get("ROWSHIFT_DESTINATION_URL").map(str::to_string))
        .ok_or(CliError::MissingOption("--destination-url"))?;

    let mut builder = TransferSettings::builder();
    builder.source_batch_size =
        pick(args.source_batch_size, env, "ROWSHIFT_SOURCE_BATCH_SIZE")?;
    builder.write_batch_size = pick(args.write_batch_size, env, "ROWSHIFT_WRITE_BATCH_SIZE")?;
    builder.row_limit = pick(args.row_limit, env, "ROWSHIFT_ROW_LIMIT")?;
    builder.concurrency_limit = pick(args.concurrency, env, "ROWSHIFT_CONCURRENCY")?;
    builder.start_after_id = pick(args.start_after_id, env, "ROWSHIFT_START_AFTER_ID")?;
    builder.max_retries = pick(args.max_retries, env, "ROWSHIFT_MAX_RETRIES")?;
    builder.read_timeout = pick(args.read_timeout_secs, env, "ROWSHIFT_READ_TIMEOUT_SECS")?
        .map(Duration::from_secs);
    builder.write_timeout = pick(args.write_timeout_secs, env, "ROWSHIFT_WRITE_TIMEOUT_SECS")?
        .map(Duration::from_secs);
    builder.delimiter = args
        .delimiter
        .clone()
        .or_else(|| env.get("ROWSHIFT_DELIMITER").map(str::to_string));

    builder.read_strategy = match &args.read_strategy {
        Some(value) => Some(value.parse::<ReadStrategy>()?),
        None => env.parse("ROWSHIFT_READ_STRATEGY")?,
    };
    builder.failure_policy = match &args.failure_policy {
        Some(value) => Some(value.parse::<FailurePolicy>()?),
        None => env.parse("ROWSHIFT_FAILURE_POLICY")?,
    };

    if let Some(table) = args
        .source_table
        .clone()
        .or_else(|| env.get("ROWSHIFT_SOURCE_TABLE").map(str::to_string))
    {
        builder.source_table = Some(SourceTable {
            table,
            ..SourceTable::default()
        });
    }
    if let Some(table) = args
        .dest_table
        .clone()
        .or_else(|| env.get("ROWSHIFT_DEST_TABLE").map(str::to_string))
    {
        builder.dest_table = Some(DestTable {
            table,
            ..DestTable::default()
        });
    }

    let settings = builder.build()?;
    Ok((settings, Endpoints::new(source_url, destination_url)))
}

fn pick<T>(flag: Option<T>, env: &EnvManager, key: &str) -> Result<Option<T>, CliError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match flag {
        Some(value) => Ok(Some(value)),
        None => env.parse(key),
    }
}
