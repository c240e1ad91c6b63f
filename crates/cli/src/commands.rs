use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum Commands {
    /// Copy rows from the source table into the destination table
    Transfer {
        #[command(flatten)]
        args: TransferArgs,

        #[arg(
            long,
            help = "If specified, writes the JSON report to this file instead of stdout"
        )]
        output: Option<String>,
    },
    /// Check that a connection URL is reachable
    TestConn {
        /// `mysql://...` or `postgres://...`
        #[arg(long)]
        url: String,
    },
    /// Print the resolved settings as JSON without connecting
    Config {
        #[command(flatten)]
        args: TransferArgs,
    },
}

/// Transfer options. Every flag falls back to a `ROWSHIFT_*` variable.
#[derive(Args, Debug, Default, Clone)]
pub struct TransferArgs {
    #[arg(long, help = "Source connection URL [env: ROWSHIFT_SOURCE_URL]")]
    pub source_url: Option<String>,

    #[arg(
        long,
        help = "Destination connection URL [env: ROWSHIFT_DESTINATION_URL]"
    )]
    pub destination_url: Option<String>,

    #[arg(long, help = "Source table [env: ROWSHIFT_SOURCE_TABLE]")]
    pub source_table: Option<String>,

    #[arg(long, help = "Destination table [env: ROWSHIFT_DEST_TABLE]")]
    pub dest_table: Option<String>,

    #[arg(long, help = "Rows per source read [env: ROWSHIFT_SOURCE_BATCH_SIZE]")]
    pub source_batch_size: Option<usize>,

    #[arg(long, help = "Rows per insert [env: ROWSHIFT_WRITE_BATCH_SIZE]")]
    pub write_batch_size: Option<usize>,

    #[arg(long, help = "Stop after this many source rows [env: ROWSHIFT_ROW_LIMIT]")]
    pub row_limit: Option<u64>,

    #[arg(long, help = "Maximum writes in flight [env: ROWSHIFT_CONCURRENCY]")]
    pub concurrency: Option<usize>,

    #[arg(long, help = "paginated | streamed [env: ROWSHIFT_READ_STRATEGY]")]
    pub read_strategy: Option<String>,

    #[arg(long, help = "Split delimiter [env: ROWSHIFT_DELIMITER]")]
    pub delimiter: Option<String>,

    #[arg(long, help = "abort | best-effort [env: ROWSHIFT_FAILURE_POLICY]")]
    pub failure_policy: Option<String>,

    #[arg(
        long,
        help = "Only transfer ids greater than this one [env: ROWSHIFT_START_AFTER_ID]"
    )]
    pub start_after_id: Option<u64>,

    #[arg(long, help = "Retries per failed operation [env: ROWSHIFT_MAX_RETRIES]")]
    pub max_retries: Option<usize>,

    #[arg(long, help = "Read timeout in seconds [env: ROWSHIFT_READ_TIMEOUT_SECS]")]
    pub read_timeout_secs: Option<u64>,

    #[arg(
        long,
        help = "Write timeout in seconds [env: ROWSHIFT_WRITE_TIMEOUT_SECS]"
    )]
    pub write_timeout_secs: Option<u64>,
}
