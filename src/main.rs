//! RooDB query binary
//!
//! Usage: roodb-query [--function NAME] [--partitions N] [--limit N] [--explain] < values
//!
//! Reads one value per line from stdin (`null` or an empty line is NULL),
//! spreads the rows round-robin over in-memory partitions and runs an
//! aggregate over them through the full scan/aggregate/merge pipeline.

use std::str::FromStr;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use roodb_query::aggregate::{resolve, AggregatePlan, AggregationCoordinator, PartitionScan};
use roodb_query::catalog::DataType;
use roodb_query::config::ExecConfig;
use roodb_query::executor::encoding::encode_row;
use roodb_query::executor::{
    collect_rows, ColumnProjector, ColumnRef, Datum, Expression, Row, Scanner, TableScan,
};
use roodb_query::storage::MemoryCursor;

#[derive(Parser)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run an aggregate over values read from stdin")]
struct Cli {
    /// Aggregate function (STDDEV_POP, STDDEV_SAMP, MEDIAN)
    #[arg(long, default_value = "STDDEV_POP")]
    function: String,

    /// Number of partitions to spread rows over
    #[arg(long, default_value_t = 4)]
    partitions: u32,

    /// Maximum result rows (0 = unlimited)
    #[arg(long, env = "ROODB_MAX_ROWS")]
    limit: Option<u64>,

    /// Declared type of the input column
    #[arg(long = "type", value_enum, default_value_t = ValueType::Double)]
    value_type: ValueType,

    /// Table name shown in the explain plan
    #[arg(long, default_value = "stdin")]
    table: String,

    /// Print the explain plan before the result
    #[arg(long)]
    explain: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ValueType {
    Int,
    Double,
    Decimal,
}

impl ValueType {
    fn data_type(self) -> DataType {
        match self {
            ValueType::Int => DataType::BigInt,
            ValueType::Double => DataType::Double,
            ValueType::Decimal => DataType::Decimal,
        }
    }

    fn parse(self, text: &str) -> Result<Datum, String> {
        let text = text.trim();
        if text.is_empty() || text.eq_ignore_ascii_case("null") {
            return Ok(Datum::Null);
        }
        match self {
            ValueType::Int => text.parse().map(Datum::Int).map_err(|e| e.to_string()),
            ValueType::Double => text.parse().map(Datum::Float).map_err(|e| e.to_string()),
            ValueType::Decimal => Decimal::from_str(text)
                .map(Datum::Decimal)
                .map_err(|e| e.to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ExecConfig::from_env();
    if let Some(limit) = cli.limit {
        config = config.with_max_rows(limit);
    }
    let partition_count = cli.partitions.max(1);

    // Resolve the aggregate before reading any input
    let column: Arc<dyn Expression> =
        Arc::new(ColumnRef::new("value", 0, cli.value_type.data_type()));
    let aggregate = resolve(&cli.function, vec![column])?;
    let plan = Arc::new(AggregatePlan::scalar(vec![aggregate]));

    // Spread encoded rows over partitions
    let mut partitions: Vec<Vec<Vec<u8>>> = vec![Vec::new(); partition_count as usize];
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        let value = cli
            .value_type
            .parse(&line)
            .map_err(|e| format!("line {}: {}: {:?}", line_no + 1, e, line))?;
        let row = Row::new(vec![value]);
        partitions[line_no % partition_count as usize].push(encode_row(&row));
        line_no += 1;
    }

    tracing::info!(
        function = %cli.function,
        rows = line_no,
        partitions = partition_count,
        "Running aggregation"
    );

    let scans = partitions
        .into_iter()
        .enumerate()
        .map(|(i, rows)| {
            let partition = i as u32;
            let scan = TableScan::new(cli.table.clone(), partition, MemoryCursor::new(rows));
            PartitionScan::new(partition, Box::new(scan))
        })
        .collect();

    let names = plan.output_names();
    let values = AggregationCoordinator::execute(Arc::clone(&plan), scans, &config).await?;
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let projector = Arc::new(ColumnProjector::identity(&name_refs));
    let mut scanner = Scanner::from_config(Box::new(values), projector, &config);

    if cli.explain {
        println!("{}", scanner.explain_plan());
        println!();
    }

    let projection = scanner.projection();
    println!("{}", projection.column_names().join("\t"));
    let rows = collect_rows(&mut scanner.iterator()).await?;
    for row in rows {
        println!("{}", projection.project(&row)?);
    }

    Ok(())
}
