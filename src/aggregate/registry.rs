//! Built-in aggregate function registry
//!
//! A static table of definitions, indexed by upper-case name on first use.
//! Resolving a call validates the argument types once, up front, and binds
//! the factories used later on each side of the aggregation.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::catalog::DataType;
use crate::executor::{ExecutorError, ExecutorResult, Expression};

use super::distinct_value::DistinctValueWithCountServerAggregator;
use super::median::MedianAggregator;
use super::stddev::{StddevPopAggregator, StddevSampAggregator};
use super::{ClientAggregator, ServerAggregator};

/// Validates argument types, returning the result type
pub type ValidateFn = fn(&[DataType]) -> Result<DataType, String>;

/// Builds the partition-side aggregator for bound arguments
pub type ServerFactory = fn(&[Arc<dyn Expression>]) -> ExecutorResult<Box<dyn ServerAggregator>>;

/// Builds the coordinator-side aggregator for bound arguments
pub type ClientFactory = fn(&[Arc<dyn Expression>]) -> ExecutorResult<Box<dyn ClientAggregator>>;

/// One built-in aggregate function
pub struct AggregateFunctionDef {
    /// Upper-case SQL name
    pub name: &'static str,
    pub validate: ValidateFn,
    pub new_server_aggregator: ServerFactory,
    pub new_client_aggregator: ClientFactory,
}

impl fmt::Debug for AggregateFunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateFunctionDef")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

static BUILTIN_AGGREGATES: &[AggregateFunctionDef] = &[
    AggregateFunctionDef {
        name: "STDDEV_POP",
        validate: single_numeric_to_double,
        new_server_aggregator: distinct_value_server,
        new_client_aggregator: stddev_pop_client,
    },
    AggregateFunctionDef {
        name: "STDDEV_SAMP",
        validate: single_numeric_to_double,
        new_server_aggregator: distinct_value_server,
        new_client_aggregator: stddev_samp_client,
    },
    AggregateFunctionDef {
        name: "MEDIAN",
        validate: single_numeric_to_double,
        new_server_aggregator: distinct_value_server,
        new_client_aggregator: median_client,
    },
];

static REGISTRY: LazyLock<HashMap<&'static str, &'static AggregateFunctionDef>> =
    LazyLock::new(|| BUILTIN_AGGREGATES.iter().map(|def| (def.name, def)).collect());

/// Look up an aggregate by name, case-insensitively
pub fn get_aggregate(name: &str) -> Option<&'static AggregateFunctionDef> {
    REGISTRY.get(name.to_uppercase().as_str()).copied()
}

/// Check if a name refers to a built-in aggregate
pub fn is_aggregate(name: &str) -> bool {
    get_aggregate(name).is_some()
}

/// Names of all built-in aggregates
pub fn aggregate_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_AGGREGATES.iter().map(|def| def.name)
}

/// Resolve a call `name(args...)` against the registry
pub fn resolve(name: &str, args: Vec<Arc<dyn Expression>>) -> ExecutorResult<BoundAggregate> {
    let def =
        get_aggregate(name).ok_or_else(|| ExecutorError::UnknownFunction(name.to_string()))?;
    let arg_types: Vec<DataType> = args.iter().map(|a| a.data_type()).collect();
    let result_type = (def.validate)(&arg_types).map_err(|reason| {
        ExecutorError::InvalidArguments {
            function: def.name.to_string(),
            reason,
        }
    })?;
    Ok(BoundAggregate {
        def,
        args,
        result_type,
    })
}

/// An aggregate call whose arguments have been validated
#[derive(Debug, Clone)]
pub struct BoundAggregate {
    def: &'static AggregateFunctionDef,
    args: Vec<Arc<dyn Expression>>,
    result_type: DataType,
}

impl BoundAggregate {
    pub fn name(&self) -> &'static str {
        self.def.name
    }

    pub fn result_type(&self) -> &DataType {
        &self.result_type
    }

    pub fn args(&self) -> &[Arc<dyn Expression>] {
        &self.args
    }

    /// Text used for output column names and explain output
    pub fn display_name(&self) -> String {
        let args: Vec<String> = self.args.iter().map(|a| a.display_name()).collect();
        format!("{}({})", self.def.name, args.join(", "))
    }

    pub fn new_server_aggregator(&self) -> ExecutorResult<Box<dyn ServerAggregator>> {
        (self.def.new_server_aggregator)(&self.args)
    }

    pub fn new_client_aggregator(&self) -> ExecutorResult<Box<dyn ClientAggregator>> {
        (self.def.new_client_aggregator)(&self.args)
    }
}

fn single_numeric_to_double(arg_types: &[DataType]) -> Result<DataType, String> {
    match arg_types {
        [t] if t.is_numeric() => Ok(DataType::Double),
        [t] => Err(format!("expected a numeric argument, got {}", t)),
        _ => Err(format!("takes exactly 1 argument, got {}", arg_types.len())),
    }
}

fn single_arg(args: &[Arc<dyn Expression>]) -> ExecutorResult<&Arc<dyn Expression>> {
    match args {
        [arg] => Ok(arg),
        _ => Err(ExecutorError::Internal(format!(
            "aggregate bound with {} arguments",
            args.len()
        ))),
    }
}

fn distinct_value_server(
    args: &[Arc<dyn Expression>],
) -> ExecutorResult<Box<dyn ServerAggregator>> {
    let arg = single_arg(args)?;
    Ok(Box::new(DistinctValueWithCountServerAggregator::new(
        Arc::clone(arg),
    )?))
}

fn stddev_pop_client(args: &[Arc<dyn Expression>]) -> ExecutorResult<Box<dyn ClientAggregator>> {
    let arg = single_arg(args)?;
    Ok(Box::new(StddevPopAggregator::new(&arg.data_type())?))
}

fn stddev_samp_client(args: &[Arc<dyn Expression>]) -> ExecutorResult<Box<dyn ClientAggregator>> {
    let arg = single_arg(args)?;
    Ok(Box::new(StddevSampAggregator::new(&arg.data_type())?))
}

fn median_client(args: &[Arc<dyn Expression>]) -> ExecutorResult<Box<dyn ClientAggregator>> {
    let arg = single_arg(args)?;
    Ok(Box::new(MedianAggregator::new(&arg.data_type())?))
}
