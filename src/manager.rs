//! `ValidationManager`: owns the dependency graph and drives the scheduling
//! loop described in the concurrency model — a topological walk per record
//! that spawns a task per node only when the node is async or one of its
//! dependencies is still running, and otherwise runs the node inline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::info;

use crate::config::ManagerConfig;
use crate::error::{EngineError, ProviderItemError, ValidationError};
use crate::error_handler::ErrorHandler;
use crate::error_id::{self, ERROR_ID_ABANDONED, ERROR_ID_PROVIDER_FAILED, ERROR_ID_TIMEOUT, ERROR_ID_TYPE_MISMATCH};
use crate::graph::{DependencyGraph, NodeId, Plan};
use crate::params::Parameters;
use crate::provider::MappedValidator;
use crate::record::Record;
use crate::result::ValidationResult;
use crate::validator::Validator;

/// Owns the registered dependency graph and runs records through it.
pub struct ValidationManager {
    graph: DependencyGraph,
    config: ManagerConfig,
}

impl ValidationManager {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            graph: DependencyGraph::new(),
            config,
        }
    }

    /// Registers a mapped validator. Registering the same mapped validator
    /// (same function, same provider specification) twice is a no-op that
    /// returns the original `NodeId` rather than an error — callers building
    /// up a graph across multiple setup passes don't need to deduplicate by
    /// hand.
    pub fn register(
        &mut self,
        mapped_validator: MappedValidator,
        depends_on: &[NodeId],
        timeout: Option<Duration>,
    ) -> Result<NodeId, EngineError> {
        if let Some(existing) = self.graph.find_equal(&mapped_validator) {
            return Ok(existing);
        }
        let timeout = timeout.or(self.config.default_timeout);
        self.graph.register(mapped_validator, depends_on, timeout)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Validates every record, independently and concurrently, returning a
    /// batch-level [`ValidationResult`]. Freezes the dependency graph on
    /// first call.
    pub async fn validate(
        &self,
        records: Vec<Arc<dyn Record>>,
        log_summary: Option<bool>,
    ) -> ValidationResult {
        let plan = self.graph.plan();
        let total = records.len();
        let mut succeeded = Vec::new();
        let mut data_set_errors = HashMap::new();

        for record in records {
            let errors = validate_one(&plan, record.clone()).await;
            if errors.is_empty() {
                succeeded.push(record);
            } else {
                data_set_errors.insert(record.get_id(), (record, errors));
            }
        }

        let result = ValidationResult::new(total, succeeded, data_set_errors);

        if log_summary.unwrap_or(self.config.log_summary_default) {
            info!(
                total = result.total(),
                succeeded = result.num_succeeds(),
                failed = result.num_fails(),
                errors = result.num_errors_total(),
                "validation complete"
            );
        }

        result
    }
}

/// Runs every node of `plan` against a single `record`, returning the flat
/// list of errors recorded across the whole graph.
async fn validate_one(plan: &Arc<Plan>, record: Arc<dyn Record>) -> Vec<ValidationError> {
    let handler = Arc::new(ErrorHandler::new());

    let mut senders = HashMap::with_capacity(plan.order.len());
    let mut receivers = HashMap::with_capacity(plan.order.len());
    for &node in &plan.order {
        let (tx, rx) = watch::channel(false);
        senders.insert(node, tx);
        receivers.insert(node, rx);
    }

    let mut join_set = JoinSet::new();

    for &node in &plan.order {
        let deps = plan.dependencies.get(&node).cloned().unwrap_or_default();
        let dep_running = deps.iter().any(|d| !*receivers[d].borrow());
        let mapped = plan
            .mapped_validators
            .get(&node)
            .expect("every planned node has a mapped validator")
            .clone();
        let is_async = mapped.validator().is_async();
        let timeout = plan.timeouts.get(&node).copied().flatten();
        let dep_rxs: Vec<_> = deps.iter().map(|d| receivers[d].clone()).collect();
        let done = senders[&node].clone();
        let record = record.clone();

        if is_async || dep_running {
            let handler = handler.clone();
            join_set.spawn(run_node(node, deps, dep_rxs, mapped, timeout, handler, record, done));
        } else {
            run_node(node, deps, dep_rxs, mapped, timeout, handler.clone(), record, done).await;
        }
    }

    while join_set.join_next().await.is_some() {}

    Arc::try_unwrap(handler)
        .unwrap_or_else(|_| panic!("every task holding a handler clone has finished by now"))
        .into_errors()
}

/// The per-node algorithm: wait for dependencies, check for abandonment,
/// bind parameters, type-check, invoke (under a timeout if configured), and
/// record whatever errors result, then signal completion.
#[allow(clippy::too_many_arguments)]
async fn run_node(
    node: NodeId,
    deps: Vec<NodeId>,
    dep_rxs: Vec<watch::Receiver<bool>>,
    mapped: MappedValidator,
    timeout: Option<Duration>,
    handler: Arc<ErrorHandler>,
    record: Arc<dyn Record>,
    done: watch::Sender<bool>,
) {
    for mut rx in dep_rxs {
        let _ = rx.wait_for(|finished| *finished).await;
    }

    let validator = mapped.validator().clone();

    if deps.iter().any(|d| handler.has_errors(*d)) {
        handler.catch(
            node,
            ERROR_ID_ABANDONED,
            format!("'{}' skipped: a dependency failed validation", validator.name()),
            Box::from("dependency failed"),
            validator.name(),
            vec![],
            record.as_ref(),
        );
        let _ = done.send(true);
        return;
    }

    for item in mapped.provide(record.as_ref()) {
        match item {
            Err(ProviderItemError::MissingRequired { param_name, source }) => {
                let message = format!("{param_name} not provided ({source})");
                handler.catch(
                    node,
                    ERROR_ID_PROVIDER_FAILED,
                    message,
                    Box::new(source),
                    validator.name(),
                    vec![],
                    record.as_ref(),
                );
            }
            Ok(params) => {
                run_one_invocation(node, &validator, timeout, params, &handler, record.as_ref()).await;
            }
        }
    }

    let _ = done.send(true);
}

async fn run_one_invocation(
    node: NodeId,
    validator: &Validator,
    timeout: Option<Duration>,
    params: Parameters,
    handler: &ErrorHandler,
    record: &dyn Record,
) {
    if let Some(message) = type_mismatch(validator, &params) {
        handler.catch(
            node,
            ERROR_ID_TYPE_MISMATCH,
            message,
            Box::from("parameter type mismatch"),
            validator.name(),
            params.snapshot(),
            record,
        );
        return;
    }

    let snapshot = params.snapshot();
    let fut = validator.invoke(params);

    let outcome = match timeout {
        Some(d) => match tokio::time::timeout(d, fut).await {
            Ok(outcome) => outcome,
            Err(_) => {
                handler.catch(
                    node,
                    ERROR_ID_TIMEOUT,
                    format!("Timeout ({:.1}s) during execution", d.as_secs_f64()),
                    Box::from("timeout"),
                    validator.name(),
                    snapshot,
                    record,
                );
                return;
            }
        },
        None => fut.await,
    };

    if let Err(raised) = outcome {
        let error_id = error_id::id_for(&raised.origin);
        let message = raised.message.clone();
        handler.catch(node, error_id, message, Box::new(raised), validator.name(), snapshot, record);
    }
}

fn type_mismatch(validator: &Validator, params: &Parameters) -> Option<String> {
    params.iter().find_map(|p| {
        let spec = validator.param(&p.name)?;
        if spec.type_tag.matches(&p.value) {
            None
        } else {
            Some(format!(
                "parameter '{}' expected {} but got '{}'",
                p.name, spec.type_tag, p.value
            ))
        }
    })
}
