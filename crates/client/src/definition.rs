//! Workflow definition builder
//!
//! Constructors for each step kind plus [`WorkflowDefBuilder`], which checks the
//! assembled graph before it is sent to the server.
//!
//! # Example
//!
//! ```
//! use conductor_client::definition::WorkflowDef;
//! use conductor_client::models::WorkflowTask;
//!
//! let def = WorkflowDef::builder("order_flow")
//!     .version(2)
//!     .task(WorkflowTask::simple("validate", "validate_ref"))
//!     .fork_join(
//!         "fan_out",
//!         vec![
//!             vec![WorkflowTask::simple("charge", "charge_ref")],
//!             vec![WorkflowTask::simple("reserve", "reserve_ref")],
//!         ],
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(def.tasks.len(), 3);
//! ```

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};
use thiserror::Error;

pub use crate::models::WorkflowDef;
use crate::models::{SubWorkflowParams, TaskType, WorkflowTask, WorkflowTimeoutPolicy};

/// Evaluator used for switch expressions written in JavaScript
pub const JAVASCRIPT_EVALUATOR: &str = "javascript";

/// Evaluator that switches on an input parameter's value
pub const VALUE_PARAM_EVALUATOR: &str = "value-param";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("workflow name must not be empty")]
    EmptyName,

    #[error("workflow '{0}' has no tasks")]
    NoTasks(String),

    #[error("task '{0}' has an empty reference name")]
    EmptyReference(String),

    #[error("task reference name '{0}' is used more than once")]
    DuplicateReference(String),

    #[error("fork '{0}' has no branches or an empty branch")]
    EmptyForkBranch(String),

    #[error("loop '{0}' has no tasks to repeat")]
    EmptyLoop(String),
}

impl WorkflowTask {
    /// Step executed by a polling worker of type `name`
    pub fn simple(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::of_type(TaskType::Simple, name, reference)
    }

    /// Branch on `expression`; cases are keyed by the value it evaluates to
    pub fn switch(
        reference: impl Into<String>,
        evaluator: &str,
        expression: impl Into<String>,
        cases: BTreeMap<String, Vec<WorkflowTask>>,
        default_case: Vec<WorkflowTask>,
    ) -> Self {
        let reference = reference.into();
        let mut task = Self::of_type(TaskType::Switch, reference.clone(), reference);
        task.evaluator_type = Some(evaluator.to_string());
        task.expression = Some(expression.into());
        task.decision_cases = cases;
        task.default_case = default_case;
        task
    }

    /// Run `branches` in parallel; pair with [`WorkflowTask::join`]
    pub fn fork_join(reference: impl Into<String>, branches: Vec<Vec<WorkflowTask>>) -> Self {
        let reference = reference.into();
        let mut task = Self::of_type(TaskType::ForkJoin, reference.clone(), reference);
        task.fork_tasks = branches;
        task
    }

    /// Wait for the listed task references to finish
    pub fn join(reference: impl Into<String>, join_on: Vec<String>) -> Self {
        let reference = reference.into();
        let mut task = Self::of_type(TaskType::Join, reference.clone(), reference);
        task.join_on = join_on;
        task
    }

    /// Repeat `body` while `condition` holds
    pub fn do_while(
        reference: impl Into<String>,
        condition: impl Into<String>,
        body: Vec<WorkflowTask>,
    ) -> Self {
        let reference = reference.into();
        let mut task = Self::of_type(TaskType::DoWhile, reference.clone(), reference);
        task.loop_condition = Some(condition.into());
        task.loop_over = body;
        task
    }

    /// Start workflow `workflow_name` as a child
    pub fn sub_workflow(
        reference: impl Into<String>,
        workflow_name: impl Into<String>,
        version: Option<i32>,
    ) -> Self {
        let reference = reference.into();
        let mut task = Self::of_type(TaskType::SubWorkflow, reference.clone(), reference);
        task.sub_workflow_param = Some(SubWorkflowParams {
            name: workflow_name.into(),
            version,
        });
        task
    }

    pub fn wait(reference: impl Into<String>) -> Self {
        let reference = reference.into();
        Self::of_type(TaskType::Wait, reference.clone(), reference)
    }

    /// End the workflow with `status` (`COMPLETED` or `FAILED`)
    pub fn terminate(reference: impl Into<String>, status: &str, reason: Option<&str>) -> Self {
        let reference = reference.into();
        let mut task = Self::of_type(TaskType::Terminate, reference.clone(), reference);
        task.input_parameters
            .insert("terminationStatus".to_string(), Value::from(status));
        if let Some(reason) = reason {
            task.input_parameters
                .insert("terminationReason".to_string(), Value::from(reason));
        }
        task
    }

    /// Set one input parameter, e.g. `("orderId", "${workflow.input.orderId}")`
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.input_parameters.insert(key.into(), value.into());
        self
    }

    /// Let the workflow continue if this step fails
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    fn of_type(task_type: TaskType, name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            task_reference_name: reference.into(),
            task_type,
            ..Default::default()
        }
    }
}

impl WorkflowDef {
    pub fn builder(name: impl Into<String>) -> WorkflowDefBuilder {
        WorkflowDefBuilder::new(name)
    }

    /// Check reference names are present and unique across nested steps, and
    /// that forks and loops have something to run
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        if self.tasks.is_empty() {
            return Err(DefinitionError::NoTasks(self.name.clone()));
        }

        let mut seen = HashSet::new();
        let mut stack: Vec<&WorkflowTask> = self.tasks.iter().collect();
        while let Some(task) = stack.pop() {
            if task.task_reference_name.trim().is_empty() {
                return Err(DefinitionError::EmptyReference(task.name.clone()));
            }
            if !seen.insert(task.task_reference_name.as_str()) {
                return Err(DefinitionError::DuplicateReference(
                    task.task_reference_name.clone(),
                ));
            }
            match task.task_type {
                TaskType::ForkJoin
                    if task.fork_tasks.is_empty() || task.fork_tasks.iter().any(Vec::is_empty) =>
                {
                    return Err(DefinitionError::EmptyForkBranch(
                        task.task_reference_name.clone(),
                    ));
                }
                TaskType::DoWhile if task.loop_over.is_empty() => {
                    return Err(DefinitionError::EmptyLoop(task.task_reference_name.clone()));
                }
                _ => {}
            }
            stack.extend(task.children());
        }
        Ok(())
    }
}

/// Builder for [`WorkflowDef`]
#[derive(Debug, Clone)]
pub struct WorkflowDefBuilder {
    def: WorkflowDef,
}

impl WorkflowDefBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            def: WorkflowDef {
                name: name.into(),
                description: None,
                version: 1,
                tasks: Vec::new(),
                input_parameters: Vec::new(),
                output_parameters: Map::new(),
                schema_version: 2,
                restartable: true,
                owner_email: None,
                timeout_seconds: 0,
                timeout_policy: WorkflowTimeoutPolicy::default(),
                failure_workflow: None,
            },
        }
    }

    pub fn version(mut self, version: i32) -> Self {
        self.def.version = version;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.def.description = Some(description.into());
        self
    }

    pub fn owner_email(mut self, email: impl Into<String>) -> Self {
        self.def.owner_email = Some(email.into());
        self
    }

    pub fn timeout(mut self, seconds: u64, policy: WorkflowTimeoutPolicy) -> Self {
        self.def.timeout_seconds = seconds;
        self.def.timeout_policy = policy;
        self
    }

    pub fn restartable(mut self, restartable: bool) -> Self {
        self.def.restartable = restartable;
        self
    }

    pub fn failure_workflow(mut self, name: impl Into<String>) -> Self {
        self.def.failure_workflow = Some(name.into());
        self
    }

    pub fn input_parameter(mut self, name: impl Into<String>) -> Self {
        self.def.input_parameters.push(name.into());
        self
    }

    pub fn output_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.def.output_parameters.insert(key.into(), value.into());
        self
    }

    /// Append one step
    pub fn task(mut self, task: WorkflowTask) -> Self {
        self.def.tasks.push(task);
        self
    }

    /// Append a fork over `branches` followed by a join on each branch's last step
    pub fn fork_join(mut self, reference: impl Into<String>, branches: Vec<Vec<WorkflowTask>>) -> Self {
        let reference = reference.into();
        let join_on = branches
            .iter()
            .filter_map(|branch| branch.last())
            .map(|task| task.task_reference_name.clone())
            .collect();
        self.def
            .tasks
            .push(WorkflowTask::fork_join(reference.clone(), branches));
        self.def
            .tasks
            .push(WorkflowTask::join(format!("{reference}_join"), join_on));
        self
    }

    pub fn build(self) -> Result<WorkflowDef, DefinitionError> {
        self.def.validate()?;
        Ok(self.def)
    }
}
