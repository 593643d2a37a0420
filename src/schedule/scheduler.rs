use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::database::executions::ExecutionRepo;
use crate::workflow::{
    engine::WorkflowEngine,
    errors::{FluoError, Result},
    models::Workflow,
    nodes::ScheduleSpec,
    validation::WorkflowValidator,
};

struct ScheduledJob {
    workflow: Arc<Workflow>,
    trigger_name: String,
    spec: ScheduleSpec,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// Process-wide scheduler. Owns one tokio task per schedule trigger; each
/// task sleeps until the next fire-time and runs the workflow through the
/// engine. Fires of one job are serialized (the run is awaited in the job
/// task); different jobs run in parallel.
pub struct WorkflowScheduler {
    engine: Arc<WorkflowEngine>,
    executions: Option<Arc<ExecutionRepo>>,
    jobs: RwLock<HashMap<String, ScheduledJob>>,
    shutdown: CancellationToken,
    started: AtomicBool,
}

impl WorkflowScheduler {
    pub fn new(engine: Arc<WorkflowEngine>, executions: Option<Arc<ExecutionRepo>>) -> Self {
        Self {
            engine,
            executions,
            jobs: RwLock::new(HashMap::new()),
            shutdown: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Install one job per schedule trigger of `workflow`, keyed
    /// `"{workflow.name}-{trigger.name}"`. Manual triggers are ignored.
    /// Validation failures and duplicate job IDs reject the whole workflow;
    /// nothing is installed.
    pub async fn register_workflow(&self, workflow: Arc<Workflow>) -> Result<()> {
        WorkflowValidator::validate(&workflow)?;

        let mut pending = Vec::new();
        for node in workflow.schedule_triggers() {
            let spec = ScheduleSpec::from_node(node)
                .map_err(|e| FluoError::Validation(format!("Node '{}': {e}", node.name)))?;
            let job_id = format!("{}-{}", workflow.name, node.name);
            pending.push((job_id, node.name.clone(), spec));
        }

        let mut jobs = self.jobs.write().await;
        for (job_id, _, _) in &pending {
            if jobs.contains_key(job_id) {
                return Err(FluoError::Scheduler(format!("Duplicate job ID: {job_id}")));
            }
        }

        for (job_id, trigger_name, spec) in pending {
            let mut job = ScheduledJob {
                workflow: workflow.clone(),
                trigger_name,
                spec,
                token: self.shutdown.child_token(),
                handle: None,
            };
            if self.started.load(Ordering::SeqCst) {
                self.spawn_job(&job_id, &mut job);
            }
            tracing::info!(job_id = %job_id, workflow = %workflow.name, "registered schedule trigger");
            jobs.insert(job_id, job);
        }

        Ok(())
    }

    /// Cancel and remove every job belonging to `workflow_name`.
    pub async fn unregister_workflow(&self, workflow_name: &str) {
        let mut jobs = self.jobs.write().await;
        let doomed: Vec<String> = jobs
            .iter()
            .filter(|(_, job)| job.workflow.name == workflow_name)
            .map(|(id, _)| id.clone())
            .collect();

        for job_id in doomed {
            if let Some(job) = jobs.remove(&job_id) {
                job.token.cancel();
                tracing::info!(job_id = %job_id, "unregistered schedule trigger");
            }
        }
    }

    /// Begin firing. Jobs registered afterwards start immediately.
    pub async fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("starting workflow scheduler");

        let mut jobs = self.jobs.write().await;
        let job_ids: Vec<String> = jobs.keys().cloned().collect();
        for job_id in job_ids {
            if let Some(job) = jobs.get_mut(&job_id) {
                if job.handle.is_none() {
                    self.spawn_job(&job_id, job);
                }
            }
        }
    }

    /// Stop firing. New fires are suppressed immediately; a run already in
    /// flight is awaited to completion.
    pub async fn shutdown(&self) {
        tracing::info!("shutting down workflow scheduler");
        self.shutdown.cancel();

        let mut jobs = self.jobs.write().await;
        for (job_id, mut job) in jobs.drain() {
            if let Some(handle) = job.handle.take() {
                if handle.await.is_err() {
                    tracing::warn!(job_id = %job_id, "schedule task ended abnormally");
                }
            }
        }
        tracing::info!("workflow scheduler shutdown complete");
    }

    pub async fn job_ids(&self) -> Vec<String> {
        let jobs = self.jobs.read().await;
        let mut ids: Vec<String> = jobs.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn spawn_job(&self, job_id: &str, job: &mut ScheduledJob) {
        let engine = self.engine.clone();
        let executions = self.executions.clone();
        let workflow = job.workflow.clone();
        let trigger_name = job.trigger_name.clone();
        let spec = job.spec.clone();
        let token = job.token.clone();
        let job_id = job_id.to_string();

        job.handle = Some(tokio::spawn(async move {
            job_loop(engine, executions, workflow, trigger_name, spec, token, job_id).await;
        }));
    }
}

#[allow(clippy::too_many_arguments)]
async fn job_loop(
    engine: Arc<WorkflowEngine>,
    executions: Option<Arc<ExecutionRepo>>,
    workflow: Arc<Workflow>,
    trigger_name: String,
    spec: ScheduleSpec,
    token: CancellationToken,
    job_id: String,
) {
    // Interval jobs count from registration/start; cron jobs from the next
    // matching wall-clock time.
    let mut last_planned = Utc::now();

    loop {
        let Some(next) = spec.next_after(last_planned) else {
            tracing::warn!(job_id = %job_id, "no further fire times, stopping job");
            break;
        };

        let now = Utc::now();
        if next <= now {
            // One or more fire-times elapsed while the previous run was still
            // executing: coalesce the backlog into a single catch-up fire.
            last_planned = spec.latest_due(last_planned, now);
            tracing::warn!(job_id = %job_id, "missed fire-times detected, running one catch-up");
            run_workflow(&engine, executions.as_deref(), &workflow, &trigger_name).await;
            continue;
        }

        let wait = (next - now).to_std().unwrap_or_default();
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        // The run is awaited outside the select: shutdown stops new fires
        // but lets this one finish.
        run_workflow(&engine, executions.as_deref(), &workflow, &trigger_name).await;
        last_planned = next;

        if token.is_cancelled() {
            break;
        }
    }
}

async fn run_workflow(
    engine: &WorkflowEngine,
    executions: Option<&ExecutionRepo>,
    workflow: &Workflow,
    trigger_name: &str,
) {
    tracing::info!(workflow = %workflow.name, trigger = %trigger_name, "executing scheduled workflow");

    let (_, record) = engine.run_recorded(workflow, Some(trigger_name)).await;

    if let Some(repo) = executions {
        if let Err(e) = repo.insert(&record).await {
            tracing::error!(workflow = %workflow.name, error = %e, "failed to store execution record");
        }
    }

    tracing::info!(
        workflow = %workflow.name,
        execution_id = %record.id,
        status = record.status.as_str(),
        "scheduled run finished"
    );
}
