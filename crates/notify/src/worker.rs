use crate::{context::NotifyContext, post_notify};
use agora_db::{
  source::task::{QueuedTask, TaskKind, TaskPayload},
  traits::TaskQueue,
};
use agora_utils::{error::AgoraResult, version::version};
use async_trait::async_trait;
use chrono::Utc;
use std::{collections::HashMap, time::Duration};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long an idle worker sleeps between queue polls.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How many tasks one poll may claim.
const CLAIM_BATCH: usize = 10;

/// A handler for one kind of queued task.
#[async_trait]
pub trait BackgroundTask: Send + Sync {
  fn kind(&self) -> TaskKind;

  async fn run(&self, payload: TaskPayload, context: &NotifyContext) -> AgoraResult<()>;
}

/// Routes claimed tasks to the handler registered for their kind.
#[derive(Default)]
pub struct TaskRegistry {
  handlers: HashMap<TaskKind, Box<dyn BackgroundTask>>,
}

impl TaskRegistry {
  /// A registry with every built in task registered.
  pub fn with_builtin_tasks() -> TaskRegistry {
    let mut registry = TaskRegistry::default();
    registry.register(Box::new(PostNotifyTask));
    registry
  }

  pub fn register(&mut self, task: Box<dyn BackgroundTask>) {
    self.handlers.insert(task.kind(), task);
  }

  async fn dispatch(&self, task: QueuedTask, context: &NotifyContext) -> AgoraResult<()> {
    let kind = task.payload.kind();
    match self.handlers.get(&kind) {
      Some(handler) => handler.run(task.payload, context).await,
      None => {
        warn!("No handler registered for {kind} task {}, dropping it", task.id);
        Ok(())
      }
    }
  }
}

/// The post notification fan-out, the task the composer flow enqueues.
pub struct PostNotifyTask;

#[async_trait]
impl BackgroundTask for PostNotifyTask {
  fn kind(&self) -> TaskKind {
    TaskKind::PostNotify
  }

  async fn run(&self, payload: TaskPayload, context: &NotifyContext) -> AgoraResult<()> {
    match payload {
      TaskPayload::PostNotify(data) => post_notify::execute(data, context).await,
    }
  }
}

/// Claims and executes queued tasks until cancelled. A failed task keeps its
/// claim, which surfaces it again once the lease runs out.
pub async fn run_worker(context: NotifyContext, registry: TaskRegistry, cancel: CancellationToken) {
  info!("Notification worker starting, version {}", version());
  loop {
    if let Err(e) = process_due_tasks(&context, &registry).await {
      warn!("Task queue poll failed: {e}");
    }
    tokio::select! {
      () = cancel.cancelled() => {
        info!("Notification worker stopping");
        return;
      }
      () = sleep(POLL_INTERVAL) => {}
    }
  }
}

/// One queue poll: claim whatever is due and run it. Finished tasks leave
/// the queue, failed ones stay claimed until their lease expires.
pub async fn process_due_tasks(
  context: &NotifyContext,
  registry: &TaskRegistry,
) -> AgoraResult<()> {
  let due = context.store().claim_due(Utc::now(), CLAIM_BATCH).await?;
  for task in due {
    let task_id = task.id;
    let kind = task.payload.kind();
    match registry.dispatch(task, context).await {
      Ok(()) => {
        context.store().finish(task_id).await?;
        debug!("Finished {kind} task {task_id}");
      }
      Err(e) => {
        warn!("{kind} task {task_id} failed, leaving it claimed for a later retry: {e}");
      }
    }
  }
  Ok(())
}
