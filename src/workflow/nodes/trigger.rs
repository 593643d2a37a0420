use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use serde_json::{json, Value};
use std::str::FromStr;

use crate::workflow::errors::NodeError;
use crate::workflow::models::{Node, TriggerKind};

#[derive(Debug, Clone)]
pub enum ScheduleKind {
    Cron { schedule: Schedule, expression: String },
    Interval { minutes: u32 },
}

/// Parsed schedule-trigger parameters, shared between the trigger node itself
/// and the scheduler's job loops.
#[derive(Debug, Clone)]
pub struct ScheduleSpec {
    pub kind: ScheduleKind,
    pub timezone: Tz,
}

impl ScheduleSpec {
    pub fn from_node(node: &Node) -> Result<Self, NodeError> {
        let schedule_type = node
            .string_parameter("schedule_type")
            .ok_or_else(|| NodeError::execution("schedule_type is required (interval or cron)"))?;

        let timezone_name = node.string_parameter("timezone").unwrap_or("UTC");
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|_| NodeError::execution(format!("Invalid timezone: {timezone_name}")))?;

        let kind = match schedule_type {
            "cron" => {
                if node.trigger_kind == Some(TriggerKind::ScheduleInterval) {
                    return Err(NodeError::execution(
                        "schedule_type does not match the trigger kind",
                    ));
                }
                let expression = node
                    .string_parameter("cron_expression")
                    .ok_or_else(|| NodeError::execution("Invalid cron expression"))?;
                ScheduleKind::Cron {
                    schedule: parse_cron(expression)?,
                    expression: expression.to_string(),
                }
            }
            "interval" => {
                if node.trigger_kind == Some(TriggerKind::ScheduleCron) {
                    return Err(NodeError::execution(
                        "schedule_type does not match the trigger kind",
                    ));
                }
                let minutes = node
                    .parameters
                    .get("interval_minutes")
                    .ok_or_else(|| {
                        NodeError::execution("interval_minutes is required for interval schedule")
                    })?
                    .as_u64()
                    .filter(|m| *m > 0 && *m <= u32::MAX as u64)
                    .ok_or_else(|| {
                        NodeError::execution("interval_minutes must be a positive integer")
                    })?;
                ScheduleKind::Interval {
                    minutes: minutes as u32,
                }
            }
            other => {
                return Err(NodeError::execution(format!(
                    "Unsupported schedule_type: {other}"
                )))
            }
        };

        Ok(Self { kind, timezone })
    }

    pub fn schedule_type(&self) -> &'static str {
        match self.kind {
            ScheduleKind::Cron { .. } => "cron",
            ScheduleKind::Interval { .. } => "interval",
        }
    }

    /// Next fire-time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match &self.kind {
            ScheduleKind::Cron { schedule, .. } => schedule
                .after(&after.with_timezone(&self.timezone))
                .next()
                .map(|t| t.with_timezone(&Utc)),
            ScheduleKind::Interval { minutes } => {
                after.checked_add_signed(Duration::minutes(*minutes as i64))
            }
        }
    }

    /// Latest fire-time that is due at `now`, starting from `last_planned`.
    /// Used to coalesce a backlog of missed fires into a single catch-up.
    pub fn latest_due(&self, last_planned: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut due = last_planned;
        while let Some(next) = self.next_after(due) {
            if next > now {
                break;
            }
            due = next;
        }
        due
    }
}

/// The user-facing expression is standard 5-field cron; the `cron` crate wants
/// a seconds field, so one is prepended.
fn parse_cron(expression: &str) -> Result<Schedule, NodeError> {
    if expression.split_whitespace().count() != 5 {
        return Err(NodeError::execution("Invalid cron expression"));
    }
    Schedule::from_str(&format!("0 {expression}"))
        .map_err(|_| NodeError::execution("Invalid cron expression"))
}

pub fn validate_parameters(node: &Node) -> Result<(), NodeError> {
    match node.trigger_kind {
        Some(TriggerKind::Manual) => Ok(()),
        Some(TriggerKind::ScheduleCron) | Some(TriggerKind::ScheduleInterval) => {
            ScheduleSpec::from_node(node).map(|_| ())
        }
        None => Err(NodeError::execution("trigger node is missing trigger_kind")),
    }
}

/// Fire a trigger node. Returns `None` when the trigger declines to fire;
/// the engine then leaves the trigger's successors untouched.
pub fn execute(node: &Node) -> Result<Option<Value>, NodeError> {
    match node.trigger_kind {
        Some(TriggerKind::Manual) => execute_manual(node),
        Some(TriggerKind::ScheduleCron) | Some(TriggerKind::ScheduleInterval) => {
            execute_schedule(node)
        }
        None => Err(NodeError::execution("trigger node is missing trigger_kind")),
    }
}

fn execute_manual(node: &Node) -> Result<Option<Value>, NodeError> {
    tracing::info!(node = %node.name, "manual trigger activated");
    Ok(Some(json!({
        "trigger_type": "manual",
        "timestamp": Utc::now().to_rfc3339(),
    })))
}

fn execute_schedule(node: &Node) -> Result<Option<Value>, NodeError> {
    let spec = ScheduleSpec::from_node(node)?;
    let fired_at = Utc::now();
    let local = fired_at.with_timezone(&spec.timezone);

    let mut last = node
        .last_execution
        .lock()
        .map_err(|_| NodeError::unexpected("trigger state lock poisoned"))?;
    *last = Some(fired_at);
    drop(last);

    tracing::info!(node = %node.name, schedule_type = spec.schedule_type(), "schedule trigger activated");
    Ok(Some(json!({
        "trigger_type": "schedule",
        "schedule_type": spec.schedule_type(),
        "timestamp": local.to_rfc3339(),
        "timezone": spec.timezone.name(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn schedule_node(params: Value) -> Node {
        let Value::Object(parameters) = params else {
            panic!("params must be an object");
        };
        Node::trigger("sched", TriggerKind::ScheduleInterval, parameters)
    }

    #[test]
    fn interval_next_after_adds_period() {
        let node = schedule_node(json!({"schedule_type": "interval", "interval_minutes": 5}));
        let spec = ScheduleSpec::from_node(&node).unwrap();
        let t0 = Utc::now();
        assert_eq!(spec.next_after(t0), Some(t0 + Duration::minutes(5)));
    }

    #[test]
    fn latest_due_coalesces_backlog() {
        let node = schedule_node(json!({"schedule_type": "interval", "interval_minutes": 1}));
        let spec = ScheduleSpec::from_node(&node).unwrap();
        let t0 = Utc::now();
        // Three and a half periods elapsed: the backlog collapses to the
        // third fire-time, so exactly one catch-up run happens.
        let now = t0 + Duration::seconds(210);
        assert_eq!(spec.latest_due(t0, now), t0 + Duration::minutes(3));
    }

    #[test]
    fn five_field_cron_parses() {
        let mut parameters = Map::new();
        parameters.insert("schedule_type".into(), json!("cron"));
        parameters.insert("cron_expression".into(), json!("0 9 * * *"));
        let node = Node::trigger("daily", TriggerKind::ScheduleCron, parameters);
        let spec = ScheduleSpec::from_node(&node).unwrap();
        assert_eq!(spec.schedule_type(), "cron");
        assert!(spec.next_after(Utc::now()).is_some());
    }

    #[test]
    fn malformed_cron_is_rejected() {
        let mut parameters = Map::new();
        parameters.insert("schedule_type".into(), json!("cron"));
        parameters.insert("cron_expression".into(), json!("not a cron"));
        let node = Node::trigger("daily", TriggerKind::ScheduleCron, parameters);
        assert!(ScheduleSpec::from_node(&node).is_err());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let node = schedule_node(json!({"schedule_type": "interval", "interval_minutes": 0}));
        assert!(ScheduleSpec::from_node(&node).is_err());
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let node = schedule_node(json!({
            "schedule_type": "interval",
            "interval_minutes": 1,
            "timezone": "Mars/Olympus"
        }));
        assert!(ScheduleSpec::from_node(&node).is_err());
    }
}
