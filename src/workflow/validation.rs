use crate::workflow::{
    errors::{FluoError, Result},
    models::{NodeKind, Workflow},
    nodes,
};
use std::collections::HashSet;

pub struct WorkflowValidator;

impl WorkflowValidator {
    /// Validate the entire workflow structure and every node's parameters.
    /// Called at ingestion and again at scheduler registration; failures
    /// prevent the workflow from becoming visible to either.
    pub fn validate(workflow: &Workflow) -> Result<()> {
        Self::validate_nodes_present(workflow)?;
        Self::validate_unique_names(workflow)?;
        Self::validate_connections(workflow)?;
        Self::validate_triggers(workflow)?;
        Self::validate_node_parameters(workflow)?;
        Ok(())
    }

    fn validate_nodes_present(workflow: &Workflow) -> Result<()> {
        if workflow.nodes.is_empty() {
            return Err(FluoError::Validation(
                "Workflow must contain at least one node".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_unique_names(workflow: &Workflow) -> Result<()> {
        let mut seen = HashSet::new();
        for node in &workflow.nodes {
            if !seen.insert(node.name.as_str()) {
                return Err(FluoError::Validation(format!(
                    "Duplicate node name: '{}'",
                    node.name
                )));
            }
        }
        Ok(())
    }

    fn validate_connections(workflow: &Workflow) -> Result<()> {
        let names: HashSet<&str> = workflow.nodes.iter().map(|n| n.name.as_str()).collect();

        for (source, targets) in &workflow.connections {
            if !names.contains(source.as_str()) {
                return Err(FluoError::Validation(format!(
                    "Connection references non-existent source node: '{source}'"
                )));
            }
            for target in targets {
                if !names.contains(target.as_str()) {
                    return Err(FluoError::Validation(format!(
                        "Connection from '{source}' references non-existent node: '{target}'"
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_triggers(workflow: &Workflow) -> Result<()> {
        if workflow.triggers.is_empty() {
            return Err(FluoError::Validation(
                "Workflow must declare at least one trigger".to_string(),
            ));
        }

        for trigger_name in &workflow.triggers {
            let node = workflow.get_node(trigger_name).ok_or_else(|| {
                FluoError::Validation(format!(
                    "Trigger references non-existent node: '{trigger_name}'"
                ))
            })?;
            if node.kind != NodeKind::Trigger {
                return Err(FluoError::Validation(format!(
                    "Node '{trigger_name}' is declared as a trigger but has kind {:?}",
                    node.kind
                )));
            }
        }

        if !workflow.nodes.iter().any(|n| n.kind == NodeKind::Trigger) {
            return Err(FluoError::Validation(
                "Workflow must contain at least one trigger node".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_node_parameters(workflow: &Workflow) -> Result<()> {
        for node in &workflow.nodes {
            nodes::validate_parameters(node).map_err(|e| {
                FluoError::Validation(format!("Node '{}': {e}", node.name))
            })?;
        }
        Ok(())
    }
}
