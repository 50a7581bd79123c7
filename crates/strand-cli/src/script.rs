//! Scene scripts: an ordered list of `[[step]]` tables in TOML.
//!
//! ```toml
//! [[step]]
//! op = "add-node"
//! name = "a"
//! kind = "point3d"
//!
//! [[step]]
//! op = "formula"
//! path = "a.y"
//! inputs = ["x"]
//! func = "neg"
//! ```

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use strand::{builtin, Root, Scene, Value, BUILTINS};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case", deny_unknown_fields)]
pub enum Step {
    /// Add a node, either with an explicit name or auto-named from `prefix`
    AddNode {
        name: Option<String>,
        prefix: Option<String>,
        kind: String,
    },
    RemoveNode {
        node: String,
    },
    RenameNode {
        node: String,
        to: String,
    },
    /// Assign a literal to `node.datum`
    Set {
        path: String,
        value: Value,
    },
    /// Make `node.datum` computed by a built-in over `inputs`
    Formula {
        path: String,
        #[serde(default)]
        inputs: Vec<String>,
        func: String,
    },
    RemoveDatum {
        path: String,
    },
    RenameDatum {
        path: String,
        to: String,
    },
    Flush,
}

impl Script {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed to parse script {}", path.display()))
    }

    /// Apply every step in order.
    pub fn apply(&self, scene: &mut Scene) -> Result<()> {
        for (i, step) in self.steps.iter().enumerate() {
            log::debug!("step {}: {:?}", i + 1, step);
            step.apply(scene)
                .with_context(|| format!("step {} ({})", i + 1, step.op()))?;
        }
        Ok(())
    }
}

impl Step {
    fn op(&self) -> &'static str {
        match self {
            Step::AddNode { .. } => "add-node",
            Step::RemoveNode { .. } => "remove-node",
            Step::RenameNode { .. } => "rename-node",
            Step::Set { .. } => "set",
            Step::Formula { .. } => "formula",
            Step::RemoveDatum { .. } => "remove-datum",
            Step::RenameDatum { .. } => "rename-datum",
            Step::Flush => "flush",
        }
    }

    fn apply(&self, scene: &mut Scene) -> Result<()> {
        match self {
            Step::AddNode { name, prefix, kind } => match (name, prefix) {
                (Some(name), None) => {
                    scene.add_node(name, kind)?;
                }
                (None, Some(prefix)) => {
                    scene.add_node_with_prefix(prefix, kind)?;
                }
                _ => bail!("exactly one of `name` or `prefix` is required"),
            },
            Step::RemoveNode { node } => {
                scene.remove_node(node)?;
            }
            Step::RenameNode { node, to } => scene.rename_node(node, to)?,
            Step::Set { path, value } => {
                let (node, datum) = split_path(path)?;
                scene.set_literal(node, datum, value.clone())?;
            }
            Step::Formula { path, inputs, func } => {
                let (node, datum) = split_path(path)?;
                let f = builtin(func).ok_or_else(|| {
                    anyhow!("unknown function {func:?} (expected one of {})", BUILTINS.join(", "))
                })?;
                let inputs: Vec<&str> = inputs.iter().map(String::as_str).collect();
                scene.set_formula(node, datum, &inputs, f)?;
            }
            Step::RemoveDatum { path } => {
                let (node, datum) = split_path(path)?;
                scene.remove_datum(node, datum)?;
            }
            Step::RenameDatum { path, to } => {
                let (node, datum) = split_path(path)?;
                scene.rename_datum(node, datum, to)?;
            }
            Step::Flush => {
                let report = scene.flush_queue()?;
                log::info!("flushed {} downstreams in {} rounds", report.evaluated, report.rounds);
            }
        }
        Ok(())
    }
}

fn split_path(path: &str) -> Result<(&str, &str)> {
    path.split_once('.')
        .ok_or_else(|| anyhow!("expected a `node.datum` path, got {path:?}"))
}
