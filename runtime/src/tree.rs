//! # Tree: the authentication graph
//!
//! A [`Tree`] wires node instances together by outcome id. It is built once,
//! validated ahead of execution and then shared by every journey.
//!
//! * **Tree runs, Schematic shows**: [`Tree::schematic`] exports the
//!   structure for editors and documentation.

use crate::error::TreeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use trellis_core::contract::WILDCARD;
use trellis_core::node::{Node, NodeId};
use trellis_core::outcome::{Outcome, OutcomeProviders};
use trellis_core::request::PreferredLocales;

/// Where an outcome edge leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Node(NodeId),
    Success,
    Failure,
}

/// A node instance placed in a tree.
pub struct TreeNode {
    pub id: NodeId,
    pub node_type: String,
    pub node: Arc<dyn Node>,
    pub outcomes: OutcomeProviders,
    pub config: Value,
    pub connections: BTreeMap<String, Target>,
}

impl TreeNode {
    pub fn new<N: Node>(id: NodeId, node_type: impl Into<String>, node: N, outcomes: OutcomeProviders) -> Self {
        Self {
            id,
            node_type: node_type.into(),
            node: Arc::new(node),
            outcomes,
            config: Value::Null,
            connections: BTreeMap::new(),
        }
    }

    /// Configuration handed to dynamic outcome providers.
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn connect(mut self, outcome: impl Into<String>, target: Target) -> Self {
        self.connections.insert(outcome.into(), target);
        self
    }
}

impl std::fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeNode")
            .field("id", &self.id)
            .field("node_type", &self.node_type)
            .field("outcomes", &self.outcomes)
            .field("connections", &self.connections)
            .finish()
    }
}

#[derive(Debug)]
pub struct Tree {
    name: String,
    entry: NodeId,
    nodes: BTreeMap<NodeId, TreeNode>,
    initial_keys: BTreeSet<String>,
}

impl Tree {
    pub fn builder(name: impl Into<String>) -> TreeBuilder {
        TreeBuilder {
            name: name.into(),
            entry: None,
            nodes: BTreeMap::new(),
            initial_keys: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> NodeId {
        self.entry
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.values()
    }

    /// Checks the wiring of every node against its outcome provider and the
    /// state contracts along every path.
    pub fn validate(&self, locales: &PreferredLocales) -> Result<(), TreeError> {
        for tree_node in self.nodes.values() {
            let outcomes: BTreeSet<String> = tree_node
                .outcomes
                .outcomes(locales, &tree_node.config)
                .map_err(|source| TreeError::Outcomes {
                    node: tree_node.id,
                    source,
                })?
                .into_iter()
                .map(|outcome| outcome.id)
                .collect();

            if let Some(outcome) = outcomes.iter().find(|o| !tree_node.connections.contains_key(*o)) {
                return Err(TreeError::UnconnectedOutcome {
                    node: tree_node.id,
                    outcome: outcome.clone(),
                });
            }
            for (outcome, target) in &tree_node.connections {
                if !outcomes.contains(outcome) {
                    return Err(TreeError::UnknownOutcome {
                        node: tree_node.id,
                        outcome: outcome.clone(),
                    });
                }
                if let Target::Node(next) = target {
                    if !self.nodes.contains_key(next) {
                        return Err(TreeError::UnknownNode(*next));
                    }
                }
            }
        }
        self.validate_inputs()
    }

    /// Forward data-flow over the graph: the keys guaranteed on entry to a
    /// node are the intersection over its incoming edges of what the
    /// predecessor guarantees plus what it outputs on that edge.
    fn validate_inputs(&self) -> Result<(), TreeError> {
        let mut guaranteed: BTreeMap<NodeId, BTreeSet<String>> = BTreeMap::new();
        guaranteed.insert(self.entry, self.initial_keys.clone());
        let mut pending = VecDeque::from([self.entry]);

        while let Some(id) = pending.pop_front() {
            let tree_node = self.nodes.get(&id).ok_or(TreeError::UnknownNode(id))?;
            let known = guaranteed.get(&id).cloned().unwrap_or_default();
            let outputs = tree_node.node.outputs();

            for (outcome, target) in &tree_node.connections {
                let Target::Node(next) = target else { continue };
                let mut flowing = known.clone();
                flowing.extend(
                    outputs
                        .iter()
                        .filter(|output| output.is_guaranteed_for(outcome))
                        .map(|output| output.name.clone()),
                );
                let changed = match guaranteed.get_mut(next) {
                    None => {
                        guaranteed.insert(*next, flowing);
                        true
                    }
                    Some(existing) => {
                        let narrowed: BTreeSet<String> = existing.intersection(&flowing).cloned().collect();
                        let changed = narrowed.len() != existing.len();
                        *existing = narrowed;
                        changed
                    }
                };
                if changed {
                    pending.push_back(*next);
                }
            }
        }

        for (id, tree_node) in &self.nodes {
            let Some(known) = guaranteed.get(id) else {
                tracing::warn!(node = %id, node_type = %tree_node.node_type, "node is unreachable from the entry node");
                continue;
            };
            if let Some(input) = tree_node
                .node
                .inputs()
                .into_iter()
                .find(|input| input.required && !input.is_wildcard() && !known.contains(&input.name))
            {
                return Err(TreeError::MissingInput {
                    node: *id,
                    input: input.name,
                });
            }
        }
        Ok(())
    }

    /// Input names declared by `from` and every node reachable from it.
    ///
    /// `None` when one of them reads every key.
    pub fn downstream_inputs(&self, from: NodeId) -> Option<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        let mut seen = BTreeSet::from([from]);
        let mut pending = VecDeque::from([from]);

        while let Some(id) = pending.pop_front() {
            let Some(tree_node) = self.nodes.get(&id) else { continue };
            for input in tree_node.node.inputs() {
                if input.name == WILDCARD {
                    return None;
                }
                names.insert(input.name);
            }
            for target in tree_node.connections.values() {
                if let Target::Node(next) = target {
                    if seen.insert(*next) {
                        pending.push_back(*next);
                    }
                }
            }
        }
        Some(names)
    }

    /// Structural view of the tree.
    pub fn schematic(&self, locales: &PreferredLocales) -> Schematic {
        let nodes = self
            .nodes
            .values()
            .map(|tree_node| SchematicNode {
                id: tree_node.id,
                node_type: tree_node.node_type.clone(),
                outcomes: tree_node
                    .outcomes
                    .outcomes(locales, &tree_node.config)
                    .unwrap_or_default(),
                inputs: tree_node.node.inputs().into_iter().map(|input| input.name).collect(),
                outputs: tree_node.node.outputs().into_iter().map(|output| output.name).collect(),
            })
            .collect();
        let edges = self
            .nodes
            .values()
            .flat_map(|tree_node| {
                tree_node.connections.iter().map(|(outcome, target)| Edge {
                    from: tree_node.id,
                    to: *target,
                    outcome: outcome.clone(),
                })
            })
            .collect();
        Schematic {
            name: self.name.clone(),
            entry: self.entry,
            nodes,
            edges,
        }
    }
}

pub struct TreeBuilder {
    name: String,
    entry: Option<NodeId>,
    nodes: BTreeMap<NodeId, TreeNode>,
    initial_keys: BTreeSet<String>,
}

impl TreeBuilder {
    pub fn entry(mut self, id: NodeId) -> Self {
        self.entry = Some(id);
        self
    }

    /// Adds a node; the first node added becomes the entry unless set explicitly.
    pub fn node(mut self, node: TreeNode) -> Self {
        self.entry.get_or_insert(node.id);
        self.nodes.insert(node.id, node);
        self
    }

    /// State keys present before the entry node runs (e.g. seeded by the driver).
    pub fn initial_key(mut self, key: impl Into<String>) -> Self {
        self.initial_keys.insert(key.into());
        self
    }

    pub fn build(self) -> Result<Tree, TreeError> {
        let entry = self.entry.ok_or(TreeError::MissingEntry)?;
        if !self.nodes.contains_key(&entry) {
            return Err(TreeError::UnknownNode(entry));
        }
        Ok(Tree {
            name: self.name,
            entry,
            nodes: self.nodes,
            initial_keys: self.initial_keys,
        })
    }
}

/// Serializable graph representation for editors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schematic {
    pub name: String,
    pub entry: NodeId,
    pub nodes: Vec<SchematicNode>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchematicNode {
    pub id: NodeId,
    pub node_type: String,
    pub outcomes: Vec<Outcome>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: Target,
    pub outcome: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trellis_core::action::Action;
    use trellis_core::context::TreeContext;
    use trellis_core::contract::{InputState, OutputState};
    use trellis_core::error::NodeError;
    use trellis_core::outcome::{BooleanOutcomeProvider, SingleOutcomeProvider};
    use uuid::Uuid;

    struct Collect {
        writes: &'static str,
    }

    impl Node for Collect {
        fn process(&self, _context: &mut TreeContext) -> Result<Action, NodeError> {
            Ok(Action::goto("outcome").build()?)
        }

        fn outputs(&self) -> Vec<OutputState> {
            vec![OutputState::always(self.writes)]
        }
    }

    struct Check {
        reads: Vec<InputState>,
    }

    impl Node for Check {
        fn process(&self, _context: &mut TreeContext) -> Result<Action, NodeError> {
            Ok(Action::goto("true").build()?)
        }

        fn inputs(&self) -> Vec<InputState> {
            self.reads.clone()
        }
    }

    fn single(id: NodeId, writes: &'static str) -> TreeNode {
        TreeNode::new(id, "Collect", Collect { writes }, OutcomeProviders::fixed(SingleOutcomeProvider))
    }

    fn decision(id: NodeId, reads: Vec<InputState>) -> TreeNode {
        TreeNode::new(id, "Check", Check { reads }, OutcomeProviders::fixed(BooleanOutcomeProvider))
    }

    #[test]
    fn wired_tree_validates() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let tree = Tree::builder("Login")
            .node(single(a, "username").connect("outcome", Target::Node(b)))
            .node(
                decision(b, vec![InputState::required("username")])
                    .connect("true", Target::Success)
                    .connect("false", Target::Failure),
            )
            .build()
            .unwrap();

        tree.validate(&PreferredLocales::default()).unwrap();
        assert_eq!(tree.entry(), a);
    }

    #[test]
    fn unconnected_outcome_is_reported() {
        let a = Uuid::new_v4();
        let tree = Tree::builder("Login")
            .node(decision(a, vec![]).connect("true", Target::Success))
            .build()
            .unwrap();

        let err = tree.validate(&PreferredLocales::default()).unwrap_err();
        assert!(matches!(err, TreeError::UnconnectedOutcome { outcome, .. } if outcome == "false"));
    }

    #[test]
    fn connection_to_missing_node_is_reported() {
        let (a, ghost) = (Uuid::new_v4(), Uuid::new_v4());
        let tree = Tree::builder("Login")
            .node(single(a, "username").connect("outcome", Target::Node(ghost)))
            .build()
            .unwrap();

        assert!(matches!(
            tree.validate(&PreferredLocales::default()),
            Err(TreeError::UnknownNode(id)) if id == ghost
        ));
    }

    #[test]
    fn required_input_must_be_guaranteed_on_every_path() {
        let (start, collect, check) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        // `false` skips the node producing "username"
        let tree = Tree::builder("Login")
            .node(
                decision(start, vec![])
                    .connect("true", Target::Node(collect))
                    .connect("false", Target::Node(check)),
            )
            .node(single(collect, "username").connect("outcome", Target::Node(check)))
            .node(
                decision(check, vec![InputState::required("username")])
                    .connect("true", Target::Success)
                    .connect("false", Target::Failure),
            )
            .build()
            .unwrap();

        let err = tree.validate(&PreferredLocales::default()).unwrap_err();
        assert!(matches!(err, TreeError::MissingInput { node, input } if node == check && input == "username"));
    }

    #[test]
    fn optional_and_seeded_inputs_pass() {
        let a = Uuid::new_v4();
        let tree = Tree::builder("Login")
            .initial_key("realm")
            .node(
                decision(a, vec![InputState::required("realm"), InputState::optional("email")])
                    .connect("true", Target::Success)
                    .connect("false", Target::Failure),
            )
            .build()
            .unwrap();

        tree.validate(&PreferredLocales::default()).unwrap();
    }

    #[test]
    fn downstream_inputs_cover_reachable_nodes() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let tree = Tree::builder("Login")
            .node(single(a, "username").connect("outcome", Target::Node(b)))
            .node(
                decision(b, vec![InputState::optional("password")])
                    .connect("true", Target::Success)
                    .connect("false", Target::Failure),
            )
            .build()
            .unwrap();

        assert_eq!(tree.downstream_inputs(a), Some(BTreeSet::from(["password".to_string()])));

        let wildcard = Tree::builder("Any")
            .node(decision(a, vec![InputState::wildcard()]))
            .build()
            .unwrap();
        assert_eq!(wildcard.downstream_inputs(a), None);
    }

    #[test]
    fn schematic_lists_edges() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let tree = Tree::builder("Login")
            .node(single(a, "username").connect("outcome", Target::Node(b)))
            .node(
                decision(b, vec![])
                    .connect("true", Target::Success)
                    .connect("false", Target::Failure),
            )
            .build()
            .unwrap();

        let schematic = tree.schematic(&PreferredLocales::default());
        assert_eq!(schematic.nodes.len(), 2);
        assert_eq!(schematic.edges.len(), 3);
        let encoded = serde_json::to_value(&schematic).unwrap();
        assert_eq!(encoded["name"], json!("Login"));
    }

    #[test]
    fn missing_entry_is_rejected() {
        assert!(matches!(Tree::builder("Empty").build(), Err(TreeError::MissingEntry)));
    }
}
