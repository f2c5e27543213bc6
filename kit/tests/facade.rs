use std::sync::Arc;
use trellis::prelude::*;
use trellis::EngineConfig;
use uuid::Uuid;

const CONFIG: &str = r#"
tree_name = "Welcome"
resume_uri = "https://login.example.com/resume"
state_containers = ["objectAttributes"]
"#;

#[tokio::test]
async fn configured_tree_runs_through_the_facade() {
    let config = EngineConfig::from_toml_str(CONFIG).unwrap();
    assert_eq!(config.tree_name, "Welcome");

    let (log, present) = (Uuid::new_v4(), Uuid::new_v4());
    let tree = Tree::builder(config.tree_name.clone())
        .node(
            TreeNode::new(log, "Log", LogNode::new("welcome", LogLevel::Debug), OutcomeProviders::fixed(SingleOutcomeProvider))
                .connect("outcome", Target::Node(present)),
        )
        .node(
            TreeNode::new(
                present,
                "AttributePresent",
                AttributePresentDecisionNode::new("username"),
                OutcomeProviders::fixed(BooleanOutcomeProvider),
            )
            .connect("true", Target::Success)
            .connect("false", Target::Failure),
        )
        .build()
        .unwrap();
    tree.validate(&PreferredLocales::default()).unwrap();

    let executor = TreeExecutor::new(Arc::new(tree), config);
    let mut shared = StateDocument::new();
    shared.insert("username", serde_json::json!("demo"));

    let result = executor.start_with(shared, RequestContext::default()).await.unwrap();
    assert!(matches!(result, StepResult::Completed(_)));
}
