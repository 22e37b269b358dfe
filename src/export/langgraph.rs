//! LangGraph project: `langgraph.json`, a declarative `graph.json` derived
//! from skill behaviors, and an `agent.py` that builds the graph from it.

use serde::Serialize;

use super::{skill_slugs, ExportError, ExportFormat, ExportedFile, Exporter};
use crate::schema::story::slugify;
use crate::schema::{AgentStory, Behavior, Skill};

const START: &str = "__start__";
const END: &str = "__end__";
const ROUTER: &str = "route";

const AGENT_PY: &str = r#"import json
from pathlib import Path
from typing import TypedDict

from langgraph.graph import END, START, StateGraph


class State(TypedDict, total=False):
    messages: list
    route: str


SPEC = json.loads((Path(__file__).parent / "graph.json").read_text())


def make_node(node):
    def run(state: State) -> State:
        # Replace with the real implementation of this node.
        return {"messages": state.get("messages", []) + [node["description"]]}

    return run


def resolve(name):
    return {"__start__": START, "__end__": END}.get(name, name)


builder = StateGraph(State)
for node in SPEC["nodes"]:
    builder.add_node(node["id"], make_node(node))
for edge in SPEC["edges"]:
    builder.add_edge(resolve(edge["from"]), resolve(edge["to"]))

graph = builder.compile()
"#;

pub struct LangGraphExporter;

#[derive(Debug, Serialize, PartialEq)]
struct GraphSpec {
    name: String,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

#[derive(Debug, Serialize, PartialEq)]
struct GraphNode {
    id: String,
    skill: String,
    description: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct GraphEdge {
    from: String,
    to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<String>,
}

impl GraphEdge {
    fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            condition: None,
        }
    }

    fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

impl Exporter for LangGraphExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Langgraph
    }

    fn check(&self, story: &AgentStory) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();
        for skill in &story.skills {
            let empty = match &skill.behavior {
                Some(Behavior::Sequential(sequential)) => sequential.steps.is_empty(),
                Some(Behavior::Workflow(workflow)) => workflow.stages.is_empty(),
                _ => false,
            };
            if empty {
                warnings.push(format!(
                    "skill \"{}\" has no steps or stages and is exported as a single node",
                    skill.name
                ));
            }
            if let Some(Behavior::Workflow(workflow)) = &skill.behavior {
                for transition in workflow.stages.iter().flat_map(|s| &s.transitions) {
                    if workflow.stage(&transition.to).is_none() {
                        warnings.push(format!(
                            "skill \"{}\" transition to unknown stage \"{}\" was dropped",
                            skill.name, transition.to
                        ));
                    }
                }
            }
        }
        if story.guardrails.iter().any(|g| !g.constraint.is_empty()) {
            warnings.push("guardrails are not enforced by the generated graph".to_string());
        }
        Ok(warnings)
    }

    fn render(&self, story: &AgentStory) -> Result<Vec<ExportedFile>, ExportError> {
        let slug = story.slug();
        let spec = build_graph(story);

        let config = serde_json::json!({
            "dependencies": ["."],
            "graphs": { slug: "./agent.py:graph" },
        });

        Ok(vec![
            ExportedFile::new("langgraph.json", serde_json::to_string_pretty(&config)?),
            ExportedFile::new("graph.json", serde_json::to_string_pretty(&spec)?),
            ExportedFile::new("agent.py", AGENT_PY),
        ])
    }
}

fn trigger_condition(skill: &Skill) -> String {
    skill
        .triggers
        .iter()
        .map(|t| format!("{}: {}", t.trigger_type, t.description))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn build_graph(story: &AgentStory) -> GraphSpec {
    let mut nodes = vec![GraphNode {
        id: ROUTER.to_string(),
        skill: String::new(),
        description: "Select the skill whose trigger matches the input".to_string(),
    }];
    let mut edges = vec![GraphEdge::new(START, ROUTER)];

    for (skill, slug) in story.skills.iter().zip(skill_slugs(story)) {
        let condition = trigger_condition(skill);
        let node = |id: String, description: &str| GraphNode {
            id,
            skill: skill.name.clone(),
            description: description.to_string(),
        };

        match &skill.behavior {
            Some(Behavior::Sequential(sequential)) => {
                let ids: Vec<String> = (1..=sequential.steps.len())
                    .map(|i| format!("{}.step-{}", slug, i))
                    .collect();
                for (id, step) in ids.iter().zip(&sequential.steps) {
                    nodes.push(node(id.clone(), step));
                }
                let (Some(first), Some(last)) = (ids.first(), ids.last()) else {
                    nodes.push(node(slug.clone(), &skill.description));
                    edges.push(GraphEdge::new(ROUTER, &slug).when(condition));
                    edges.push(GraphEdge::new(&slug, END));
                    continue;
                };
                edges.push(GraphEdge::new(ROUTER, first).when(condition));
                for pair in ids.windows(2) {
                    edges.push(GraphEdge::new(&pair[0], &pair[1]));
                }
                edges.push(GraphEdge::new(last, END));
            }
            Some(Behavior::Workflow(workflow)) => {
                let Some(first_stage) = workflow.stages.first() else {
                    nodes.push(node(slug.clone(), &skill.description));
                    edges.push(GraphEdge::new(ROUTER, &slug).when(condition));
                    edges.push(GraphEdge::new(&slug, END));
                    continue;
                };
                let stage_id = |name: &str| format!("{}.{}", slug, slugify(name));
                for stage in &workflow.stages {
                    let description = stage.purpose.as_deref().unwrap_or(&stage.name);
                    nodes.push(node(stage_id(&stage.name), description));
                }
                let entry = workflow
                    .entry_stage
                    .as_deref()
                    .filter(|e| workflow.stage(e).is_some())
                    .unwrap_or(&first_stage.name);
                edges.push(GraphEdge::new(ROUTER, stage_id(entry)).when(condition));

                for stage in &workflow.stages {
                    let known: Vec<_> = stage
                        .transitions
                        .iter()
                        .filter(|t| workflow.stage(&t.to).is_some())
                        .collect();
                    if known.is_empty() {
                        edges.push(GraphEdge::new(stage_id(&stage.name), END));
                    }
                    for transition in known {
                        let mut edge =
                            GraphEdge::new(stage_id(&stage.name), stage_id(&transition.to));
                        edge.condition = transition.when.clone();
                        edges.push(edge);
                    }
                }
            }
            Some(Behavior::Iterative(iterative)) => {
                let description = iterative.body.join("; ");
                nodes.push(node(slug.clone(), &description));
                edges.push(GraphEdge::new(ROUTER, &slug).when(condition));
                edges.push(
                    GraphEdge::new(&slug, &slug)
                        .when(format!("not ({})", iterative.termination_condition)),
                );
                edges.push(GraphEdge::new(&slug, END).when(iterative.termination_condition.clone()));
            }
            Some(Behavior::Adaptive(_)) | None => {
                nodes.push(node(slug.clone(), &skill.description));
                edges.push(GraphEdge::new(ROUTER, &slug).when(condition));
                edges.push(GraphEdge::new(&slug, END));
            }
        }
    }

    GraphSpec {
        name: story.name.clone(),
        nodes,
        edges,
    }
}
