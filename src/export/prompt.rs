use std::fmt::Write;

use crate::schema::{AgentStory, Behavior, Guardrail, Skill};

/// Markdown system prompt describing the whole agent. Shared by the formats
/// that carry a single free-text instruction block.
pub fn render_system_prompt(story: &AgentStory) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", story.name);
    if let Some(role) = &story.role {
        let _ = writeln!(out, "\nYou are {}.", role.trim_end_matches('.'));
    }
    if let Some(purpose) = &story.purpose {
        let _ = writeln!(out, "\n## Purpose\n\n{}", purpose);
    }
    if let Some(level) = story.autonomy_level {
        let _ = writeln!(out, "\n## Autonomy\n\nAutonomy level: {}.", level);
    }
    if let Some(interaction) = &story.human_interaction {
        let _ = writeln!(out, "Human interaction mode: {}.", interaction.mode);
        for checkpoint in &interaction.checkpoints {
            let _ = writeln!(
                out,
                "- Checkpoint \"{}\" ({}) when {}",
                checkpoint.name, checkpoint.checkpoint_type, checkpoint.trigger
            );
        }
        if let Some(escalation) = &interaction.escalation {
            let _ = writeln!(out, "Escalate when: {}", escalation.conditions.join("; "));
        }
    }

    if !story.skills.is_empty() {
        let _ = writeln!(out, "\n## Skills");
        for skill in &story.skills {
            out.push('\n');
            out.push_str(&render_skill_section(skill, "###"));
        }
    }

    if let Some(memory) = &story.memory {
        let _ = writeln!(out, "\n## Memory");
        if !memory.working.is_empty() {
            let _ = writeln!(out, "\nKeep in working memory: {}.", memory.working.join(", "));
        }
        for store in &memory.persistent {
            let _ = writeln!(
                out,
                "- {} ({}, {})",
                store.name, store.store_type, store.updates
            );
        }
    }

    if !story.guardrails.is_empty() {
        let _ = writeln!(out, "\n## Guardrails\n");
        out.push_str(&render_guardrails(&story.guardrails));
    }

    out
}

/// One skill as a markdown section headed by `heading` (e.g. `###`).
pub(crate) fn render_skill_section(skill: &Skill, heading: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}\n", heading, skill.name);
    if !skill.description.is_empty() {
        let _ = writeln!(out, "{}\n", skill.description);
    }

    let _ = writeln!(out, "**When to use:**");
    for trigger in &skill.triggers {
        let _ = writeln!(out, "- ({}) {}", trigger.trigger_type, trigger.description);
        for condition in &trigger.conditions {
            let _ = writeln!(out, "  - only if {}", condition);
        }
    }

    if let Some(behavior) = &skill.behavior {
        let _ = writeln!(out, "\n**How:**");
        out.push_str(&render_behavior(behavior));
    }

    if !skill.tools.is_empty() {
        let _ = writeln!(out, "\n**Tools:**");
        for tool in &skill.tools {
            let _ = writeln!(out, "- `{}`: {}", tool.name, tool.purpose);
        }
    }

    let _ = writeln!(out, "\n**Done when:**");
    for condition in &skill.acceptance.success_conditions {
        let _ = writeln!(out, "- {}", condition);
    }
    if let Some(timeout) = &skill.acceptance.timeout {
        let _ = writeln!(out, "- within {}", timeout);
    }

    if let Some(handling) = &skill.failure_handling {
        if !handling.is_empty() {
            let _ = writeln!(out, "\n**On failure:**");
            for mode in &handling.modes {
                let _ = writeln!(out, "- {}: {}", mode.condition, mode.recovery);
            }
            if let Some(fallback) = &handling.default_fallback {
                let _ = writeln!(out, "- otherwise: {}", fallback);
            }
        }
    }

    if !skill.guardrails.is_empty() {
        let _ = writeln!(out, "\n**Guardrails:**");
        out.push_str(&render_guardrails(&skill.guardrails));
    }

    out
}

fn render_behavior(behavior: &Behavior) -> String {
    let mut out = String::new();
    match behavior {
        Behavior::Sequential(sequential) => {
            for (i, step) in sequential.steps.iter().enumerate() {
                let _ = writeln!(out, "{}. {}", i + 1, step);
            }
        }
        Behavior::Workflow(workflow) => {
            for stage in &workflow.stages {
                let _ = write!(out, "- Stage `{}`", stage.name);
                if let Some(purpose) = &stage.purpose {
                    let _ = write!(out, ": {}", purpose);
                }
                out.push('\n');
                for transition in &stage.transitions {
                    match &transition.when {
                        Some(when) => {
                            let _ = writeln!(out, "  - go to `{}` when {}", transition.to, when);
                        }
                        None => {
                            let _ = writeln!(out, "  - go to `{}`", transition.to);
                        }
                    }
                }
            }
        }
        Behavior::Adaptive(adaptive) => {
            let _ = writeln!(
                out,
                "Choose among: {}.",
                adaptive.capabilities.join(", ")
            );
            if let Some(strategy) = &adaptive.selection_strategy {
                let _ = writeln!(out, "Selection strategy: {}.", strategy);
            }
        }
        Behavior::Iterative(iterative) => {
            let _ = writeln!(out, "Repeat:");
            for step in &iterative.body {
                let _ = writeln!(out, "- {}", step);
            }
            let _ = write!(out, "Stop when {}", iterative.termination_condition);
            if let Some(max) = iterative.max_iterations {
                let _ = write!(out, " or after {} iterations", max);
            }
            out.push_str(".\n");
        }
    }
    out
}

fn render_guardrails(guardrails: &[Guardrail]) -> String {
    guardrails
        .iter()
        .map(|g| format!("- **{}** ({}): {}\n", g.name, g.enforcement, g.constraint))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures::support_story;

    #[test]
    fn test_prompt_mentions_every_skill() {
        let prompt = render_system_prompt(&support_story());
        assert!(prompt.starts_with("# Support Bot\n"));
        assert!(prompt.contains("You are Tier-one support agent."));
        assert!(prompt.contains("### Ticket Triage"));
        assert!(prompt.contains("### Resolution"));
        assert!(prompt.contains("go to `resolve` when issue understood"));
        assert!(prompt.contains("- **No refunds** (hard): Never issue refunds"));
    }
}
