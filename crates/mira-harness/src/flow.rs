use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Marks a step whose confirmation must trigger a background search callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackTrigger {
    pub iteration: u32,
}

/// One scripted conversational exchange: a user utterance and the substring
/// the assistant's reply must contain (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStep {
    pub name: String,
    pub user_message: String,
    pub expected_response: String,
    #[serde(default)]
    pub trigger: Option<CallbackTrigger>,
}

impl ConversationStep {
    pub fn plain(name: &str, user_message: &str, expected_response: &str) -> Self {
        Self {
            name: name.to_string(),
            user_message: user_message.to_string(),
            expected_response: expected_response.to_string(),
            trigger: None,
        }
    }

    pub fn confirmation(
        name: &str,
        user_message: &str,
        expected_response: &str,
        iteration: u32,
    ) -> Self {
        Self {
            trigger: Some(CallbackTrigger { iteration }),
            ..Self::plain(name, user_message, expected_response)
        }
    }
}

/// Ordered, immutable flow table consumed by the orchestrator.
///
/// Invariant: iteration numbers on triggering steps form a contiguous
/// increasing sequence starting at 1, exactly one step per iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationFlow {
    steps: Vec<ConversationStep>,
}

impl ConversationFlow {
    pub fn new(steps: Vec<ConversationStep>) -> Result<Self> {
        if steps.is_empty() {
            bail!("conversation flow must include at least one step");
        }
        let mut names = std::collections::HashSet::new();
        for step in &steps {
            if step.name.trim().is_empty() {
                bail!("conversation step name cannot be empty");
            }
            if !names.insert(step.name.as_str()) {
                bail!("duplicate step name '{}'", step.name);
            }
        }
        let mut expected_iteration = 1u32;
        for step in &steps {
            if let Some(trigger) = step.trigger {
                if trigger.iteration != expected_iteration {
                    bail!(
                        "step '{}' carries iteration {} where {} was expected",
                        step.name,
                        trigger.iteration,
                        expected_iteration
                    );
                }
                expected_iteration += 1;
            }
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[ConversationStep] {
        &self.steps
    }

    /// Highest iteration number any step triggers; 0 for a trigger-free flow.
    pub fn max_iteration(&self) -> u32 {
        self.steps
            .iter()
            .filter_map(|step| step.trigger.map(|trigger| trigger.iteration))
            .max()
            .unwrap_or(0)
    }

    pub fn step(&self, name: &str) -> Option<&ConversationStep> {
        self.steps.iter().find(|step| step.name == name)
    }
}

/// The canonical property-search conversation: search, clarify, then three
/// confirmation/feedback cycles. Iterations 2 and 3 are the historically
/// failure-prone ones.
pub fn property_search_flow() -> ConversationFlow {
    ConversationFlow::new(vec![
        ConversationStep::plain(
            "INITIAL_SEARCH",
            "Quiero buscar un piso en Madrid",
            "búsqueda",
        ),
        ConversationStep::plain(
            "CLARIFICATION",
            "Busco 2 habitaciones, máximo 300.000 euros",
            "criterios",
        ),
        ConversationStep::confirmation(
            "SUMMARY_CONFIRMATION",
            "Sí, confirmo la búsqueda",
            "confirmo",
            1,
        ),
        ConversationStep::plain(
            "FEEDBACK",
            "Me gustan pero quiero algo más céntrico",
            "céntrico",
        ),
        ConversationStep::confirmation(
            "SECOND_CONFIRMATION",
            "Perfecto, busca con estos nuevos criterios",
            "nuevos criterios",
            2,
        ),
        ConversationStep::plain(
            "SECOND_FEEDBACK",
            "Ahora quiero también que tenga terraza",
            "terraza",
        ),
        ConversationStep::confirmation(
            "THIRD_CONFIRMATION",
            "Sí, busca con terraza incluida",
            "terraza incluida",
            3,
        ),
    ])
    .expect("canonical flow is valid")
}
