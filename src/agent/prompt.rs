use crate::history::SessionHistory;

/// Instruction template for the reasoning round, with worked sample
/// sessions covering both tools and the from-memory path.
const SYSTEM_MESSAGE: &str = "\
You run in a process of Question, Thought, Action, Observation.

Use Thought to describe your thoughts about the question you have been asked.
Observation will be the result of running those actions.

If you can not answer the question from your memory, use Action to run one of these actions available to you:

- exchange: from to
- lookup: terms

Here are some sample sessions.

Question: What is capital of france?
Thought: This is about geography, I can recall the answer from my memory.
Action: lookup: capital of France.
Observation: Paris is the capital of France.
Answer: The capital of France is Paris.

Question: What is the exchange rate from USD to EUR?
Thought: This is about currency exchange rates, I need to check the current rate.
Action: exchange: USD EUR
Observation: 0.8276 EUR for 1 USD.
Answer: The current exchange rate is 0.8276 EUR for 1 USD.

Question: Who painted Mona Lisa?
Thought: This is about general knowledge, I can recall the answer from my memory.
Action: lookup: painter of Mona Lisa.
Observation: Mona Lisa was painted by Leonardo da Vinci.
Answer: Leonardo da Vinci painted Mona Lisa.";

const HISTORY_PREAMBLE: &str =
    "Before formulating a thought, consider the following conversation history.";

/// Labeled kind of supplied material for the composition prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassageKind {
    ReferenceDocument,
    ExchangeRate,
}

impl PassageKind {
    fn label(self) -> &'static str {
        match self {
            PassageKind::ReferenceDocument => "reference document",
            PassageKind::ExchangeRate => "exchange rate",
        }
    }
}

/// Builds the reasoning prompt: instructions, optional history block, and
/// the literal question.
pub fn reason_prompt(history: &SessionHistory, question: &str) -> String {
    let mut sections = vec![SYSTEM_MESSAGE.to_string()];
    if let Some(block) = history_block(history) {
        sections.push(block);
    }
    sections.push("Now let us go!".to_string());
    sections.push(format!("Question: {question}"));
    sections.join("\n\n")
}

/// Renders retained turns, emitting only the fields each turn actually
/// has, one `Key: value` line per field.
fn history_block(history: &SessionHistory) -> Option<String> {
    if history.is_empty() {
        return None;
    }

    let turns = history
        .turns()
        .map(|turn| {
            let mut lines = vec![format!("Question: {}", turn.question)];
            if let Some(thought) = &turn.thought {
                lines.push(format!("Thought: {thought}"));
            }
            if let Some(action) = &turn.action {
                lines.push(format!("Action: {action}"));
            }
            if let Some(observation) = &turn.observation {
                lines.push(format!("Observation: {observation}"));
            }
            lines.push(format!("Answer: {}", turn.answer));
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n");

    Some(format!("{HISTORY_PREAMBLE}\n\n{turns}"))
}

/// Builds the answer-composition prompt: the backend must answer from the
/// supplied material only.
pub fn compose_answer_prompt(kind: PassageKind, body: &str, question: &str) -> String {
    let label = kind.label();
    format!(
        "Answer the question based only on the following {label}. \
         If the {label} does not contain the answer, say that you do not know.\n\n\
         {body}\n\n\
         Question: {question}\n\
         Answer:"
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::history::ConversationTurn;

    fn turn(question: &str, action: Option<&str>) -> ConversationTurn {
        ConversationTurn {
            question: question.to_string(),
            thought: Some("thinking".to_string()),
            action: action.map(str::to_string),
            observation: None,
            answer: "an answer".to_string(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn empty_history_renders_no_history_block() {
        let prompt = reason_prompt(&SessionHistory::default(), "What is two plus two?");
        assert!(!prompt.contains(HISTORY_PREAMBLE));
        assert!(prompt.ends_with("Question: What is two plus two?"));
    }

    #[test]
    fn history_block_emits_only_present_fields() {
        let mut history = SessionHistory::default();
        history.append(turn("first?", Some("lookup: terms")));
        history.append(turn("second?", None));

        let block = history_block(&history).expect("non-empty history renders a block");
        assert!(block.starts_with(HISTORY_PREAMBLE));
        assert!(block.contains(
            "Question: first?\nThought: thinking\nAction: lookup: terms\nAnswer: an answer"
        ));
        assert!(block.contains("Question: second?\nThought: thinking\nAnswer: an answer"));
        // the turns above carry no observation, so none may be rendered
        assert!(!block.contains("Observation:"));
    }

    #[test]
    fn composition_prompt_labels_the_material_kind() {
        let prompt = compose_answer_prompt(
            PassageKind::ExchangeRate,
            "As per today, 1 USD equals 0.9 EUR.",
            "What is the rate?",
        );
        assert!(prompt.contains("based only on the following exchange rate"));
        assert!(prompt.contains("As per today, 1 USD equals 0.9 EUR."));
        assert!(prompt.trim_end().ends_with("Answer:"));
    }
}
