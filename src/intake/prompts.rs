//! Prompts sent to the generation service during intake.

/// Prompt asking for a one-sentence, encouraging acknowledgment of an answer.
pub fn acknowledgment_prompt(question: &str, answer: &str) -> String {
    format!(
        "You are a kind assistant helping a parent of an autistic child. \
         The parent answered this question:\n\
         Q: {question}\n\
         A: {answer}\n\
         Reply with a short, kind, and encouraging sentence showing you understand."
    )
}

/// Fixed closing instructions of the full-plan prompt.
pub const PLAN_INSTRUCTIONS: &str = "\
Generate a 7-day table (Monday to Sunday) with columns: Morning, Afternoon, Evening, Night. \
Each cell should contain warm, autism-friendly structured activities. \
Follow with a brief narrative summary per day.
Avoid generic advice. Be caring and personalized.";

/// Prompt for the full weekly plan, built from every question/answer pair in
/// asking order.
pub fn plan_prompt(name: &str, age: &str, pairs: &[(String, String)]) -> String {
    let mut prompt = format!(
        "Create a detailed weekly wellness plan for an autistic child named {name}, aged {age}.\n\n"
    );
    for (question, answer) in pairs {
        prompt.push_str(question);
        prompt.push_str("\nUser: ");
        prompt.push_str(answer);
        prompt.push_str("\n\n");
    }
    prompt.push_str(PLAN_INSTRUCTIONS);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::questions::render_all;

    #[test]
    fn acknowledgment_embeds_question_and_answer() {
        let prompt = acknowledgment_prompt(
            "How does Maya behave in public settings?",
            "She covers her ears in shops",
        );
        assert!(prompt.contains("Q: How does Maya behave in public settings?"));
        assert!(prompt.contains("A: She covers her ears in shops"));
        assert!(prompt.contains("short, kind, and encouraging sentence"));
    }

    #[test]
    fn plan_prompt_pairs_in_order() {
        let questions = render_all("Maya");
        let pairs: Vec<(String, String)> = questions
            .iter()
            .enumerate()
            .map(|(i, q)| (q.clone(), format!("answer-{i}")))
            .collect();

        let prompt = plan_prompt("Maya", "5", &pairs);
        assert!(prompt.starts_with(
            "Create a detailed weekly wellness plan for an autistic child named Maya, aged 5."
        ));

        let mut cursor = 0;
        for (i, question) in questions.iter().enumerate() {
            let block = format!("{question}\nUser: answer-{i}");
            let found = prompt[cursor..]
                .find(&block)
                .unwrap_or_else(|| panic!("missing or out of order: {block}"));
            cursor += found + block.len();
        }
        assert!(prompt.ends_with(PLAN_INSTRUCTIONS));
    }

    #[test]
    fn plan_instructions_name_every_column() {
        for column in ["Morning", "Afternoon", "Evening", "Night"] {
            assert!(PLAN_INSTRUCTIONS.contains(column));
        }
        assert!(PLAN_INSTRUCTIONS.contains("7-day"));
        assert!(PLAN_INSTRUCTIONS.contains("Avoid generic advice"));
    }
}
