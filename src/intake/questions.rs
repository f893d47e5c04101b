//! The fixed question sequence asked after the introduction.

/// Templates in asking order. `{name}` is replaced with the child's name.
pub const QUESTION_TEMPLATES: [&str; 5] = [
    "How does {name} behave in public settings?",
    "What are {name}'s favorite activities or interests?",
    "Does {name} follow a daily routine already?",
    "Is {name} sensitive to any sensory inputs (light, noise, texture)?",
    "Are there specific goals you'd like to achieve for {name} through this plan?",
];

pub const QUESTION_COUNT: usize = QUESTION_TEMPLATES.len();

/// Render question `index` for `name`, or `None` past the end.
pub fn render_question(index: usize, name: &str) -> Option<String> {
    QUESTION_TEMPLATES
        .get(index)
        .map(|template| template.replace("{name}", name))
}

/// Every question rendered for `name`, in order.
pub fn render_all(name: &str) -> Vec<String> {
    QUESTION_TEMPLATES
        .iter()
        .map(|template| template.replace("{name}", name))
        .collect()
}
