use crate::types::{Excerpt, Stipulation};
use serde::{Deserialize, Serialize};

const NO_MATCH_NOTICE: &str = "Note: no document section matched this rule with confidence. \
The text below is the start of the document; answer UNCLEAR unless it clearly decides the rule.";

/// Everything a backend needs to judge one stipulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgementPrompt {
    pub stipulation_id: String,
    pub category: String,
    pub description: String,
    pub excerpt: String,
    pub section: Option<String>,
    pub confident_match: bool,
}

impl JudgementPrompt {
    pub fn new(stipulation: &Stipulation, excerpt: &Excerpt) -> Self {
        Self {
            stipulation_id: stipulation.id.clone(),
            category: stipulation.category.clone(),
            description: stipulation.description.clone(),
            excerpt: excerpt.text.clone(),
            section: excerpt.section_label(),
            confident_match: excerpt.is_confident(),
        }
    }

    /// User message sent to the model
    pub fn render(&self) -> String {
        let mut prompt = String::from(
            "You are a CLO compliance expert. Analyze the following document section \
and determine if it complies with the given rule.\n\n",
        );

        if !self.confident_match {
            prompt.push_str(NO_MATCH_NOTICE);
            prompt.push_str("\n\n");
        }

        match &self.section {
            Some(section) => prompt.push_str(&format!("Document Section ({section}):\n")),
            None => prompt.push_str("Document Section:\n"),
        }
        prompt.push_str(self.excerpt.trim());
        prompt.push_str("\n\n");

        prompt.push_str("Rule/Stipulation:\n");
        prompt.push_str(&format!("Category: {}\n", self.category));
        prompt.push_str(&format!("Requirement: {}\n\n", self.description));

        prompt.push_str(
            "Please provide:\n\
1. Compliance Status: exactly one of PASS, FAIL or UNCLEAR\n\
2. Explanation: one paragraph of reasoning for your determination\n\
3. Relevant Excerpts: quote the text from the document that supports your conclusion\n",
        );
        prompt
    }
}
