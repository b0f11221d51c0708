//! Requirement model shared by the parser and the emitters

pub mod parser;

use serde::{Deserialize, Serialize};

pub use parser::{parse_requirements, HeadingParser, ResponseParser};

/// Heading literal the model is asked to put above functional requirements
pub const FUNCTIONAL_HEADING: &str = "**Functional Requirements**";

/// Heading literal the model is asked to put above non-functional requirements
pub const NON_FUNCTIONAL_HEADING: &str = "**Non-Functional Requirements**";

pub const NO_FUNCTIONAL_PLACEHOLDER: &str = "No functional requirements found.";
pub const NO_NON_FUNCTIONAL_PLACEHOLDER: &str = "No non-functional requirements found.";

/// Requirement category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementCategory {
    Functional,
    NonFunctional,
}

impl RequirementCategory {
    /// Categories in emission order
    pub const ALL: [RequirementCategory; 2] = [Self::Functional, Self::NonFunctional];

    /// Value of the spreadsheet `Type` column
    pub fn label(&self) -> &'static str {
        match self {
            Self::Functional => "Functional",
            Self::NonFunctional => "Non-Functional",
        }
    }

    /// Section heading used in the generated document
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Functional => "Functional Requirements",
            Self::NonFunctional => "Non-Functional Requirements",
        }
    }

    /// Marker searched for in the model reply
    pub fn heading_literal(&self) -> &'static str {
        match self {
            Self::Functional => FUNCTIONAL_HEADING,
            Self::NonFunctional => NON_FUNCTIONAL_HEADING,
        }
    }

    /// Line substituted when the reply has nothing for this category
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Functional => NO_FUNCTIONAL_PLACEHOLDER,
            Self::NonFunctional => NO_NON_FUNCTIONAL_PLACEHOLDER,
        }
    }
}

/// Requirements split by category, each list in reply order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementSet {
    pub functional: Vec<String>,
    pub non_functional: Vec<String>,
}

impl RequirementSet {
    pub fn new(functional: Vec<String>, non_functional: Vec<String>) -> Self {
        Self {
            functional,
            non_functional,
        }
    }

    pub fn get(&self, category: RequirementCategory) -> &[String] {
        match category {
            RequirementCategory::Functional => &self.functional,
            RequirementCategory::NonFunctional => &self.non_functional,
        }
    }

    /// All requirements, functional first, each with its category
    pub fn rows(&self) -> impl Iterator<Item = (RequirementCategory, &str)> + '_ {
        RequirementCategory::ALL.into_iter().flat_map(move |category| {
            self.get(category)
                .iter()
                .map(move |requirement| (category, requirement.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        self.functional.len() + self.non_functional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functional.is_empty() && self.non_functional.is_empty()
    }
}
