//! Section schemas: which fields one repeating item carries and how they
//! are named on the backend.

use anyhow::{bail, Result};

/// One field of a repeating item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Key in the client-side item record (e.g. "question")
    pub key: &'static str,

    /// Label used in element names (e.g. "Question" in "FAQ 1 - Question")
    pub label: &'static str,

    /// Backend element type ("text", "textarea", "image", ...)
    pub element_type: &'static str,

    /// Must be non-empty in the default language before save
    pub required: bool,

    /// Maximum length in characters, checked for every language
    pub max_length: Option<usize>,
}

impl FieldSpec {
    pub const fn text(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            element_type: "text",
            required: false,
            max_length: None,
        }
    }

    pub fn with_type(mut self, element_type: &'static str) -> Self {
        self.element_type = element_type;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }
}

/// Shape of one repeating section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSchema {
    /// Element name prefix (e.g. "FAQ")
    pub prefix: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl SectionSchema {
    pub fn new(prefix: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self { prefix, fields }
    }

    /// Number of content elements backing one item.
    pub fn fields_per_item(&self) -> usize {
        self.fields.len()
    }

    /// Position of a field by its element-name label (case-insensitive).
    pub fn position_of_label(&self, label: &str) -> Option<usize> {
        let label = label.trim();
        self.fields
            .iter()
            .position(|f| f.label.eq_ignore_ascii_case(label))
    }

    pub fn faq() -> Self {
        Self::new(
            "FAQ",
            vec![
                FieldSpec::text("question", "Question").required(),
                FieldSpec::text("answer", "Answer").with_type("textarea"),
            ],
        )
    }

    pub fn benefits() -> Self {
        Self::new(
            "Benefit",
            vec![
                FieldSpec::text("icon", "Icon").with_type("image"),
                FieldSpec::text("title", "Title").required(),
                FieldSpec::text("description", "Description").with_type("textarea"),
            ],
        )
    }

    pub fn process_steps() -> Self {
        Self::new(
            "Step",
            vec![
                FieldSpec::text("icon", "Icon").with_type("image"),
                FieldSpec::text("title", "Title").required(),
                FieldSpec::text("description", "Description").with_type("textarea"),
            ],
        )
    }

    pub fn comments() -> Self {
        Self::new(
            "Comment",
            vec![
                FieldSpec::text("name", "Name").required(),
                FieldSpec::text("role", "Role"),
                FieldSpec::text("comment", "Comment").with_type("textarea"),
            ],
        )
    }

    pub fn team_navigation() -> Self {
        Self::new(
            "Team Nav",
            vec![
                FieldSpec::text("name", "Name").with_max_length(60),
                FieldSpec::text("url", "Url"),
            ],
        )
    }

    /// Look up a built-in schema by name ("faq", "benefits", ...).
    pub fn by_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "faq" | "faqs" => Ok(Self::faq()),
            "benefits" => Ok(Self::benefits()),
            "process_steps" | "steps" => Ok(Self::process_steps()),
            "comments" => Ok(Self::comments()),
            "team_navigation" | "team_nav" => Ok(Self::team_navigation()),
            other => bail!("Unknown section schema: '{}'", other),
        }
    }
}
