//! Query shapes for the semantic page-query boundary.
//!
//! A [`QueryShape`] names the fields and controls the scraper wants located on
//! a page. The core never inspects markup; it hands a shape to the driver and
//! reads back either JSON data or element handles keyed by dotted path
//! (`login_form.email_input`).
//!
//! Shapes render (via `Display`) to the AgentQL query syntax:
//!
//! ```text
//! {
//!     job_posts[] {
//!         org_name
//!         contract_type(Contract or Full time)
//!     }
//! }
//! ```

use std::fmt;

/// One named node in a query shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryField {
    pub name: String,
    /// Node matches a list of items (`name[]`).
    pub list: bool,
    /// Free-text hint narrowing what the node should match.
    pub hint: Option<String>,
    pub children: Vec<QueryField>,
}

impl QueryField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            list: false,
            hint: None,
            children: Vec::new(),
        }
    }

    /// Mark this node as a list.
    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_child(mut self, child: QueryField) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn collect_leaf_paths(&self, prefix: &str, out: &mut Vec<String>) {
        let path = if prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", prefix, self.name)
        };

        if self.is_leaf() {
            out.push(path);
        } else {
            for child in &self.children {
                child.collect_leaf_paths(&path, out);
            }
        }
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "    ".repeat(depth);
        write!(f, "{}{}", indent, self.name)?;
        if self.list {
            f.write_str("[]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "({})", hint)?;
        }

        if self.is_leaf() {
            return writeln!(f);
        }

        writeln!(f, " {{")?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        writeln!(f, "{}}}", indent)
    }
}

/// A complete query: one or more top-level fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryShape {
    fields: Vec<QueryField>,
}

impl QueryShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: QueryField) -> Self {
        self.fields.push(field);
        self
    }

    /// Name of the first top-level field, used for logging.
    pub fn root_name(&self) -> &str {
        self.fields.first().map(|f| f.name.as_str()).unwrap_or("")
    }

    /// Dotted paths of every leaf, in declaration order.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        for field in &self.fields {
            field.collect_leaf_paths("", &mut out);
        }
        out
    }
}

impl fmt::Display for QueryShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        for field in &self.fields {
            field.write_indented(f, 1)?;
        }
        write!(f, "}}")
    }
}

/// The fixed shapes the scraper issues, and the paths it reads back.
pub mod shapes {
    use super::{QueryField, QueryShape};

    pub const EMAIL_INPUT: &str = "login_form.email_input";
    pub const CONTINUE_BUTTON: &str = "login_form.continue_btn";
    pub const VERIFY_CHECKBOX: &str = "login_form.verify_not_robot_checkbox";
    pub const PASSWORD_INPUT: &str = "login_form.password_input";
    pub const NEXT_PAGE_BUTTON: &str = "pagination.next_page_btn";

    /// Key of the record list in a [`job_posts`] response.
    pub const JOB_POSTS: &str = "job_posts";

    pub fn email_form() -> QueryShape {
        QueryShape::new().field(
            QueryField::new("login_form")
                .with_child(QueryField::new("email_input"))
                .with_child(QueryField::new("continue_btn")),
        )
    }

    pub fn verify_human() -> QueryShape {
        QueryShape::new().field(
            QueryField::new("login_form").with_child(QueryField::new("verify_not_robot_checkbox")),
        )
    }

    pub fn password_form() -> QueryShape {
        QueryShape::new().field(
            QueryField::new("login_form")
                .with_child(QueryField::new("password_input"))
                .with_child(QueryField::new("continue_btn")),
        )
    }

    pub fn job_posts() -> QueryShape {
        QueryShape::new().field(
            QueryField::new(JOB_POSTS)
                .list()
                .with_child(QueryField::new("org_name"))
                .with_child(QueryField::new("job_title"))
                .with_child(QueryField::new("salary"))
                .with_child(QueryField::new("location"))
                .with_child(QueryField::new("contract_type").with_hint("Contract or Full time"))
                .with_child(
                    QueryField::new("location_type").with_hint("remote or on-site or hybrid"),
                )
                .with_child(QueryField::new("date_posted")),
        )
    }

    pub fn pagination() -> QueryShape {
        QueryShape::new()
            .field(QueryField::new("pagination").with_child(QueryField::new("next_page_btn")))
    }
}
