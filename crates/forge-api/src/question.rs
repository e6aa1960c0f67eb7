//! Conditional question tree
//!
//! Input collection for a lifecycle stage is modeled as a tree of
//! [`QuestionNode`]s. Node kinds form a closed, tagged set so that the
//! traversal in `forge-core` stays independent of kind-specific behavior.
//! Trees are built fresh for every operation and never persisted.
//!
//! Option resolvers are pure functions of the answers collected so far;
//! validators may be asynchronous (they routinely probe the filesystem).

use crate::error::CoreError;
use crate::types::Json;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Answer set accumulated by one traversal
///
/// Maps question name to collected value. Consumed by the stage that follows
/// the traversal, then discarded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answers {
    map: Json,
}

impl Answers {
    /// Empty answer set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.map.insert(name.into(), value);
    }

    /// Look up an answer
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.map.get(name)
    }

    /// Look up a string answer
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.map.get(name).and_then(Value::as_str)
    }

    /// Look up a string-list answer (multi-select values)
    #[must_use]
    pub fn get_string_list(&self, name: &str) -> Option<Vec<String>> {
        self.map.get(name).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
    }

    /// Whether an answer exists for `name`
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Copy every answer from `other`, overwriting collisions
    pub fn extend_from(&mut self, other: &Answers) {
        for (k, v) in &other.map {
            self.map.insert(k.clone(), v.clone());
        }
    }

    /// Number of collected answers
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no answers were collected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// One selectable option of a select question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionItem {
    /// Stable identifier recorded as the answer
    pub id: String,
    /// Short label rendered by the prompt provider
    pub label: String,
    /// Longer explanation, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Opaque payload attached to the option (e.g. a sample download URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl OptionItem {
    /// Option with id and label
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            detail: None,
            data: None,
        }
    }

    /// Attach a detail line
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach an opaque payload
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Visibility condition of a node
///
/// Evaluated against the governing prior answer (the collected answer of the
/// nearest ancestor question node). A false condition skips the node and its
/// entire subtree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Governing answer equals this string
    Equals(String),
    /// Governing answer is a list containing this string
    Contains(String),
    /// Governing answer is a list containing any of these strings
    ContainsAny(Vec<String>),
    /// Governing answer is a list with at least this many items
    MinItems(usize),
}

impl Condition {
    /// Evaluate against a governing answer; `None` means no governing answer
    /// was collected, which never satisfies a condition.
    #[must_use]
    pub fn is_met(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else { return false };
        match self {
            Self::Equals(expected) => value.as_str() == Some(expected.as_str()),
            Self::Contains(item) => list_of(value).is_some_and(|l| l.contains(&item.as_str())),
            Self::ContainsAny(items) => list_of(value)
                .is_some_and(|l| items.iter().any(|item| l.contains(&item.as_str()))),
            Self::MinItems(min) => list_of(value).is_some_and(|l| l.len() >= *min),
        }
    }
}

fn list_of(value: &Value) -> Option<Vec<&str>> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(Value::as_str).collect())
}

/// Resolves the option set of a select question from prior answers
pub type OptionsResolver =
    Arc<dyn Fn(&Answers) -> Result<Vec<OptionItem>, CoreError> + Send + Sync>;

/// Validates a collected value; returns a message to re-prompt with, or
/// `None` when the value is accepted
pub type Validator =
    Arc<dyn Fn(Value, Answers) -> BoxFuture<'static, Result<Option<String>, CoreError>> + Send + Sync>;

/// Computes the value of a function node from prior answers, without
/// prompting the operator
pub type ValueFunction =
    Arc<dyn Fn(Answers) -> BoxFuture<'static, Result<Value, CoreError>> + Send + Sync>;

/// Kind of a question node (closed set)
#[derive(Clone)]
pub enum QuestionKind {
    /// Pure container; contributes no answer
    Group,
    /// Free-text input
    Text {
        /// Pre-filled default
        default: Option<String>,
    },
    /// Pick exactly one option
    SingleSelect {
        /// Static options; may be replaced by `dynamic_options`
        options: Vec<OptionItem>,
        /// Default option id
        default: Option<String>,
        /// Record the only option without prompting when exactly one remains
        skip_single_option: bool,
        /// Computed option set, resolved immediately before prompting
        dynamic_options: Option<OptionsResolver>,
    },
    /// Pick zero or more options
    MultiSelect {
        /// Static options; may be replaced by `dynamic_options`
        options: Vec<OptionItem>,
        /// Default option ids
        default: Vec<String>,
        /// Minimum number of selected items accepted
        min_items: Option<usize>,
        /// Computed option set, resolved immediately before prompting
        dynamic_options: Option<OptionsResolver>,
    },
    /// Folder or file path input
    Folder {
        /// Pre-filled default
        default: Option<String>,
    },
    /// Computes a value with a side effect; never prompts
    Function {
        /// The computation
        func: ValueFunction,
    },
}

impl fmt::Debug for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group => write!(f, "Group"),
            Self::Text { default } => f.debug_struct("Text").field("default", default).finish(),
            Self::SingleSelect {
                options,
                default,
                skip_single_option,
                dynamic_options,
            } => f
                .debug_struct("SingleSelect")
                .field("options", options)
                .field("default", default)
                .field("skip_single_option", skip_single_option)
                .field("dynamic", &dynamic_options.is_some())
                .finish(),
            Self::MultiSelect {
                options,
                default,
                min_items,
                dynamic_options,
            } => f
                .debug_struct("MultiSelect")
                .field("options", options)
                .field("default", default)
                .field("min_items", min_items)
                .field("dynamic", &dynamic_options.is_some())
                .finish(),
            Self::Folder { default } => f.debug_struct("Folder").field("default", default).finish(),
            Self::Function { .. } => write!(f, "Function"),
        }
    }
}

/// One node of a question tree
#[derive(Clone)]
pub struct QuestionNode {
    /// Answer key; unique within one traversal. Empty for groups.
    pub name: String,
    /// Title rendered by the prompt provider
    pub title: String,
    /// Node kind
    pub kind: QuestionKind,
    /// Visibility condition over the governing prior answer
    pub condition: Option<Condition>,
    /// Answer validator; a returned message re-prompts the same node
    pub validator: Option<Validator>,
    /// Ordered child nodes
    pub children: Vec<QuestionNode>,
}

impl fmt::Debug for QuestionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestionNode")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("kind", &self.kind)
            .field("condition", &self.condition)
            .field("validator", &self.validator.is_some())
            .field("children", &self.children)
            .finish()
    }
}

impl QuestionNode {
    /// Question node with a given kind
    #[must_use]
    pub fn new(name: impl Into<String>, title: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            kind,
            condition: None,
            validator: None,
            children: Vec::new(),
        }
    }

    /// Anonymous container node
    #[must_use]
    pub fn group() -> Self {
        Self::new("", "", QuestionKind::Group)
    }

    /// Gate this node (and its whole subtree) behind a condition
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Attach a validator
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Append a child node, builder style
    #[must_use]
    pub fn with_child(mut self, child: QuestionNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append a child node
    pub fn push(&mut self, child: QuestionNode) {
        self.children.push(child);
    }

    /// Whether this node is a pure container
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self.kind, QuestionKind::Group)
    }

    /// Whether this node contributes nothing to a traversal
    ///
    /// A plugin that declines to contribute must not leave a dangling
    /// conditional node; the composer drops nodes for which this is true.
    #[must_use]
    pub fn is_empty_contribution(&self) -> bool {
        self.is_group() && self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn condition_equals() {
        let cond = Condition::Equals("Azure".to_string());
        assert!(cond.is_met(Some(&json!("Azure"))));
        assert!(!cond.is_met(Some(&json!("SPFx"))));
        assert!(!cond.is_met(None));
    }

    #[test]
    fn condition_contains() {
        let cond = Condition::Contains("Tab".to_string());
        assert!(cond.is_met(Some(&json!(["Tab", "Bot"]))));
        assert!(!cond.is_met(Some(&json!(["Bot"]))));
        assert!(!cond.is_met(Some(&json!("Tab"))));
    }

    #[test]
    fn condition_contains_any() {
        let cond = Condition::ContainsAny(vec!["Bot".to_string(), "MessagingExtension".to_string()]);
        assert!(cond.is_met(Some(&json!(["Tab", "Bot"]))));
        assert!(!cond.is_met(Some(&json!(["Tab"]))));
    }

    #[test]
    fn condition_min_items() {
        let cond = Condition::MinItems(1);
        assert!(cond.is_met(Some(&json!(["Tab"]))));
        assert!(!cond.is_met(Some(&json!([]))));
    }

    #[test]
    fn empty_group_is_empty_contribution() {
        assert!(QuestionNode::group().is_empty_contribution());

        let non_empty = QuestionNode::group().with_child(QuestionNode::new(
            "q",
            "Q",
            QuestionKind::Text { default: None },
        ));
        assert!(!non_empty.is_empty_contribution());
    }

    #[test]
    fn answers_accessors() {
        let mut answers = Answers::new();
        answers.insert("capabilities", json!(["Tab", "Bot"]));
        answers.insert("host-type", json!("Azure"));

        assert_eq!(answers.get_str("host-type"), Some("Azure"));
        assert_eq!(
            answers.get_string_list("capabilities").unwrap(),
            vec!["Tab".to_string(), "Bot".to_string()]
        );
        assert!(answers.contains("capabilities"));
        assert!(!answers.contains("missing"));
    }
}
