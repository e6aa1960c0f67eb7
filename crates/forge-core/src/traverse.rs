//! Question-tree traversal
//!
//! Depth-first, pre-order, single-threaded per call. A node whose condition
//! evaluates false is skipped together with its entire subtree; nothing
//! inside a skipped subtree is ever prompted. Validation failures re-prompt
//! the same node. Cancellation discards the whole traversal.

use forge_api::{
    Answers, CoreError, PromptKind, PromptRequest, PromptResponse, QuestionKind, QuestionNode,
    UserInteraction,
};
use serde_json::Value;

/// Terminal outcome of a traversal
#[derive(Debug)]
pub enum TraverseOutcome {
    /// Every effective node was answered
    Completed(Answers),
    /// The operator aborted; no answers are surfaced
    Cancelled,
}

enum Visit {
    Answered,
    Cancelled,
}

/// Walk the tree and collect an answer set
///
/// `preset` answers (e.g. from CLI flags) are consumed instead of prompting,
/// after passing the node's validator.
pub async fn traverse(
    root: &QuestionNode,
    preset: &Answers,
    ui: &dyn UserInteraction,
) -> Result<TraverseOutcome, CoreError> {
    let mut answers = Answers::new();
    // Stack entries carry the answer key of the nearest ancestor question
    // node; conditions are evaluated against that governing answer.
    let mut stack: Vec<(&QuestionNode, Option<String>)> = vec![(root, None)];

    while let Some((node, governing)) = stack.pop() {
        if let Some(condition) = &node.condition {
            let value = governing.as_deref().and_then(|key| answers.get(key));
            if !condition.is_met(value) {
                tracing::debug!(node = %node.name, "condition not met, skipping subtree");
                continue;
            }
        }

        if !node.is_group() {
            match visit(node, &mut answers, preset, ui).await? {
                Visit::Answered => {}
                Visit::Cancelled => return Ok(TraverseOutcome::Cancelled),
            }
        }

        let next_governing = if node.is_group() {
            governing
        } else {
            Some(node.name.clone())
        };
        for child in node.children.iter().rev() {
            stack.push((child, next_governing.clone()));
        }
    }

    Ok(TraverseOutcome::Completed(answers))
}

async fn visit(
    node: &QuestionNode,
    answers: &mut Answers,
    preset: &Answers,
    ui: &dyn UserInteraction,
) -> Result<Visit, CoreError> {
    // Function nodes compute their value; they never prompt.
    if let QuestionKind::Function { func } = &node.kind {
        let value = func(answers.clone()).await?;
        answers.insert(node.name.clone(), value);
        return Ok(Visit::Answered);
    }

    if let Some(value) = preset.get(&node.name) {
        if let Some(message) = validate(node, value.clone(), answers).await? {
            return Err(CoreError::InvalidInput(message));
        }
        answers.insert(node.name.clone(), value.clone());
        return Ok(Visit::Answered);
    }

    let kind = resolve_prompt_kind(node, answers)?;

    // Single-option selects marked skip_single_option record the only
    // option without prompting.
    if let QuestionKind::SingleSelect {
        skip_single_option: true,
        ..
    } = &node.kind
    {
        if let PromptKind::SingleSelect { options, .. } = &kind {
            if options.len() == 1 {
                answers.insert(node.name.clone(), Value::String(options[0].id.clone()));
                return Ok(Visit::Answered);
            }
        }
    }

    let mut request = PromptRequest {
        name: node.name.clone(),
        title: node.title.clone(),
        validation_message: None,
        kind,
    };

    loop {
        match ui.prompt(&request).await? {
            PromptResponse::Cancel => return Ok(Visit::Cancelled),
            PromptResponse::Answer(value) => {
                if let Some(message) = validate(node, value.clone(), answers).await? {
                    request.validation_message = Some(message);
                    continue;
                }
                answers.insert(node.name.clone(), value);
                return Ok(Visit::Answered);
            }
        }
    }
}

fn resolve_prompt_kind(node: &QuestionNode, answers: &Answers) -> Result<PromptKind, CoreError> {
    match &node.kind {
        QuestionKind::Group | QuestionKind::Function { .. } => {
            unreachable!("groups and function nodes are never prompted")
        }
        QuestionKind::Text { default } => Ok(PromptKind::Text {
            default: default.clone(),
        }),
        QuestionKind::Folder { default } => Ok(PromptKind::Folder {
            default: default.clone(),
        }),
        QuestionKind::SingleSelect {
            options,
            default,
            dynamic_options,
            ..
        } => {
            let options = match dynamic_options {
                Some(resolver) => resolver(answers)?,
                None => options.clone(),
            };
            if options.is_empty() {
                return Err(CoreError::Plugin(format!(
                    "question '{}' resolved an empty option set",
                    node.name
                )));
            }
            Ok(PromptKind::SingleSelect {
                options,
                default: default.clone(),
            })
        }
        QuestionKind::MultiSelect {
            options,
            default,
            dynamic_options,
            ..
        } => {
            let options = match dynamic_options {
                Some(resolver) => resolver(answers)?,
                None => options.clone(),
            };
            if options.is_empty() {
                return Err(CoreError::Plugin(format!(
                    "question '{}' resolved an empty option set",
                    node.name
                )));
            }
            Ok(PromptKind::MultiSelect {
                options,
                default: default.clone(),
            })
        }
    }
}

async fn validate(
    node: &QuestionNode,
    value: Value,
    answers: &Answers,
) -> Result<Option<String>, CoreError> {
    if let QuestionKind::MultiSelect {
        min_items: Some(min),
        ..
    } = &node.kind
    {
        let count = value.as_array().map_or(0, Vec::len);
        if count < *min {
            return Ok(Some(format!("select at least {min} item(s)")));
        }
    }
    if let Some(validator) = &node.validator {
        return validator(value, answers.clone()).await;
    }
    Ok(None)
}
