use crate::checklist;
use crate::config::Preferences;
use crate::context::{LintSection, LintStatus, ReviewContext, ReviewSection};
use crate::diff::DiffSnapshot;
use minijinja::{context, Environment};
use std::fmt;

// ===================================================================
// Instruction templates
// ===================================================================

const CHECKLIST_TEMPLATE: &str = "\
Review findings are still open ({{ checklist }} remaining). Continue in this order:
1) Read {{ context_path }} with the Read tool
2) Fix every item listed in `review.checklist`
3) Remove each fixed item from `review.checklist`
4) Once the checklist is empty, the next stop moves on to lint fixes";

const REVIEW_TEMPLATE: &str = "\
Starting review of {{ targets }} changed file(s). Proceed as follows:
1) Launch the reviewer agent with the Task tool
2) The agent reviews the changes recorded in {{ context_path }} (`review.targets` and `review.patchUnified0`)
3) The agent lists its findings in `review.checklist` and fixes them, re-reviewing until the checklist is empty
4) Once the checklist is empty, set `lint.status` to 'in_progress'
5) The next stop moves on to lint fixes";

const LINT_TEMPLATE: &str = "\
Continue lint fixes:
1) Run the linters ({{ lint_tools }})
2) Fix the reported errors
3) Once they report zero errors, set `lint.status` in {{ context_path }} to 'done'
4) The next stop ends the session";

const UNKNOWN_TEMPLATE: &str = "The review state is unknown. Inspect {{ context_path }}.";

// ===================================================================
// Output: what the hook should emit
// ===================================================================

#[derive(Debug, PartialEq, Eq)]
pub enum StopDecision {
    /// Nothing left to do; let the assistant stop.
    Allow,
    /// Keep the assistant working on the next step.
    Block { reason: String },
}

// ===================================================================
// Error: a malformed instruction template
// ===================================================================

#[derive(Debug)]
pub enum DecisionError {
    TemplateRender(String),
}

impl fmt::Display for DecisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionError::TemplateRender(msg) => write!(f, "template render error: {msg}"),
        }
    }
}

impl std::error::Error for DecisionError {}

// ===================================================================
// State transition
// ===================================================================

/// True iff the diff is exactly what the previous document recorded.
pub fn review_unchanged(previous: &ReviewContext, snapshot: &DiffSnapshot) -> bool {
    previous.review.targets == snapshot.targets
        && previous.review.patch_unified0 == snapshot.patch
}

/// Build the next state document from a fresh diff and the previous one.
///
/// Targets and patch always come from `snapshot`. The checklist is the
/// previous one filtered to current targets. The lint status survives only
/// when the diff is unchanged; any change restarts it at `pending`.
pub fn next_context(
    previous: &ReviewContext,
    snapshot: DiffSnapshot,
    lint_tools: &[String],
    generated_at: String,
) -> ReviewContext {
    let status = if review_unchanged(previous, &snapshot) {
        previous.lint.status
    } else {
        LintStatus::Pending
    };
    let checklist = checklist::reconcile(&previous.review.checklist, &snapshot.targets);

    ReviewContext {
        generated_at,
        review: ReviewSection {
            targets: snapshot.targets,
            patch_unified0: snapshot.patch,
            checklist,
        },
        lint: LintSection {
            tools: lint_tools.to_vec(),
            status,
        },
    }
}

// ===================================================================
// Stop decision
// ===================================================================

pub fn should_allow_stop(ctx: &ReviewContext) -> bool {
    if ctx.review.targets.is_empty() {
        return true;
    }
    ctx.review.checklist.is_empty() && ctx.lint.status == LintStatus::Done
}

/// The instruction for the next required action. Only meaningful when
/// `should_allow_stop` is false.
pub fn generate_reason(
    ctx: &ReviewContext,
    context_path: &str,
    prefs: &Preferences,
) -> Result<String, DecisionError> {
    let overrides = &prefs.instructions;
    let template = if !ctx.review.checklist.is_empty() {
        overrides.checklist.as_deref().unwrap_or(CHECKLIST_TEMPLATE)
    } else {
        match ctx.lint.status {
            LintStatus::Pending => overrides.review.as_deref().unwrap_or(REVIEW_TEMPLATE),
            LintStatus::InProgress => overrides.lint.as_deref().unwrap_or(LINT_TEMPLATE),
            // Done with an empty checklist is an allowed stop.
            LintStatus::Done => UNKNOWN_TEMPLATE,
        }
    };
    render(template, ctx, context_path)
}

fn render(template: &str, ctx: &ReviewContext, context_path: &str) -> Result<String, DecisionError> {
    let env = Environment::new();
    let tmpl = env
        .template_from_str(template)
        .map_err(|e| DecisionError::TemplateRender(e.to_string()))?;
    tmpl.render(context! {
        context_path,
        lint_tools => ctx.lint.tools.join(", "),
        targets => ctx.review.targets.len(),
        checklist => ctx.review.checklist.len(),
    })
    .map_err(|e| DecisionError::TemplateRender(e.to_string()))
}

pub fn decide(
    ctx: &ReviewContext,
    context_path: &str,
    prefs: &Preferences,
) -> Result<StopDecision, DecisionError> {
    if should_allow_stop(ctx) {
        return Ok(StopDecision::Allow);
    }
    let reason = generate_reason(ctx, context_path, prefs)?;
    Ok(StopDecision::Block { reason })
}
