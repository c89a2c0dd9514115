use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use tracing::{debug, info};

use crate::config::{HookConfig, STATE_DIR};
use crate::context;
use crate::decision::{self, StopDecision};
use crate::diff;
use crate::types::HookOutput;

/// One stop-hook evaluation against a resolved project.
pub struct Gate {
    config: HookConfig,
}

impl Gate {
    pub fn new(config: HookConfig) -> Self {
        Self { config }
    }

    /// Collect the diff, rebuild and persist the state document, then decide
    /// whether the assistant may stop.
    ///
    /// The document is written before the decision is rendered, so a failing
    /// instruction template still leaves an up-to-date document behind.
    pub fn run(&self) -> Result<HookOutput> {
        let config = &self.config;
        let prefs = &config.prefs;

        let snapshot = diff::collect(&config.root, &prefs.reference, Path::new(STATE_DIR));
        debug!(
            targets = snapshot.targets.len(),
            patch_bytes = snapshot.patch.len(),
            "collected diff"
        );

        let previous = context::load(&config.state_path);
        let ctx = decision::next_context(
            &previous,
            snapshot,
            &prefs.lint_tools,
            context::timestamp(Utc::now()),
        );
        context::save(&config.state_path, &ctx)?;

        let decision = decision::decide(&ctx, &config.display_state_path(), prefs)?;
        info!(
            targets = ctx.review.targets.len(),
            checklist = ctx.review.checklist.len(),
            lint = ?ctx.lint.status,
            allow = decision == StopDecision::Allow,
            "stop evaluated"
        );
        Ok(match decision {
            StopDecision::Allow => HookOutput::allow(),
            StopDecision::Block { reason } => HookOutput::block(reason),
        })
    }
}
