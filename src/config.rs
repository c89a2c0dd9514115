use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory, relative to the project root, holding the state document.
pub const STATE_DIR: &str = ".claude/review";

const STATE_FILENAME: &str = "context.json";
const PREFS_FILENAME: &str = "review-gate.toml";

const DEFAULT_REFERENCE: &str = "HEAD";
const DEFAULT_LINT_TOOLS: &[&str] = &["eslint", "ruff"];

/// Optional overrides for the instruction templates emitted on a blocked
/// stop. Each is a minijinja template; see `decision` for the variables.
///
/// ```toml
/// [instructions]
/// lint = "Run {{ lint_tools }} and update {{ context_path }}"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InstructionTemplates {
    #[serde(default)]
    pub checklist: Option<String>,
    #[serde(default)]
    pub review: Option<String>,
    #[serde(default)]
    pub lint: Option<String>,
}

/// User-facing preferences stored in `.claude/review/review-gate.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Preferences {
    /// Revision the working tree is diffed against.
    #[serde(default = "default_reference")]
    pub reference: String,

    /// Linter names recorded in `lint.tools` and quoted in instructions.
    #[serde(default = "default_lint_tools")]
    pub lint_tools: Vec<String>,

    #[serde(default)]
    pub instructions: InstructionTemplates,
}

fn default_reference() -> String {
    DEFAULT_REFERENCE.into()
}

fn default_lint_tools() -> Vec<String> {
    DEFAULT_LINT_TOOLS.iter().map(|s| s.to_string()).collect()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            reference: default_reference(),
            lint_tools: default_lint_tools(),
            instructions: InstructionTemplates::default(),
        }
    }
}

impl Preferences {
    /// Load preferences from `<state_dir>/review-gate.toml`.
    ///
    /// A missing file yields defaults and is not created. Missing keys in an
    /// existing file are filled in with defaults via serde.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join(PREFS_FILENAME);
        match fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("parsing {}", path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }
}

/// Paths and preferences for one hook invocation, resolved once at startup.
#[derive(Debug, Clone)]
pub struct HookConfig {
    pub root: PathBuf,
    pub state_path: PathBuf,
    pub prefs: Preferences,
}

impl HookConfig {
    /// Build a config rooted at `root`, loading any preferences file.
    pub fn load(root: PathBuf) -> Result<Self> {
        let state_dir = root.join(STATE_DIR);
        let prefs = Preferences::load(&state_dir)?;
        Ok(Self::with_prefs(root, prefs))
    }

    pub fn with_prefs(root: PathBuf, prefs: Preferences) -> Self {
        let state_path = root.join(STATE_DIR).join(STATE_FILENAME);
        Self {
            root,
            state_path,
            prefs,
        }
    }

    /// The state document path relative to the project root, `/`-separated,
    /// as quoted in instructions to the agent.
    pub fn display_state_path(&self) -> String {
        format!("{STATE_DIR}/{STATE_FILENAME}")
    }
}

/// Pick the project root: explicit flag or `CLAUDE_PROJECT_DIR` first, then
/// the `cwd` reported in the hook payload, then the process directory.
pub fn resolve_root(explicit: Option<&Path>, payload_cwd: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = explicit.filter(|d| !d.as_os_str().is_empty()) {
        return Ok(dir.to_path_buf());
    }
    if let Some(cwd) = payload_cwd {
        return Ok(PathBuf::from(cwd));
    }
    std::env::current_dir().context("reading current directory")
}
