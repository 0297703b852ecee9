//! UI context for detecting interactive vs CI environments

use std::io::IsTerminal;

/// UI context that determines output behavior
#[derive(Debug, Clone)]
pub struct UiContext {
    /// Whether running in an interactive terminal
    interactive: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        Self {
            interactive: interactive_session(
                std::io::stdout().is_terminal(),
                std::io::stdin().is_terminal(),
                ci_environment(),
            ),
        }
    }

    /// Create a non-interactive context (for testing or explicit CI mode)
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    /// Check if we're in an interactive terminal
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Check if we should use fancy output (spinners, colors)
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}

/// A session is interactive only when both stdio ends are terminals.
///
/// Lockfiles and path snippets stream over stdin and stdout, so a piped
/// end means this process is part of a pipeline and must not render
/// spinners or progress into it.
fn interactive_session(stdout_tty: bool, stdin_tty: bool, ci: bool) -> bool {
    stdout_tty && stdin_tty && !ci
}

/// Check for common CI environment indicators
fn ci_environment() -> bool {
    const CI_VARS: [&str; 7] = [
        "CI",
        "GITHUB_ACTIONS",
        "GITLAB_CI",
        "CIRCLECI",
        "TRAVIS",
        "JENKINS_URL",
        "BUILDKITE",
    ];
    CI_VARS.iter().any(|var| std::env::var(var).is_ok())
}
