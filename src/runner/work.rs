//! Units of work the loop repeats.

use std::collections::HashMap;
use std::fmt;
use std::process::Command;
use std::sync::Arc;

/// A named action callable without arguments.
pub type Action = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

/// Actions selectable by `module:function` name.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Action>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, action: F)
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Arc::new(action));
    }

    pub fn get(&self, name: &str) -> Option<&Action> {
        self.actions.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .finish()
    }
}

/// What one invocation runs, decided by the shape of the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkDescriptor {
    /// `module:function`, looked up in the [`ActionRegistry`].
    Function(String),
    /// Text with whitespace, run as a shell snippet; a failing exit status is reported.
    Snippet(String),
    /// A single word, run through the shell; its exit status is not inspected.
    Command(String),
}

impl WorkDescriptor {
    /// `:` selects a function, otherwise whitespace selects a snippet,
    /// otherwise it is a command.
    pub fn parse(descriptor: &str) -> Self {
        if descriptor.contains(':') {
            Self::Function(descriptor.to_string())
        } else if descriptor.trim().contains(char::is_whitespace) {
            Self::Snippet(descriptor.to_string())
        } else {
            Self::Command(descriptor.to_string())
        }
    }

    /// Runs the work once. The error is the message to show the operator.
    pub fn invoke(&self, actions: &ActionRegistry) -> Result<(), String> {
        match self {
            Self::Function(name) => {
                let action = actions
                    .get(name)
                    .ok_or_else(|| format!("No action registered as \"{}\"", name))?;
                action()
            }
            Self::Snippet(code) => {
                let status = shell(code).status().map_err(|e| e.to_string())?;
                if status.success() {
                    Ok(())
                } else {
                    Err(format!("\"{}\" failed: {}", code, status))
                }
            }
            Self::Command(cmd) => shell(cmd).status().map(|_| ()).map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Display for WorkDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(s) | Self::Snippet(s) | Self::Command(s) => f.write_str(s),
        }
    }
}

fn shell(code: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(code);
    command
}
