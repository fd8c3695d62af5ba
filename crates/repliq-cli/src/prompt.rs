//! Interactive prompts: passwords and the accept confirmation.

use dialoguer::{Confirm, Password};

use repliq_engine::{ConfirmGate, Relationship, ReplError, Result};

/// Use the password from flags or environment, or ask on the terminal.
pub fn resolve_password(given: Option<&str>, user: &str, host: &str) -> Result<String> {
    if let Some(password) = given {
        return Ok(password.to_string());
    }
    Password::new()
        .with_prompt(format!("Enter password for {}@{}", user, host))
        .interact()
        .map_err(|e| ReplError::Configuration(format!("cannot read password: {}", e)))
}

/// Lines listing the relationships awaiting acceptance.
pub fn pending_lines(pending: &[Relationship]) -> Vec<String> {
    pending
        .iter()
        .map(|rel| {
            format!(
                "  {}  {} -> {}  (from {})",
                rel.id, rel.source_path, rel.target_path, rel.source_cluster_name
            )
        })
        .collect()
}

/// Terminal yes/no gate for `accept --confirm`.
pub struct TerminalGate;

impl ConfirmGate for TerminalGate {
    fn approve(&self, pending: &[Relationship]) -> Result<bool> {
        println!("Pending replication relationships:");
        for line in pending_lines(pending) {
            println!("{}", line);
        }
        Confirm::new()
            .with_prompt(format!("Accept {} relationship(s)?", pending.len()))
            .default(false)
            .interact()
            .map_err(|e| ReplError::Configuration(format!("cannot read confirmation: {}", e)))
    }
}
