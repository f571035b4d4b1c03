//! Confirmation prompt seam.

use async_trait::async_trait;
use devstack_core::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Asks the operator a yes/no question.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, question: &str) -> Result<bool>;
}

/// Prompts on stderr and reads the answer from stdin. Anything but `y` or
/// `yes` declines; so does end of input.
#[derive(Debug, Clone, Default)]
pub struct StdinConfirm;

#[async_trait]
impl Confirm for StdinConfirm {
    async fn confirm(&self, question: &str) -> Result<bool> {
        {
            let mut stderr = std::io::stderr().lock();
            write!(stderr, "{} [y/N] ", question)?;
            stderr.flush()?;
        }

        let mut answer = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut answer)
            .await?;
        Ok(is_yes(&answer))
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
