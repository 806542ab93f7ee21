use clap::Args;

use crate::diagnostics::Diagnostics;

/// Show the background error log
#[derive(Args)]
pub struct LogCommand {
    /// Clear the log instead of printing it
    #[arg(long)]
    pub clear: bool,
}

impl LogCommand {
    pub fn run(&self, diagnostics: &Diagnostics) -> Result<(), Box<dyn std::error::Error>> {
        if self.clear {
            diagnostics.clear()?;
            println!("Error log cleared.");
            return Ok(());
        }

        let entries = diagnostics.entries()?;
        if entries.is_empty() {
            println!("No errors logged.");
            return Ok(());
        }

        for entry in entries {
            match &entry.pathname {
                Some(pathname) => {
                    println!("{} [{}] {}", entry.time.to_rfc3339(), pathname, entry.error)
                }
                None => println!("{} {}", entry.time.to_rfc3339(), entry.error),
            }
        }
        Ok(())
    }
}
