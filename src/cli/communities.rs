//! Communities command - list the built-in dataset families

use anyhow::Result;
use console::style;
use std::path::Path;

use bellwether::data::{DirectoryProvider, KNOWN_COMMUNITIES};

pub fn run(root: &Path) -> Result<()> {
    let provider = DirectoryProvider::new(root);
    println!("\n{} (data root: {})\n", style("Communities").bold(), root.display());

    for known in KNOWN_COMMUNITIES {
        let dir = provider.community_dir(known);
        let status = if dir.is_dir() {
            style("✓ present").green()
        } else {
            style("✗ missing").red()
        };
        println!(
            "  {:<8} {:<10} {}",
            style(known.name).cyan(),
            known.dir,
            status
        );
        println!("           {}", style(known.projects.join(", ")).dim());
    }

    println!(
        "\nOther directories under the data root are searched with every sub-directory as a project."
    );
    Ok(())
}
