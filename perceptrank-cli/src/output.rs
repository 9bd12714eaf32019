/// Output formatting: terminal leaderboards and JSON.
use anyhow::Result;
use perceptrank_core::{DimensionProgress, Dimensions, Summary};

/// Print one leaderboard per dimension.
pub fn print_table(summary: &Summary) {
    for dim in &summary.dimensions {
        let name_width = dim.items.iter().map(|i| i.item.len()).max().unwrap_or(5).max(5); // at least "Image"

        println!("\n== {} ({} judgments, {} covered) ==", dim.name, dim.judgments, dim.covered);
        println!(" # | {:<name_width$} |    Mean | Uncertainty | Conservative | Comparisons", "Image");
        println!("---|-{}-|---------|-------------|--------------|------------", "-".repeat(name_width));

        for (i, item) in dim.items.iter().enumerate() {
            println!(
                "{:>2} | {:<name_width$} | {:>7.3} | {:>11.3} | {:>12.3} | {:>11}",
                i + 1,
                item.item,
                item.mean,
                item.uncertainty,
                item.conservative,
                item.comparisons,
            );
        }
    }

    let status = if summary.completed { "complete" } else { "in progress" };
    match &summary.subject {
        Some(subject) => println!("\n{} judgments by {subject}, campaign {status}", summary.total_judgments),
        None => println!("\n{} judgments, campaign {status}", summary.total_judgments),
    }
}

/// Print the summary as JSON.
pub fn print_json(summary: &Summary) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

/// One status line: dimension name and coverage so far.
pub fn progress_line(dimensions: &Dimensions, progress: &DimensionProgress) -> String {
    let name = dimensions.name(progress.dimension).unwrap_or("?");
    format!(
        "[{} {}/{}] {}/{} covered, {} judged",
        name,
        progress.dimension + 1,
        dimensions.len(),
        progress.covered,
        progress.total,
        progress.judgments,
    )
}
