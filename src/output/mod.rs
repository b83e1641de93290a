use crate::reconcile::ReconcileReport;
use std::io::{self, Write};
use std::path::Path;

/// Where the run wrote its outcome lines
pub struct LogLocations<'a> {
    pub not_found: &'a Path,
    pub renamed: &'a Path,
}

/// Print the end-of-run report.
pub fn display_summary(
    report: &ReconcileReport,
    logs: &LogLocations<'_>,
    writer: &mut impl Write,
) -> io::Result<()> {
    let counters = &report.counters;

    writeln!(writer)?;
    if report.dry_run {
        writeln!(writer, "========================================")?;
        writeln!(writer, "              DRY RUN")?;
        writeln!(writer, "========================================")?;
        writeln!(writer)?;
    }

    writeln!(writer, "Root folder: {} ({})", report.root.name, report.root.id)?;
    writeln!(writer, "Folders:     {}", report.folders_visited)?;
    writeln!(writer)?;

    if counters.total_images == 0 {
        writeln!(writer, "No images found.")?;
        return Ok(());
    }

    writeln!(writer, "Summary:")?;
    writeln!(writer, "  {} images processed", counters.total_images)?;
    if report.dry_run {
        writeln!(
            writer,
            "  {} images would be renamed",
            counters.matched_images()
        )?;
    } else {
        writeln!(writer, "  {} images renamed", counters.renamed_images)?;
    }
    writeln!(
        writer,
        "  {} images without a product",
        counters.not_found_images
    )?;
    if counters.retries_triggered > 0 {
        writeln!(writer, "  {} retries", counters.retries_triggered)?;
    }

    writeln!(writer)?;
    writeln!(writer, "Rename log:    {}", logs.renamed.display())?;
    writeln!(writer, "Not-found log: {}", logs.not_found.display())?;

    if report.dry_run {
        writeln!(writer)?;
        writeln!(writer, "Run without --dry to apply these changes.")?;
    }

    Ok(())
}
