//! Human-readable run report.

use std::fmt::Write;

use pipeline_engine::{PipelineReport, RunOutcome};

/// Render the report as the boxed summary printed after `run`
pub fn render_summary(report: &PipelineReport) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_summary(&mut out, report);
    out
}

/// Print detailed summary
pub fn print_summary(report: &PipelineReport) {
    println!("{}", render_summary(report));
}

fn write_summary(out: &mut String, report: &PipelineReport) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "╔══════════════════════════════════════════════════════════════╗")?;
    writeln!(out, "║                    Pipeline Statistics                       ║")?;
    writeln!(out, "╚══════════════════════════════════════════════════════════════╝")?;
    writeln!(out)?;

    writeln!(out, "📊 Overview")?;
    writeln!(out, "   ├─ Outcome: {}", report.outcome.label())?;
    if let RunOutcome::Failed(failure) = &report.outcome {
        writeln!(out, "   ├─ Failure: {failure}")?;
    }
    writeln!(out, "   ├─ Duration: {:.2}s", report.duration.as_secs_f64())?;
    writeln!(out, "   ├─ Blocks generated: {}", report.items_generated)?;
    if let Some(delivered) = report.items_delivered {
        writeln!(out, "   ├─ Blocks delivered: {delivered}")?;
    }
    writeln!(out, "   └─ Throughput: {:.2} blocks/s", report.throughput())?;

    for stage in &report.stages {
        writeln!(out)?;
        writeln!(out, "⚙️  {}", stage.name)?;
        writeln!(
            out,
            "   ├─ Exit: {}",
            stage.exit.map_or("running", |exit| exit.label())
        )?;
        writeln!(
            out,
            "   ├─ Received / succeeded / failed: {} / {} / {}",
            stage.received, stage.succeeded, stage.failed
        )?;
        writeln!(out, "   ├─ Forwarded: {}", stage.forwarded)?;
        writeln!(
            out,
            "   ├─ Errors reported / dropped: {} / {}",
            stage.errors_reported, stage.errors_dropped
        )?;
        let latency = &stage.latency_ms;
        writeln!(
            out,
            "   └─ Latency (ms): mean {:.1}, std {:.1}, min {:.1}, max {:.1}",
            latency.mean, latency.std_dev, latency.min, latency.max
        )?;
    }

    Ok(())
}
