use std::io::{self, Write};

use anyhow::{Context, Result};

use crate::cli::MetricsArgs;
use crate::request::metrics::{METRIC_CATALOG, MetricGroup};

const GROUP_ORDER: [MetricGroup; 2] = [MetricGroup::ModelGraded, MetricGroup::Statistical];

pub fn run(args: MetricsArgs) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    if args.json {
        serde_json::to_writer_pretty(&mut output, METRIC_CATALOG)
            .context("failed to serialize metrics json output")?;
        writeln!(output)?;
    } else {
        render_text(&mut output)?;
    }
    output.flush()?;
    Ok(())
}

fn render_text(output: &mut impl Write) -> Result<()> {
    for group in GROUP_ORDER {
        writeln!(output, "{}:", group.as_str())?;
        for metric in METRIC_CATALOG.iter().filter(|metric| metric.group == group) {
            writeln!(
                output,
                "  {:<18}{:<16}{}",
                metric.name, metric.display_name, metric.description
            )?;
        }
    }
    Ok(())
}
