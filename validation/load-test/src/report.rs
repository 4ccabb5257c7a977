//! Results reporting and formatting.

use crate::metrics::TestResults;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

/// Formats test results for output.
pub struct ResultsReport;

impl ResultsReport {
    /// Format results as a console table.
    pub fn format_table(results: &TestResults) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![format!("Load Test Results: {}", results.scenario_name)]);

        table.add_row(vec!["Duration:", &format!("{:.1}s", results.duration_secs)]);
        table.add_row(vec![
            "Target:",
            &format!(
                "{} / {} (x{}{}{})",
                results.target.exchange,
                results.target.routing_key,
                results.target.iterations,
                if results.target.persistent { ", persistent" } else { "" },
                if results.target.use_transaction { ", tx" } else { "" },
            ),
        ]);
        table.add_row(vec![
            "Invocations:",
            &format!("{}", results.total_invocations),
        ]);
        table.add_row(vec![
            "Success Rate:",
            &format!("{:.1}%", results.success_rate()),
        ]);
        for (code, count) in &results.failures_by_code {
            table.add_row(vec![format!("  Failed ({}):", code), count.to_string()]);
        }
        table.add_row(vec![
            "Invocations/sec:",
            &format!("{:.1}", results.invocations_per_second),
        ]);
        table.add_row(vec![
            "Messages/sec:",
            &format!("{:.1}", results.messages_per_second),
        ]);

        table.add_row(vec!["", ""]);
        table.add_row(vec!["Latency (ms)", "p50 / p90 / p95 / p99 / max"]);
        table.add_row(vec![
            "",
            &format!(
                "{:.2} / {:.2} / {:.2} / {:.2} / {:.2}",
                results.latency_p50,
                results.latency_p90,
                results.latency_p95,
                results.latency_p99,
                results.latency_max
            ),
        ]);

        table.add_row(vec!["", ""]);
        table.add_row(vec![
            "Throughput:",
            &format!("{:.2} MB/s", results.bytes_per_second / 1_000_000.0),
        ]);

        table.to_string()
    }

    /// Format results as JSON.
    pub fn format_json(results: &TestResults) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(results)?)
    }

    /// Format results as CSV row.
    pub fn format_csv(results: &TestResults) -> String {
        format!(
            "{},{},{:.1},{},{},{:.1},{:.1},{:.2},{:.2},{:.2}",
            results.timestamp,
            results.scenario_name,
            results.duration_secs,
            results.total_invocations,
            results.failed_invocations,
            results.invocations_per_second,
            results.messages_per_second,
            results.latency_p50,
            results.latency_p90,
            results.latency_p99,
        )
    }

    /// CSV header row.
    pub fn csv_header() -> &'static str {
        "timestamp,scenario,duration,invocations,failed,ips,mps,p50,p90,p99"
    }
}
