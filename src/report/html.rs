use std::fmt::Write as _;
use std::path::Path;

use crate::billing::calculator::format_currency;
use crate::billing::{CostReport, GroupSummary};
use crate::core::status::write_atomic;
use crate::error::Result;

const CHART_WIDTH: f64 = 640.0;
const CHART_LABEL_WIDTH: f64 = 200.0;
const CHART_VALUE_WIDTH: f64 = 110.0;
const CHART_ROW_HEIGHT: f64 = 26.0;
/// Groups beyond this are folded out of charts (tables still list them)
const CHART_MAX_BARS: usize = 15;

const STYLE: &str = "body{font-family:Segoe UI,Helvetica,Arial,sans-serif;margin:2em;color:#222}\
table{border-collapse:collapse;margin-bottom:2em}\
th,td{border:1px solid #ccc;padding:4px 10px;text-align:left}\
td.num{text-align:right;font-variant-numeric:tabular-nums}\
th{background:#f0f3f7}\
.note{color:#8a5a00;font-size:0.9em}\
svg text{font-size:12px}";

/// Escape text for HTML element content and attribute values
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Horizontal bar chart of group costs as inline SVG
pub fn bar_chart(title: &str, groups: &[GroupSummary]) -> String {
    let bars: Vec<&GroupSummary> = groups.iter().take(CHART_MAX_BARS).collect();
    let max_value = bars
        .iter()
        .map(|g| g.monthly_cost)
        .fold(0.0f64, |a, b| a.max(b));

    if bars.is_empty() || max_value <= 0.0 {
        return format!("<p>{}: no costs to display.</p>\n", escape(title));
    }

    let bar_space = CHART_WIDTH - CHART_LABEL_WIDTH - CHART_VALUE_WIDTH;
    let height = CHART_ROW_HEIGHT * bars.len() as f64 + 10.0;
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" role=\"img\" aria-label=\"{t}\">",
        w = CHART_WIDTH,
        h = height,
        t = escape(title)
    );

    for (i, group) in bars.iter().enumerate() {
        let y = i as f64 * CHART_ROW_HEIGHT + 5.0;
        let width = (group.monthly_cost / max_value * bar_space).max(1.0);
        let _ = writeln!(
            svg,
            "<text x=\"{lx}\" y=\"{ty:.1}\" text-anchor=\"end\">{label}</text>\
             <rect x=\"{bx}\" y=\"{y:.1}\" width=\"{width:.1}\" height=\"{bh:.1}\" fill=\"#3b7dd8\"/>\
             <text x=\"{vx:.1}\" y=\"{ty:.1}\">{value}</text>",
            lx = CHART_LABEL_WIDTH - 8.0,
            ty = y + CHART_ROW_HEIGHT * 0.6,
            label = escape(&group.label),
            bx = CHART_LABEL_WIDTH,
            bh = CHART_ROW_HEIGHT - 8.0,
            vx = CHART_LABEL_WIDTH + width + 6.0,
            value = escape(&format_currency(group.monthly_cost)),
        );
    }
    svg.push_str("</svg>\n");
    svg
}

fn group_table(out: &mut String, title: &str, groups: &[GroupSummary], grand_total: f64) {
    let _ = writeln!(out, "<h2>Cost by {}</h2>", escape(title));
    out.push_str("<table><tr><th>");
    out.push_str(&escape(title));
    out.push_str("</th><th>Monthly cost</th><th>Subscriptions</th><th>Share</th></tr>\n");
    for group in groups {
        let share = if grand_total > 0.0 {
            group.monthly_cost / grand_total * 100.0
        } else {
            0.0
        };
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{:.1}%</td></tr>",
            escape(&group.label),
            escape(&format_currency(group.monthly_cost)),
            group.subscription_count,
            share
        );
    }
    out.push_str("</table>\n");
}

/// Render the complete HTML report
pub fn render(report: &CostReport, include_charts: bool) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">");
    out.push_str("<title>Azure log ingestion cost estimate</title><style>");
    out.push_str(STYLE);
    out.push_str("</style></head><body>\n<h1>Azure log ingestion cost estimate</h1>\n");

    let _ = writeln!(
        out,
        "<p>Generated {} &middot; {} subscriptions &middot; {} days analyzed &middot; pricing: {} ({}, {})</p>",
        report.generated_at.format("%Y-%m-%d %H:%M UTC"),
        report.subscriptions.len(),
        report.parameters.days_to_analyze,
        report.pricing.source,
        escape(&report.pricing.currency),
        report.pricing.fetched_at.format("%Y-%m-%d %H:%M UTC"),
    );
    let _ = writeln!(
        out,
        "<h2>Estimated monthly total: {}</h2>",
        escape(&format_currency(report.grand_total))
    );

    out.push_str("<table><tr><th>Component</th><th>Monthly cost</th></tr>\n");
    for (name, value) in report.cost_breakdown.components() {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td class=\"num\">{}</td></tr>",
            name,
            escape(&format_currency(value))
        );
    }
    out.push_str("</table>\n");

    for (key, groups) in report.groupings() {
        group_table(&mut out, key.title(), groups, report.grand_total);
        if include_charts {
            out.push_str(&bar_chart(key.title(), groups));
        }
    }

    if !report.top_subscriptions.is_empty() {
        let _ = writeln!(
            out,
            "<h2>Top {} subscriptions</h2>",
            report.top_subscriptions.len()
        );
        out.push_str("<table><tr><th>#</th><th>Subscription</th><th>Business unit</th><th>Monthly cost</th></tr>\n");
        for top in &report.top_subscriptions {
            let _ = writeln!(
                out,
                "<tr><td class=\"num\">{}</td><td>{}</td><td>{}</td><td class=\"num\">{}</td></tr>",
                top.rank,
                escape(&top.subscription_name),
                escape(&top.business_unit),
                escape(&format_currency(top.monthly_cost))
            );
        }
        out.push_str("</table>\n");
    }

    out.push_str("<h2>Subscriptions</h2>\n<table><tr><th>Subscription</th><th>Region</th>\
        <th>Environment</th><th>Business unit</th><th>Daily entries</th><th>TUs</th>\
        <th>Instances</th><th>Monthly cost</th><th>Notes</th></tr>\n");
    for e in &report.subscriptions {
        let _ = writeln!(
            out,
            "<tr><td title=\"{}\">{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{:.0}</td>\
             <td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"note\">{}</td></tr>",
            escape(&e.subscription_id),
            escape(&e.subscription_name),
            escape(&e.region),
            escape(&e.environment),
            escape(&e.business_unit),
            e.logs.daily_entries,
            e.capacity.throughput_units,
            e.capacity.compute_instances,
            escape(&format_currency(e.monthly_cost)),
            escape(&e.notes.join("; "))
        );
    }
    out.push_str("</table>\n");

    if !report.failures.is_empty() {
        out.push_str("<h2>Failed subscriptions</h2>\n<table><tr><th>Subscription</th><th>Error</th></tr>\n");
        for failure in &report.failures {
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(&failure.subscription_name),
                escape(&failure.error)
            );
        }
        out.push_str("</table>\n");
    }

    out.push_str("</body></html>\n");
    out
}

pub fn write_report(path: &Path, report: &CostReport, include_charts: bool) -> Result<()> {
    write_atomic(path, render(report, include_charts).as_bytes())
}
