//! Console rendering of a portfolio report.

use crate::domain::Decimal;
use crate::engine::PortfolioReport;

const HEADERS: [&str; 6] = ["Ticker", "Shares", "AvgIn", "AvgStop", "Risk$", "Realized P/L"];

fn money(value: Decimal) -> String {
    value.round_dp(2).inner().to_string()
}

/// Pipe-separated table of open positions, followed by the realized grand total.
///
/// Flat tickers are omitted from the rows but their realized P&L still counts
/// toward the total.
pub fn render_table(report: &PortfolioReport) -> String {
    let mut lines = vec![HEADERS.join(" | "), "-".repeat(60)];

    for summary in report.open_positions() {
        let avg_in = summary.average_open_price.unwrap_or_default();
        let avg_stop = summary.average_stop.unwrap_or_default();
        lines.push(format!(
            "{} | {} | {} | {} | {} | {}",
            summary.ticker,
            summary.open_quantity,
            money(avg_in),
            money(avg_stop),
            money(summary.risk_to_stop),
            money(summary.realized_pnl_total),
        ));
    }

    lines.push("-".repeat(60));
    lines.push(format!(
        "Total realized P/L: {}",
        money(report.total_realized_pnl)
    ));
    lines.join("\n")
}

pub fn render_json(report: &PortfolioReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
