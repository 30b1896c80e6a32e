//! JSON output of dashboard figures

use crate::core::dashboard::DashboardStats;
use crate::types::LedgerError;
use std::io::Write;

/// Write dashboard stats as pretty-printed JSON followed by a newline
pub fn write_stats_json(stats: &DashboardStats, output: &mut dyn Write) -> Result<(), LedgerError> {
    serde_json::to_writer_pretty(&mut *output, stats)?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dashboard::LedgerSnapshot;
    use crate::types::{AccountClass, NewAccount};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use serde_json::Value;

    #[test]
    fn test_write_stats_json_uses_camel_case() {
        let snapshot = LedgerSnapshot {
            accounts: vec![NewAccount::new("o", AccountClass::Company, "Bank", "USD")
                .into_account("1".to_string(), dec!(500), Utc::now())],
            transactions: Vec::new(),
        };
        let stats = DashboardStats::fold(snapshot).unwrap();
        let mut output = Vec::new();

        write_stats_json(&stats, &mut output).unwrap();

        let json: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(json["totalBalance"], "500");
        assert_eq!(json["companyBalance"], "500");
        assert_eq!(json["transactionCount"], 0);
        assert_eq!(json["accounts"][0]["name"], "Bank");
        assert_eq!(json["accounts"][0]["lifecycle"]["state"], "active");
    }
}
