//! Stdout sink.
//!
//! Prints observations as JSON lines, suitable for piping to other tools.

use std::io::Write;

use super::ObservationSink;
use crate::observation::Observation;
use async_trait::async_trait;

/// Sink that prints observations to stdout as JSON lines.
pub struct StdoutSink {
    /// Whether to use pretty printing
    pretty: bool,
}

impl StdoutSink {
    /// Create a new stdout sink.
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Create a new stdout sink with pretty printing.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    fn render(&self, observation: &Observation) -> String {
        if self.pretty {
            observation.to_json_pretty()
        } else {
            observation.to_json()
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObservationSink for StdoutSink {
    async fn emit(&self, observation: &Observation) -> anyhow::Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", self.render(observation))?;
        Ok(())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        std::io::stdout().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::AccountId;

    fn observation() -> Observation {
        Observation {
            source: AccountId::from("GA"),
            amount: 50,
            asset_code: "XLM".to_string(),
            destination: AccountId::from("GB"),
            ledger_sequence: 100,
            tx_hash: "aa".to_string(),
            tx_index: 0,
            op_index: 0,
        }
    }

    #[test]
    fn test_render_json_lines() {
        let line = StdoutSink::new().render(&observation());
        assert!(!line.contains('\n'));
        assert_eq!(line, observation().to_json());

        let pretty = StdoutSink::pretty().render(&observation());
        assert!(pretty.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(parsed["asset_code"], "XLM");
    }
}
