use std::collections::BTreeMap;

use crate::ErrorSummary;
use crate::dispatch::DispatchError;
use crate::protocols::mxtp::DecodeError;

/// Examples kept per error id.
const MAX_EXAMPLES: usize = 3;

#[derive(Debug, Default)]
struct ErrorStats {
    count: u64,
    examples: Vec<String>,
}

/// Dropped frames grouped by stable error id.
#[derive(Debug, Default)]
pub(crate) struct ErrorTally {
    by_id: BTreeMap<&'static str, ErrorStats>,
}

impl ErrorTally {
    pub fn record(&mut self, err: &DispatchError, context: &str) {
        let entry = self.by_id.entry(error_id(err)).or_default();
        entry.count += 1;
        if entry.examples.len() < MAX_EXAMPLES {
            entry.examples.push(format!("{context}: {err}"));
        }
    }

    /// Summaries sorted by id.
    pub fn into_summaries(self) -> Vec<ErrorSummary> {
        self.by_id
            .into_iter()
            .map(|(id, stats)| ErrorSummary {
                id: id.to_string(),
                message: error_message(id).to_string(),
                count: stats.count,
                examples: stats.examples,
            })
            .collect()
    }
}

pub(crate) fn error_id(err: &DispatchError) -> &'static str {
    match err {
        DispatchError::Decode { source, .. } => match source {
            DecodeError::Truncated { .. } => "MXTP-TRUNCATED",
            DecodeError::InvalidCount { .. } => "MXTP-INVALID-COUNT",
            DecodeError::UnknownType { .. } => "MXTP-UNKNOWN-TYPE",
            DecodeError::InvalidHeader { .. } => "MXTP-INVALID-HEADER",
        },
        DispatchError::UnknownAvatar { .. } => "MXTP-UNKNOWN-AVATAR",
        DispatchError::Sink(_) => "MXTP-SINK",
    }
}

fn error_message(id: &str) -> &'static str {
    match id {
        "MXTP-TRUNCATED" => "Frame shorter than its header or declared records",
        "MXTP-INVALID-COUNT" => "Declared record count above the protocol maximum",
        "MXTP-UNKNOWN-TYPE" => "Datagram type code not in the variant registry",
        "MXTP-INVALID-HEADER" => "Frame header signature or type code malformed",
        "MXTP-UNKNOWN-AVATAR" => "Avatar index without an output channel",
        "MXTP-SINK" => "Channel sink rejected the sample",
        _ => "Frame dropped",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::mxtp::DatagramKind;

    fn unknown_avatar() -> DispatchError {
        DispatchError::UnknownAvatar {
            kind: DatagramKind::EulerPose,
            avatar: 7,
        }
    }

    #[test]
    fn examples_are_capped() {
        let mut tally = ErrorTally::default();
        for idx in 0..5 {
            tally.record(&unknown_avatar(), &format!("datagram {idx}"));
        }
        let summaries = tally.into_summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, "MXTP-UNKNOWN-AVATAR");
        assert_eq!(summaries[0].count, 5);
        assert_eq!(summaries[0].examples.len(), 3);
        assert!(summaries[0].examples[0].starts_with("datagram 0: "));
    }

    #[test]
    fn summaries_sorted_by_id() {
        let mut tally = ErrorTally::default();
        tally.record(&unknown_avatar(), "a");
        tally.record(
            &DispatchError::Decode {
                stage: crate::dispatch::DispatchStage::AwaitingHeader,
                source: DecodeError::UnknownType { code: 0x7f },
            },
            "b",
        );
        let ids: Vec<_> = tally
            .into_summaries()
            .into_iter()
            .map(|summary| summary.id)
            .collect();
        assert_eq!(ids, ["MXTP-UNKNOWN-AVATAR", "MXTP-UNKNOWN-TYPE"]);
    }
}
