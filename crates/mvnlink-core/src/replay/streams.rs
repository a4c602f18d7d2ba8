use std::collections::BTreeMap;

use crate::StreamSummary;
use crate::dispatch::{ChannelKey, ChannelRegistry, DispatchOutcome};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct StreamStats {
    pub frames: u64,
    pub records: u64,
    pub first_sample: Option<u32>,
    pub last_sample: Option<u32>,
    pub missed_samples: u64,
}

impl StreamStats {
    /// Count one pushed frame and track forward gaps in the sample counter.
    ///
    /// Several datagrams may share a sample counter; repeats and backward
    /// jumps are not gaps.
    pub fn observe(&mut self, sample_counter: u32, records: usize) {
        self.frames += 1;
        self.records += records as u64;
        if self.first_sample.is_none() {
            self.first_sample = Some(sample_counter);
        }
        if let Some(last) = self.last_sample {
            if sample_counter > last {
                self.missed_samples += u64::from(sample_counter - last - 1);
            }
        }
        self.last_sample = Some(sample_counter);
    }
}

pub(crate) fn add_outcome(stats: &mut BTreeMap<ChannelKey, StreamStats>, outcome: &DispatchOutcome) {
    stats
        .entry(outcome.key)
        .or_default()
        .observe(outcome.header.sample_counter, outcome.records);
}

/// Summaries in channel key order (datagram type, then avatar).
pub(crate) fn build_stream_summaries(
    stats: BTreeMap<ChannelKey, StreamStats>,
    channels: &ChannelRegistry,
) -> Vec<StreamSummary> {
    stats
        .into_iter()
        .map(|(key, stats)| StreamSummary {
            channel: channels
                .info(key)
                .map(|info| info.name.clone())
                .unwrap_or_else(|| key.to_string()),
            datagram: key.kind.label().to_string(),
            type_code: key.kind.type_code(),
            avatar: key.avatar,
            frames: stats.frames,
            records: stats.records,
            first_sample: stats.first_sample,
            last_sample: stats.last_sample,
            missed_samples: stats.missed_samples,
        })
        .collect()
}
