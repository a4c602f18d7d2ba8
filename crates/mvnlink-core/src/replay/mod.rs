use std::collections::BTreeMap;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::dispatch::{ChannelRegistry, FrameDispatcher};
use crate::protocols::mxtp::layout;
use crate::source::{
    DatagramEvent, DatagramSource, PcapFileSource, SourceError, UdpCaptureSource,
};
use crate::{CaptureSummary, DEFAULT_GENERATED_AT, InputInfo, Report, make_stub_report};

mod errors;
mod streams;

use errors::ErrorTally;
use streams::{StreamStats, add_outcome, build_stream_summaries};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Replay settings passed explicitly by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayOptions {
    /// UDP destination port to keep; `None` keeps every UDP datagram.
    pub port: Option<u16>,
    /// Stop after this many datagrams.
    pub max_datagrams: Option<u64>,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            port: Some(layout::DEFAULT_PORT),
            max_datagrams: None,
        }
    }
}

/// Replay a PCAP/PCAPNG capture through the dispatcher.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
///
/// use mvnlink_core::dispatch::{ChannelRegistry, FrameDispatcher};
/// use mvnlink_core::{ReplayOptions, replay_pcap_file};
///
/// let channels = ChannelRegistry::discarding();
/// let report = replay_pcap_file(
///     Path::new("capture.pcapng"),
///     &FrameDispatcher::default(),
///     &channels,
///     &ReplayOptions::default(),
/// )?;
/// println!("{} streams", report.streams.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn replay_pcap_file(
    path: &Path,
    dispatcher: &FrameDispatcher,
    channels: &ChannelRegistry,
    options: &ReplayOptions,
) -> Result<Report, ReplayError> {
    let input = InputInfo {
        path: path.display().to_string(),
        bytes: path.metadata()?.len(),
    };
    let source = UdpCaptureSource::new(PcapFileSource::open(path)?, options.port);
    stream_datagrams(input, source, dispatcher, channels, options)
}

/// Drive a datagram source through the dispatcher and summarize the run.
///
/// Every datagram is dispatched as one MXTP frame. Frames that fail are
/// dropped, logged and tallied; the stream keeps going. Only source errors
/// end the replay early.
pub fn stream_datagrams<S: DatagramSource>(
    input: InputInfo,
    mut source: S,
    dispatcher: &FrameDispatcher,
    channels: &ChannelRegistry,
    options: &ReplayOptions,
) -> Result<Report, ReplayError> {
    let mut datagrams_total = 0u64;
    let mut payload_bytes = 0u64;
    let mut first_ts = None;
    let mut last_ts = None;
    let mut streams: BTreeMap<_, StreamStats> = BTreeMap::new();
    let mut errors = ErrorTally::default();

    while options
        .max_datagrams
        .is_none_or(|limit| datagrams_total < limit)
    {
        let Some(DatagramEvent {
            ts,
            origin,
            payload,
        }) = source.next_datagram()?
        else {
            break;
        };
        datagrams_total += 1;
        payload_bytes += payload.len() as u64;
        update_ts_bounds(&mut first_ts, &mut last_ts, ts);

        match dispatcher.dispatch(&payload, channels) {
            Ok(outcome) => add_outcome(&mut streams, &outcome),
            Err(err) => {
                let context = match origin {
                    Some(origin) => format!("datagram {datagrams_total} from {origin}"),
                    None => format!("datagram {datagrams_total}"),
                };
                warn!("dropping {context}: {err}");
                errors.record(&err, &context);
            }
        }
    }

    info!(
        "replayed {datagrams_total} datagrams into {} streams",
        streams.len()
    );

    let mut report = make_stub_report(&input.path, input.bytes);
    report.capture_summary = Some(CaptureSummary {
        packets_total: source.packets_seen(),
        datagrams_total,
        payload_bytes,
        time_start: ts_to_rfc3339(first_ts),
        time_end: ts_to_rfc3339(last_ts),
    });
    report.generated_at = report
        .capture_summary
        .as_ref()
        .and_then(|summary| summary.time_end.clone().or(summary.time_start.clone()))
        .unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string());
    report.streams = build_stream_summaries(streams, channels);
    report.errors = errors.into_summaries();
    Ok(report)
}

fn update_ts_bounds(first: &mut Option<f64>, last: &mut Option<f64>, ts: Option<f64>) {
    let Some(ts) = ts else {
        return;
    };
    if first.is_none_or(|existing| ts < existing) {
        *first = Some(ts);
    }
    if last.is_none_or(|existing| ts > existing) {
        *last = Some(ts);
    }
}

pub(crate) fn ts_to_rfc3339(ts: Option<f64>) -> Option<String> {
    let ts = ts?;
    let nanos = (ts * 1_000_000_000.0) as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}
