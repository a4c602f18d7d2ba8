//! mvnlink core library: MVN network streaming (MXTP) decoding.
//!
//! Datagram sources feed the dispatcher, which parses the frame header,
//! selects the datagram variant, decodes its records through the protocol
//! layers (layout/reader/records) and pushes one flattened sample per frame
//! to the channel keyed by (datagram type, avatar). The replay loop drives a
//! source through the dispatcher and aggregates a deterministic report.
//!
//! Decoding is byte-oriented and side-effect free; all I/O lives in
//! `source` and in the channel sinks.
//!
//! Invariants:
//! - A frame either pushes exactly one sample or pushes nothing.
//! - Unit and axis normalization happen once, during decode.
//! - Report outputs are deterministic and stable across runs.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use mvnlink_core::dispatch::{ChannelRegistry, FrameDispatcher};
//! use mvnlink_core::{ReplayOptions, replay_pcap_file};
//!
//! let report = replay_pcap_file(
//!     Path::new("capture.pcapng"),
//!     &FrameDispatcher::default(),
//!     &ChannelRegistry::discarding(),
//!     &ReplayOptions::default(),
//! )?;
//! println!("report version: {}", report.report_version);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

pub mod dispatch;
pub mod protocols;
mod replay;
pub mod source;

pub use replay::{ReplayError, ReplayOptions, replay_pcap_file, stream_datagrams};
pub use source::{
    DatagramEvent, DatagramSource, PacketEvent, PacketSource, PcapFileSource, SourceError,
};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used when no capture time is available.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Aggregated replay report with deterministic ordering.
///
/// # Examples
/// ```
/// use mvnlink_core::make_stub_report;
///
/// let report = make_stub_report("capture.pcapng", 123);
/// assert_eq!(report.report_version, mvnlink_core::REPORT_VERSION);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    pub tool: ToolInfo,
    /// RFC3339 timestamp; the last capture time when known.
    pub generated_at: String,
    pub input: InputInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_summary: Option<CaptureSummary>,
    /// Per-channel stream summaries, ordered by datagram type then avatar.
    pub streams: Vec<StreamSummary>,
    /// Dropped-frame summaries, ordered by id.
    pub errors: Vec<ErrorSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// Input metadata embedded in reports.
///
/// # Examples
/// ```
/// use mvnlink_core::InputInfo;
///
/// let input = InputInfo {
///     path: "capture.pcapng".to_string(),
///     bytes: 1024,
/// };
/// assert_eq!(input.bytes, 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Capture path, or bind address for live input.
    pub path: String,
    /// Input size in bytes; zero for live input.
    pub bytes: u64,
}

/// Totals over the whole input (timestamps may be absent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSummary {
    /// Link-layer packets read from the source.
    pub packets_total: u64,
    /// UDP datagrams handed to the dispatcher.
    pub datagrams_total: u64,
    pub payload_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

/// Frames pushed to one channel.
///
/// # Examples
/// ```
/// use mvnlink_core::StreamSummary;
///
/// let stream = StreamSummary {
///     channel: "QuaternionDatagram1".to_string(),
///     datagram: "quaternion".to_string(),
///     type_code: 0x02,
///     avatar: 0,
///     frames: 120,
///     records: 2760,
///     first_sample: Some(1),
///     last_sample: Some(121),
///     missed_samples: 1,
/// };
/// assert_eq!(stream.records / stream.frames, 23);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSummary {
    /// Channel name, e.g. `EulerDatagram1`.
    pub channel: String,
    /// Datagram label, e.g. `euler`.
    pub datagram: String,
    pub type_code: u8,
    pub avatar: u8,
    pub frames: u64,
    pub records: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_sample: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sample: Option<u32>,
    /// Sample counter values skipped between consecutive frames.
    pub missed_samples: u64,
}

/// Dropped frames sharing one failure kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorSummary {
    /// Stable identifier, e.g. `MXTP-TRUNCATED`.
    pub id: String,
    pub message: String,
    pub count: u64,
    /// At most three example contexts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

/// Build a stub report with base fields filled and empty aggregates.
///
/// # Examples
/// ```
/// use mvnlink_core::make_stub_report;
///
/// let report = make_stub_report("capture.pcapng", 123);
/// assert!(report.streams.is_empty());
/// assert_eq!(report.tool.name, "mvnlink");
/// ```
pub fn make_stub_report(input_path: &str, input_bytes: u64) -> Report {
    Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "mvnlink".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        capture_summary: None,
        streams: vec![],
        errors: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_omits_optional_fields_when_none() {
        let mut report = make_stub_report("capture.pcapng", 1);
        report.capture_summary = Some(CaptureSummary {
            packets_total: 1,
            datagrams_total: 1,
            payload_bytes: 24,
            time_start: None,
            time_end: None,
        });
        report.streams.push(StreamSummary {
            channel: "EulerDatagram1".to_string(),
            datagram: "euler".to_string(),
            type_code: 1,
            avatar: 0,
            frames: 0,
            records: 0,
            first_sample: None,
            last_sample: None,
            missed_samples: 0,
        });
        report.errors.push(ErrorSummary {
            id: "MXTP-SINK".to_string(),
            message: "sink".to_string(),
            count: 1,
            examples: vec![],
        });

        let value = serde_json::to_value(&report).expect("report json");
        let capture = value.get("capture_summary").expect("capture_summary");
        assert!(capture.get("time_start").is_none());
        assert!(capture.get("time_end").is_none());

        let stream = &value["streams"][0];
        assert!(stream.get("first_sample").is_none());
        assert_eq!(stream["missed_samples"], 0);
        assert!(value["errors"][0].get("examples").is_none());
    }

    #[test]
    fn stub_report_has_no_capture_summary() {
        let value = serde_json::to_value(make_stub_report("x.pcap", 0)).unwrap();
        assert!(value.get("capture_summary").is_none());
        assert_eq!(value["generated_at"], DEFAULT_GENERATED_AT);
    }
}
