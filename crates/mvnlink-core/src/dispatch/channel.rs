use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;

use crate::protocols::mxtp::DatagramKind;
use crate::protocols::mxtp::layout;

/// Category label shared by every channel.
pub const CHANNEL_CATEGORY: &str = "MoCap";

/// Identity of one output channel: datagram type and avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ChannelKey {
    pub kind: DatagramKind,
    pub avatar: u8,
}

impl ChannelKey {
    pub fn new(kind: DatagramKind, avatar: u8) -> Self {
        Self { kind, avatar }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind.label(), self.avatar)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleRate {
    /// Samples arrive whenever a frame is decoded.
    Irregular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelFormat {
    Float32,
}

/// Declaration of one sink channel, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    pub key: ChannelKey,
    pub name: String,
    pub category: &'static str,
    /// Maximum number of values in one sample.
    pub channel_count: usize,
    pub rate: SampleRate,
    pub format: ChannelFormat,
    pub source_id: String,
}

impl ChannelInfo {
    /// Channel declaration for `key`; names and ids are numbered from 1.
    ///
    /// # Examples
    /// ```
    /// use mvnlink_core::dispatch::{ChannelInfo, ChannelKey};
    /// use mvnlink_core::protocols::mxtp::DatagramKind;
    ///
    /// let info = ChannelInfo::for_key(ChannelKey::new(DatagramKind::TrackerKinematics, 1));
    /// assert_eq!(info.name, "TrackerKinematicsDatagram2");
    /// assert_eq!(info.source_id, "tkd2");
    /// assert_eq!(info.channel_count, 17 * 16);
    /// ```
    pub fn for_key(key: ChannelKey) -> Self {
        let (name, source) = match key.kind {
            DatagramKind::EulerPose => ("EulerDatagram", "ed"),
            DatagramKind::QuaternionPose => ("QuaternionDatagram", "qd"),
            DatagramKind::VirtualMarkers => ("PositionDatagram", "pd"),
            DatagramKind::LinearSegmentKinematics => ("LinearSegmentKinematicsDatagram", "lsk"),
            DatagramKind::AngularSegmentKinematics => ("AngularKinematics", "ang"),
            DatagramKind::TrackerKinematics => ("TrackerKinematicsDatagram", "tkd"),
        };
        let number = u16::from(key.avatar) + 1;
        Self {
            key,
            name: format!("{name}{number}"),
            category: CHANNEL_CATEGORY,
            channel_count: key.kind.channel_width(),
            rate: SampleRate::Irregular,
            format: ChannelFormat::Float32,
            source_id: format!("{source}{number}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sample of {actual} values exceeds channel {channel} width {width}")]
    WidthExceeded {
        channel: String,
        width: usize,
        actual: usize,
    },
    #[error("no channel registered for {key}")]
    UnknownChannel { key: ChannelKey },
    #[error("channel {channel} lock poisoned")]
    Poisoned { channel: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write-only outlet for flattened samples.
pub trait ChannelSink {
    fn push(&mut self, sample: &[f32]) -> Result<(), SinkError>;
}

/// Sink that keeps every pushed sample; clones share storage.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    samples: Arc<Mutex<Vec<Vec<f32>>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<Vec<f32>> {
        match self.samples.lock() {
            Ok(samples) => samples.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ChannelSink for RecordingSink {
    fn push(&mut self, sample: &[f32]) -> Result<(), SinkError> {
        let mut samples = self.samples.lock().map_err(|_| SinkError::Poisoned {
            channel: "recording".to_string(),
        })?;
        samples.push(sample.to_vec());
        Ok(())
    }
}

/// Sink that drops samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl ChannelSink for DiscardSink {
    fn push(&mut self, _sample: &[f32]) -> Result<(), SinkError> {
        Ok(())
    }
}

pub type BoxedSink = Box<dyn ChannelSink + Send>;

struct Channel {
    info: ChannelInfo,
    sink: Mutex<BoxedSink>,
}

/// Output channels keyed by (datagram type, avatar), built once.
///
/// Each channel has its own lock, so frames for different channels can be
/// pushed from different threads while pushes to one channel never overlap.
pub struct ChannelRegistry {
    channels: BTreeMap<ChannelKey, Channel>,
}

impl ChannelRegistry {
    /// Open one channel per kind for each supported avatar.
    pub fn open<I, F>(kinds: I, mut open: F) -> Result<Self, SinkError>
    where
        I: IntoIterator<Item = DatagramKind>,
        F: FnMut(&ChannelInfo) -> Result<BoxedSink, SinkError>,
    {
        let mut channels = BTreeMap::new();
        for kind in kinds {
            for avatar in 0..layout::MAX_AVATARS {
                let info = ChannelInfo::for_key(ChannelKey::new(kind, avatar));
                let sink = open(&info)?;
                channels.insert(
                    info.key,
                    Channel {
                        info,
                        sink: Mutex::new(sink),
                    },
                );
            }
        }
        Ok(Self { channels })
    }

    /// Registry for every datagram kind, with samples discarded.
    pub fn discarding() -> Self {
        let channels = DatagramKind::ALL
            .into_iter()
            .flat_map(|kind| (0..layout::MAX_AVATARS).map(move |avatar| (kind, avatar)))
            .map(|(kind, avatar)| {
                let info = ChannelInfo::for_key(ChannelKey::new(kind, avatar));
                let sink: BoxedSink = Box::new(DiscardSink);
                (
                    info.key,
                    Channel {
                        info,
                        sink: Mutex::new(sink),
                    },
                )
            })
            .collect();
        Self { channels }
    }

    pub fn contains(&self, key: ChannelKey) -> bool {
        self.channels.contains_key(&key)
    }

    pub fn info(&self, key: ChannelKey) -> Option<&ChannelInfo> {
        self.channels.get(&key).map(|channel| &channel.info)
    }

    /// Channel declarations in key order.
    pub fn infos(&self) -> impl Iterator<Item = &ChannelInfo> {
        self.channels.values().map(|channel| &channel.info)
    }

    /// Push one sample. Nothing is written when the sample is too wide.
    pub fn push(&self, key: ChannelKey, sample: &[f32]) -> Result<(), SinkError> {
        let channel = self
            .channels
            .get(&key)
            .ok_or(SinkError::UnknownChannel { key })?;
        if sample.len() > channel.info.channel_count {
            return Err(SinkError::WidthExceeded {
                channel: channel.info.name.clone(),
                width: channel.info.channel_count,
                actual: sample.len(),
            });
        }
        let mut sink = channel.sink.lock().map_err(|_| SinkError::Poisoned {
            channel: channel.info.name.clone(),
        })?;
        sink.push(sample)
    }
}

impl fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.channels.values().map(|channel| &channel.info.name))
            .finish()
    }
}
