//! Frame dispatch: header, variant lookup, decode, flatten, push.
//!
//! The dispatcher owns only the read-only variant registry and decode
//! options; it keeps no state between frames and dispatches through `&self`.
//! Every failure aborts the current frame only and names the stage it
//! happened in.

mod channel;

use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use thiserror::Error;

use crate::protocols::mxtp::{
    ByteReader, Datagram, DatagramKind, DecodeError, DecodeOptions, FrameHeader, parse_header,
};

pub use channel::{
    BoxedSink, CHANNEL_CATEGORY, ChannelFormat, ChannelInfo, ChannelKey, ChannelRegistry,
    ChannelSink, DiscardSink, RecordingSink, SampleRate, SinkError,
};

/// Where in a frame a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    AwaitingHeader,
    DecodingBody,
}

impl fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchStage::AwaitingHeader => write!(f, "header"),
            DispatchStage::DecodingBody => write!(f, "body"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{stage}: {source}")]
    Decode {
        stage: DispatchStage,
        #[source]
        source: DecodeError,
    },
    #[error("no channel for avatar {avatar} ({kind:?})")]
    UnknownAvatar { kind: DatagramKind, avatar: u8 },
    #[error("sink: {0}")]
    Sink(#[from] SinkError),
}

impl DispatchError {
    fn header(source: DecodeError) -> Self {
        DispatchError::Decode {
            stage: DispatchStage::AwaitingHeader,
            source,
        }
    }

    fn body(source: DecodeError) -> Self {
        DispatchError::Decode {
            stage: DispatchStage::DecodingBody,
            source,
        }
    }

    /// The decode error behind this failure, if any.
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self {
            DispatchError::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Type codes the dispatcher accepts, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRegistry {
    by_code: BTreeMap<u8, DatagramKind>,
}

impl VariantRegistry {
    /// Registry with every known datagram kind.
    pub fn standard() -> Self {
        Self::from_kinds(DatagramKind::ALL)
    }

    pub fn from_kinds<I: IntoIterator<Item = DatagramKind>>(kinds: I) -> Self {
        let by_code = kinds
            .into_iter()
            .map(|kind| (kind.type_code(), kind))
            .collect();
        Self { by_code }
    }

    pub fn lookup(&self, type_code: u8) -> Option<DatagramKind> {
        self.by_code.get(&type_code).copied()
    }

    pub fn kinds(&self) -> impl Iterator<Item = DatagramKind> + '_ {
        self.by_code.values().copied()
    }
}

impl Default for VariantRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Fully decoded frame, before it is flattened.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub header: FrameHeader,
    pub datagram: Datagram,
}

/// What one successful dispatch pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub key: ChannelKey,
    pub header: FrameHeader,
    pub records: usize,
    pub values: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FrameDispatcher {
    variants: VariantRegistry,
    options: DecodeOptions,
}

impl FrameDispatcher {
    pub fn new(variants: VariantRegistry, options: DecodeOptions) -> Self {
        Self { variants, options }
    }

    /// Decode one frame without touching any sink.
    pub fn decode_frame(&self, frame: &[u8]) -> Result<DecodedFrame, DispatchError> {
        let (header, kind, body) = self.read_header(frame)?;
        let datagram = self.decode_body(kind, &header, body)?;
        Ok(DecodedFrame { header, datagram })
    }

    /// Decode one frame and push its flattened sample to its channel.
    ///
    /// The channel is resolved before the body is decoded, and the sample is
    /// pushed only after the whole body decoded, so a failing frame leaves
    /// every channel untouched.
    ///
    /// # Examples
    /// ```
    /// use mvnlink_core::dispatch::{
    ///     BoxedSink, ChannelKey, ChannelRegistry, FrameDispatcher, RecordingSink,
    /// };
    /// use mvnlink_core::protocols::mxtp::{DatagramKind, FrameBuilder};
    ///
    /// let sink = RecordingSink::new();
    /// let handle = sink.clone();
    /// let channels = ChannelRegistry::open(DatagramKind::ALL, move |_| {
    ///     Ok(Box::new(handle.clone()) as BoxedSink)
    /// })?;
    ///
    /// let mut builder = FrameBuilder::new(DatagramKind::LinearSegmentKinematics);
    /// builder.record(5, &[0.0; 9])?;
    /// let outcome = FrameDispatcher::default().dispatch(&builder.build(), &channels)?;
    ///
    /// assert_eq!(outcome.key, ChannelKey::new(DatagramKind::LinearSegmentKinematics, 0));
    /// assert_eq!(sink.samples(), vec![vec![0.0; 9]]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn dispatch(
        &self,
        frame: &[u8],
        channels: &ChannelRegistry,
    ) -> Result<DispatchOutcome, DispatchError> {
        let (header, kind, body) = self.read_header(frame)?;
        let key = ChannelKey::new(kind, header.avatar_index);
        if !channels.contains(key) {
            return Err(DispatchError::UnknownAvatar {
                kind,
                avatar: header.avatar_index,
            });
        }

        let datagram = self.decode_body(kind, &header, body)?;
        let sample = datagram.flatten();
        channels.push(key, &sample)?;
        debug!(
            "pushed {} values ({} records) to {} at sample {}",
            sample.len(),
            datagram.len(),
            key,
            header.sample_counter
        );
        Ok(DispatchOutcome {
            key,
            header,
            records: datagram.len(),
            values: sample.len(),
        })
    }

    fn read_header<'a>(
        &self,
        frame: &'a [u8],
    ) -> Result<(FrameHeader, DatagramKind, &'a [u8]), DispatchError> {
        let (header, body) = parse_header(frame).map_err(DispatchError::header)?;
        let kind = self
            .variants
            .lookup(header.type_code)
            .ok_or_else(|| {
                DispatchError::header(DecodeError::UnknownType {
                    code: header.type_code,
                })
            })?;
        Ok((header, kind, body))
    }

    fn decode_body(
        &self,
        kind: DatagramKind,
        header: &FrameHeader,
        body: &[u8],
    ) -> Result<Datagram, DispatchError> {
        let mut reader = ByteReader::new(body);
        Datagram::decode(
            kind,
            &mut reader,
            usize::from(header.item_count),
            &self.options,
        )
        .map_err(DispatchError::body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::mxtp::FrameBuilder;

    fn recording_registry(kinds: &[DatagramKind]) -> (ChannelRegistry, RecordingSink) {
        let sink = RecordingSink::new();
        let handle = sink.clone();
        let registry = ChannelRegistry::open(kinds.iter().copied(), move |_| {
            Ok(Box::new(handle.clone()) as BoxedSink)
        })
        .unwrap();
        (registry, sink)
    }

    #[test]
    fn dispatch_pushes_flattened_sample() {
        let (channels, sink) = recording_registry(&DatagramKind::ALL);
        let mut builder = FrameBuilder::new(DatagramKind::TrackerKinematics);
        builder.avatar(1);
        let values: Vec<f32> = (0..16).map(|v| v as f32).collect();
        builder.record(1, &values).unwrap().record(2, &values).unwrap();

        let outcome = FrameDispatcher::default()
            .dispatch(&builder.build(), &channels)
            .unwrap();
        assert_eq!(
            outcome.key,
            ChannelKey::new(DatagramKind::TrackerKinematics, 1)
        );
        assert_eq!(outcome.records, 2);
        assert_eq!(outcome.values, 32);
        let samples = sink.samples();
        assert_eq!(samples.len(), 1);
        assert_eq!(&samples[0][..16], values.as_slice());
    }

    #[test]
    fn unknown_type_is_reported_once_without_push() {
        let (channels, sink) = recording_registry(&DatagramKind::ALL);
        let mut builder = FrameBuilder::with_type_code(0x24);
        builder.record(1, &[0.0; 3]).unwrap();

        let err = FrameDispatcher::default()
            .dispatch(&builder.build(), &channels)
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Decode {
                stage: DispatchStage::AwaitingHeader,
                source: DecodeError::UnknownType { code: 0x24 },
            }
        ));
        assert!(sink.samples().is_empty());
    }

    #[test]
    fn unregistered_kind_is_unknown_type() {
        let (channels, sink) = recording_registry(&DatagramKind::ALL);
        let dispatcher = FrameDispatcher::new(
            VariantRegistry::from_kinds([DatagramKind::EulerPose]),
            DecodeOptions::default(),
        );
        let mut builder = FrameBuilder::new(DatagramKind::VirtualMarkers);
        builder.record(1, &[0.0; 3]).unwrap();

        let err = dispatcher.dispatch(&builder.build(), &channels).unwrap_err();
        assert_eq!(
            err.decode_error(),
            Some(&DecodeError::UnknownType { code: 0x03 })
        );
        assert!(sink.samples().is_empty());
    }

    #[test]
    fn truncated_body_leaves_sinks_untouched() {
        let (channels, sink) = recording_registry(&DatagramKind::ALL);
        let mut builder = FrameBuilder::new(DatagramKind::EulerPose);
        builder.record(1, &[0.0; 6]).unwrap().declared_count(2);

        let err = FrameDispatcher::default()
            .dispatch(&builder.build(), &channels)
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Decode {
                stage: DispatchStage::DecodingBody,
                source: DecodeError::Truncated { .. },
            }
        ));
        assert!(sink.samples().is_empty());
    }

    #[test]
    fn invalid_count_is_rejected() {
        let (channels, _) = recording_registry(&DatagramKind::ALL);
        let mut builder = FrameBuilder::new(DatagramKind::VirtualMarkers);
        builder.declared_count(31);

        let err = FrameDispatcher::default()
            .dispatch(&builder.build(), &channels)
            .unwrap_err();
        assert!(matches!(
            err.decode_error(),
            Some(DecodeError::InvalidCount { count: 31, .. })
        ));
    }

    #[test]
    fn avatar_outside_registry_is_dropped() {
        let (channels, sink) = recording_registry(&DatagramKind::ALL);
        let mut builder = FrameBuilder::new(DatagramKind::VirtualMarkers);
        builder.avatar(2).record(1, &[0.0; 3]).unwrap();

        let err = FrameDispatcher::default()
            .dispatch(&builder.build(), &channels)
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownAvatar { avatar: 2, .. }));
        assert!(sink.samples().is_empty());
    }

    #[test]
    fn frames_after_a_failure_decode_normally() {
        let (channels, sink) = recording_registry(&DatagramKind::ALL);
        let dispatcher = FrameDispatcher::default();
        let bad = FrameBuilder::with_type_code(0x99).build();
        let mut good = FrameBuilder::new(DatagramKind::VirtualMarkers);
        good.record(1, &[100.0, 200.0, 300.0]).unwrap();

        assert!(dispatcher.dispatch(&bad, &channels).is_err());
        dispatcher.dispatch(&good.build(), &channels).unwrap();
        assert_eq!(sink.samples(), vec![vec![1.0, -3.0, 2.0]]);
    }

    #[test]
    fn decode_frame_returns_records() {
        let mut builder = FrameBuilder::new(DatagramKind::QuaternionPose);
        builder.sample_counter(9).record(4, &[0.0; 7]).unwrap();
        let decoded = FrameDispatcher::default()
            .decode_frame(&builder.build())
            .unwrap();
        assert_eq!(decoded.header.sample_counter, 9);
        assert_eq!(decoded.datagram.kind(), DatagramKind::QuaternionPose);
        assert_eq!(decoded.datagram.len(), 1);
    }

    #[test]
    fn avatars_dispatch_from_separate_threads() {
        let (channels, sink) = recording_registry(&[DatagramKind::LinearSegmentKinematics]);
        let dispatcher = FrameDispatcher::default();
        let frames: Vec<Vec<u8>> = (0..2u8)
            .map(|avatar| {
                let mut builder = FrameBuilder::new(DatagramKind::LinearSegmentKinematics);
                builder.avatar(avatar).record(1, &[f32::from(avatar); 9]).unwrap();
                builder.build()
            })
            .collect();

        std::thread::scope(|scope| {
            for frame in &frames {
                let (dispatcher, channels) = (&dispatcher, &channels);
                scope.spawn(move || {
                    for _ in 0..10 {
                        dispatcher.dispatch(frame, channels).unwrap();
                    }
                });
            }
        });
        assert_eq!(sink.samples().len(), 20);
    }
}
