use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use mvnlink_core::dispatch::{BoxedSink, ChannelInfo, ChannelSink, SinkError};
use serde::Serialize;

type SharedWriter = Arc<Mutex<BufWriter<File>>>;

/// One JSON line per pushed sample, shared by every channel.
#[derive(Clone)]
pub struct SampleFile {
    out: SharedWriter,
}

impl SampleFile {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            out: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    pub fn sink_for(&self, info: &ChannelInfo) -> BoxedSink {
        Box::new(JsonLinesSink {
            channel: info.name.clone(),
            out: Arc::clone(&self.out),
        })
    }

    pub fn flush(&self) -> Result<(), SinkError> {
        let mut out = self.out.lock().map_err(|_| SinkError::Poisoned {
            channel: "samples".to_string(),
        })?;
        out.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct SampleLine<'a> {
    channel: &'a str,
    values: &'a [f32],
}

struct JsonLinesSink {
    channel: String,
    out: SharedWriter,
}

impl ChannelSink for JsonLinesSink {
    fn push(&mut self, sample: &[f32]) -> Result<(), SinkError> {
        let line = serde_json::to_string(&SampleLine {
            channel: &self.channel,
            values: sample,
        })
        .map_err(std::io::Error::from)?;
        let mut out = self.out.lock().map_err(|_| SinkError::Poisoned {
            channel: self.channel.clone(),
        })?;
        writeln!(out, "{line}")?;
        Ok(())
    }
}
