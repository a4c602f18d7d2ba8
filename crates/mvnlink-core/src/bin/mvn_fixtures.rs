use std::env;
use std::net::SocketAddrV4;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use mvnlink_core::protocols::mxtp::{DatagramKind, FrameBuilder};
use mvnlink_core::source::CaptureWriter;

const SENDER: &str = "192.168.1.20:49152";
const RECEIVER: &str = "192.168.1.10:9763";
/// 60 Hz sample interval.
const FRAME_INTERVAL_US: u64 = 16_667;
const SEGMENTS: i32 = 23;
const TRACKERS: i32 = 17;

fn main() -> ExitCode {
    let root = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("fixtures"));
    if let Err(err) = run(&root) {
        eprintln!("error: {}", err);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run(root: &Path) -> Result<(), String> {
    for kind in DatagramKind::ALL {
        write_capture(
            &root.join(format!("{}.pcapng", kind.label())),
            &CapturePlan::steady(kind, &[0]),
        )?;
    }
    write_capture(
        &root.join("two_avatars.pcapng"),
        &CapturePlan::steady(DatagramKind::QuaternionPose, &[0, 1]),
    )?;
    write_capture(
        &root.join("sample_gap.pcapng"),
        &CapturePlan {
            kind: DatagramKind::EulerPose,
            avatars: vec![0],
            counters: vec![1, 2, 3, 7, 8],
            corrupt_every: None,
        },
    )?;
    write_capture(
        &root.join("damaged.pcapng"),
        &CapturePlan {
            kind: DatagramKind::LinearSegmentKinematics,
            avatars: vec![0],
            counters: (1..=12).collect(),
            corrupt_every: Some(4),
        },
    )?;
    Ok(())
}

struct CapturePlan {
    kind: DatagramKind,
    avatars: Vec<u8>,
    counters: Vec<u32>,
    /// Truncate the body of every n-th frame.
    corrupt_every: Option<usize>,
}

impl CapturePlan {
    fn steady(kind: DatagramKind, avatars: &[u8]) -> Self {
        Self {
            kind,
            avatars: avatars.to_vec(),
            counters: (1..=10).collect(),
            corrupt_every: None,
        }
    }
}

fn write_capture(path: &Path, plan: &CapturePlan) -> Result<(), String> {
    let src: SocketAddrV4 = SENDER
        .parse()
        .map_err(|err| format!("bad sender address: {}", err))?;
    let dst: SocketAddrV4 = RECEIVER
        .parse()
        .map_err(|err| format!("bad receiver address: {}", err))?;

    let mut writer = CaptureWriter::new();
    let mut ts_us = 0u64;
    for (idx, counter) in plan.counters.iter().copied().enumerate() {
        for avatar in plan.avatars.iter().copied() {
            let mut frame = build_frame(plan.kind, avatar, counter)?;
            if plan.corrupt_every.is_some_and(|n| (idx + 1) % n == 0) {
                frame.truncate(frame.len() - 3);
            }
            writer
                .push_udp(ts_us, src, dst, &frame)
                .map_err(|err| format!("failed to append frame: {}", err))?;
        }
        ts_us += FRAME_INTERVAL_US;
    }

    writer
        .write_to(path)
        .map_err(|err| format!("failed to write {}: {}", path.display(), err))?;
    println!("wrote {} ({} frames)", path.display(), writer.packet_count());
    Ok(())
}

fn build_frame(kind: DatagramKind, avatar: u8, counter: u32) -> Result<Vec<u8>, String> {
    let records = match kind {
        DatagramKind::TrackerKinematics => TRACKERS,
        _ => SEGMENTS,
    };
    let mut builder = FrameBuilder::new(kind);
    builder
        .avatar(avatar)
        .sample_counter(counter)
        .time_code_ms(counter * 1000 / 60);
    for segment in 1..=records {
        let id = match kind {
            DatagramKind::VirtualMarkers => segment * 256,
            _ => segment,
        };
        let values = record_values(kind, segment, counter);
        builder
            .record(id, &values)
            .map_err(|err| format!("bad fixture record: {}", err))?;
    }
    Ok(builder.build())
}

/// Smoothly varying wire values for one record.
fn record_values(kind: DatagramKind, segment: i32, counter: u32) -> Vec<f32> {
    let phase = counter as f32 * 0.05 + segment as f32 * 0.1;
    let height = segment as f32 * 7.5;
    let half_angle = phase * 0.5;
    let quat = [half_angle.cos(), 0.0, half_angle.sin(), 0.0];
    match kind {
        DatagramKind::EulerPose => vec![phase.sin() * 10.0, height, 0.0, 0.0, phase * 10.0, 0.0],
        DatagramKind::QuaternionPose => {
            let mut values = vec![phase.sin() * 10.0, height, 0.0];
            values.extend_from_slice(&quat);
            values
        }
        DatagramKind::VirtualMarkers => vec![phase.sin() * 10.0, height, 2.0],
        DatagramKind::LinearSegmentKinematics => vec![
            phase.sin() * 0.1,
            height / 100.0,
            0.0,
            phase.cos() * 0.1,
            0.0,
            0.0,
            -phase.sin() * 0.1,
            0.0,
            0.0,
        ],
        DatagramKind::AngularSegmentKinematics => {
            let mut values = quat.to_vec();
            values.extend_from_slice(&[0.0, 0.5, 0.0, 0.0, 0.0, 0.0]);
            values
        }
        DatagramKind::TrackerKinematics => {
            let mut values = quat.to_vec();
            values.extend_from_slice(&[0.0, 0.0, 0.1]);
            values.extend_from_slice(&[0.0, 0.0, 9.9]);
            values.extend_from_slice(&[0.0, 0.5, 0.0]);
            values.extend_from_slice(&[0.3, 0.0, 0.9]);
            values
        }
    }
}
