//! Recorded tracking traces.
//!
//! A trace is a JSON document (optionally gzip-compressed, `.json.gz`)
//! holding one record per host tick. Rotations are stored `[x, y, z, w]`.
//! A frame carrying a `release` pose asks the replayer for a release
//! velocity of that object after the frame has been ingested.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use nalgebra::{Quaternion, UnitQuaternion};
use serde::{Deserialize, Serialize};

use crate::error::{VelocityError, VelocityResult};
use crate::types::{Pose, ReleaseVelocityInformation, TrackingFrame, Vec3};

fn default_true() -> bool {
    true
}

fn identity_rotation() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    pub position: [f64; 3],
    #[serde(default = "identity_rotation")]
    pub rotation: [f64; 4],
}

impl PoseRecord {
    pub fn to_pose(&self) -> VelocityResult<Pose> {
        let [x, y, z, w] = self.rotation;
        let rotation = UnitQuaternion::try_new(Quaternion::new(w, x, y, z), 1e-9).ok_or_else(|| {
            VelocityError::Trace(format!("degenerate rotation {:?}", self.rotation))
        })?;
        Ok(Pose::new(Vec3::from(self.position), rotation))
    }

    pub fn from_pose(pose: &Pose) -> Self {
        let q = pose.rotation.quaternion();
        PoseRecord {
            position: [pose.position.x, pose.position.y, pose.position.z],
            rotation: [q.i, q.j, q.k, q.w],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameRecord {
    pub time: f64,
    #[serde(default = "default_true")]
    pub tracked: bool,
    #[serde(default = "default_true")]
    pub high_confidence: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<PoseRecord>,
}

impl FrameRecord {
    pub fn from_frame(frame: &TrackingFrame, release: Option<&Pose>) -> Self {
        let root = frame.root_pose.as_ref().map(PoseRecord::from_pose);
        FrameRecord {
            time: frame.time,
            tracked: frame.root_pose.is_some(),
            high_confidence: frame.high_confidence,
            position: root.as_ref().map(|r| r.position),
            rotation: root.as_ref().map(|r| r.rotation),
            release: release.map(PoseRecord::from_pose),
        }
    }

    pub fn to_frame(&self) -> VelocityResult<TrackingFrame> {
        let root_pose = if self.tracked {
            let position = self.position.ok_or_else(|| {
                VelocityError::Trace(format!("tracked frame at t={} has no position", self.time))
            })?;
            let record = PoseRecord {
                position,
                rotation: self.rotation.unwrap_or_else(identity_rotation),
            };
            Some(record.to_pose()?)
        } else {
            None
        };

        Ok(TrackingFrame {
            time: self.time,
            root_pose,
            high_confidence: self.high_confidence,
        })
    }

    pub fn release_pose(&self) -> VelocityResult<Option<Pose>> {
        self.release.as_ref().map(PoseRecord::to_pose).transpose()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PoseTrace {
    pub frames: Vec<FrameRecord>,
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

pub fn load_trace(path: &Path) -> VelocityResult<PoseTrace> {
    let to_error = |e: String| VelocityError::Trace(format!("{}: {}", path.display(), e));

    let file = File::open(path).map_err(|e| to_error(e.to_string()))?;
    let trace = if is_gzip(path) {
        let reader = BufReader::new(GzDecoder::new(file));
        serde_json::from_reader(reader)
    } else {
        serde_json::from_reader(BufReader::new(file))
    };
    trace.map_err(|e| to_error(e.to_string()))
}

pub fn save_trace(path: &Path, trace: &PoseTrace) -> VelocityResult<()> {
    let to_error = |e: String| VelocityError::Trace(format!("{}: {}", path.display(), e));

    let file = File::create(path).map_err(|e| to_error(e.to_string()))?;
    if is_gzip(path) {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        serde_json::to_writer(&mut encoder, trace).map_err(|e| to_error(e.to_string()))?;
        encoder
            .finish()
            .and_then(|mut inner| inner.flush())
            .map_err(|e| to_error(e.to_string()))
    } else {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, trace).map_err(|e| to_error(e.to_string()))?;
        writer.flush().map_err(|e| to_error(e.to_string()))
    }
}

/// Flattened release estimate for JSON reports.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub time: f64,
    pub linear_velocity: [f64; 3],
    pub angular_velocity: [f64; 3],
    pub position: [f64; 3],
    pub speed: f64,
    pub angular_speed: f64,
    pub valid: bool,
}

impl ReleaseRecord {
    pub fn new(time: f64, info: &ReleaseVelocityInformation) -> Self {
        let flat = |v: &Vec3| [v.x, v.y, v.z];
        ReleaseRecord {
            time,
            linear_velocity: flat(&info.linear_velocity),
            angular_velocity: flat(&info.angular_velocity),
            position: flat(&info.position),
            speed: info.linear_velocity.norm(),
            angular_speed: info.angular_velocity.norm(),
            valid: info.valid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rotation;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_minimal_trace() {
        let json = r#"{
            "frames": [
                { "time": 0.0, "position": [0, 0, 0] },
                { "time": 0.01, "tracked": false },
                { "time": 0.02, "position": [1, 2, 3], "rotation": [0, 0.7071068, 0, 0.7071068],
                  "high_confidence": false,
                  "release": { "position": [1, 2, 3.5] } }
            ]
        }"#;
        let trace: PoseTrace = serde_json::from_str(json).unwrap();
        assert_eq!(trace.frames.len(), 3);

        let first = trace.frames[0].to_frame().unwrap();
        assert!(first.high_confidence);
        assert_eq!(first.root_pose.unwrap(), Pose::identity());

        let lost = trace.frames[1].to_frame().unwrap();
        assert!(lost.root_pose.is_none());

        let third = trace.frames[2].to_frame().unwrap();
        assert!(!third.high_confidence);
        // [x, y, z, w] order: 90° about +Y
        let root = third.root_pose.unwrap();
        assert_relative_eq!(root.rotation.angle(), std::f64::consts::FRAC_PI_2, epsilon = 1e-6);
        assert_relative_eq!(root.rotation.axis().unwrap().y, 1.0, epsilon = 1e-6);

        let release = trace.frames[2].release_pose().unwrap().unwrap();
        assert_eq!(release.position, Vec3::new(1.0, 2.0, 3.5));
        assert_eq!(release.rotation, Rotation::identity());
    }

    #[test]
    fn test_tracked_frame_requires_position() {
        let record: FrameRecord = serde_json::from_str(r#"{ "time": 1.0 }"#).unwrap();
        assert!(matches!(record.to_frame(), Err(VelocityError::Trace(_))));
    }

    #[test]
    fn test_zero_quaternion_rejected() {
        let record = PoseRecord {
            position: [0.0; 3],
            rotation: [0.0; 4],
        };
        assert!(record.to_pose().is_err());
    }

    #[test]
    fn test_frame_record_preserves_pose() {
        let pose = Pose::new(
            Vec3::new(0.1, 0.2, 0.3),
            Rotation::from_axis_angle(&Vec3::x_axis(), 0.7),
        );
        let record = FrameRecord::from_frame(&TrackingFrame::tracked(2.0, pose), Some(&pose));
        let frame = record.to_frame().unwrap();

        let restored = frame.root_pose.unwrap();
        assert_relative_eq!(restored.position, pose.position, epsilon = 1e-12);
        assert_relative_eq!(restored.rotation.angle_to(&pose.rotation), 0.0, epsilon = 1e-9);
        assert!(record.release_pose().unwrap().is_some());
    }

    #[test]
    fn test_save_and_load_gzip() {
        let path = std::env::temp_dir().join(format!("release_trace_{}.json.gz", std::process::id()));
        let trace = PoseTrace {
            frames: vec![FrameRecord::from_frame(&TrackingFrame::lost(0.5), None)],
        };

        save_trace(&path, &trace).unwrap();
        let loaded = load_trace(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.frames.len(), 1);
        assert!(!loaded.frames[0].tracked);
        assert_eq!(loaded.frames[0].time, 0.5);
    }

    #[test]
    fn test_release_record_magnitudes() {
        let info = ReleaseVelocityInformation {
            linear_velocity: Vec3::new(3.0, 4.0, 0.0),
            angular_velocity: Vec3::new(0.0, 0.0, 2.0),
            position: Vec3::zeros(),
            valid: true,
        };
        let record = ReleaseRecord::new(1.0, &info);
        assert_relative_eq!(record.speed, 5.0);
        assert_relative_eq!(record.angular_speed, 2.0);
    }
}
