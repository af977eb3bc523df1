//! Sensor frame model as delivered by the tracking stream.

use serde::Deserialize;
use serde::de::IgnoredAny;

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(from = "[f32; 3]")]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<[f32; 3]> for Vec3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn magnitude(&self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Angle in radians between two vectors; 0 if either has zero length.
    pub fn angle_to(&self, other: &Vec3) -> f32 {
        let denom = self.magnitude() * other.magnitude();
        if denom <= f32::EPSILON {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0).acos()
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Finger {
    pub id: i32,
    pub tip_position: Vec3,
    pub tip_velocity: Vec3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hand {
    pub id: i32,
    #[serde(default)]
    pub fingers: Vec<Finger>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureState {
    Start,
    Update,
    Stop,
}

impl GestureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Update => "update",
            Self::Stop => "stop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GestureKind {
    Circle {
        progress: f32,
        radius: f32,
        normal: Vec3,
        pointable_direction: Vec3,
    },
    Swipe {
        #[serde(default)]
        position: Vec3,
        direction: Vec3,
        speed: f32,
    },
    KeyTap {
        position: Vec3,
        direction: Vec3,
    },
    ScreenTap {
        position: Vec3,
        direction: Vec3,
    },
    /// Any gesture type this build does not know about.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Gesture {
    pub id: i32,
    pub state: GestureState,
    #[serde(flatten)]
    pub kind: GestureKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Frame {
    /// Sensor-assigned identity; also forwarded as the TUIO frame sequence.
    pub id: i64,
    /// Microseconds, sensor clock.
    #[serde(default)]
    pub timestamp: Option<u64>,
    #[serde(default)]
    pub hands: Vec<Hand>,
    /// Tools only count towards "something is in view"; their contents are skipped.
    #[serde(default)]
    pub tools: Vec<IgnoredAny>,
    #[serde(default)]
    pub gestures: Vec<Gesture>,
}

impl Frame {
    pub fn finger_count(&self) -> usize {
        self.hands.iter().map(|h| h.fingers.len()).sum()
    }

    /// Nothing a consumer could be told about.
    pub fn is_empty(&self) -> bool {
        self.finger_count() == 0 && self.tools.is_empty() && self.gestures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_frame() {
        let f: Frame = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert_eq!(f.id, 7);
        assert!(f.hands.is_empty());
        assert!(f.is_empty());
    }

    #[test]
    fn test_parse_gestures() {
        let f: Frame = serde_json::from_str(
            r#"{"id": 1, "gestures": [
                {"type": "circle", "id": 4, "state": "update", "progress": 1.5,
                 "radius": 12.0, "normal": [0, 0, 1], "pointable_direction": [0, 0, 1]},
                {"type": "swipe", "id": 5, "state": "start", "position": [10, 200, -5],
                 "direction": [1, 0, 0], "speed": 300.0},
                {"type": "wave", "id": 6, "state": "stop", "amplitude": 3.0}
            ]}"#,
        )
        .unwrap();
        assert_eq!(f.gestures.len(), 3);
        assert!(matches!(
            f.gestures[0].kind,
            GestureKind::Circle { progress, .. } if progress == 1.5
        ));
        assert_eq!(f.gestures[1].state, GestureState::Start);
        assert!(matches!(
            f.gestures[1].kind,
            GestureKind::Swipe { position, .. } if position == Vec3::new(10.0, 200.0, -5.0)
        ));
        assert_eq!(f.gestures[2].kind, GestureKind::Unknown);
        assert!(!f.is_empty());
    }

    #[test]
    fn test_tools_are_counted_not_kept() {
        let f: Frame = serde_json::from_str(
            r#"{"id": 3, "tools": [
                {"id": 11, "tip_position": [0, 120, 0], "length": 140.5, "width": 3},
                {"id": 12}
            ]}"#,
        )
        .unwrap();
        assert_eq!(f.tools.len(), 2);
        assert_eq!(f.finger_count(), 0);
        assert!(!f.is_empty());
    }

    #[test]
    fn test_fingerless_hands_are_empty() {
        let f: Frame =
            serde_json::from_str(r#"{"id": 2, "hands": [{"id": 1}, {"id": 2, "fingers": []}]}"#)
                .unwrap();
        assert_eq!(f.hands.len(), 2);
        assert_eq!(f.finger_count(), 0);
        assert!(f.is_empty());
    }

    #[test]
    fn test_angle_to() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 2.0, 0.0);
        assert!((a.angle_to(&b) - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!(a.angle_to(&a), 0.0);
        assert_eq!(a.angle_to(&Vec3::default()), 0.0);
    }
}
