use std::collections::HashMap;
use std::f32::consts::FRAC_PI_4;
use std::fmt;

use crate::frame::{Gesture, GestureKind, GestureState, Vec3};

/// Circle progress of every circle gesture seen in the previous frame, by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GestureLookback {
    circle_progress: HashMap<i32, f32>,
}

impl GestureLookback {
    pub fn capture(gestures: &[Gesture]) -> Self {
        let circle_progress = gestures
            .iter()
            .filter_map(|g| match g.kind {
                GestureKind::Circle { progress, .. } => Some((g.id, progress)),
                _ => None,
            })
            .collect();
        Self { circle_progress }
    }

    /// 0 when the gesture was not present one frame back.
    pub fn circle_progress(&self, id: i32) -> f32 {
        self.circle_progress.get(&id).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clockwise => "clockwise",
            Self::CounterClockwise => "counterclockwise",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GestureDetail {
    Circle {
        progress: f32,
        radius: f32,
        /// Degrees swept since the previous frame.
        swept_degrees: f32,
        rotation: Rotation,
    },
    Swipe {
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
}

#[derive(Debug, Clone, PartialEq)]
pub struct GestureEvent {
    pub id: i32,
    pub state: GestureState,
    pub detail: GestureDetail,
}

impl fmt::Display for GestureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.as_str();
        match &self.detail {
            GestureDetail::Circle {
                progress,
                radius,
                swept_degrees,
                rotation,
            } => write!(
                f,
                "circle id={} state={state} progress={progress:.3} radius={radius:.1} angle={swept_degrees:.1} {}",
                self.id,
                rotation.as_str()
            ),
            GestureDetail::Swipe {
                position,
                direction,
                speed,
            } => write!(
                f,
                "swipe id={} state={state} position={position} direction={direction} speed={speed:.1}",
                self.id
            ),
            GestureDetail::KeyTap {
                position,
                direction,
            } => write!(
                f,
                "key tap id={} state={state} position={position} direction={direction}",
                self.id
            ),
            GestureDetail::ScreenTap {
                position,
                direction,
            } => write!(
                f,
                "screen tap id={} state={state} position={position} direction={direction}",
                self.id
            ),
        }
    }
}

/// Turns recognized gestures into [`GestureEvent`]s. Unknown kinds yield `None`.
pub fn classify(gesture: &Gesture, previous: &GestureLookback) -> Option<GestureEvent> {
    let detail = match gesture.kind {
        GestureKind::Circle {
            progress,
            radius,
            normal,
            pointable_direction,
        } => {
            let rotation = if pointable_direction.angle_to(&normal) <= FRAC_PI_4 {
                Rotation::Clockwise
            } else {
                Rotation::CounterClockwise
            };
            let swept_degrees = match gesture.state {
                GestureState::Start => 0.0,
                _ => (progress - previous.circle_progress(gesture.id)) * 360.0,
            };
            GestureDetail::Circle {
                progress,
                radius,
                swept_degrees,
                rotation,
            }
        }
        GestureKind::Swipe {
            position,
            direction,
            speed,
        } => GestureDetail::Swipe {
            position,
            direction,
            speed,
        },
        GestureKind::KeyTap {
            position,
            direction,
        } => GestureDetail::KeyTap {
            position,
            direction,
        },
        GestureKind::ScreenTap {
            position,
            direction,
        } => GestureDetail::ScreenTap {
            position,
            direction,
        },
        GestureKind::Unknown => return None,
    };
    Some(GestureEvent {
        id: gesture.id,
        state: gesture.state,
        detail,
    })
}
