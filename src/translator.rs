//! Per-frame translation from sensor frames to TUIO cursor state.

use log::{debug, trace};

use crate::frame::Frame;
use crate::gestures::{self, GestureEvent, GestureLookback};
use crate::identity::{CursorId, IdentityTracker};
use crate::mapper::CoordinateMapper;
use crate::tuio::CursorUpdate;

/// Reference divisor taking sensor velocity (mm/s) into a usable TUIO delta.
/// Picked by eye, not derived.
pub const DEFAULT_VELOCITY_SCALE: f32 = 400.0;

#[derive(Debug, Clone)]
struct PreviousFrame {
    id: i64,
    gestures: GestureLookback,
}

#[derive(Debug, Clone)]
enum TranslatorState {
    Idle,
    Tracking(PreviousFrame),
}

/// Everything one frame has to say.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame_id: i64,
    pub cursors: Vec<CursorUpdate>,
    pub alive: Vec<CursorId>,
    pub gestures: Vec<GestureEvent>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    /// Same sensor frame as last time.
    Duplicate,
    /// No fingers, tools or gestures.
    Empty,
    Report(FrameReport),
}

#[derive(Debug)]
pub struct FrameTranslator {
    mapper: CoordinateMapper,
    ids: IdentityTracker,
    velocity_scale: f32,
    state: TranslatorState,
}

impl FrameTranslator {
    pub fn new(mapper: CoordinateMapper, ids: IdentityTracker, velocity_scale: f32) -> Self {
        Self {
            mapper,
            ids,
            velocity_scale,
            state: TranslatorState::Idle,
        }
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    /// Swap id and velocity settings in place. The previous frame is kept so
    /// duplicate suppression and gesture lookback carry across a reload.
    pub fn reconfigure(&mut self, ids: IdentityTracker, velocity_scale: f32) {
        self.ids = ids;
        self.velocity_scale = velocity_scale;
    }

    /// Drops whatever volume the current mapper has learned.
    pub fn replace_mapper(&mut self, mapper: CoordinateMapper) {
        self.mapper = mapper;
    }

    pub fn process(&mut self, frame: &Frame) -> Translation {
        let previous = match &self.state {
            TranslatorState::Tracking(prev) if prev.id == frame.id => return Translation::Duplicate,
            TranslatorState::Tracking(prev) => prev.gestures.clone(),
            TranslatorState::Idle => GestureLookback::default(),
        };
        self.state = TranslatorState::Tracking(PreviousFrame {
            id: frame.id,
            gestures: GestureLookback::capture(&frame.gestures),
        });

        if frame.is_empty() {
            trace!("frame {} is empty", frame.id);
            return Translation::Empty;
        }

        let mut cursors = Vec::with_capacity(frame.finger_count());
        let mut alive = Vec::with_capacity(frame.finger_count());
        for hand in frame.hands.iter().filter(|h| !h.fingers.is_empty()) {
            for finger in &hand.fingers {
                let id = self.ids.cursor_id(hand.id, finger.id);
                let pos = self.mapper.map(&finger.tip_position);
                cursors.push(CursorUpdate {
                    id,
                    x: pos.x,
                    y: pos.y,
                    dx: finger.tip_velocity.x / self.velocity_scale,
                    dy: finger.tip_velocity.y / self.velocity_scale,
                    accel: 0.0,
                });
                alive.push(id);
            }
            if self.mapper.is_adaptive() {
                let v = self.mapper.volume();
                debug!("volume min={} max={}", v.min, v.max);
            }
        }

        let gestures = frame
            .gestures
            .iter()
            .filter_map(|g| gestures::classify(g, &previous))
            .collect();

        Translation::Report(FrameReport {
            frame_id: frame.id,
            cursors,
            alive,
            gestures,
        })
    }
}
