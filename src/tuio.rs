//! TUIO 1.1 `/tuio/2Dcur` bundle assembly on top of `rosc`.
//!
//! A frame becomes one bundle: every `set`, then `alive`, then `fseq`.
//! Consumers treat `alive`/`fseq` as the end of the update batch, so that
//! order is fixed.

use anyhow::Result;
use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType, encoder};

use crate::identity::CursorId;

pub const CURSOR_2D_ADDR: &str = "/tuio/2Dcur";

/// One `set` message worth of cursor state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorUpdate {
    pub id: CursorId,
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub accel: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TuioMessage {
    Set(CursorUpdate),
    Alive(Vec<CursorId>),
    Fseq(i32),
}

impl TuioMessage {
    pub fn command(&self) -> &'static str {
        match self {
            Self::Set(_) => "set",
            Self::Alive(_) => "alive",
            Self::Fseq(_) => "fseq",
        }
    }

    pub fn to_osc(&self) -> OscMessage {
        let mut args = vec![OscType::String(self.command().to_string())];
        match self {
            Self::Set(c) => args.extend([
                OscType::Int(c.id),
                OscType::Float(c.x),
                OscType::Float(c.y),
                OscType::Float(c.dx),
                OscType::Float(c.dy),
                OscType::Float(c.accel),
            ]),
            Self::Alive(ids) => args.extend(ids.iter().map(|id| OscType::Int(*id))),
            Self::Fseq(seq) => args.push(OscType::Int(*seq)),
        }
        OscMessage {
            addr: CURSOR_2D_ADDR.to_string(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TuioBundle {
    pub messages: Vec<TuioMessage>,
}

impl TuioBundle {
    pub fn to_osc(&self) -> OscPacket {
        OscPacket::Bundle(OscBundle {
            // "immediately"
            timetag: OscTime {
                seconds: 0,
                fractional: 1,
            },
            content: self
                .messages
                .iter()
                .map(|m| OscPacket::Message(m.to_osc()))
                .collect(),
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(encoder::encode(&self.to_osc())?)
    }

    pub fn cursor_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m, TuioMessage::Set(_)))
            .count()
    }
}

/// Packs one frame's cursor state into a bundle.
#[derive(Debug, Default)]
pub struct BundleEncoder;

impl BundleEncoder {
    /// Sensor frame ids are 64-bit; TUIO carries int32, so the id is truncated.
    pub fn fseq(frame_id: i64) -> i32 {
        frame_id as i32
    }

    pub fn bundle(&self, cursors: &[CursorUpdate], alive: &[CursorId], frame_id: i64) -> TuioBundle {
        let mut messages = Vec::with_capacity(cursors.len() + 2);
        messages.extend(cursors.iter().copied().map(TuioMessage::Set));
        messages.push(TuioMessage::Alive(alive.to_vec()));
        messages.push(TuioMessage::Fseq(Self::fseq(frame_id)));
        TuioBundle { messages }
    }
}
