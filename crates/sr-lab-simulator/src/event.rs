use serde::Serialize;
use std::fmt;

/// Something that happened to a single packet during a round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoundEvent {
    /// Data packet left the sender and reached the receiver.
    Transmitted { id: u32, estimated_time: f64 },
    /// Data packet was lost on the way to the receiver.
    DataLost { id: u32 },
    /// The receiver's ACK was lost on the way back.
    AckLost { id: u32 },
    /// The sender got the ACK and the receiver buffered the packet.
    Acked { id: u32 },
    /// An in-flight packet waited too long.
    Timeout { id: u32 },
    /// Packet goes back to idle with a fresh estimate.
    Rescheduled { id: u32, estimated_time: f64 },
    /// `window_start` moved forward.
    WindowAdvanced { from: u32, to: u32 },
}

impl fmt::Display for RoundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundEvent::Transmitted { id, estimated_time } => {
                write!(f, "Sending packet {id}... (time: {estimated_time:.2})")
            }
            RoundEvent::DataLost { id } => {
                write!(f, "Packet {id} lost during transmission to receiver!")
            }
            RoundEvent::AckLost { id } => write!(f, "ACK for packet {id} lost!"),
            RoundEvent::Acked { id } => write!(f, "Received ACK for packet {id}"),
            RoundEvent::Timeout { id } => write!(f, "Timeout for packet {id}"),
            RoundEvent::Rescheduled { id, estimated_time } => write!(
                f,
                "Will resend packet {id} with new time: {estimated_time:.2}"
            ),
            RoundEvent::WindowAdvanced { from, to } => {
                write!(f, "Window start moved {from} -> {to}")
            }
        }
    }
}
