use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    /// Rejected before the first round runs.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("packet id {id} is outside the ledger range 1..={len}")]
    UnknownPacket { id: u32, len: u32 },

    #[error("packet {0} was delivered to the receiver twice")]
    DuplicateDelivery(u32),

    #[error("simulation did not finish within {0} rounds")]
    RoundLimitExceeded(u64),
}
