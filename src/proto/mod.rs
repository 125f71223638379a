mod domain_name;
mod header;
mod label;
mod macros;
mod packet;
mod question;
mod resource;
mod types;

pub use self::domain_name::{DomainName, MAX_NAME_SIZE, MAX_POINTER_HOPS};
pub use self::header::{Header, Opcode, PacketType, ResponseCode, Unassigned};
pub use self::label::{Label, MAX_LABEL_SIZE};
pub use self::packet::{Packet, PacketBuilder};
pub use self::question::Question;
pub use self::resource::{ARecord, Resource};
pub use self::types::{Class, QClass, QType, Type};

use nom::Parser;
use thiserror::Error;

/// The largest datagram read from a client or an upstream resolver.
pub const MAX_MESSAGE_SIZE: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("The packet ended at byte {len} while reading a field at offset {offset}")]
    TruncatedInput { offset: usize, len: usize },
    #[error("The domain name at offset {offset} is malformed: {fault}")]
    MalformedName { offset: usize, fault: NameFault },
    #[error("The label is {0} bytes long, the maximum is 63")]
    LabelTooLong(usize),
    #[error("The name takes {0} bytes in a packet, the maximum is 255")]
    NameTooLong(usize),
    #[error("The name contains an empty label")]
    EmptyLabel,
    #[error("The record data is {0} bytes long, the maximum is 65535")]
    DataTooLong(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NameFault {
    #[error("the pointer to {0} was already followed")]
    PointerLoop(usize),
    #[error("more than 128 pointers were followed")]
    TooManyPointers,
    #[error("the pointer to {0} is past the end of the packet")]
    PointerOutOfBounds(usize),
    #[error("a label of {0} bytes runs past the end of the packet")]
    LabelOutOfBounds(usize),
    #[error("the length octet {0:#04x} uses a reserved label type")]
    ReservedLabelType(u8),
    #[error("the name is longer than 255 bytes")]
    TooLong,
}

impl WireError {
    pub(crate) const fn truncated(buffer: &[u8], offset: usize) -> Self {
        Self::TruncatedInput {
            offset,
            len: buffer.len(),
        }
    }

    pub(crate) const fn malformed(offset: usize, fault: NameFault) -> Self {
        Self::MalformedName { offset, fault }
    }
}

/// Runs a nom parser over the fixed-size fields starting at `offset`, returning the parsed value
/// and the offset just past it. Running out of input is reported as [WireError::TruncatedInput].
pub(crate) fn parse_fields<'data, O, P>(
    buffer: &'data [u8],
    offset: usize,
    mut parser: P,
) -> Result<(O, usize), WireError>
where
    P: Parser<&'data [u8], O, nom::error::Error<&'data [u8]>>,
{
    let input = buffer.get(offset..).unwrap_or_default();
    match parser.parse(input) {
        Ok((rest, value)) => Ok((value, offset + (input.len() - rest.len()))),
        Err(_) => Err(WireError::truncated(buffer, offset)),
    }
}
