//! The DNS packet header is a struct with an id a few flags and the number of questions, answers,
//! name servers in the authority section, and the number of additional records. The structure is
//! as the following, and multibyte items are in big endian order.
//! ```text
//!                                     1  1  1  1  1  1
//!       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                      ID                       |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    QDCOUNT                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    ANCOUNT                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    NSCOUNT                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!     |                    ARCOUNT                    |
//!     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! ```
//!
//! Every field is kept as read, including values this server does not understand, so
//! [Header::decode] followed by [Header::encode] reproduces the input bit for bit.

use bytes::BufMut;

use super::WireError;

/// A four bit code without a variant of its own. Only the `from_u8` constructors of [Opcode] and
/// [ResponseCode] make one, so an assigned code can never hide in an `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unassigned(u8);

impl Unassigned {
    pub const fn get(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Query,
    InverseQuery,
    Status,
    Other(Unassigned),
}

impl Opcode {
    pub const fn as_u8(&self) -> u8 {
        match self {
            Opcode::Query => 0,
            Opcode::InverseQuery => 1,
            Opcode::Status => 2,
            Opcode::Other(code) => code.get(),
        }
    }

    pub const fn from_u8(code: u8) -> Self {
        match code & 0xf {
            0 => Opcode::Query,
            1 => Opcode::InverseQuery,
            2 => Opcode::Status,
            code => Opcode::Other(Unassigned(code)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Query,
    Response,
}

impl PacketType {
    pub const fn as_u8(&self) -> u8 {
        match self {
            Self::Query => 0,
            Self::Response => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    /// No error condition
    None,
    /// The name server was unable to interpret the query.
    FormatError,
    /// The name server was unable to process this query due to
    /// a problem with the name server.
    ServerFailure,
    /// Meaningful only for responses from an authoritative name
    /// server, this code signifies that the domain name referenced
    /// in the query does not exist.
    NameError,
    /// The name server does not support the requested kind of query.
    NotImplemented,
    /// The name server refuses to perform the specified operation
    /// for policy reasons.
    Refused,
    Other(Unassigned),
}

impl ResponseCode {
    pub const fn as_u8(&self) -> u8 {
        match self {
            ResponseCode::None => 0,
            ResponseCode::FormatError => 1,
            ResponseCode::ServerFailure => 2,
            ResponseCode::NameError => 3,
            ResponseCode::NotImplemented => 4,
            ResponseCode::Refused => 5,
            ResponseCode::Other(code) => code.get(),
        }
    }

    pub const fn from_u8(code: u8) -> Self {
        match code & 0xf {
            0 => ResponseCode::None,
            1 => ResponseCode::FormatError,
            2 => ResponseCode::ServerFailure,
            3 => ResponseCode::NameError,
            4 => ResponseCode::NotImplemented,
            5 => ResponseCode::Refused,
            code => ResponseCode::Other(Unassigned(code)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// A 16 bit identifier assigned by the program that
    /// generates any kind of query.  This identifier is copied
    /// the corresponding reply and can be used by the requester
    /// to match up replies to outstanding queries.
    ///
    /// Field: ID
    pub id: u16,

    /// A one bit field that specifies whether this message is a
    /// query (0), or a response (1).
    ///
    /// Field: QR
    pub packet_type: PacketType,

    /// A four bit field that specifies kind of query in this
    /// message.  This value is set by the originator of a query
    /// and copied into the response.
    ///
    /// Field: Opcode
    pub opcode: Opcode,

    /// Authoritative Answer - this bit is valid in responses,
    /// and specifies that the responding name server is an
    /// authority for the domain name in question section.
    ///
    /// Field: AA
    pub authoritative_answer: bool,

    /// TrunCation - specifies that this message was truncated
    /// due to length greater than that permitted on the
    /// transmission channel.
    ///
    /// Field: TC
    pub truncated: bool,

    /// Recursion Desired - this bit may be set in a query and
    /// is copied into the response.
    ///
    /// Field: RD
    pub recursion_desired: bool,

    /// Recursion Available - this be is set or cleared in a
    /// response, and denotes whether recursive query support is
    /// available in the name server.
    ///
    /// Field: RA
    pub recursion_available: bool,

    /// Reserved for future use. Three bits, carried through untouched.
    ///
    /// Field: Z
    pub reserved: u8,

    /// Response code - this 4 bit field is set as part of responses.
    ///
    /// Field: RCODE
    pub response_code: ResponseCode,

    /// Field: QDCOUNT
    pub question_entries: u16,

    /// Field: ANCOUNT
    pub answer_entries: u16,

    /// Field: NSCOUNT
    pub authority_entries: u16,

    /// Field: ARCOUNT
    pub additional_entries: u16,
}

impl Header {
    pub const SIZE: usize = 12;

    pub fn new(id: u16) -> Self {
        Self {
            id,
            packet_type: PacketType::Query,
            opcode: Opcode::Query,
            authoritative_answer: false,
            truncated: false,
            recursion_desired: false,
            recursion_available: false,
            reserved: 0,
            response_code: ResponseCode::None,
            question_entries: 0,
            answer_entries: 0,
            authority_entries: 0,
            additional_entries: 0,
        }
    }

    pub fn decode(buffer: &[u8]) -> Result<Self, WireError> {
        if buffer.len() < Self::SIZE {
            return Err(WireError::truncated(buffer, buffer.len()));
        }
        Ok(Self {
            id: u16::from_be_bytes([buffer[0], buffer[1]]),
            packet_type: if (buffer[2] & 0x80) == 0x80 {
                PacketType::Response
            } else {
                PacketType::Query
            },
            opcode: Opcode::from_u8(buffer[2] >> 3),
            authoritative_answer: (buffer[2] & 4) == 4,
            truncated: (buffer[2] & 2) == 2,
            recursion_desired: (buffer[2] & 1) == 1,
            recursion_available: (buffer[3] & 0x80) == 0x80,
            reserved: (buffer[3] >> 4) & 0x7,
            response_code: ResponseCode::from_u8(buffer[3]),
            question_entries: u16::from_be_bytes([buffer[4], buffer[5]]),
            answer_entries: u16::from_be_bytes([buffer[6], buffer[7]]),
            authority_entries: u16::from_be_bytes([buffer[8], buffer[9]]),
            additional_entries: u16::from_be_bytes([buffer[10], buffer[11]]),
        })
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u16(self.id);
        buf.put_u8(
            (self.packet_type.as_u8() << 7)
                | (self.opcode.as_u8() << 3)
                | ((self.authoritative_answer as u8) << 2)
                | ((self.truncated as u8) << 1)
                | (self.recursion_desired as u8),
        );
        buf.put_u8(
            ((self.recursion_available as u8) << 7)
                | ((self.reserved & 0x7) << 4)
                | self.response_code.as_u8(),
        );
        buf.put_u16(self.question_entries);
        buf.put_u16(self.answer_entries);
        buf.put_u16(self.authority_entries);
        buf.put_u16(self.additional_entries);
    }
}
