use std::fmt::Display;

use bytes::BufMut;
use nom::{number::complete::be_u16, sequence::tuple, IResult};

use super::{domain_name::DomainName, parse_fields, types::QClass, types::QType, WireError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    name: DomainName,
    q_type: QType,
    q_class: QClass,
}

impl Question {
    pub fn new(q_type: QType, q_class: QClass, name: DomainName) -> Self {
        Self {
            name,
            q_type,
            q_class,
        }
    }

    pub fn name(&self) -> &DomainName {
        &self.name
    }

    pub fn q_type(&self) -> &QType {
        &self.q_type
    }

    pub fn q_class(&self) -> &QClass {
        &self.q_class
    }

    pub fn len_in_packet(&self) -> usize {
        4 + self.name.len_in_packet()
    }

    /// Decodes the question at `offset`, returning it with the offset of the next section entry.
    pub fn decode(buffer: &[u8], offset: usize) -> Result<(Self, usize), WireError> {
        let (name, offset) = DomainName::decode(buffer, offset)?;
        let ((q_type, q_class), offset) = parse_fields(buffer, offset, type_and_class)?;
        Ok((
            Self {
                name,
                q_type: QType::from(q_type),
                q_class: QClass::from(q_class),
            },
            offset,
        ))
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        self.name.encode(buf);
        buf.put_u16(self.q_type.as_u16());
        buf.put_u16(self.q_class.as_u16());
    }
}

fn type_and_class(input: &[u8]) -> IResult<&[u8], (u16, u16)> {
    tuple((be_u16, be_u16))(input)
}

impl Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:?} {:?}", self.name, self.q_class, self.q_type)
    }
}
