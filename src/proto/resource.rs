use std::{fmt::Display, net::Ipv4Addr};

use bytes::{BufMut, Bytes};
use nom::{
    multi::length_data,
    number::complete::{be_u16, be_u32},
    sequence::tuple,
    IResult,
};

use super::{
    domain_name::DomainName,
    parse_fields,
    types::{Class, Type},
    WireError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    name: DomainName,
    typ: Type,
    class: Class,
    ttl: u32,
    data: Bytes,
}

impl Resource {
    /// Fails when `data` does not fit the 16 bit RDLENGTH field.
    pub fn new(
        name: DomainName,
        typ: Type,
        class: Class,
        ttl: u32,
        data: Bytes,
    ) -> Result<Self, WireError> {
        if u16::try_from(data.len()).is_err() {
            return Err(WireError::DataTooLong(data.len()));
        }
        Ok(Self {
            name,
            typ,
            class,
            ttl,
            data,
        })
    }

    pub fn name(&self) -> &DomainName {
        &self.name
    }

    pub fn typ(&self) -> &Type {
        &self.typ
    }

    pub fn class(&self) -> &Class {
        &self.class
    }

    pub fn ttl(&self) -> &u32 {
        &self.ttl
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The RDLENGTH written for this record. [Resource::new] and [Resource::decode] keep the data
    /// within range, so this never truncates.
    pub fn data_len(&self) -> u16 {
        self.data.len() as u16
    }

    pub fn len_in_packet(&self) -> usize {
        10 + self.name.len_in_packet() + self.data.len()
    }

    /// Decodes the record at `offset`, returning it with the offset of the next section entry.
    /// The data is copied out of `buffer` as is; names inside it are not decompressed.
    pub fn decode(buffer: &[u8], offset: usize) -> Result<(Self, usize), WireError> {
        let (name, offset) = DomainName::decode(buffer, offset)?;
        let ((typ, class, ttl, data), offset) = parse_fields(buffer, offset, record_fields)?;
        Ok((
            Self {
                name,
                typ: Type::from(typ),
                class: Class::from(class),
                ttl,
                data: Bytes::copy_from_slice(data),
            },
            offset,
        ))
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        self.name.encode(buf);
        buf.put_u16(self.typ.as_u16());
        buf.put_u16(self.class.as_u16());
        buf.put_u32(self.ttl);
        buf.put_u16(self.data_len());
        buf.put_slice(&self.data);
    }
}

fn record_fields(input: &[u8]) -> IResult<&[u8], (u16, u16, u32, &[u8])> {
    tuple((be_u16, be_u16, be_u32, length_data(be_u16)))(input)
}

impl Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {:?} {:?}",
            self.name, self.ttl, self.class, self.typ
        )
    }
}

/// An IN A record, the only kind of answer this server makes up itself.
pub struct ARecord {
    ttl: u32,
    addr: Ipv4Addr,
}

impl ARecord {
    pub fn new(ttl: u32, addr: Ipv4Addr) -> Self {
        Self { ttl, addr }
    }

    pub fn to_resource(&self, name: DomainName) -> Resource {
        Resource {
            name,
            typ: Type::A,
            class: Class::IN,
            ttl: self.ttl,
            data: Bytes::copy_from_slice(&self.addr.octets()),
        }
    }
}
