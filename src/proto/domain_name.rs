use std::{fmt::Display, str::FromStr};

use bytes::BufMut;

use super::{
    label::{Label, LabelParseResult},
    NameFault, WireError,
};

/// The maximum number of bytes a name may take in a packet, length octets included.
pub const MAX_NAME_SIZE: usize = 255;

/// The maximum number of compression pointers followed while decoding a single name. A name of
/// [MAX_NAME_SIZE] bytes has at most 127 labels, so one pointer per label always fits.
pub const MAX_POINTER_HOPS: usize = 128;

#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
pub struct DomainName(Vec<Label>);

impl DomainName {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_labels(labels: Vec<Label>) -> Result<Self, WireError> {
        let name = Self(labels);
        if name.len_in_packet() > MAX_NAME_SIZE {
            return Err(WireError::NameTooLong(name.len_in_packet()));
        }
        Ok(name)
    }

    pub fn labels(&self) -> &[Label] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Size of the uncompressed name, which is how it is always written.
    pub fn len_in_packet(&self) -> usize {
        1 + self.0.iter().map(|label| label.len() + 1).sum::<usize>()
    }

    /// Decodes the name starting at `offset`, following compression pointers anywhere in
    /// `buffer`. Returns the name and the offset of the first byte after it: just past the
    /// terminating zero octet, or two bytes past the first pointer if one was followed.
    pub fn decode(buffer: &[u8], offset: usize) -> Result<(Self, usize), WireError> {
        let mut cursor = offset;
        let mut labels = Vec::new();
        let mut size = 1;
        let mut resume_at = None;
        let mut visited: Vec<usize> = Vec::new();

        loop {
            match Label::parse(buffer, cursor)? {
                (label_size, LabelParseResult::Label(label)) => {
                    size += label_size;
                    if size > MAX_NAME_SIZE {
                        return Err(WireError::malformed(offset, NameFault::TooLong));
                    }
                    labels.push(label);
                    cursor += label_size;
                }
                (pointer_size, LabelParseResult::Pointer(target)) => {
                    if resume_at.is_none() {
                        resume_at = Some(cursor + pointer_size);
                    }
                    if visited.contains(&target) {
                        return Err(WireError::malformed(cursor, NameFault::PointerLoop(target)));
                    }
                    if visited.len() == MAX_POINTER_HOPS {
                        return Err(WireError::malformed(cursor, NameFault::TooManyPointers));
                    }
                    visited.push(target);
                    cursor = target;
                }
                (end_size, LabelParseResult::End) => {
                    let next = resume_at.unwrap_or(cursor + end_size);
                    return Ok((Self(labels), next));
                }
            }
        }
    }

    /// Writes the name as length prefixed labels followed by a zero octet. Pointers are never
    /// emitted.
    pub fn encode(&self, buf: &mut impl BufMut) {
        for label in &self.0 {
            label.encode(buf);
        }
        buf.put_u8(0);
    }
}

impl FromStr for DomainName {
    type Err = WireError;

    /// Splits on `.`. A single trailing dot is allowed, and both `""` and `"."` are the root.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_suffix('.').unwrap_or(s);
        if s.is_empty() {
            return Ok(Self::root());
        }
        let labels = s.split('.').map(Label::new).collect::<Result<Vec<_>, _>>()?;
        Self::from_labels(labels)
    }
}

impl Display for DomainName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, ".");
        }
        for (i, label) in self.0.iter().enumerate() {
            if i != 0 {
                write!(f, ".")?;
            }
            write!(f, "{label}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use bytes::BytesMut;

    use super::*;

    fn name(s: &str) -> DomainName {
        s.parse().unwrap()
    }

    #[test]
    fn decodes_plain_name() {
        let buffer = b"\x0ccodecrafters\x02io\x00\xff";
        let (decoded, next) = DomainName::decode(buffer, 0).unwrap();
        assert_eq!(decoded.to_string(), "codecrafters.io");
        assert_eq!(next, 17);
    }

    #[test]
    fn decodes_root() {
        let (decoded, next) = DomainName::decode(b"\x00", 0).unwrap();
        assert!(decoded.is_root());
        assert_eq!(next, 1);
    }

    #[test]
    fn pointer_decodes_like_its_target() {
        // 0: "abc.longassdomainname.com", 27: "def" + pointer to 4
        let mut buffer = Vec::new();
        buffer.extend_from_slice(b"\x03abc\x11longassdomainname\x03com\x00");
        let second = buffer.len();
        buffer.extend_from_slice(b"\x03def\xc0\x04");
        buffer.extend_from_slice(b"\xc0\x00");

        let (target, _) = DomainName::decode(&buffer, 4).unwrap();
        assert_eq!(target.to_string(), "longassdomainname.com");

        let (compressed, next) = DomainName::decode(&buffer, second).unwrap();
        assert_eq!(compressed.to_string(), "def.longassdomainname.com");
        assert_eq!(next, second + 6);

        let (whole, next) = DomainName::decode(&buffer, second + 6).unwrap();
        assert_eq!(whole, DomainName::decode(&buffer, 0).unwrap().0);
        assert_eq!(next, second + 8);
    }

    #[test]
    fn self_pointer_is_malformed() {
        let buffer = [0u8, 0, 0xc0, 0x02];
        assert_eq!(
            DomainName::decode(&buffer, 2),
            Err(WireError::MalformedName {
                offset: 2,
                fault: NameFault::PointerLoop(2)
            })
        );
    }

    #[test]
    fn pointer_cycle_is_malformed() {
        // 0 -> label "a" then pointer to 5, 5 -> label "b" then pointer to 0
        let buffer = b"\x01a\xc0\x05\x00\x01b\xc0\x00";
        assert!(matches!(
            DomainName::decode(buffer, 0),
            Err(WireError::MalformedName {
                fault: NameFault::PointerLoop(_),
                ..
            })
        ));
    }

    #[test]
    fn long_pointer_chain_is_capped() {
        // every pointer jumps two bytes back, ending in a root at offset 0
        let mut buffer = vec![0u8];
        for i in 0..=MAX_POINTER_HOPS {
            let target = if i == 0 { 0 } else { 1 + (i - 1) * 2 };
            buffer.extend_from_slice(&(0xc000 | target as u16).to_be_bytes());
        }
        let start = buffer.len() - 2;
        assert!(matches!(
            DomainName::decode(&buffer, start),
            Err(WireError::MalformedName {
                fault: NameFault::TooManyPointers,
                ..
            })
        ));
        // one hop fewer is fine
        assert!(DomainName::decode(&buffer, start - 2).is_ok());
    }

    #[test]
    fn longest_name_with_a_pointer_per_label() {
        // 127 one byte labels, each followed by a pointer to the next: 255 bytes once expanded
        let mut buffer = Vec::new();
        for i in 0..127u16 {
            buffer.extend_from_slice(b"\x01a");
            buffer.extend_from_slice(&(0xc000 | ((i + 1) * 4)).to_be_bytes());
        }
        buffer.push(0);

        let (decoded, next) = DomainName::decode(&buffer, 0).unwrap();
        assert_eq!(decoded.labels().len(), 127);
        assert_eq!(decoded.len_in_packet(), MAX_NAME_SIZE);
        assert_eq!(next, 4);
    }

    #[test]
    fn pointer_past_end_is_malformed() {
        assert!(matches!(
            DomainName::decode(b"\x01a\xc0\x09", 0),
            Err(WireError::MalformedName {
                offset: 2,
                fault: NameFault::PointerOutOfBounds(9),
            })
        ));
    }

    #[test]
    fn oversized_name_is_malformed() {
        let mut buffer = Vec::new();
        for _ in 0..5 {
            buffer.push(63);
            buffer.extend_from_slice(&[b'a'; 63]);
        }
        buffer.push(0);
        assert!(matches!(
            DomainName::decode(&buffer, 0),
            Err(WireError::MalformedName {
                fault: NameFault::TooLong,
                ..
            })
        ));
    }

    #[test]
    fn missing_terminator_is_truncation() {
        assert_eq!(
            DomainName::decode(b"\x01a", 0),
            Err(WireError::TruncatedInput { offset: 2, len: 2 })
        );
    }

    #[test]
    fn encodes_uncompressed() {
        let mut buf = BytesMut::new();
        name("codecrafters.io").encode(&mut buf);
        assert_eq!(&buf[..], b"\x0ccodecrafters\x02io\x00");

        let mut buf = BytesMut::new();
        DomainName::root().encode(&mut buf);
        assert_eq!(&buf[..], b"\x00");
    }

    #[test]
    fn parses_text() {
        assert_eq!(name("codecrafters.io."), name("codecrafters.io"));
        assert_eq!(name("."), DomainName::root());
        assert_eq!(name("codecrafters.io").len_in_packet(), 17);
        assert_eq!(
            "a..b".parse::<DomainName>(),
            Err(WireError::EmptyLabel)
        );
        let long = vec!["a".repeat(63); 4].join(".");
        assert_eq!(long.parse::<DomainName>(), Err(WireError::NameTooLong(257)));
    }
}
