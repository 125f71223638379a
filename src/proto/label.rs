use std::{fmt::Display, hash::Hash};

use bytes::BufMut;

use super::{NameFault, WireError};

pub const MAX_LABEL_SIZE: usize = 63;

/// One segment of a domain name. The bytes are kept exactly as they appeared on the wire;
/// comparison and hashing ignore ASCII case.
#[derive(Debug, Clone)]
pub struct Label(Box<[u8]>);

pub(super) enum LabelParseResult {
    Label(Label),
    Pointer(usize),
    End,
}

impl Label {
    pub fn new(label: &str) -> Result<Self, WireError> {
        if label.is_empty() {
            return Err(WireError::EmptyLabel);
        }
        if label.len() > MAX_LABEL_SIZE {
            return Err(WireError::LabelTooLong(label.len()));
        }
        Ok(Self(Box::from(label.as_bytes())))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Reads whatever starts at `offset`: a label, a compression pointer or the terminating zero
    /// octet. The returned size is the number of bytes the item occupies at `offset`.
    pub(super) fn parse(
        buffer: &[u8],
        offset: usize,
    ) -> Result<(usize, LabelParseResult), WireError> {
        use LabelParseResult::*;

        let Some(&len) = buffer.get(offset) else {
            return Err(WireError::truncated(buffer, offset));
        };
        if len == 0 {
            return Ok((1, End));
        }
        if let Some(upper) = label_pointer(len) {
            let Some(&lower) = buffer.get(offset + 1) else {
                return Err(WireError::truncated(buffer, offset + 1));
            };
            let target = (upper << 8) | lower as usize;
            if target >= buffer.len() {
                return Err(WireError::malformed(
                    offset,
                    NameFault::PointerOutOfBounds(target),
                ));
            }
            return Ok((2, Pointer(target)));
        }
        // 01xxxxxx and 10xxxxxx are reserved label types
        if (len & 0xc0) != 0 {
            return Err(WireError::malformed(
                offset,
                NameFault::ReservedLabelType(len),
            ));
        }

        let len = len as usize;
        let Some(data) = buffer.get(offset + 1..offset + 1 + len) else {
            return Err(WireError::malformed(
                offset,
                NameFault::LabelOutOfBounds(len),
            ));
        };
        Ok((1 + len, Label(Self(Box::from(data)))))
    }

    pub(super) fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.0.len() as u8);
        buf.put_slice(&self.0);
    }
}

/// Returns the upper six bits of a compression pointer if the length octet is one.
fn label_pointer(len: u8) -> Option<usize> {
    if (len & 0xc0) == 0xc0 {
        Some((len & 0x3f) as usize)
    } else {
        None
    }
}

impl Hash for Label {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for c in self.0.iter() {
            state.write_u8(c.to_ascii_lowercase());
        }
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Label {}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        String::from_utf8_lossy(&self.0).fmt(f)
    }
}
