//! Object framing inside an uncompressed page.
//!
//! Each object is `[u32 LE total_len][u32 LE id_len][id][payload]`, with
//! `total_len` covering both length fields, the id and the payload.

use crate::{Error, Result};

const OBJECT_HEADER_LEN: usize = 8;

/// Serializes one `(id, payload)` unit into a page accumulation buffer.
pub trait ObjectWriter {
    /// Appends the framed object to `out`; returns the number of bytes appended.
    fn marshal_object(&self, id: &[u8], payload: &[u8], out: &mut Vec<u8>) -> Result<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Object<'a> {
    pub id: &'a [u8],
    pub payload: &'a [u8],
}

/// Length-prefixed object framing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectCodec;

impl ObjectWriter for ObjectCodec {
    fn marshal_object(&self, id: &[u8], payload: &[u8], out: &mut Vec<u8>) -> Result<usize> {
        let total = OBJECT_HEADER_LEN + id.len() + payload.len();
        let total_len = u32::try_from(total).map_err(|_| Error::ObjectTooLarge(total))?;
        out.reserve(total);
        out.extend_from_slice(&total_len.to_le_bytes());
        out.extend_from_slice(&(id.len() as u32).to_le_bytes());
        out.extend_from_slice(id);
        out.extend_from_slice(payload);
        Ok(total)
    }
}

impl ObjectCodec {
    /// Decodes the object at the front of `src`.
    ///
    /// Returns the object and the bytes it occupied, or `None` if `src` is empty.
    pub fn unmarshal_object<'a>(&self, src: &'a [u8]) -> Result<Option<(Object<'a>, usize)>> {
        if src.is_empty() {
            return Ok(None);
        }
        if src.len() < OBJECT_HEADER_LEN {
            return Err(Error::CorruptPage(format!(
                "object header truncated: {} bytes",
                src.len()
            )));
        }
        let total = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
        let id_len = u32::from_le_bytes([src[4], src[5], src[6], src[7]]) as usize;
        if total < OBJECT_HEADER_LEN || total > src.len() {
            return Err(Error::CorruptPage(format!(
                "object length {total} outside page of {} bytes",
                src.len()
            )));
        }
        if id_len > total - OBJECT_HEADER_LEN {
            return Err(Error::CorruptPage(format!(
                "object id length {id_len} exceeds object length {total}"
            )));
        }
        let id_end = OBJECT_HEADER_LEN + id_len;
        Ok(Some((
            Object {
                id: &src[OBJECT_HEADER_LEN..id_end],
                payload: &src[id_end..total],
            },
            total,
        )))
    }
}

/// Iterates the objects of one decoded page.
pub fn objects(page: &[u8]) -> ObjectIter<'_> {
    ObjectIter {
        remaining: page,
        codec: ObjectCodec,
    }
}

pub struct ObjectIter<'a> {
    remaining: &'a [u8],
    codec: ObjectCodec,
}

impl<'a> Iterator for ObjectIter<'a> {
    type Item = Result<Object<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.codec.unmarshal_object(self.remaining) {
            Ok(Some((object, len))) => {
                self.remaining = &self.remaining[len..];
                Some(Ok(object))
            }
            Ok(None) => None,
            Err(err) => {
                self.remaining = &[];
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objects_walk_in_write_order() {
        let mut page = Vec::new();
        let codec = ObjectCodec;
        assert_eq!(codec.marshal_object(b"a", b"first", &mut page).expect("a"), 14);
        codec.marshal_object(b"bb", b"", &mut page).expect("bb");
        codec.marshal_object(b"", b"third", &mut page).expect("empty id");

        let decoded: Vec<_> = objects(&page).collect::<Result<_>>().expect("decode");
        assert_eq!(
            decoded,
            vec![
                Object { id: b"a", payload: b"first" },
                Object { id: b"bb", payload: b"" },
                Object { id: b"", payload: b"third" },
            ]
        );
    }

    #[test]
    fn truncated_object_is_reported_once() {
        let mut page = Vec::new();
        ObjectCodec.marshal_object(b"id", b"payload", &mut page).expect("marshal");
        page.truncate(page.len() - 1);

        let mut iter = objects(&page);
        assert!(matches!(iter.next(), Some(Err(Error::CorruptPage(_)))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn id_longer_than_object_is_corrupt() {
        let mut page = Vec::new();
        page.extend_from_slice(&10u32.to_le_bytes());
        page.extend_from_slice(&5u32.to_le_bytes());
        page.extend_from_slice(&[0, 0]);
        assert!(ObjectCodec.unmarshal_object(&page).is_err());
    }
}
