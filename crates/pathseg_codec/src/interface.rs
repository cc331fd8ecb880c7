//! Path interfaces and their fixed-width wire form.

use bytes::BufMut;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CodecError, CodecResult};

/// Wire size of a single [`PathInterface`].
pub const INTERFACE_LEN: usize = 16;

/// Packed ISD-AS identifier.
///
/// The upper 16 bits carry the isolation domain, the lower 48 bits the AS
/// number. The codec only moves the packed value around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IsdAsn(pub u64);

impl IsdAsn {
    /// Returns the packed 64-bit value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the isolation domain part.
    #[must_use]
    pub const fn isd(self) -> u16 {
        (self.0 >> 48) as u16
    }

    /// Returns the AS number part.
    #[must_use]
    pub const fn asn(self) -> u64 {
        self.0 & 0x0000_ffff_ffff_ffff
    }
}

impl From<u64> for IsdAsn {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<IsdAsn> for u64 {
    fn from(value: IsdAsn) -> Self {
        value.0
    }
}

impl fmt::Display for IsdAsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.isd(), self.asn())
    }
}

/// A single hop: interface identifier plus the AS it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathInterface {
    /// Interface identifier.
    pub id: u64,
    /// AS the interface belongs to.
    pub ia: IsdAsn,
}

impl PathInterface {
    /// Creates a new path interface.
    #[must_use]
    pub const fn new(id: u64, ia: IsdAsn) -> Self {
        Self { id, ia }
    }

    /// Returns the 16-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; INTERFACE_LEN] {
        let mut out = [0u8; INTERFACE_LEN];
        out[..8].copy_from_slice(&self.id.to_be_bytes());
        out[8..].copy_from_slice(&self.ia.0.to_be_bytes());
        out
    }

    /// Reads an interface from its 16-byte wire form.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; INTERFACE_LEN]) -> Self {
        let mut id = [0u8; 8];
        let mut ia = [0u8; 8];
        id.copy_from_slice(&bytes[..8]);
        ia.copy_from_slice(&bytes[8..]);
        Self {
            id: u64::from_be_bytes(id),
            ia: IsdAsn(u64::from_be_bytes(ia)),
        }
    }
}

/// Appends the wire form of each interface to `buf`.
pub fn encode_interfaces<B: BufMut>(buf: &mut B, interfaces: &[PathInterface]) {
    for iface in interfaces {
        buf.put_u64(iface.id);
        buf.put_u64(iface.ia.0);
    }
}

/// Reads `count` interfaces from the start of `bytes`.
///
/// # Errors
///
/// Returns [`CodecError::MalformedHeader`] if `bytes` holds fewer than
/// `count` interfaces.
pub fn decode_interfaces(bytes: &[u8], count: usize) -> CodecResult<Vec<PathInterface>> {
    let needed = count * INTERFACE_LEN;
    if bytes.len() < needed {
        return Err(CodecError::malformed_header(format!(
            "{count} interfaces need {needed} bytes, {} available",
            bytes.len()
        )));
    }

    let interfaces = bytes[..needed]
        .chunks_exact(INTERFACE_LEN)
        .map(|chunk| {
            let mut raw = [0u8; INTERFACE_LEN];
            raw.copy_from_slice(chunk);
            PathInterface::from_bytes(&raw)
        })
        .collect();
    Ok(interfaces)
}
