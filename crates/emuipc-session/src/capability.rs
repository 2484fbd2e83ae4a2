//! Per-backend opcode support.
//!
//! All backends share the memory-access core of the protocol and differ only
//! in which auxiliary opcodes they accept. Backends are plain data; the
//! protocol logic is the same for all of them.

use std::fmt;

use emuipc_frame::{FrameError, Opcode, Width};
use emuipc_transport::Endpoint;

use crate::error::{IpcError, Result};

/// A set of opcodes, one bit per opcode value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilitySet(u32);

const fn bit(opcode: Opcode) -> u32 {
    match opcode as u8 {
        raw @ 0..=31 => 1 << raw,
        // Envelope and sentinel opcodes are never members.
        _ => 0,
    }
}

impl CapabilitySet {
    pub const EMPTY: Self = Self(0);

    /// Memory reads and writes of every width.
    pub const MEMORY: Self = Self::of(&[
        Opcode::Read8,
        Opcode::Read16,
        Opcode::Read32,
        Opcode::Read64,
        Opcode::Write8,
        Opcode::Write16,
        Opcode::Write32,
        Opcode::Write64,
    ]);

    /// Version, status and game metadata queries.
    pub const QUERIES: Self = Self::of(&[
        Opcode::Version,
        Opcode::Status,
        Opcode::GameTitle,
        Opcode::GameId,
        Opcode::GameUuid,
        Opcode::GameVersion,
    ]);

    /// Save and load state slots.
    pub const SAVE_STATES: Self = Self::of(&[Opcode::SaveState, Opcode::LoadState]);

    /// Build a set from a list of opcodes.
    pub const fn of(opcodes: &[Opcode]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < opcodes.len() {
            bits |= bit(opcodes[i]);
            i += 1;
        }
        Self(bits)
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn with(self, opcode: Opcode) -> Self {
        Self(self.0 | bit(opcode))
    }

    pub const fn without(self, opcode: Opcode) -> Self {
        Self(self.0 & !bit(opcode))
    }

    pub const fn contains(self, opcode: Opcode) -> bool {
        let mask = bit(opcode);
        mask != 0 && self.0 & mask == mask
    }

    /// Member opcodes in wire order.
    pub fn iter(self) -> impl Iterator<Item = Opcode> {
        Opcode::COMMANDS
            .into_iter()
            .filter(move |op| self.contains(*op))
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Opcode::name)).finish()
    }
}

/// "Supports opcode X" for anything that carries a capability set.
pub trait Capabilities {
    fn supports(&self, opcode: Opcode) -> bool;
}

impl Capabilities for CapabilitySet {
    fn supports(&self, opcode: Opcode) -> bool {
        self.contains(opcode)
    }
}

/// Kind of memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// A target emulator: its opcode subset and where it listens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backend {
    /// Display name.
    pub name: &'static str,
    /// Opcodes the emulator accepts.
    pub capabilities: CapabilitySet,
    /// Socket file stem under `/tmp` on Unix platforms.
    pub socket_name: &'static str,
    /// Loopback TCP port elsewhere.
    pub port: u16,
}

impl Backend {
    pub const PCSX2: Self = Self {
        name: "PCSX2",
        capabilities: CapabilitySet::MEMORY
            .union(CapabilitySet::QUERIES)
            .union(CapabilitySet::SAVE_STATES),
        socket_name: "pcsx2",
        port: 28011,
    };

    pub const RPCS3: Self = Self {
        name: "RPCS3",
        capabilities: CapabilitySet::MEMORY.union(CapabilitySet::QUERIES),
        socket_name: "rpcs3",
        port: 28012,
    };

    pub const DUCKSTATION: Self = Self {
        name: "DuckStation",
        capabilities: CapabilitySet::MEMORY
            .union(CapabilitySet::QUERIES)
            .union(CapabilitySet::SAVE_STATES),
        socket_name: "duckstation",
        port: 28011,
    };

    /// Every built-in backend.
    pub const ALL: [Self; 3] = [Self::PCSX2, Self::RPCS3, Self::DUCKSTATION];

    /// Look up a built-in backend by name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|backend| backend.name.eq_ignore_ascii_case(name))
    }

    /// Platform default endpoint of this emulator.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::for_backend(self.socket_name, self.port)
    }

    /// Return `opcode` if this backend accepts it.
    pub fn resolve(&self, opcode: Opcode) -> Result<Opcode> {
        if self.capabilities.contains(opcode) {
            Ok(opcode)
        } else {
            Err(IpcError::Unsupported {
                opcode,
                backend: self.name,
            })
        }
    }

    /// Opcode for a memory access of `size` bytes.
    pub fn resolve_memory(&self, access: Access, size: usize) -> Result<Opcode> {
        let width = Width::from_size(size).ok_or(FrameError::UnsupportedWidth(size))?;
        self.resolve(match access {
            Access::Read => Opcode::read(width),
            Access::Write => Opcode::write(width),
        })
    }
}

impl Capabilities for Backend {
    fn supports(&self, opcode: Opcode) -> bool {
        self.capabilities.contains(opcode)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn every_backend_shares_the_memory_core() {
        for backend in Backend::ALL {
            for op in CapabilitySet::MEMORY.iter() {
                assert!(backend.supports(op), "{backend} should support {op}");
            }
        }
    }

    #[test]
    fn rpcs3_has_no_save_states() {
        let err = Backend::RPCS3.resolve(Opcode::SaveState).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unimplemented);
        assert!(Backend::RPCS3.supports(Opcode::GameTitle));
        assert!(Backend::PCSX2.supports(Opcode::LoadState));
    }

    #[test]
    fn envelope_and_sentinel_are_never_members() {
        let all = CapabilitySet::of(&Opcode::COMMANDS)
            .with(Opcode::MultiCommand)
            .with(Opcode::Unimplemented);
        assert!(!all.contains(Opcode::MultiCommand));
        assert!(!all.contains(Opcode::Unimplemented));
        assert_eq!(all.iter().count(), Opcode::COMMANDS.len());
    }

    #[test]
    fn without_removes_one_opcode() {
        let set = CapabilitySet::MEMORY.without(Opcode::Write64);
        assert!(!set.contains(Opcode::Write64));
        assert!(set.contains(Opcode::Read64));
    }

    #[test]
    fn resolve_memory_by_size() {
        assert_eq!(
            Backend::PCSX2.resolve_memory(Access::Write, 4).unwrap(),
            Opcode::Write32
        );
        assert_eq!(
            Backend::DUCKSTATION.resolve_memory(Access::Read, 1).unwrap(),
            Opcode::Read8
        );
        let err = Backend::PCSX2.resolve_memory(Access::Read, 16).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unimplemented);
    }

    #[test]
    fn backend_lookup_is_case_insensitive() {
        assert_eq!(Backend::from_name("duckstation"), Some(Backend::DUCKSTATION));
        assert_eq!(Backend::from_name("Pcsx2"), Some(Backend::PCSX2));
        assert_eq!(Backend::from_name("dolphin"), None);
    }

    #[test]
    fn debug_lists_opcode_names() {
        let set = CapabilitySet::SAVE_STATES;
        assert_eq!(format!("{set:?}"), r#"{"SaveState", "LoadState"}"#);
    }
}
