//! Textual address parsing: `:xxxxxxxx` (an explicit hex handle) versus
//! `.name` or a bare name (a local registry lookup), matching the address
//! syntax accepted by the command surface and by `sendname`.

use crate::kernel::Kernel;
use crate::Handle;

/// A parsed textual address, before any registry lookup has happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Handle(Handle),
    Name(String),
}

/// Formats `handle` the way it would appear typed back in as an address.
pub fn id_to_hex(handle: Handle) -> String {
    format!(":{handle:08X}")
}

/// Parses a `:`-prefixed hex handle. Returns `None` for anything else,
/// including a `:` prefix followed by non-hex digits.
pub fn parse_hex_strict(s: &str) -> Option<Handle> {
    let hex = s.strip_prefix(':')?;
    u32::from_str_radix(hex, 16).ok()
}

/// Parses `s` as either an explicit handle or a name reference. A leading
/// `.` is accepted and stripped as a conventional "local name" marker but
/// does not change lookup semantics; bare names are looked up the same
/// way.
pub fn parse_address(s: &str) -> Address {
    if let Some(handle) = parse_hex_strict(s) {
        return Address::Handle(handle);
    }
    match s.strip_prefix('.') {
        Some(name) => Address::Name(name.to_string()),
        None => Address::Name(s.to_string()),
    }
}

/// Resolves `s` to a handle using `kernel`'s local name table. Returns
/// `None` both for an unparseable hex address and for a name with no
/// local binding; callers fall back to the harbor's global name routing
/// in the latter case.
pub fn queryname(kernel: &Kernel, s: &str) -> Option<Handle> {
    match parse_address(s) {
        Address::Handle(handle) => Some(handle),
        Address::Name(name) => kernel.find_name(&name),
    }
}
