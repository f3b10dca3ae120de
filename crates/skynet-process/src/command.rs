//! The text-based command surface every context issues its
//! house-keeping requests through: `TIMEOUT`, `REG`, `NAME`, `NOW`,
//! `STARTTIME`, `EXIT`, `KILL`, `LAUNCH`, `GETENV`, `SETENV`, `GROUP`.
//!
//! Commands are plain space-separated text, matching the original's
//! `skynet_command` surface; the reply (if any) is also plain text so a
//! service's callback can format it however it likes.

use std::sync::Arc;

use crate::address::{self, Address};
use crate::collaborators::MessageSink;
use crate::kernel::Kernel;
use crate::message::GlobalName;
use crate::{Handle, Session};

/// Runs one command on behalf of `source`, returning its text reply if
/// it has one. An unrecognized command name, or one with missing or
/// unparseable arguments, returns `None` — the same as a command that
/// legitimately has nothing to report.
/// Splits `s` at its first run of whitespace, trimming any leading
/// whitespace first. The second half keeps every byte after that run
/// verbatim — no further whitespace collapsing — unlike repeatedly
/// calling `split_whitespace().next()`.
fn split_first_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.find(char::is_whitespace) {
        Some(idx) => Some((&s[..idx], s[idx..].trim_start())),
        None => Some((s, "")),
    }
}

pub fn dispatch_command(kernel: &Arc<Kernel>, source: Handle, cmd: &str) -> Option<String> {
    let (name, rest) = split_first_token(cmd)?;
    match name {
        "TIMEOUT" => {
            let (ticks, _) = split_first_token(rest)?;
            let ticks: u32 = ticks.parse().ok()?;
            let ctx = kernel.grab(source)?;
            let session = ctx.next_session();
            let sink: Arc<dyn MessageSink> = kernel.clone();
            kernel.timer().timeout(sink, source, ticks, session);
            Some(session.to_string())
        }
        "REG" => match split_first_token(rest) {
            Some((requested, _)) => {
                if kernel.bind_name(requested.to_string(), source) {
                    kernel.harbor().register(GlobalName::new(requested), source);
                    Some(format!(".{requested}"))
                } else {
                    None
                }
            }
            None => Some(address::id_to_hex(source)),
        },
        "NAME" => {
            let (name, rest) = split_first_token(rest)?;
            let (addr, _) = split_first_token(rest)?;
            let handle = match address::parse_address(addr) {
                Address::Handle(h) => Some(h),
                Address::Name(n) => kernel.find_name(&n),
            }?;
            if handle == 0 {
                return None;
            }
            if kernel.bind_name(name.to_string(), handle) {
                Some(format!(".{name}"))
            } else {
                None
            }
        }
        "NOW" => Some(kernel.timer().now_ticks().to_string()),
        "STARTTIME" => Some(kernel.start_time().to_string()),
        "EXIT" => {
            kernel.retire(source);
            None
        }
        "KILL" => {
            let (addr, _) = split_first_token(rest)?;
            match address::parse_address(addr) {
                Address::Handle(handle) => {
                    kernel.retire(handle);
                }
                Address::Name(name) => {
                    if let Some(handle) = kernel.find_name(&name) {
                        kernel.retire(handle);
                    } else if !kernel.harbor().kill_by_name(&name) {
                        kernel
                            .errors()
                            .log(Some(source), &format!("KILL: no route to name {name}"));
                    }
                }
            }
            None
        }
        "LAUNCH" => {
            let (module, rest) = split_first_token(rest)?;
            match kernel.context_new(module, rest) {
                Ok(ctx) => Some(address::id_to_hex(ctx.handle())),
                Err(_) => None,
            }
        }
        "GETENV" => {
            let (key, _) = split_first_token(rest)?;
            kernel.env().get(key)
        }
        "SETENV" => {
            let (key, value) = split_first_token(rest)?;
            kernel.env().set(key.to_string(), value.to_string());
            None
        }
        "GROUP" => {
            let (sub, rest) = split_first_token(rest)?;
            let (group, _) = split_first_token(rest)?;
            let group: i32 = group.parse().ok()?;
            match sub {
                "ENTER" => {
                    kernel.groups().enter(group, source);
                    None
                }
                "LEAVE" => {
                    kernel.groups().leave(group, source);
                    None
                }
                "QUERY" => kernel.groups().query(group).map(address::id_to_hex),
                "CLEAR" => {
                    kernel.groups().clear(group);
                    None
                }
                _ => None,
            }
        }
        _ => None,
    }
}
