//! Name resolution over getaddrinfo, filtered to IPv4.

use std::ffi::{CStr, CString};

use crate::addr::SocketAddrV4;
use crate::error::{Result, SocketError};
use crate::socket::SockType;

/// Owns a getaddrinfo result chain and frees it on drop.
struct AddrChain(*mut libc::addrinfo);

impl Drop for AddrChain {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { libc::freeaddrinfo(self.0) };
        }
    }
}

fn c_string(text: &str, host: &str, port: u16) -> Result<CString> {
    CString::new(text).map_err(|_| SocketError::Resolve {
        host: host.to_string(),
        port,
        detail: "embedded NUL byte in lookup argument".to_string(),
    })
}

/// Resolves `host:port` to IPv4 candidates for a socket of type `T`.
///
/// With `host = None` the lookup sets `AI_PASSIVE` and yields wildcard
/// addresses suitable for `bind()`. Candidates of other address families
/// are skipped silently; an empty vector means the name resolved but had
/// no IPv4 entries.
pub fn lookup<T: SockType>(host: Option<&str>, port: u16) -> Result<Vec<SocketAddrV4>> {
    let display_host = host.unwrap_or("*");
    let node = match host {
        Some(name) => Some(c_string(name, name, port)?),
        None => None,
    };
    let service = c_string(&port.to_string(), display_host, port)?;

    let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
    hints.ai_family = libc::AF_INET;
    hints.ai_socktype = T::raw();
    if host.is_none() {
        hints.ai_flags = libc::AI_PASSIVE;
    }

    let mut chain: *mut libc::addrinfo = std::ptr::null_mut();
    let status = unsafe {
        libc::getaddrinfo(
            node.as_ref().map_or(std::ptr::null(), |n| n.as_ptr()),
            service.as_ptr(),
            &hints,
            &mut chain,
        )
    };
    if status != 0 {
        let detail = unsafe { CStr::from_ptr(libc::gai_strerror(status)) }
            .to_string_lossy()
            .into_owned();
        return Err(SocketError::Resolve {
            host: display_host.to_string(),
            port,
            detail,
        });
    }
    let chain = AddrChain(chain);

    let mut found = Vec::new();
    let mut entry = chain.0;
    while !entry.is_null() {
        let info = unsafe { &*entry };
        if info.ai_family == libc::AF_INET
            && !info.ai_addr.is_null()
            && info.ai_addrlen as usize >= std::mem::size_of::<libc::sockaddr_in>()
        {
            let raw = unsafe { &*(info.ai_addr as *const libc::sockaddr_in) };
            found.push(SocketAddrV4::from_raw(raw));
        }
        entry = info.ai_next;
    }
    log::trace!(
        "resolved {}:{} to {} IPv4 candidate(s)",
        display_host,
        port,
        found.len()
    );
    Ok(found)
}

/// Reverse-resolves an address to a hostname via getnameinfo.
///
/// Falls back to the dotted-quad form when the address has no name.
pub fn reverse(addr: &SocketAddrV4) -> String {
    let raw = addr.to_raw();
    let mut host = [0 as libc::c_char; libc::NI_MAXHOST as usize];
    let status = unsafe {
        libc::getnameinfo(
            &raw as *const _ as *const libc::sockaddr,
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            host.as_mut_ptr(),
            host.len() as libc::socklen_t,
            std::ptr::null_mut(),
            0,
            0,
        )
    };
    if status != 0 {
        return addr.ip_string();
    }
    unsafe { CStr::from_ptr(host.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}
