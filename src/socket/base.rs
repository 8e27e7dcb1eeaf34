use std::marker::PhantomData;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd};

use crate::addr::SocketAddrV4;
use crate::error::{Result, SocketError, errno};
use crate::resolve;
use super::SockType;

/// A blocking IPv4 socket of type `T`.
///
/// Owns the OS handle and the most recent resolution results, and tracks
/// whether the socket is bound or closed. `TcpSocket` and `UdpSocket` wrap
/// this type and add their own operations; use those unless you are
/// building another protocol on top.
pub struct Socket<T: SockType> {
	fd: Option<OwnedFd>,
	addrs: Vec<SocketAddrV4>,
	port: Option<u16>,
	bound: bool,
	_marker: PhantomData<T>,
}

impl<T: SockType> Socket<T> {
	/// Creates a new socket of the marker's type.
	///
	/// Calls the `socket()` syscall with `AF_INET` and `SOCK_CLOEXEC`,
	/// then enables `SO_REUSEADDR` so a recently released port can be
	/// bound again without waiting out TIME_WAIT.
	pub fn new() -> Result<Self> {
		let fd = unsafe { libc::socket(libc::AF_INET, T::raw() | libc::SOCK_CLOEXEC, 0) };
		if fd == -1 {
			return Err(SocketError::Create { errno: errno() });
		}
		let fd = unsafe { OwnedFd::from_raw_fd(fd) };
		set_reuse_addr(fd.as_raw_fd())?;
		log::trace!("created {} socket (fd {})", T::name(), fd.as_raw_fd());

		Ok(Self {
			fd: Some(fd),
			addrs: Vec::new(),
			port: None,
			bound: false,
			_marker: PhantomData,
		})
	}

	/// Wraps a handle that `accept()` produced. The new socket inherits
	/// the listener's port value but is not itself bound.
	pub(crate) fn from_accepted(fd: OwnedFd, port: Option<u16>) -> Self {
		Self {
			fd: Some(fd),
			addrs: Vec::new(),
			port,
			bound: false,
			_marker: PhantomData,
		}
	}

	/// Returns the raw file descriptor, or `Closed` once the handle has
	/// been released.
	pub(crate) fn raw_fd(&self) -> Result<libc::c_int> {
		match &self.fd {
			Some(fd) => Ok(fd.as_raw_fd()),
			None => Err(SocketError::Closed),
		}
	}

	/// Binds the socket to a local port on all interfaces.
	///
	/// Binding again to the same port is a no-op; binding to a different
	/// port while bound fails. The port is resolved to wildcard IPv4
	/// candidates and the first one `bind()` accepts wins.
	pub fn bind(&mut self, port: u16) -> Result<()> {
		if self.bound {
			if self.port == Some(port) {
				return Ok(());
			}
			return Err(SocketError::AlreadyBound {
				bound: self.port.unwrap_or_default(),
				requested: port,
			});
		}
		let fd = self.raw_fd()?;

		self.addrs = resolve::lookup::<T>(None, port)?;
		if self.addrs.is_empty() {
			return Err(SocketError::NoAddressFound {
				host: "*".to_string(),
				port,
			});
		}

		let mut last_errno = 0;
		for addr in &self.addrs {
			let raw = addr.to_raw();
			let result = unsafe {
				libc::bind(
					fd,
					&raw as *const _ as *const libc::sockaddr,
					std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
				)
			};
			if result == -1 {
				last_errno = errno();
				continue;
			}
			self.port = Some(port);
			self.bound = true;
			log::debug!("bound {} socket (fd {}) to port {}", T::name(), fd, port);
			return Ok(());
		}

		Err(SocketError::Bind {
			errno: last_errno,
			port,
		})
	}

	/// Closes the socket, releasing the OS handle.
	///
	/// Idempotent: closing an already-closed socket is a no-op. The handle
	/// is gone after this call even when the OS reports a close failure,
	/// so every later operation fails with `Closed`.
	pub fn close(&mut self) -> Result<()> {
		let Some(fd) = self.fd.take() else {
			return Ok(());
		};
		self.bound = false;
		self.port = None;
		// into_raw_fd so the OwnedFd drop cannot close a second time.
		let raw = fd.into_raw_fd();
		let result = unsafe { libc::close(raw) };
		if result == -1 {
			return Err(SocketError::Close { errno: errno() });
		}
		log::debug!("closed {} socket (fd {})", T::name(), raw);
		Ok(())
	}

	/// Local address reported by `getsockname()`.
	///
	/// After binding port 0 this is how the OS-picked port is learned.
	pub fn local_addr(&self) -> Result<SocketAddrV4> {
		let fd = self.raw_fd()?;
		let mut raw: libc::sockaddr_in = unsafe { std::mem::zeroed() };
		let mut len = std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
		let result = unsafe {
			libc::getsockname(fd, &mut raw as *mut _ as *mut libc::sockaddr, &mut len)
		};
		if result == -1 {
			return Err(SocketError::GetName { errno: errno() });
		}
		if raw.sin_family != libc::AF_INET as libc::sa_family_t {
			return Err(SocketError::InvalidAddress {
				reason: "local address is not IPv4",
			});
		}
		Ok(SocketAddrV4::from_raw(&raw))
	}

	/// True after a successful `bind` and until `close`.
	pub fn is_bound(&self) -> bool {
		self.bound
	}

	/// True once the handle has been released.
	pub fn is_closed(&self) -> bool {
		self.fd.is_none()
	}

	/// The port value this socket carries, if any: the bind port, or the
	/// listener's port for sockets produced by `accept()`.
	pub fn port(&self) -> Option<u16> {
		self.port
	}

	/// Replaces the stored resolution results.
	pub(crate) fn set_candidates(&mut self, addrs: Vec<SocketAddrV4>) {
		self.addrs = addrs;
	}

	/// The stored resolution results, in resolver order.
	pub(crate) fn candidates(&self) -> &[SocketAddrV4] {
		&self.addrs
	}
}

fn set_reuse_addr(fd: libc::c_int) -> Result<()> {
	let val: libc::c_int = 1;
	let result = unsafe {
		libc::setsockopt(
			fd,
			libc::SOL_SOCKET,
			libc::SO_REUSEADDR,
			&val as *const _ as *const libc::c_void,
			std::mem::size_of::<libc::c_int>() as libc::socklen_t,
		)
	};
	if result == -1 {
		return Err(SocketError::SetOption {
			errno: errno(),
			option: "SO_REUSEADDR",
		});
	}
	Ok(())
}
