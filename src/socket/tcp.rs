use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use crate::addr::SocketAddrV4;
use crate::error::{Result, SocketError, errno};
use crate::resolve;
use super::Stream;
use super::base::Socket;

/// A blocking TCP socket.
///
/// One type covers both roles: bind/listen/accept for servers and
/// connect/send/recv for clients. The current role is tracked with
/// runtime flags, and an operation invoked in a state that forbids it
/// fails up front with a precondition error instead of reaching the OS.
pub struct TcpSocket {
	base: Socket<Stream>,
	listening: bool,
	connected: bool,
}

impl TcpSocket {
	/// Creates an unbound, unconnected TCP socket.
	pub fn new() -> Result<Self> {
		Ok(Self {
			base: Socket::new()?,
			listening: false,
			connected: false,
		})
	}

	fn from_accepted(fd: OwnedFd, port: Option<u16>) -> Self {
		Self {
			base: Socket::from_accepted(fd, port),
			listening: false,
			connected: true,
		}
	}

	/// Binds to a local port. See [`Socket::bind`].
	pub fn bind(&mut self, port: u16) -> Result<()> {
		self.base.bind(port)
	}

	/// Connects to `host:port`.
	///
	/// The host is resolved to IPv4 candidates and each is tried in order
	/// until the OS accepts one. Listening sockets cannot connect, and a
	/// socket connects at most once.
	pub fn connect(&mut self, host: &str, port: u16) -> Result<()> {
		if self.listening {
			return Err(SocketError::AlreadyListening {
				port: self.base.port().unwrap_or_default(),
			});
		}
		if self.connected {
			return Err(SocketError::AlreadyConnected);
		}
		let fd = self.base.raw_fd()?;

		self.base.set_candidates(resolve::lookup::<Stream>(Some(host), port)?);
		if self.base.candidates().is_empty() {
			return Err(SocketError::NoAddressFound {
				host: host.to_string(),
				port,
			});
		}

		let mut last_errno = 0;
		for addr in self.base.candidates() {
			let raw = addr.to_raw();
			let result = unsafe {
				libc::connect(
					fd,
					&raw as *const _ as *const libc::sockaddr,
					std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
				)
			};
			if result == -1 {
				last_errno = errno();
				continue;
			}
			self.connected = true;
			log::debug!("connected to {}:{} (fd {})", host, port, fd);
			return Ok(());
		}

		Err(SocketError::Connect {
			errno: last_errno,
			addr: format!("{}:{}", host, port),
		})
	}

	/// Starts listening for incoming connections.
	///
	/// Requires a bound socket; a socket listens at most once.
	pub fn listen(&mut self, backlog: u32) -> Result<()> {
		if !self.base.is_bound() {
			return Err(SocketError::NotBound);
		}
		if self.listening {
			return Err(SocketError::AlreadyListening {
				port: self.base.port().unwrap_or_default(),
			});
		}
		let fd = self.base.raw_fd()?;
		let result = unsafe { libc::listen(fd, backlog as libc::c_int) };
		if result == -1 {
			return Err(SocketError::Listen {
				errno: errno(),
				backlog,
			});
		}
		self.listening = true;
		log::debug!(
			"listening on port {} (backlog {})",
			self.base.port().unwrap_or_default(),
			backlog
		);
		Ok(())
	}

	/// Accepts one incoming connection, blocking until a peer arrives.
	///
	/// The returned socket owns a fresh handle and starts out connected.
	/// It reports the listener's port value but is not itself bound, and
	/// its lifecycle is independent of the listener's.
	pub fn accept(&mut self) -> Result<TcpSocket> {
		if !self.listening {
			return Err(SocketError::NotListening);
		}
		let fd = self.base.raw_fd()?;
		let client_fd = unsafe {
			libc::accept4(
				fd,
				std::ptr::null_mut(),
				std::ptr::null_mut(),
				libc::SOCK_CLOEXEC,
			)
		};
		if client_fd == -1 {
			return Err(SocketError::Accept { errno: errno() });
		}
		let client_fd = unsafe { OwnedFd::from_raw_fd(client_fd) };
		log::debug!("accepted connection (fd {})", client_fd.as_raw_fd());
		Ok(TcpSocket::from_accepted(client_fd, self.base.port()))
	}

	/// Sends the whole payload, looping over partial writes.
	///
	/// `MSG_NOSIGNAL` turns a write to a dead peer into an error return
	/// instead of SIGPIPE.
	pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
		if self.listening || !self.connected {
			return Err(SocketError::NotConnected);
		}
		let fd = self.base.raw_fd()?;

		let mut sent = 0;
		while sent < bytes.len() {
			let result = unsafe {
				libc::send(
					fd,
					bytes[sent..].as_ptr() as *const libc::c_void,
					bytes.len() - sent,
					libc::MSG_NOSIGNAL,
				)
			};
			if result == -1 {
				return Err(SocketError::Send { errno: errno() });
			}
			sent += result as usize;
		}
		log::trace!("sent {} byte(s) (fd {})", sent, fd);
		Ok(())
	}

	/// Receives at most `max_len` bytes, returning whatever the OS
	/// delivered in one call.
	///
	/// Message boundaries are not preserved; one `send` by the peer may
	/// arrive across several `recv` calls.
	///
	/// # Connection close
	///
	/// A zero-length read means the peer closed the stream. The socket is
	/// marked disconnected and `ConnectionClosed` is returned exactly
	/// once; later calls fail the `NotConnected` precondition.
	pub fn recv(&mut self, max_len: usize) -> Result<Vec<u8>> {
		if self.listening || !self.connected {
			return Err(SocketError::NotConnected);
		}
		let fd = self.base.raw_fd()?;
		if max_len == 0 {
			// recv(fd, _, 0) returns 0, indistinguishable from a close.
			return Ok(Vec::new());
		}

		let mut buffer = vec![0u8; max_len];
		let result =
			unsafe { libc::recv(fd, buffer.as_mut_ptr() as *mut libc::c_void, max_len, 0) };
		if result == -1 {
			return Err(SocketError::Recv { errno: errno() });
		}
		if result == 0 {
			self.connected = false;
			return Err(SocketError::ConnectionClosed);
		}
		buffer.truncate(result as usize);
		log::trace!("received {} byte(s) (fd {})", buffer.len(), fd);
		Ok(buffer)
	}

	/// Closes the socket and clears the connection state. Idempotent.
	pub fn close(&mut self) -> Result<()> {
		// The handle is released even when close() reports a failure, so
		// the flags clear unconditionally.
		let result = self.base.close();
		self.listening = false;
		self.connected = false;
		result
	}

	/// Local address reported by the OS. See [`Socket::local_addr`].
	pub fn local_addr(&self) -> Result<SocketAddrV4> {
		self.base.local_addr()
	}

	/// True while connected to a peer.
	pub fn is_connected(&self) -> bool {
		self.connected
	}

	/// True while listening for connections.
	pub fn is_listening(&self) -> bool {
		self.listening
	}

	/// True after a successful `bind` and until `close`.
	pub fn is_bound(&self) -> bool {
		self.base.is_bound()
	}

	/// True once the handle has been released.
	pub fn is_closed(&self) -> bool {
		self.base.is_closed()
	}

	/// The port value this socket carries, if any.
	///
	/// For a bound socket this is the bind port; for an accepted socket
	/// it is inherited from the listener.
	pub fn port(&self) -> Option<u16> {
		self.base.port()
	}
}
