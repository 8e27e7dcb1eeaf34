use crate::addr::{SocketAddrV4, parse_ipv4};
use crate::error::{Result, SocketError, errno};
use crate::resolve;
use super::Datagram;
use super::base::Socket;

/// A blocking UDP socket.
///
/// Connectionless: every send names its destination and every receive
/// reports its sender. There is no connected state and no close-by-peer
/// signal; a zero-length receive is an empty datagram.
pub struct UdpSocket {
	base: Socket<Datagram>,
}

/// One received datagram together with the sender's identity.
#[derive(Debug)]
pub struct Received {
	/// Sender hostname from reverse lookup, or the dotted-quad form when
	/// the address has no name.
	pub host: String,
	/// Sender address as a dotted-quad string.
	pub addr: String,
	/// Payload, exactly as delivered.
	pub bytes: Vec<u8>,
	/// Sender port.
	pub port: u16,
}

impl UdpSocket {
	/// Creates an unbound UDP socket.
	pub fn new() -> Result<Self> {
		Ok(Self {
			base: Socket::new()?,
		})
	}

	/// Binds to a local port. See [`Socket::bind`].
	pub fn bind(&mut self, port: u16) -> Result<()> {
		self.base.bind(port)
	}

	/// Sends the whole payload to `host:port`.
	///
	/// A dotted-quad literal is used directly; any other host goes
	/// through the resolver and the first IPv4 candidate wins.
	pub fn send_to(&mut self, host: &str, port: u16, bytes: &[u8]) -> Result<()> {
		let fd = self.base.raw_fd()?;
		let dest = match parse_ipv4(host) {
			Some(ip) => SocketAddrV4::new(ip, port),
			None => {
				self.base
					.set_candidates(resolve::lookup::<Datagram>(Some(host), port)?);
				match self.base.candidates().first() {
					Some(addr) => *addr,
					None => {
						return Err(SocketError::HostNotFound {
							host: host.to_string(),
						});
					}
				}
			}
		};

		let raw = dest.to_raw();
		let mut sent = 0;
		while sent < bytes.len() {
			let result = unsafe {
				libc::sendto(
					fd,
					bytes[sent..].as_ptr() as *const libc::c_void,
					bytes.len() - sent,
					libc::MSG_NOSIGNAL,
					&raw as *const _ as *const libc::sockaddr,
					std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
				)
			};
			if result == -1 {
				return Err(SocketError::Send { errno: errno() });
			}
			sent += result as usize;
		}
		log::trace!("sent {} byte(s) to {} (fd {})", sent, dest, fd);
		Ok(())
	}

	/// Receives one datagram of at most `max_len` bytes.
	///
	/// The sender's address always comes back with the payload, with the
	/// hostname reverse-resolved when one exists.
	pub fn recv_from(&mut self, max_len: usize) -> Result<Received> {
		let fd = self.base.raw_fd()?;
		let mut buffer = vec![0u8; max_len];
		let mut sender: libc::sockaddr_in = unsafe { std::mem::zeroed() };
		let mut sender_len = std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;

		let result = unsafe {
			libc::recvfrom(
				fd,
				buffer.as_mut_ptr() as *mut libc::c_void,
				max_len,
				0,
				&mut sender as *mut _ as *mut libc::sockaddr,
				&mut sender_len,
			)
		};
		if result == -1 {
			return Err(SocketError::Recv { errno: errno() });
		}
		buffer.truncate(result as usize);

		let from = SocketAddrV4::from_raw(&sender);
		let received = Received {
			host: resolve::reverse(&from),
			addr: from.ip_string(),
			bytes: buffer,
			port: from.port(),
		};
		log::trace!(
			"received {} byte(s) from {}:{} (fd {})",
			received.bytes.len(),
			received.addr,
			received.port,
			fd
		);
		Ok(received)
	}

	/// Closes the socket, releasing the OS handle. Idempotent.
	pub fn close(&mut self) -> Result<()> {
		self.base.close()
	}

	/// Local address reported by the OS. See [`Socket::local_addr`].
	pub fn local_addr(&self) -> Result<SocketAddrV4> {
		self.base.local_addr()
	}

	/// True after a successful `bind` and until `close`.
	pub fn is_bound(&self) -> bool {
		self.base.is_bound()
	}

	/// True once the handle has been released.
	pub fn is_closed(&self) -> bool {
		self.base.is_closed()
	}

	/// The port given to the last successful `bind`, if any.
	pub fn port(&self) -> Option<u16> {
		self.base.port()
	}
}
