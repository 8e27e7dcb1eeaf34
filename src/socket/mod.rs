mod base;
mod tcp;
mod udp;

pub use self::base::Socket;
pub use self::tcp::TcpSocket;
pub use self::udp::{Received, UdpSocket};

/// Trait for socket type markers.
///
/// Each type implementing this trait represents a socket type
/// that can be passed to the `socket()` syscall.
///
/// - `Stream` — reliable, ordered byte stream (TCP)
/// - `Datagram` — unreliable, unordered packets (UDP)
pub trait SockType {
	/// Returns the libc constant for this socket type.
	fn raw() -> libc::c_int;
	/// Short lowercase name used in log lines.
	fn name() -> &'static str;
}

/// Stream socket marker.
///
/// Provides reliable, ordered, two-way byte streams. Used for TCP.
pub struct Stream;

/// Datagram socket marker.
///
/// Provides unreliable, unordered packets. Used for UDP.
pub struct Datagram;

impl SockType for Stream {
	#[inline]
	fn raw() -> libc::c_int {
		libc::SOCK_STREAM
	}

	#[inline]
	fn name() -> &'static str {
		"stream"
	}
}

impl SockType for Datagram {
	#[inline]
	fn raw() -> libc::c_int {
		libc::SOCK_DGRAM
	}

	#[inline]
	fn name() -> &'static str {
		"datagram"
	}
}
