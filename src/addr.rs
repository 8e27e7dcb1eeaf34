//! IPv4 socket addresses and conversions to the raw libc forms.

use std::fmt;

/// IPv4 socket address (IP + port).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketAddrV4 {
	ip: [u8; 4],
	port: u16,
}

impl SocketAddrV4 {
	/// Creates a new IPv4 address.
	pub fn new(ip: [u8; 4], port: u16) -> Self {
		Self { ip, port }
	}

	/// Creates from raw sockaddr_in.
	pub(crate) fn from_raw(raw: &libc::sockaddr_in) -> Self {
		Self {
			ip: raw.sin_addr.s_addr.to_ne_bytes(),
			port: u16::from_be(raw.sin_port),
		}
	}

	/// Returns the IP bytes.
	pub fn ip(&self) -> [u8; 4] {
		self.ip
	}

	/// Returns the port.
	pub fn port(&self) -> u16 {
		self.port
	}

	/// Dotted-quad form of the IP without the port.
	pub fn ip_string(&self) -> String {
		let [a, b, c, d] = self.ip;
		format!("{}.{}.{}.{}", a, b, c, d)
	}

	/// Converts to the raw sockaddr_in for syscalls.
	pub(crate) fn to_raw(&self) -> libc::sockaddr_in {
		libc::sockaddr_in {
			sin_family: libc::AF_INET as libc::sa_family_t,
			sin_port: self.port.to_be(),
			sin_addr: libc::in_addr {
				s_addr: u32::from_be_bytes(self.ip).to_be(),
			},
			sin_zero: [0; 8],
		}
	}
}

impl fmt::Display for SocketAddrV4 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.ip_string(), self.port)
	}
}

/// Parses a dotted-quad IPv4 literal, e.g. `"192.168.1.1"`.
///
/// Accepts exactly four decimal octets, each `0` to `255` with no
/// leading zeros. Hostnames, IPv6 literals, and anything with stray
/// characters return `None`.
pub fn parse_ipv4(text: &str) -> Option<[u8; 4]> {
	let mut ip = [0u8; 4];
	let mut parts = text.split('.');
	for slot in &mut ip {
		let part = parts.next()?;
		if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
			return None;
		}
		if part.len() > 1 && part.starts_with('0') {
			return None;
		}
		*slot = part.parse().ok()?;
	}
	if parts.next().is_some() {
		return None;
	}
	Some(ip)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn raw_roundtrip_preserves_ip_and_port() {
		let addr = SocketAddrV4::new([192, 168, 1, 7], 8080);
		let raw = addr.to_raw();
		assert_eq!(raw.sin_family, libc::AF_INET as libc::sa_family_t);
		assert_eq!(SocketAddrV4::from_raw(&raw), addr);
	}

	#[test]
	fn raw_form_is_network_byte_order() {
		let raw = SocketAddrV4::new([127, 0, 0, 1], 0x1234).to_raw();
		assert_eq!(raw.sin_port, 0x1234u16.to_be());
		assert_eq!(raw.sin_addr.s_addr.to_ne_bytes(), [127, 0, 0, 1]);
	}

	#[test]
	fn display_is_dotted_quad_with_port() {
		let addr = SocketAddrV4::new([10, 0, 0, 2], 9000);
		assert_eq!(addr.to_string(), "10.0.0.2:9000");
		assert_eq!(addr.ip_string(), "10.0.0.2");
	}

	#[test]
	fn parse_accepts_dotted_quads() {
		assert_eq!(parse_ipv4("127.0.0.1"), Some([127, 0, 0, 1]));
		assert_eq!(parse_ipv4("0.0.0.0"), Some([0, 0, 0, 0]));
		assert_eq!(parse_ipv4("255.255.255.255"), Some([255, 255, 255, 255]));
	}

	#[test]
	fn parse_rejects_everything_else() {
		assert_eq!(parse_ipv4("localhost"), None);
		assert_eq!(parse_ipv4("256.0.0.1"), None);
		assert_eq!(parse_ipv4("1.2.3"), None);
		assert_eq!(parse_ipv4("1.2.3.4.5"), None);
		assert_eq!(parse_ipv4("01.2.3.4"), None);
		assert_eq!(parse_ipv4("+1.2.3.4"), None);
		assert_eq!(parse_ipv4("1..2.3"), None);
		assert_eq!(parse_ipv4("::1"), None);
		assert_eq!(parse_ipv4(""), None);
		assert_eq!(parse_ipv4("1.2.3.4 "), None);
	}
}
