pub mod socket;
pub mod resolve;
mod addr;
mod error;

pub use self::error::{ErrorKind, Result, SocketError, errno};
pub use self::addr::{SocketAddrV4, parse_ipv4};
pub use self::socket::{Datagram, Received, SockType, Socket, Stream, TcpSocket, UdpSocket};
