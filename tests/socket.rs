//! End-to-end socket behavior over the loopback interface.

use std::thread;

use socklane::{ErrorKind, SocketAddrV4, SocketError, Stream, TcpSocket, UdpSocket, resolve};

fn init_logging() {
	let _ = env_logger::builder().is_test(true).try_init();
}

/// Listener on an ephemeral port plus a client connected to it, with the
/// listener itself dropped. The accepted socket comes first.
fn tcp_pair() -> (TcpSocket, TcpSocket) {
	let mut server = TcpSocket::new().unwrap();
	server.bind(0).unwrap();
	server.listen(16).unwrap();
	let port = server.local_addr().unwrap().port();

	let handle = thread::spawn(move || {
		let mut client = TcpSocket::new().unwrap();
		client.connect("127.0.0.1", port).unwrap();
		client
	});
	let accepted = server.accept().unwrap();
	(accepted, handle.join().unwrap())
}

#[test]
fn bind_is_idempotent_for_the_same_port() {
	let mut socket = TcpSocket::new().unwrap();
	socket.bind(0).unwrap();
	socket.bind(0).unwrap();
	assert!(socket.is_bound());
	assert_eq!(socket.port(), Some(0));
	assert!(socket.local_addr().unwrap().port() > 0);
}

#[test]
fn bind_to_a_second_port_is_rejected() {
	let mut socket = UdpSocket::new().unwrap();
	socket.bind(0).unwrap();
	let err = socket.bind(1).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Precondition);
	assert!(matches!(err, SocketError::AlreadyBound { requested: 1, .. }));
	assert_eq!(socket.port(), Some(0));
	assert!(socket.is_bound());
}

#[test]
fn listen_requires_a_bound_socket() {
	let mut socket = TcpSocket::new().unwrap();
	let err = socket.listen(16).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Precondition);
	assert!(matches!(err, SocketError::NotBound));
	assert!(!socket.is_listening());
}

#[test]
fn listen_twice_is_rejected() {
	let mut server = TcpSocket::new().unwrap();
	server.bind(0).unwrap();
	server.listen(16).unwrap();
	let err = server.listen(16).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Precondition);
	assert!(matches!(err, SocketError::AlreadyListening { .. }));
	assert!(server.is_listening());
}

#[test]
fn accept_requires_a_listening_socket() {
	let mut socket = TcpSocket::new().unwrap();
	assert!(matches!(socket.accept(), Err(SocketError::NotListening)));

	socket.bind(0).unwrap();
	assert!(matches!(socket.accept(), Err(SocketError::NotListening)));
}

#[test]
fn connect_on_a_listening_socket_is_rejected() {
	let mut server = TcpSocket::new().unwrap();
	server.bind(0).unwrap();
	server.listen(16).unwrap();
	let err = server.connect("127.0.0.1", 80).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Precondition);
	assert!(matches!(err, SocketError::AlreadyListening { .. }));
}

#[test]
fn connect_twice_is_rejected() {
	let (_accepted, mut client) = tcp_pair();
	let err = client.connect("127.0.0.1", 80).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Precondition);
	assert!(matches!(err, SocketError::AlreadyConnected));
	assert!(client.is_connected());
}

#[test]
fn send_and_recv_require_a_connection() {
	let mut socket = TcpSocket::new().unwrap();
	assert!(matches!(
		socket.send(b"x").unwrap_err(),
		SocketError::NotConnected
	));
	assert!(matches!(
		socket.recv(16).unwrap_err(),
		SocketError::NotConnected
	));

	// A listener hands out data channels but is not one itself.
	let mut server = TcpSocket::new().unwrap();
	server.bind(0).unwrap();
	server.listen(16).unwrap();
	assert!(matches!(
		server.send(b"x").unwrap_err(),
		SocketError::NotConnected
	));
	assert!(matches!(
		server.recv(16).unwrap_err(),
		SocketError::NotConnected
	));
}

#[test]
fn accept_yields_independent_connected_sockets() {
	let mut server = TcpSocket::new().unwrap();
	server.bind(0).unwrap();
	server.listen(16).unwrap();
	let port = server.local_addr().unwrap().port();

	let connect = move || {
		let mut client = TcpSocket::new().unwrap();
		client.connect("127.0.0.1", port).unwrap();
		client
	};
	let first = thread::spawn(connect);
	let mut one = server.accept().unwrap();
	let second = thread::spawn(connect);
	let two = server.accept().unwrap();

	for accepted in [&one, &two] {
		assert!(accepted.is_connected());
		assert!(!accepted.is_listening());
		assert!(!accepted.is_bound());
		assert_eq!(accepted.port(), server.port());
	}

	// Closing one accepted socket leaves its sibling and the listener up.
	one.close().unwrap();
	assert!(one.is_closed());
	assert!(two.is_connected());
	assert!(server.is_listening());

	assert!(first.join().unwrap().is_connected());
	assert!(second.join().unwrap().is_connected());
}

#[test]
fn stream_round_trip_and_peer_close() {
	init_logging();

	let mut server = TcpSocket::new().unwrap();
	server.bind(0).unwrap();
	server.listen(16).unwrap();
	let port = server.local_addr().unwrap().port();

	let peer = thread::spawn(move || {
		let mut client = TcpSocket::new().unwrap();
		client.connect("127.0.0.1", port).unwrap();
		client.send(b"PING").unwrap();

		// Blocks until the server closes its end of the stream.
		let err = client.recv(64).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::ConnectionClosed);
		assert!(!client.is_connected());

		// The close is reported once; afterwards the precondition fires.
		let err = client.recv(64).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Precondition);
		assert!(matches!(err, SocketError::NotConnected));
	});

	let mut accepted = server.accept().unwrap();
	// A zero-length request reads nothing and is not a close signal.
	assert_eq!(accepted.recv(0).unwrap(), Vec::<u8>::new());
	assert!(accepted.is_connected());

	assert_eq!(accepted.recv(64).unwrap(), b"PING");
	accepted.close().unwrap();
	peer.join().unwrap();
}

#[test]
fn send_after_peer_close_is_a_transport_error() {
	init_logging();
	let (mut accepted, mut client) = tcp_pair();

	accepted.close().unwrap();

	// The peer's close only surfaces once a delivered write provokes the
	// reset, so the failure can take more than one attempt.
	let mut outcome = Ok(());
	for _ in 0..100 {
		outcome = client.send(b"x");
		if outcome.is_err() {
			break;
		}
		thread::yield_now();
	}

	let err = outcome.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Transport);
	assert!(matches!(err, SocketError::Send { .. }));
	// Only a zero-length recv marks the stream disconnected.
	assert!(client.is_connected());
}

#[test]
fn recv_caps_at_the_requested_length() {
	let (mut accepted, mut client) = tcp_pair();
	client.send(b"abcdef").unwrap();
	assert_eq!(accepted.recv(3).unwrap(), b"abc");
	assert_eq!(accepted.recv(64).unwrap(), b"def");
}

#[test]
fn closed_sockets_reject_every_operation() {
	let mut socket = TcpSocket::new().unwrap();
	socket.bind(0).unwrap();
	socket.close().unwrap();
	socket.close().unwrap();
	assert!(socket.is_closed());
	assert!(!socket.is_bound());
	assert_eq!(socket.port(), None);

	let err = socket.bind(0).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Precondition);
	assert!(matches!(err, SocketError::Closed));

	assert!(matches!(
		socket.connect("127.0.0.1", 80).unwrap_err(),
		SocketError::Closed
	));
	// The bound flag was cleared, so listen trips over that first.
	assert!(matches!(
		socket.listen(16).unwrap_err(),
		SocketError::NotBound
	));
	assert!(matches!(
		socket.local_addr().unwrap_err(),
		SocketError::Closed
	));

	let mut udp = UdpSocket::new().unwrap();
	udp.close().unwrap();
	assert!(matches!(
		udp.send_to("127.0.0.1", 9, b"x").unwrap_err(),
		SocketError::Closed
	));
	assert!(matches!(
		udp.recv_from(16).unwrap_err(),
		SocketError::Closed
	));
}

#[test]
fn udp_round_trip_reports_the_sender() {
	init_logging();

	let mut receiver = UdpSocket::new().unwrap();
	receiver.bind(0).unwrap();
	let port = receiver.local_addr().unwrap().port();

	let mut sender = UdpSocket::new().unwrap();
	sender.send_to("127.0.0.1", port, b"hello").unwrap();
	let from_port = sender.local_addr().unwrap().port();

	let datagram = receiver.recv_from(64).unwrap();
	assert_eq!(datagram.bytes, b"hello");
	assert_eq!(datagram.addr, "127.0.0.1");
	assert_eq!(datagram.port, from_port);
	assert!(!datagram.host.is_empty());

	// Hostname destinations go through the resolver before sending.
	sender.send_to("localhost", port, b"again").unwrap();
	let datagram = receiver.recv_from(64).unwrap();
	assert_eq!(datagram.bytes, b"again");
}

#[test]
fn connect_failure_is_a_transport_error() {
	// Port 1 on loopback refuses instantly; nothing listens there.
	let mut client = TcpSocket::new().unwrap();
	let err = client.connect("127.0.0.1", 1).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Transport);
	assert!(matches!(err, SocketError::Connect { .. }));
	assert!(!client.is_connected());
}

#[test]
fn resolution_failures_are_reported() {
	// RFC 6761 reserves .invalid: it never resolves.
	let mut client = TcpSocket::new().unwrap();
	let err = client.connect("name.invalid", 80).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Resolution);
	assert!(!client.is_connected());

	let mut udp = UdpSocket::new().unwrap();
	let err = udp.send_to("name.invalid", 80, b"x").unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Resolution);
}

#[test]
fn lookup_is_ipv4_only() {
	// An IPv6 literal cannot satisfy AF_INET hints.
	let err = resolve::lookup::<Stream>(Some("::1"), 80).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Resolution);

	let wildcard = resolve::lookup::<Stream>(None, 4242).unwrap();
	assert!(!wildcard.is_empty());
	assert!(wildcard.iter().all(|addr| addr.port() == 4242));
	assert_eq!(wildcard[0].ip(), [0, 0, 0, 0]);
}

#[test]
fn lookup_resolves_localhost() {
	let found = resolve::lookup::<Stream>(Some("localhost"), 7777).unwrap();
	assert!(found.iter().any(|addr| addr.ip() == [127, 0, 0, 1]));
	assert!(found.iter().all(|addr| addr.port() == 7777));
}

#[test]
fn reverse_resolves_loopback() {
	let name = resolve::reverse(&SocketAddrV4::new([127, 0, 0, 1], 0));
	assert!(!name.is_empty());
}

#[test]
fn errors_render_and_convert() {
	let err = SocketError::AlreadyBound {
		bound: 8080,
		requested: 9090,
	};
	assert!(err.to_string().contains("8080"));
	assert_eq!(err.kind(), ErrorKind::Precondition);

	let err = SocketError::Bind {
		errno: libc::EADDRINUSE,
		port: 80,
	};
	assert!(err.to_string().contains("address already in use"));
	let io: std::io::Error = err.into();
	assert_eq!(io.kind(), std::io::ErrorKind::AddrInUse);

	let io: std::io::Error = SocketError::Send { errno: libc::EAGAIN }.into();
	assert_eq!(io.kind(), std::io::ErrorKind::WouldBlock);

	let io: std::io::Error = SocketError::ConnectionClosed.into();
	assert_eq!(io.kind(), std::io::ErrorKind::ConnectionReset);
}
