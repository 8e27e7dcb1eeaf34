//! Interactive TCP server: binds port 8080, accepts one peer, then reads
//! words from stdin. Each word is sent to the peer; the word `recv` instead
//! reads up to 256 bytes from the peer and prints them.

use std::io::stdin;

use socklane::{ErrorKind, TcpSocket};

fn main() {
	env_logger::init();
	if let Err(err) = run() {
		eprintln!("error: {}", err);
		std::process::exit(1);
	}
}

fn run() -> socklane::Result<()> {
	let mut server = TcpSocket::new()?;
	server.bind(8080)?;
	server.listen(128)?;
	println!("listening on port 8080");

	let mut peer = server.accept()?;
	println!("peer connected");

	for line in stdin().lines() {
		let Ok(line) = line else { break };
		for word in line.split_whitespace() {
			if word == "recv" {
				match peer.recv(256) {
					Ok(bytes) => println!("{}", String::from_utf8_lossy(&bytes)),
					Err(err) if err.kind() == ErrorKind::ConnectionClosed => {
						println!("connection closed");
						return Ok(());
					}
					Err(err) => return Err(err),
				}
			} else {
				peer.send(word.as_bytes())?;
			}
		}
	}

	peer.close()?;
	server.close()
}
