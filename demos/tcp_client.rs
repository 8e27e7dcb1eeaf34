//! Interactive TCP client: connects to localhost:8080, then reads words
//! from stdin. Each word is sent to the server; the word `recv` instead
//! reads up to 256 bytes from the server and prints them.

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
	let mut client = TcpSocket::new()?;
	client.connect("localhost", 8080)?;
	println!("connected to localhost:8080");

	for line in stdin().lines() {
		let Ok(line) = line else { break };
		for word in line.split_whitespace() {
			if word == "recv" {
				match client.recv(256) {
					Ok(bytes) => println!("{}", String::from_utf8_lossy(&bytes)),
					Err(err) if err.kind() == ErrorKind::ConnectionClosed => {
						println!("connection closed");
						return Ok(());
					}
					Err(err) => return Err(err),
				}
			} else {
				client.send(word.as_bytes())?;
			}
		}
	}

	client.close()
}
