/// Errors raised by socket operations.
///
/// Variants that wrap a failed OS call carry the raw errno value and render
/// it as text; the remaining variants report local state checks, resolution
/// failures, or an orderly close by the peer. [`SocketError::kind`] gives
/// the coarse category.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("socket is already bound to port {bound}, cannot bind to port {requested}")]
    AlreadyBound { bound: u16, requested: u16 },

    #[error("socket is not bound to a port")]
    NotBound,

    #[error("socket is already listening on port {port}")]
    AlreadyListening { port: u16 },

    #[error("socket is not listening for connections")]
    NotListening,

    #[error("socket is already connected")]
    AlreadyConnected,

    #[error("socket is not connected")]
    NotConnected,

    #[error("socket has been closed")]
    Closed,

    #[error("getaddrinfo({host}:{port}) failed: {detail}")]
    Resolve { host: String, port: u16, detail: String },

    #[error("no IPv4 address found for {host}:{port}")]
    NoAddressFound { host: String, port: u16 },

    #[error("no IPv4 address found for host {host}")]
    HostNotFound { host: String },

    #[error("socket() failed: {}", errno_to_str(*.errno))]
    Create { errno: i32 },

    #[error("bind(port={port}) failed: {}", errno_to_str(*.errno))]
    Bind { errno: i32, port: u16 },

    #[error("listen(backlog={backlog}) failed: {}", errno_to_str(*.errno))]
    Listen { errno: i32, backlog: u32 },

    #[error("connect({addr}) failed: {}", errno_to_str(*.errno))]
    Connect { errno: i32, addr: String },

    #[error("accept() failed: {}", errno_to_str(*.errno))]
    Accept { errno: i32 },

    #[error("send() failed: {}", errno_to_str(*.errno))]
    Send { errno: i32 },

    #[error("recv() failed: {}", errno_to_str(*.errno))]
    Recv { errno: i32 },

    #[error("close() failed: {}", errno_to_str(*.errno))]
    Close { errno: i32 },

    #[error("setsockopt({option}) failed: {}", errno_to_str(*.errno))]
    SetOption { errno: i32, option: &'static str },

    #[error("getsockname() failed: {}", errno_to_str(*.errno))]
    GetName { errno: i32 },

    #[error("invalid address: {reason}")]
    InvalidAddress { reason: &'static str },

    #[error("connection closed by peer")]
    ConnectionClosed,
}

/// Coarse category of a [`SocketError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected by local state checks before any OS call was made.
    Precondition,
    /// Name resolution failed or produced no usable IPv4 candidate.
    Resolution,
    /// An OS call failed.
    Transport,
    /// The peer closed the stream.
    ConnectionClosed,
}

impl SocketError {
    /// Classifies the error for callers that match on category rather than
    /// variant.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SocketError::AlreadyBound { .. }
            | SocketError::NotBound
            | SocketError::AlreadyListening { .. }
            | SocketError::NotListening
            | SocketError::AlreadyConnected
            | SocketError::NotConnected
            | SocketError::Closed => ErrorKind::Precondition,
            SocketError::Resolve { .. }
            | SocketError::NoAddressFound { .. }
            | SocketError::HostNotFound { .. } => ErrorKind::Resolution,
            SocketError::Create { .. }
            | SocketError::Bind { .. }
            | SocketError::Listen { .. }
            | SocketError::Connect { .. }
            | SocketError::Accept { .. }
            | SocketError::Send { .. }
            | SocketError::Recv { .. }
            | SocketError::Close { .. }
            | SocketError::SetOption { .. }
            | SocketError::GetName { .. }
            | SocketError::InvalidAddress { .. } => ErrorKind::Transport,
            SocketError::ConnectionClosed => ErrorKind::ConnectionClosed,
        }
    }
}

/// Result of socket operations.
pub type Result<T> = std::result::Result<T, SocketError>;

/// Returns current errno value.
#[inline]
pub fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}

/// Converts errno to human-readable string.
fn errno_to_str(errno: i32) -> String {
    match errno {
        libc::EACCES => "permission denied".into(),
        libc::EADDRINUSE => "address already in use".into(),
        libc::EADDRNOTAVAIL => "address not available".into(),
        libc::EAFNOSUPPORT => "address family not supported".into(),
        libc::EAGAIN => "resource temporarily unavailable".into(),
        libc::EBADF => "bad file descriptor".into(),
        libc::ECONNREFUSED => "connection refused".into(),
        libc::ECONNRESET => "connection reset by peer".into(),
        libc::EHOSTUNREACH => "host unreachable".into(),
        libc::EINPROGRESS => "operation in progress".into(),
        libc::EINTR => "interrupted by signal".into(),
        libc::EINVAL => "invalid argument".into(),
        libc::EISCONN => "already connected".into(),
        libc::EMFILE => "too many open files".into(),
        libc::ENETUNREACH => "network unreachable".into(),
        libc::ENOBUFS => "no buffer space available".into(),
        libc::ENOTCONN => "not connected".into(),
        libc::EPIPE => "broken pipe".into(),
        libc::ETIMEDOUT => "connection timed out".into(),
        _ => format!("errno {}", errno),
    }
}

/// Maps errno to std::io::ErrorKind.
fn errno_to_kind(errno: i32) -> std::io::ErrorKind {
    match errno {
        libc::EACCES | libc::EPERM => std::io::ErrorKind::PermissionDenied,
        libc::EADDRINUSE => std::io::ErrorKind::AddrInUse,
        libc::EADDRNOTAVAIL => std::io::ErrorKind::AddrNotAvailable,
        // EWOULDBLOCK aliases EAGAIN here.
        libc::EAGAIN => std::io::ErrorKind::WouldBlock,
        libc::ECONNREFUSED => std::io::ErrorKind::ConnectionRefused,
        libc::ECONNRESET => std::io::ErrorKind::ConnectionReset,
        libc::EINTR => std::io::ErrorKind::Interrupted,
        libc::EINVAL => std::io::ErrorKind::InvalidInput,
        libc::ENOTCONN => std::io::ErrorKind::NotConnected,
        libc::EPIPE => std::io::ErrorKind::BrokenPipe,
        libc::ETIMEDOUT => std::io::ErrorKind::TimedOut,
        _ => std::io::ErrorKind::Other,
    }
}

impl From<SocketError> for std::io::Error {
    fn from(err: SocketError) -> Self {
        let kind = match &err {
            SocketError::Create { errno }
            | SocketError::Bind { errno, .. }
            | SocketError::Listen { errno, .. }
            | SocketError::Connect { errno, .. }
            | SocketError::Accept { errno }
            | SocketError::Send { errno }
            | SocketError::Recv { errno }
            | SocketError::Close { errno }
            | SocketError::SetOption { errno, .. }
            | SocketError::GetName { errno } => errno_to_kind(*errno),
            SocketError::InvalidAddress { .. } => std::io::ErrorKind::InvalidInput,
            SocketError::AlreadyBound { .. }
            | SocketError::NotBound
            | SocketError::AlreadyListening { .. }
            | SocketError::NotListening
            | SocketError::AlreadyConnected => std::io::ErrorKind::InvalidInput,
            SocketError::NotConnected | SocketError::Closed => std::io::ErrorKind::NotConnected,
            SocketError::Resolve { .. }
            | SocketError::NoAddressFound { .. }
            | SocketError::HostNotFound { .. } => std::io::ErrorKind::NotFound,
            SocketError::ConnectionClosed => std::io::ErrorKind::ConnectionReset,
        };
        std::io::Error::new(kind, err)
    }
}
