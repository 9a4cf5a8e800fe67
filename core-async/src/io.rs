//! Async I/O traits and utilities re-exported from Tokio.

pub use tokio::io::{
    copy, empty, AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncSeek,
    AsyncSeekExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter, Error, ErrorKind, ReadBuf,
    Result,
};
