use quick_error::quick_error;
use std::io;
use std::result;

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        /// A lower bound would sit above the upper bound
        InvalidRange(msg: String) {
            display("invalid bound range: {}", msg)
        }
        /// A key does not match the table's key format
        FormatMismatch(msg: String) {
            display("key format mismatch: {}", msg)
        }
        KeyNotSet {
            display("requires key be set")
        }
        /// The cursor's own transaction is prepared
        PreparedTransaction(op: &'static str) {
            display("{} not permitted in a prepared transaction", op)
        }
        /// Another transaction's prepared update was read
        PreparedConflict(key: String) {
            display("conflict with a prepared update on key {}", key)
        }
        InvalidArgument(msg: String) {
            display("invalid argument: {}", msg)
        }
        Corruption(msg: String) {
            display("corruption: {}", msg)
        }
        CompressionFailed(err: snap::Error) {
            from()
            display("snappy compression failed: {}", err)
        }
        Io(err: io::Error) {
            from()
            display("I/O error: {}", err)
        }
    }
}

pub type Result<T> = result::Result<T, Error>;
