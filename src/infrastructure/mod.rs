pub mod oracle;
pub mod persistence;
pub mod transport;
