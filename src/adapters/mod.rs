//! External system integrations for Porter.
//!
//! - [`database`] - Source query and target load abstraction (trait-based)
//! - [`postgresql`] - PostgreSQL implementation of the source and sync target
//! - [`gnupg`] - Public-key encryption through the `gpg` tool
//! - [`sftp`] - SFTP transfer sessions
//! - [`smtp`] - Summary email delivery
//!
//! Every integration sits behind an `async_trait` trait so the pipeline can
//! be exercised with in-memory doubles.

pub mod database;
pub mod gnupg;
pub mod postgresql;
pub mod sftp;
pub mod smtp;

pub use database::{
    create_source_client, PostgreSQLConnector, SourceClient, SourceConnector, TableLoader,
    TargetConnector,
};
pub use gnupg::{Encryptor, GnuPg};
pub use sftp::{FileTransfer, SftpConnector, TransferConnector};
pub use smtp::{EmailMessage, Notifier, SmtpNotifier};
