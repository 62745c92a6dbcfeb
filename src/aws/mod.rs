//! Clients for the AWS services the API talks to (SQS, S3, Athena)

pub mod athena;
pub mod messages;
pub mod s3;
pub mod sqs;

pub use athena::{AthenaQueryRunner, QueryRunner, Row};
pub use s3::{ObjectStore, S3JsonCache, S3ObjectStore};
pub use sqs::{MessageQueue, SqsQueue};
