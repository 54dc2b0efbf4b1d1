//! Repository Tests

mod message_tests;
mod postgres_tests;
mod sequence_tests;
