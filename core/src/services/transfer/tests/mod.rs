//! Unit tests for the transfer service

mod mocks;
