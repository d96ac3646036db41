//! Unit tests for the verification orchestrator
