//! Integration Tests Module
//!
//! End-to-end tests for Symptom Trace: the deep and quick pipelines driven
//! by scripted model providers, persistence, and the HTTP surface.

// Scripted providers, stub tools and fixtures shared by the tests below
mod support;


// Bounded tool-use loop in the chain builder
mod tool_loop_test;

// Quick-trace pipeline
mod quick_trace_test;

// Archive and store behaviour after a completed trace
mod persistence_test;

// HTTP routes and SSE framing
mod http_test;
