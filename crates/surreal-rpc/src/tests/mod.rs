//! Tests driving the multiplexer through a scripted connection.

mod support;
