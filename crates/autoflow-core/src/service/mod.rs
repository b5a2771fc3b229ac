//! Business logic services (use cases).
//!
//! Services orchestrate repository calls, the scheduler, and the execution
//! engine. They depend on traits (ports) -- never on concrete infrastructure
//! implementations.

pub mod workflow;
