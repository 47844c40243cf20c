//! Property-based tests for the cursor codec and state mapping.
