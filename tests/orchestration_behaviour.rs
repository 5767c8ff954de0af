//! Behavioural scenarios for prebuild orchestration.

mod orchestration;
