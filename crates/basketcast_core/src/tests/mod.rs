//! Integration tests for the basketcast forecasting engine
//!
//! Tests are organized by topic:
//! - `metrics` - Historical statistics over realistic price histories
//! - `simulation` - Statistical properties of the Monte Carlo run
//! - `forecast` - Full pipeline, date ranges and refinement fallback

mod metrics;
