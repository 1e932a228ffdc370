//! # SynCOM
//!
//! Synthetic time sequences of solar-wind density images built from many Gaussian
//! "blobs" propagating radially outward on a polar (position angle × radius) grid,
//! and extraction of outflow speeds from distance–time stacks by windowed
//! cross-correlation.
//!
//! * [`synthesis`] – blob sampling, frame compositing and the simulation driver.
//! * [`velocity`] – detrending, lagged cross-correlation, peak refinement and
//!   lag → speed conversion.
//! * [`angular_field`] – per-angle speed/period fields and their CSV loader.
//! * [`image_cube`] – frames, cubes and circular shifts.
//! * [`frame_sink`] – destinations for rendered frames.

pub mod angular_field;
pub mod constants;
pub mod frame_sink;
pub mod image_cube;
pub mod syncom_errors;
pub mod synthesis;
pub mod velocity;
