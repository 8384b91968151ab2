//! Flight-record serialization suite
//!
//! Seven file formats for the same on-time performance table, measured by
//! the `serdebench-flights` binary with one worker process per trial.

pub mod codec;
pub mod fixtures;
pub mod record;
pub mod validate;

pub use codec::{CodecError, Format};
pub use fixtures::{
    FixtureError, data_dir, fixture_path, load_dataset, prepare_fixtures, scratch_path, synthetic,
};
pub use record::{FIELD_NAMES, Flight};
pub use validate::{ValidationError, validate};
