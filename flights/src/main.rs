//! Flight-record serialization suite
//!
//! ```text
//! serdebench-flights                  # every unit, 10 cycles
//! serdebench-flights -c 3 '^load_'    # load units only
//! serdebench-flights --group csv
//! FLIGHTS_RECORDS=5000 serdebench-flights --format json -o flights.json
//! ```

use clap::Parser;
use serdebench::Sampler;
use serdebench_flights::{Format, fixture_path, load_dataset, scratch_path, validate};

/// Registers `save`, `load` and `load_and_validate` units for one format
macro_rules! format_units {
    ($format:expr, $group:tt => $save:ident, $load:ident, $load_and_validate:ident) => {
        /// Writes the whole dataset to a per-process file, then removes it
        #[serdebench::unit(group = $group)]
        fn $save(s: &mut Sampler) -> anyhow::Result<()> {
            let flights = load_dataset()?;
            let path = scratch_path($format);
            s.measure(|| -> anyhow::Result<()> {
                let saved = $format.save(&flights, &path);
                let removed = std::fs::remove_file(&path);
                saved?;
                Ok(removed?)
            })
        }

        #[serdebench::unit(group = $group)]
        fn $load(s: &mut Sampler) -> anyhow::Result<()> {
            let path = fixture_path($format);
            let flights = s.measure(|| $format.load(&path))?;
            anyhow::ensure!(!flights.is_empty(), "{} holds no records", path.display());
            Ok(())
        }

        #[serdebench::unit(group = $group)]
        fn $load_and_validate(s: &mut Sampler) -> anyhow::Result<()> {
            let path = fixture_path($format);
            s.measure(|| -> anyhow::Result<()> {
                let flights = $format.load(&path)?;
                validate(&flights)?;
                Ok(())
            })
        }
    };
}

format_units!(Format::Csv, "csv" => save_csv, load_csv, load_csv_and_validate);
format_units!(Format::Json, "json" => save_json, load_json, load_json_and_validate);
format_units!(
    Format::JsonLines, "json_lines" =>
    save_json_lines, load_json_lines, load_json_lines_and_validate
);
format_units!(
    Format::BincodeStream, "bincode_stream" =>
    save_bincode_stream, load_bincode_stream, load_bincode_stream_and_validate
);
format_units!(
    Format::RkyvFrames, "rkyv_frames" =>
    save_rkyv_frames, load_rkyv_frames, load_rkyv_frames_and_validate
);
format_units!(Format::Bincode, "bincode" => save_bincode, load_bincode, load_bincode_and_validate);
format_units!(
    Format::BincodeZstd, "bincode_zstd" =>
    save_bincode_zstd, load_bincode_zstd, load_bincode_zstd_and_validate
);

fn main() -> anyhow::Result<()> {
    // Each trial re-executes this binary; fixtures are already in place
    if serdebench::worker_requested() {
        return serdebench::run_worker();
    }

    let cli = serdebench::Cli::parse();
    serdebench::init_logging(cli.verbose);

    if !cli.lists_only() {
        serdebench_flights::prepare_fixtures()?;
    }
    serdebench::run_with_cli(cli)
}
