// Reference file readers
//
// Three unrelated formats, one output: each reader fills a DataSetBuilder
// from a buffered stream. Malformed records are logged and skipped; a broken
// file skeleton (missing root, missing version, missing columns) fails the
// whole load and the builder is dropped with everything it collected.
//
// - clublog:      Club Log cty.xml (entities, exceptions, prefixes,
//                 invalid operations, zone exceptions, with history)
// - cty_csv:      country list as CSV with the (cq)[itu]= pattern language
// - prefix_list:  pipe-delimited, depth-nested records with wildcard masks

pub mod clublog;
pub mod cty_csv;
pub mod mask;
pub mod prefix_list;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::LoadError;
use crate::model::{DataSet, DataSetBuilder, Provider};

/// Default number of records between progress callbacks
pub const DEFAULT_PROGRESS_INTERVAL: usize = 500;

/// Knobs shared by all readers
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub progress_interval: usize,
    pub strict_overlaps: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            strict_overlaps: true,
        }
    }
}

/// Counts records and calls back every `interval` of them
pub struct Progress<'a> {
    interval: usize,
    records: usize,
    callback: Option<&'a mut dyn FnMut(usize)>,
}

impl<'a> Progress<'a> {
    pub fn new(interval: usize, callback: Option<&'a mut dyn FnMut(usize)>) -> Self {
        Self {
            interval: interval.max(1),
            records: 0,
            callback,
        }
    }

    /// A progress counter nobody listens to
    pub fn silent() -> Self {
        Self::new(DEFAULT_PROGRESS_INTERVAL, None)
    }

    /// Record one more processed record
    pub fn tick(&mut self) {
        self.records += 1;
        if self.records % self.interval == 0 {
            log::debug!("Processed {} records...", self.records);
            if let Some(cb) = self.callback.as_mut() {
                cb(self.records);
            }
        }
    }

    pub fn records(&self) -> usize {
        self.records
    }
}

/// Read a reference stream of the given provider's format into a data set
pub fn read<R: BufRead>(
    provider: Provider,
    input: R,
    options: ReadOptions,
    progress: Option<&mut dyn FnMut(usize)>,
) -> Result<DataSet, LoadError> {
    log::info!("Loading {} reference data...", provider);

    let mut progress = Progress::new(options.progress_interval, progress);
    let mut builder = DataSetBuilder::new(provider).strict_overlaps(options.strict_overlaps);

    match provider {
        Provider::Clublog => clublog::parse(input, &mut builder, &mut progress)?,
        Provider::CtyCsv => cty_csv::parse(input, &mut builder, &mut progress)?,
        Provider::PrefixList => prefix_list::parse(input, &mut builder, &mut progress)?,
    }

    let data = builder.finish()?;
    let stats = data.stats();
    log::info!(
        "Loaded {} version '{}': {} entities, {} prefixes, {} exceptions, {} zone exceptions, {} invalid ({} records)",
        provider,
        data.version(),
        stats.entity_count,
        stats.prefix_count,
        stats.exception_count,
        stats.zone_exception_count,
        stats.invalid_count,
        progress.records()
    );
    Ok(data)
}

/// Open and read a reference file from disk
pub fn read_file(
    provider: Provider,
    path: &Path,
    options: ReadOptions,
    progress: Option<&mut dyn FnMut(usize)>,
) -> Result<DataSet, LoadError> {
    log::info!("Opening {} file: {:?}", provider, path);
    let file = File::open(path)?;
    read(provider, BufReader::new(file), options, progress)
}
