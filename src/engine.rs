// Owned resolution engine
//
// Holds the current data set behind an Arc. Collaborators get the engine (or
// a snapshot) passed in explicitly. A reload builds a complete new data set
// first and swaps the Arc only when that succeeded, so a failed reload leaves
// the previous model in place and outstanding snapshots are never touched.

use std::io::BufRead;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::error::LoadError;
use crate::model::{DataSet, Provider};
use crate::readers::{self, ReadOptions};
use crate::resolver::{Resolution, Resolver, Role};

#[derive(Debug, Clone)]
pub struct Engine {
    data: Arc<DataSet>,
    config: Option<EngineConfig>,
}

impl Engine {
    /// Wrap an already built data set
    pub fn new(data: DataSet) -> Self {
        Self {
            data: Arc::new(data),
            config: None,
        }
    }

    /// Load the file named by `config`
    pub fn load(
        config: &EngineConfig,
        progress: Option<&mut dyn FnMut(usize)>,
    ) -> Result<Self, LoadError> {
        let data = readers::read_file(
            config.provider,
            &config.path,
            config.read_options(),
            progress,
        )?;
        Ok(Self {
            data: Arc::new(data),
            config: Some(config.clone()),
        })
    }

    /// Load from any buffered stream
    pub fn load_from_reader<R: BufRead>(
        provider: Provider,
        input: R,
        options: ReadOptions,
        progress: Option<&mut dyn FnMut(usize)>,
    ) -> Result<Self, LoadError> {
        let data = readers::read(provider, input, options, progress)?;
        Ok(Self::new(data))
    }

    /// Re-read the file this engine was loaded from
    pub fn reload(&mut self, progress: Option<&mut dyn FnMut(usize)>) -> Result<(), LoadError> {
        let config = self
            .config
            .clone()
            .ok_or_else(|| LoadError::Config("engine was not loaded from a file".to_string()))?;
        self.reload_from(&config, progress)
    }

    /// Load a different file and make it current
    pub fn reload_from(
        &mut self,
        config: &EngineConfig,
        progress: Option<&mut dyn FnMut(usize)>,
    ) -> Result<(), LoadError> {
        let data = readers::read_file(
            config.provider,
            &config.path,
            config.read_options(),
            progress,
        )
        .map_err(|e| {
            log::warn!("Reload of {:?} failed, keeping version '{}': {}", config.path, self.data.version(), e);
            e
        })?;
        self.swap(data);
        self.config = Some(config.clone());
        Ok(())
    }

    /// Load from a stream and make it current
    pub fn reload_from_reader<R: BufRead>(
        &mut self,
        provider: Provider,
        input: R,
        options: ReadOptions,
        progress: Option<&mut dyn FnMut(usize)>,
    ) -> Result<(), LoadError> {
        let data = readers::read(provider, input, options, progress).map_err(|e| {
            log::warn!("Reload failed, keeping version '{}': {}", self.data.version(), e);
            e
        })?;
        self.swap(data);
        Ok(())
    }

    fn swap(&mut self, data: DataSet) {
        log::info!(
            "Replacing {} '{}' with {} '{}'",
            self.data.provider(),
            self.data.version(),
            data.provider(),
            data.version()
        );
        self.data = Arc::new(data);
    }

    /// The current data set; stays valid across later reloads
    pub fn snapshot(&self) -> Arc<DataSet> {
        Arc::clone(&self.data)
    }

    pub fn data(&self) -> &DataSet {
        &self.data
    }

    pub fn config(&self) -> Option<&EngineConfig> {
        self.config.as_ref()
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.data)
    }

    pub fn resolve(&self, call: &str, date: NaiveDate, role: Role) -> Resolution {
        self.resolver().resolve(call, date, role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Provenance;
    use std::fs;

    const CTY_V1: &str = "\
prefix,name,dxcc,continent,cq,itu,lat,lon,tz,patterns
GM,Scotland,279,EU,14,27,56.82,-4.18,0,\"GM,MM,=VER20240101;\"
";

    const CTY_V2: &str = "\
prefix,name,dxcc,continent,cq,itu,lat,lon,tz,patterns
GM,Scotland,279,EU,14,27,56.82,-4.18,0,\"GM,MM,2M,=VER20240201;\"
";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_load_and_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cty.csv");
        fs::write(&path, CTY_V1).unwrap();

        let mut calls = 0;
        let mut cb = |_: usize| calls += 1;
        let config = EngineConfig {
            progress_interval: 1,
            ..EngineConfig::new(Provider::CtyCsv, &path)
        };
        let engine = Engine::load(&config, Some(&mut cb)).unwrap();
        assert_eq!(calls, 1);
        assert_eq!(engine.data().version(), "20240101");

        let res = engine.resolve("GM3ZZA", today(), Role::Theirs);
        assert_eq!(res.entity_id(), Some(279));
        assert_eq!(res.provenance(), Provenance::DefaultPrefix);
        assert_eq!(res.itu_zone(), Some(27));
        assert_eq!(res.locator().as_deref(), Some("IO76"));
    }

    #[test]
    fn test_failed_reload_keeps_previous_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cty.csv");
        fs::write(&path, CTY_V1).unwrap();
        let mut engine = Engine::load(&EngineConfig::new(Provider::CtyCsv, &path), None).unwrap();

        // header without the patterns column
        fs::write(&path, "prefix,name,dxcc\nGM,Scotland,279\n").unwrap();
        assert!(matches!(engine.reload(None), Err(LoadError::MissingColumn(_))));
        assert_eq!(engine.data().version(), "20240101");
        assert_eq!(engine.resolve("MM0ABC", today(), Role::Theirs).entity_id(), Some(279));

        let missing = EngineConfig::new(Provider::CtyCsv, dir.path().join("gone.csv"));
        assert!(matches!(engine.reload_from(&missing, None), Err(LoadError::Io(_))));
        assert_eq!(engine.config().map(|c| c.path.clone()), Some(path));
    }

    #[test]
    fn test_successful_reload_swaps_and_snapshots_survive() {
        let mut engine = Engine::load_from_reader(
            Provider::CtyCsv,
            CTY_V1.as_bytes(),
            ReadOptions::default(),
            None,
        )
        .unwrap();
        let before = engine.snapshot();

        engine
            .reload_from_reader(Provider::CtyCsv, CTY_V2.as_bytes(), ReadOptions::default(), None)
            .unwrap();
        assert_eq!(engine.data().version(), "20240201");
        assert_eq!(engine.resolve("2M0XYZ", today(), Role::Theirs).entity_id(), Some(279));

        // the old snapshot still answers from the old data
        assert_eq!(before.version(), "20240101");
        let old = Resolver::new(&before).resolve("2M0XYZ", today(), Role::Theirs);
        assert_eq!(old.provenance(), Provenance::NoDecode);
    }

    #[test]
    fn test_reload_without_file_is_config_error() {
        let mut engine = Engine::load_from_reader(
            Provider::CtyCsv,
            CTY_V1.as_bytes(),
            ReadOptions::default(),
            None,
        )
        .unwrap();
        assert!(matches!(engine.reload(None), Err(LoadError::Config(_))));
    }
}
