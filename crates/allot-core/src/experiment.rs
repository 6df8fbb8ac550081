//! Experiment facade.
//!
//! Composes partitioning, tool-config templating, the metadata store, and
//! the allocation engine into the lifecycle operations. This is the only
//! component that touches the blob store for copying unit contents into a
//! worker-visible location.
//!
//! A `Mutex` serializes mutating operations within one process. Across
//! processes the design provides no mutual exclusion by itself; deployments
//! that share a filesystem store should wrap mutations in
//! [`crate::lock::ExperimentLock`].

use crate::allocate::{self, AllocationMap};
use crate::error::ExperimentError;
use crate::metadata::MetaDict;
use crate::partition::{self, Item, Unit, UnitMember};
use crate::store::BlobStore;
use crate::toolconf::{self, Entity};
use indexmap::IndexMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

const KEY_SAMPLE_SOURCE: &str = "sample_source";
const KEY_SAMPLE_NAME: &str = "sample_name";
const KEY_ENTITIES: &str = "entities";
const KEY_MINIMUM: &str = "minimum_annotations_per_unit";
const KEY_UNIT_SIZE: &str = "max_unit_size";
const KEY_UNITS: &str = "units";
const KEY_ALLOCATIONS: &str = "allocations";

/// Unit map as persisted: unit name → member list, creation order.
pub type UnitMap = IndexMap<String, Vec<UnitMember>>;

/// Tunables fixed at `start` time.
#[derive(Debug, Clone)]
pub struct ExperimentOptions {
    /// How many distinct workers should annotate each unit before the
    /// engine stops steering new workers toward it.
    pub minimum_annotations_per_unit: usize,
    /// How many items go into each unit. Small enough not to daunt a worker
    /// at first sitting, large enough that requesting more is not a hassle.
    pub max_unit_size: usize,
}

impl Default for ExperimentOptions {
    fn default() -> Self {
        Self {
            minimum_annotations_per_unit: 2,
            max_unit_size: 10,
        }
    }
}

/// The root aggregate: a named, immutable unit pool plus the mutable
/// worker/allocation bookkeeping around it.
pub struct Experiment {
    name: String,
    base_path: String,
    store: Arc<dyn BlobStore>,
    inner: Mutex<Inner>,
}

struct Inner {
    metadata: MetaDict,
    creds: MetaDict,
}

impl Experiment {
    /// Bind an experiment identity under `base_path` in the given store.
    ///
    /// Purely constructs handles; nothing is read or written until a
    /// lifecycle operation runs.
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>, base_path: &str, name: &str) -> Self {
        let experiment_path = format!("{}/{name}", base_path.trim_end_matches('/'));
        let metadata = MetaDict::new(Arc::clone(&store), format!("{experiment_path}/metadata"));
        let creds = MetaDict::new(Arc::clone(&store), format!("{experiment_path}/worker-creds"));
        Self {
            name: name.to_string(),
            base_path: base_path.trim_end_matches('/').to_string(),
            store,
            inner: Mutex::new(Inner { metadata, creds }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path to all blobs relating to the experiment.
    #[must_use]
    pub fn experiment_path(&self) -> String {
        format!("{}/{}", self.base_path, self.name)
    }

    /// Path to the labeling-tool config artifacts.
    #[must_use]
    pub fn tool_config_path(&self) -> String {
        format!("{}/tool_config", self.experiment_path())
    }

    /// Path to the unit data the labeling tool serves.
    #[must_use]
    pub fn data_path(&self) -> String {
        format!("{}/data", self.tool_config_path())
    }

    /// Path to one unit's source artifacts.
    #[must_use]
    pub fn unit_path(&self, unit_name: &str) -> String {
        partition::unit_dir(&self.data_path(), unit_name)
    }

    /// Path to everything a worker sees when logging in.
    #[must_use]
    pub fn worker_area_path(&self, worker_id: &str) -> String {
        format!("{}/.{worker_id}", self.data_path())
    }

    /// Path to one allocation's copied artifacts for a worker.
    #[must_use]
    pub fn allocation_path(&self, worker_id: &str, unit_name: &str) -> String {
        format!("{}/{unit_name}", self.worker_area_path(worker_id))
    }

    /// Start the experiment: partition `items` into units, record the
    /// configuration and unit map, and write the labeling-tool config.
    ///
    /// The configuration and the unit set are immutable afterwards.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` if this experiment identity already has units;
    /// `Configuration` for invalid options; `Storage` on store failures.
    pub fn start(
        &self,
        sample_source: &str,
        sample_name: &str,
        items: &[Item],
        entities: &[Entity],
        options: &ExperimentOptions,
    ) -> Result<(), ExperimentError> {
        let mut inner = self.lock_inner();

        if inner.metadata.contains(KEY_UNITS)? {
            return Err(ExperimentError::AlreadyStarted(self.name.clone()));
        }
        if options.minimum_annotations_per_unit < 1 {
            return Err(ExperimentError::Configuration(
                "minimum annotations per unit must be at least 1".into(),
            ));
        }

        info!(experiment = %self.name, "starting experiment");

        let units = partition::partition(
            self.store.as_ref(),
            &self.data_path(),
            items,
            options.max_unit_size,
        )?;
        let unit_map: UnitMap = units
            .into_iter()
            .map(|Unit { name, members }| (name, members))
            .collect();

        toolconf::write_tool_config(self.store.as_ref(), &self.tool_config_path(), entities)?;

        inner.metadata.set(KEY_SAMPLE_SOURCE, &sample_source)?;
        inner.metadata.set(KEY_SAMPLE_NAME, &sample_name)?;
        inner.metadata.set(KEY_ENTITIES, &entities)?;
        inner
            .metadata
            .set(KEY_MINIMUM, &options.minimum_annotations_per_unit)?;
        inner.metadata.set(KEY_UNIT_SIZE, &options.max_unit_size)?;
        inner.metadata.set(KEY_UNITS, &unit_map)?;
        inner.metadata.set(KEY_ALLOCATIONS, &AllocationMap::new())?;
        inner.metadata.save()?;

        info!(
            experiment = %self.name,
            units = unit_map.len(),
            "experiment started; data at {}",
            self.experiment_path()
        );
        Ok(())
    }

    /// Register a worker and immediately seed its first allocation.
    ///
    /// The credential lives in a namespace separate from the allocation
    /// metadata so credential rotation never touches history. Returns the
    /// destination path of the seeded allocation.
    ///
    /// # Errors
    ///
    /// `DuplicateWorker` on re-registration; otherwise the errors of
    /// [`Experiment::allocate_next`].
    pub fn register_worker(
        &self,
        worker_id: &str,
        credential: &str,
    ) -> Result<String, ExperimentError> {
        let mut inner = self.lock_inner();

        if inner.creds.contains(worker_id)? {
            return Err(ExperimentError::DuplicateWorker(worker_id.to_string()));
        }
        inner.creds.set(worker_id, &credential)?;
        inner.creds.save()?;
        info!(experiment = %self.name, worker = %worker_id, "worker registered");

        // Registration always seeds a first unit.
        self.allocate_locked(&mut inner, worker_id)
    }

    /// Hand the worker its next unit and materialize the unit's contents at
    /// a worker-and-unit-scoped path. Returns that destination path.
    ///
    /// Copy-then-commit: artifacts are copied before the history append is
    /// persisted, so a failed copy leaves no allocation recorded and the
    /// retry path is simply calling this again (selection is deterministic
    /// over unchanged history).
    ///
    /// # Errors
    ///
    /// `UnknownWorker` for unregistered workers; `Exhausted` once the worker
    /// holds every unit (stable terminal state); `Storage` on store
    /// failures.
    pub fn allocate_next(&self, worker_id: &str) -> Result<String, ExperimentError> {
        let mut inner = self.lock_inner();
        self.allocate_locked(&mut inner, worker_id)
    }

    /// All units in creation order.
    pub fn units(&self) -> Result<UnitMap, ExperimentError> {
        let mut inner = self.lock_inner();
        Self::load_units(&mut inner)
    }

    /// A worker's allocation history, oldest first.
    pub fn allocations(&self, worker_id: &str) -> Result<Vec<String>, ExperimentError> {
        let mut inner = self.lock_inner();
        let allocations = Self::load_allocations(&mut inner)?;
        Ok(allocate::history(&allocations, worker_id).to_vec())
    }

    /// Registered worker ids, registration order.
    pub fn workers(&self) -> Result<Vec<String>, ExperimentError> {
        let mut inner = self.lock_inner();
        Ok(inner.creds.keys()?)
    }

    /// Whether the unit still lacks the minimum number of distinct workers.
    pub fn needs_more_coverage(&self, unit_name: &str) -> Result<bool, ExperimentError> {
        let mut inner = self.lock_inner();
        let minimum = Self::load_minimum(&mut inner)?;
        let allocations = Self::load_allocations(&mut inner)?;
        Ok(allocate::needs_more_coverage(
            &allocations,
            unit_name,
            minimum,
        ))
    }

    /// Reliability scoring across overlapping annotations. Out of scope for
    /// this release; the surface exists so callers get an honest error
    /// instead of a panic.
    pub fn inter_rater_reliability(&self) -> Result<(), ExperimentError> {
        Err(ExperimentError::Unimplemented("inter_rater_reliability"))
    }

    /// Final merge/export of consensus labels. Out of scope for this
    /// release.
    pub fn end(&self) -> Result<(), ExperimentError> {
        Err(ExperimentError::Unimplemented("end"))
    }

    fn allocate_locked(
        &self,
        inner: &mut Inner,
        worker_id: &str,
    ) -> Result<String, ExperimentError> {
        if !inner.creds.contains(worker_id)? {
            return Err(ExperimentError::UnknownWorker(worker_id.to_string()));
        }

        let units = Self::load_units(inner)?;
        let minimum = Self::load_minimum(inner)?;
        let mut allocations = Self::load_allocations(inner)?;
        let unit_names: Vec<String> = units.keys().cloned().collect();

        let Some(unit_name) =
            allocate::select_next(&unit_names, &allocations, worker_id, minimum)
        else {
            return Err(ExperimentError::Exhausted(worker_id.to_string()));
        };
        let unit_name = unit_name.to_string();

        // Copy first: a failed copy must not leave the worker recorded as
        // holding a unit whose content never arrived.
        let src_dir = self.unit_path(&unit_name);
        let dst_dir = self.allocation_path(worker_id, &unit_name);
        for src in self.store.list(&src_dir)? {
            let Some(rest) = src.strip_prefix(&src_dir) else {
                warn!(path = %src, "listing returned path outside unit dir");
                continue;
            };
            self.store.copy(&src, &format!("{dst_dir}{rest}"))?;
        }

        allocate::record_allocation(&mut allocations, worker_id, &unit_name);
        inner.metadata.set(KEY_ALLOCATIONS, &allocations)?;
        inner.metadata.save()?;

        info!(
            experiment = %self.name,
            worker = %worker_id,
            unit = %unit_name,
            "allocation created at {dst_dir}"
        );
        Ok(dst_dir)
    }

    fn load_units(inner: &mut Inner) -> Result<UnitMap, ExperimentError> {
        inner
            .metadata
            .get_as::<UnitMap>(KEY_UNITS)?
            .ok_or_else(|| {
                ExperimentError::Configuration("experiment has not been started".into())
            })
    }

    fn load_minimum(inner: &mut Inner) -> Result<usize, ExperimentError> {
        inner
            .metadata
            .get_as::<usize>(KEY_MINIMUM)?
            .ok_or_else(|| {
                ExperimentError::Configuration("experiment has not been started".into())
            })
    }

    fn load_allocations(inner: &mut Inner) -> Result<AllocationMap, ExperimentError> {
        Ok(inner
            .metadata
            .get_as::<AllocationMap>(KEY_ALLOCATIONS)?
            .unwrap_or_default())
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
