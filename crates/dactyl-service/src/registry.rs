//! Per-user template registry with asynchronous durable persistence
//!
//! The in-memory sequence is always the latest truth; the durable JSON copy
//! may lag by the snapshots still queued to the writer task. Every mutation
//! takes a point-in-time copy under the registry lock and publishes it to a
//! single writer per registry, which runs without the lock so slow storage
//! never blocks registry access. Snapshots coalesce: a later one always
//! captures every earlier mutation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use dactyl_core::{RegistryDocument, Template};

use crate::error::Result;

const REGISTRY_FILE: &str = "templates.json";

/// Display-name stem probed with increasing suffixes at enroll time.
const NAME_TEMPLATE: &str = "Finger";

struct RegistryInner {
    templates: Vec<Template>,
    /// Generation of the most recently scheduled snapshot
    generation: u64,
}

#[derive(Clone)]
struct WriteRequest {
    generation: u64,
    templates: Vec<Template>,
}

/// One user's enrolled-template registry.
///
/// Constructed lazily through [`RegistryStore`]; loads durable state
/// synchronously at construction and lives for the life of the process.
pub struct TemplateRegistry {
    user_id: i32,
    inner: Mutex<RegistryInner>,
    schedule_tx: watch::Sender<WriteRequest>,
    written_rx: watch::Receiver<u64>,
}

impl TemplateRegistry {
    /// Load the registry for `user_id` from `store_dir` and spawn its writer
    /// task on `runtime`. A missing file is an empty registry; a file that
    /// exists but does not parse is an error.
    pub fn open(
        store_dir: &Path,
        user_id: i32,
        runtime: &tokio::runtime::Handle,
    ) -> Result<Arc<Self>> {
        let path = store_dir.join(user_id.to_string()).join(REGISTRY_FILE);
        let templates = load_templates(&path)?;
        info!(user_id, count = templates.len(), "loaded template registry");

        let (schedule_tx, schedule_rx) = watch::channel(WriteRequest {
            generation: 0,
            templates: Vec::new(),
        });
        let (written_tx, written_rx) = watch::channel(0u64);

        let registry = Arc::new(Self {
            user_id,
            inner: Mutex::new(RegistryInner {
                templates,
                generation: 0,
            }),
            schedule_tx,
            written_rx,
        });

        runtime.spawn(write_loop(path, schedule_rx, written_tx));
        Ok(registry)
    }

    /// All enrolled templates, as a defensive copy that never aliases
    /// internal storage.
    pub fn list(&self) -> Vec<Template> {
        self.lock_inner().templates.clone()
    }

    /// Record a daemon-enrolled template, assigning it a display name unique
    /// within this registry.
    pub fn add(&self, template_id: u32, group_id: u32) -> Template {
        let mut inner = self.lock_inner();
        let name = unique_name(&inner.templates);
        let template = Template::new(name, group_id, template_id, 0);
        inner.templates.push(template.clone());
        self.schedule_write(&mut inner);
        debug!(
            user_id = self.user_id,
            template_id,
            name = %template.name,
            "template added"
        );
        template
    }

    /// Delete the first template with `template_id`. Absent ids are a no-op.
    pub fn remove(&self, template_id: u32) {
        let mut inner = self.lock_inner();
        let Some(index) = inner
            .templates
            .iter()
            .position(|t| t.template_id == template_id)
        else {
            return;
        };
        inner.templates.remove(index);
        self.schedule_write(&mut inner);
        debug!(user_id = self.user_id, template_id, "template removed");
    }

    /// Rename a template. An empty name is a no-op, not an error.
    pub fn rename(&self, template_id: u32, new_name: &str) {
        if new_name.is_empty() {
            return;
        }
        let mut inner = self.lock_inner();
        let Some(template) = inner
            .templates
            .iter_mut()
            .find(|t| t.template_id == template_id)
        else {
            return;
        };
        template.name = new_name.to_string();
        self.schedule_write(&mut inner);
    }

    /// Whether the durable copy still lags the in-memory state
    pub fn pending_write(&self) -> bool {
        let scheduled = self.lock_inner().generation;
        *self.written_rx.borrow() < scheduled
    }

    /// Wait until every scheduled snapshot has reached durable storage
    pub async fn flush(&self) {
        let scheduled = self.lock_inner().generation;
        let mut written = self.written_rx.clone();
        let _ = written.wait_for(|generation| *generation >= scheduled).await;
    }

    fn schedule_write(&self, inner: &mut RegistryInner) {
        inner.generation += 1;
        let request = WriteRequest {
            generation: inner.generation,
            templates: inner.templates.clone(),
        };
        if self.schedule_tx.send(request).is_err() {
            warn!(user_id = self.user_id, "registry writer is gone; snapshot not scheduled");
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single consumer of a registry's write queue.
async fn write_loop(
    path: PathBuf,
    mut requests: watch::Receiver<WriteRequest>,
    written: watch::Sender<u64>,
) {
    while requests.changed().await.is_ok() {
        let request = requests.borrow_and_update().clone();
        if request.generation == 0 {
            continue;
        }
        if let Err(e) = write_snapshot(&path, &request.templates) {
            // A lost durable write means memory and disk silently diverge
            // across the next reboot; the previously published copy is
            // intact, so halt rather than keep running on phantom state.
            error!(error = %e, ?path, "failed to write template registry");
            std::process::abort();
        }
        debug!(generation = request.generation, "template registry persisted");
        let _ = written.send(request.generation);
    }
}

/// All-or-nothing durable write: stage, then atomically publish. On failure
/// the staging file is discarded and the previous copy is untouched.
fn write_snapshot(path: &Path, templates: &[Template]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = RegistryDocument::new(templates.to_vec()).to_json()?;
    let staging = path.with_extension("json.tmp");
    let published = std::fs::write(&staging, json.as_bytes())
        .and_then(|()| std::fs::rename(&staging, path));
    if let Err(e) = published {
        let _ = std::fs::remove_file(&staging);
        return Err(e.into());
    }
    Ok(())
}

fn load_templates(path: &Path) -> Result<Vec<Template>> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        // No prior enrollments for this user.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let document = RegistryDocument::from_json(&json)?;
    Ok(document.templates)
}

fn unique_name(templates: &[Template]) -> String {
    // Linear probe; per-user enrollment counts stay in the single digits.
    let mut guess = 1u32;
    loop {
        let name = format!("{NAME_TEMPLATE} {guess}");
        if templates.iter().all(|t| t.name != name) {
            return name;
        }
        guess += 1;
    }
}

/// Registry-of-registries owned by the composition root.
///
/// One registry instance per user id, deduplicated under a single lock and
/// passed by reference into session constructors. Registries for different
/// users are fully independent.
pub struct RegistryStore {
    store_dir: PathBuf,
    runtime: tokio::runtime::Handle,
    users: Mutex<HashMap<i32, Arc<TemplateRegistry>>>,
}

impl RegistryStore {
    /// Create a store rooted at `store_dir`, spawning writer tasks on
    /// `runtime` as registries are first touched.
    pub fn new(store_dir: PathBuf, runtime: tokio::runtime::Handle) -> Self {
        Self {
            store_dir,
            runtime,
            users: Mutex::new(HashMap::new()),
        }
    }

    /// The registry for `user_id`, constructing it on first access
    pub fn registry_for(&self, user_id: i32) -> Result<Arc<TemplateRegistry>> {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(registry) = users.get(&user_id) {
            return Ok(Arc::clone(registry));
        }
        let registry = TemplateRegistry::open(&self.store_dir, user_id, &self.runtime)?;
        users.insert(user_id, Arc::clone(&registry));
        Ok(registry)
    }

    /// All templates enrolled for `user_id`
    pub fn templates_for(&self, user_id: i32) -> Result<Vec<Template>> {
        Ok(self.registry_for(user_id)?.list())
    }

    /// Commit a daemon-confirmed enrollment for `user_id`
    pub fn add_for(&self, user_id: i32, template_id: u32, group_id: u32) -> Result<Template> {
        Ok(self.registry_for(user_id)?.add(template_id, group_id))
    }

    /// Delete a daemon-confirmed removal for `user_id`
    pub fn remove_for(&self, user_id: i32, template_id: u32) -> Result<()> {
        self.registry_for(user_id)?.remove(template_id);
        Ok(())
    }

    /// Rename a template for `user_id`; empty names are ignored
    pub fn rename_for(&self, user_id: i32, template_id: u32, new_name: &str) -> Result<()> {
        self.registry_for(user_id)?.rename(template_id, new_name);
        Ok(())
    }
}
