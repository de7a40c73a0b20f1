use std::sync::Arc;

use dog_queue::{ConnectionFactory, SharedConnection};
use indexmap::IndexMap;
use tracing::debug;

use crate::config::{ConnectionSpec, DEFAULT_QUEUE};
use crate::{RqError, RqResult};

/// Live connection handles by name, `"default"` first.
///
/// Names that reference each other share one handle, so
/// [`dog_queue::same_connection`] holds between them.
#[derive(Debug, Clone)]
pub struct ResolvedConnections {
    default: SharedConnection,
    handles: IndexMap<String, SharedConnection>,
}

impl ResolvedConnections {
    pub fn get(&self, name: &str) -> Option<&SharedConnection> {
        self.handles.get(name)
    }

    /// The default connection, which always exists
    pub fn default_connection(&self) -> &SharedConnection {
        &self.default
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Build one handle per parameter or URL spec, then point every reference
/// at its target's handle.
///
/// `None` specs are skipped. When no spec is named `"default"`, a default
/// connection is made with [`ConnectionFactory::connect_default`]. A single
/// missing or cyclic reference fails the whole resolution.
pub fn resolve_connections(
    specs: &IndexMap<String, Option<ConnectionSpec>>,
    factory: &dyn ConnectionFactory,
) -> RqResult<ResolvedConnections> {
    let mut handles: IndexMap<String, SharedConnection> = IndexMap::new();
    let mut references: IndexMap<&str, &str> = IndexMap::new();

    for (name, spec) in specs {
        match spec {
            None => {}
            Some(ConnectionSpec::Params(params)) => {
                handles.insert(name.clone(), factory.connect(params)?);
            }
            Some(ConnectionSpec::Url(url)) => {
                handles.insert(name.clone(), factory.from_url(url)?);
            }
            Some(ConnectionSpec::Reference(target)) => {
                references.insert(name.as_str(), target.as_str());
            }
        }
    }

    if !handles.contains_key(DEFAULT_QUEUE) && !references.contains_key(DEFAULT_QUEUE) {
        debug!(factory = factory.name(), "no default connection configured, using localhost");
        handles.insert(DEFAULT_QUEUE.to_string(), factory.connect_default()?);
    }

    let mut followed = Vec::with_capacity(references.len());
    for name in references.keys() {
        followed.push((name.to_string(), follow(name, &references, &handles)?));
    }
    handles.extend(followed);

    let default = handles
        .shift_remove(DEFAULT_QUEUE)
        .ok_or_else(|| RqError::UnresolvedReference {
            name: DEFAULT_QUEUE.to_string(),
            target: DEFAULT_QUEUE.to_string(),
        })?;

    let mut ordered = IndexMap::with_capacity(handles.len() + 1);
    ordered.insert(DEFAULT_QUEUE.to_string(), Arc::clone(&default));
    ordered.extend(handles);

    debug!(
        connections = ?ordered.keys().collect::<Vec<_>>(),
        references = references.len(),
        "resolved connections"
    );

    Ok(ResolvedConnections {
        default,
        handles: ordered,
    })
}

fn follow(
    name: &str,
    references: &IndexMap<&str, &str>,
    handles: &IndexMap<String, SharedConnection>,
) -> RqResult<SharedConnection> {
    let mut chain = vec![name.to_string()];
    let mut current = name;

    loop {
        let target = references[current];
        if let Some(handle) = handles.get(target) {
            return Ok(Arc::clone(handle));
        }
        if chain.iter().any(|seen| seen == target) {
            chain.push(target.to_string());
            return Err(RqError::ReferenceCycle { chain });
        }
        if !references.contains_key(target) {
            return Err(RqError::UnresolvedReference {
                name: current.to_string(),
                target: target.to_string(),
            });
        }
        chain.push(target.to_string());
        current = target;
    }
}
