//! Host port allocation.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use yard_templates::PortMapping;

use crate::error::{EngineError, EngineResult};
use crate::registry::PortBinding;

/// Pick a host port for every template port.
///
/// The requested host port is kept when free, otherwise the next free port
/// above it is taken. Ports in `taken`, and ports already handed out in this
/// call, are never reused.
pub fn allocate_host_ports(
    requested: &[PortMapping],
    taken: &BTreeSet<u16>,
) -> EngineResult<Vec<PortBinding>> {
    let mut allocated: BTreeMap<u16, u16> = BTreeMap::new();
    let mut bindings = Vec::with_capacity(requested.len());

    for mapping in requested {
        let host = (mapping.host..=u16::MAX)
            .find(|port| !taken.contains(port) && !allocated.contains_key(port))
            .ok_or(EngineError::NoFreePort(mapping.host))?;

        if host != mapping.host {
            debug!(
                "Host port {} is taken, publishing container port {} on {}",
                mapping.host, mapping.container, host
            );
        }
        allocated.insert(host, mapping.container);
        bindings.push(PortBinding {
            host,
            container: mapping.container,
        });
    }

    Ok(bindings)
}
