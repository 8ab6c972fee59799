//! Assembly resolver: maps a runtime class identifier to the managed
//! assembly and runtime configuration colocated with the host module.

use crate::HostError;
use log::debug;
use std::path::{Path, PathBuf};

/// File name of the unspecialized host binary. A host renamed away from this
/// is assumed to be specialized for a single component.
pub const DEFAULT_HOST_FILE: &str = "winrt.host.dll";

const DEFAULT_HOST_CONFIG: &str = "winrt.host.runtimeconfig.json";
const RUNTIME_CONFIG_EXTENSION: &str = "runtimeconfig.json";
const PROBE_SUFFIXES: [&str; 2] = [".Server.dll", ".dll"];

/// Outcome of one resolution pass. Both fields are request-scoped and
/// derived purely from the filesystem snapshot at call time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub assembly: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// A resolution committed to activation. A value of this type only exists
/// when an assembly was found, so downstream stages never see an empty
/// target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub assembly: PathBuf,
    pub config: Option<PathBuf>,
}

impl Resolution {
    /// An unresolved assembly is terminal for the activation request; the
    /// runtime is never bootstrapped for it.
    pub fn into_target(self, class_id: &str) -> Result<Target, HostError> {
        match self.assembly {
            Some(assembly) => Ok(Target {
                assembly,
                config: self.config,
            }),
            None => Err(HostError::AssemblyNotFound(class_id.to_owned())),
        }
    }
}

/// Resolves the target assembly for `class_id`, probing first by the dotted
/// identifier and then, for a renamed host, by the host's own file name.
pub fn resolve(host_module: &Path, class_id: &str) -> Resolution {
    let host_dir = host_module.parent().unwrap_or(Path::new(""));
    let mut probed = ProbeSet::default();

    let mut assembly = probe_with_truncation(host_dir, class_id, &mut probed);

    // A host renamed per-component may not embed the class identifier in its
    // assembly's name; fall back to probing by the host file name itself.
    if assembly.is_none() && !is_default_host(host_module) {
        if let Some(stem) = host_module.file_stem() {
            let stem = stem.to_string_lossy();
            assembly = probe_with_truncation(host_dir, &stem, &mut probed);
        }
    }

    match &assembly {
        Some(path) => debug!("resolved target assembly {:?}", path),
        None => debug!(
            "no target assembly for class {:?} ({} candidates probed)",
            class_id,
            probed.len()
        ),
    }

    let config = assembly.as_deref().and_then(|a| resolve_config(a, host_module));
    Resolution { assembly, config }
}

/// Ordered set of candidate paths already probed in this call; a recorded
/// path is never handed to the filesystem twice.
#[derive(Default)]
struct ProbeSet(Vec<PathBuf>);

impl ProbeSet {
    fn probe(&mut self, candidate: PathBuf) -> Option<PathBuf> {
        if self.0.contains(&candidate) {
            return None;
        }
        if candidate.is_file() {
            return Some(candidate);
        }
        self.0.push(candidate);
        None
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

/// Tries `<stem>.Server.dll` then `<stem>.dll`, truncating the stem at its
/// last `.` between rounds. A stem of N dotted segments probes at most
/// 2 * N candidates.
fn probe_with_truncation(dir: &Path, seed: &str, probed: &mut ProbeSet) -> Option<PathBuf> {
    let mut stem = seed;
    loop {
        for suffix in PROBE_SUFFIXES {
            if let Some(hit) = probed.probe(dir.join(format!("{stem}{suffix}"))) {
                return Some(hit);
            }
        }
        match stem.rfind('.') {
            Some(split) => stem = &stem[..split],
            None => return None,
        }
    }
}

/// Per-assembly configuration wins; a renamed host may fall back to the
/// shared default next to the host. No configuration at all is acceptable.
fn resolve_config(assembly: &Path, host_module: &Path) -> Option<PathBuf> {
    let candidate = assembly.with_extension(RUNTIME_CONFIG_EXTENSION);
    if candidate.is_file() {
        return Some(candidate);
    }
    if is_default_host(host_module) {
        return None;
    }
    let shared = host_module.with_file_name(DEFAULT_HOST_CONFIG);
    shared.is_file().then_some(shared)
}

fn is_default_host(host_module: &Path) -> bool {
    host_module
        .file_name()
        .map(|name| name.to_string_lossy().eq_ignore_ascii_case(DEFAULT_HOST_FILE))
        .unwrap_or(false)
}
