use crate::model::{ResourceTab, RowData, TableData};
use crate::query::FieldCatalog;
use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const SERVICE_TAG: &str = "kuma.io/service";
const PROTOCOL_TAG: &str = "kuma.io/protocol";
const ZONE_TAG: &str = "kuma.io/zone";

/// Point-in-time state of one control plane, as exported by its API or CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshSnapshot {
    #[serde(default)]
    pub meshes: Vec<MeshInfo>,
    #[serde(default)]
    pub zones: Vec<ZoneInfo>,
    #[serde(default)]
    pub dataplanes: Vec<DataplaneInfo>,
    #[serde(default)]
    pub policies: Vec<PolicyInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshInfo {
    pub name: String,
    #[serde(default)]
    pub mtls_backend: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneInfo {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub ingresses: u32,
    #[serde(default)]
    pub egresses: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataplaneInfo {
    pub name: String,
    pub mesh: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub last_connected: Option<String>,
}

impl DataplaneInfo {
    pub fn service(&self) -> Option<&str> {
        self.tags.get(SERVICE_TAG).map(String::as_str)
    }

    pub fn protocol(&self) -> Option<&str> {
        self.tags.get(PROTOCOL_TAG).map(String::as_str)
    }

    pub fn zone(&self) -> Option<&str> {
        self.tags.get(ZONE_TAG).map(String::as_str)
    }

    fn online(&self) -> bool {
        self.status.eq_ignore_ascii_case("online")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyInfo {
    pub name: String,
    pub mesh: String,
    pub kind: String,
}

/// Recognized filter fields for one tab's list view; the descriptions feed
/// the suggestion overlay.
pub fn catalog_for(tab: ResourceTab) -> FieldCatalog {
    match tab {
        ResourceTab::Meshes => FieldCatalog::default()
            .field("name", "mesh name")
            .field("mtls", "mTLS backend"),
        ResourceTab::Zones => FieldCatalog::default()
            .field("name", "zone name")
            .field("status", "Online or Offline"),
        ResourceTab::Dataplanes => FieldCatalog::default()
            .field("name", "proxy name")
            .field("mesh", "owning mesh")
            .field("zone", "zone of origin")
            .field("service", "service the proxy fronts")
            .field("tag", "tag as key:value")
            .field("protocol", "service protocol")
            .field("status", "Online or Offline")
            .field("lastConnected", "time of last connection"),
        ResourceTab::Services => FieldCatalog::default()
            .field("name", "service name")
            .field("mesh", "owning mesh")
            .field("protocol", "service protocol")
            .field("status", "aggregate availability"),
        ResourceTab::Policies => FieldCatalog::default()
            .field("name", "policy name")
            .field("mesh", "owning mesh")
            .field("kind", "policy kind"),
    }
}

pub fn build_table(tab: ResourceTab, snapshot: &MeshSnapshot) -> TableData {
    let (headers, rows) = match tab {
        ResourceTab::Meshes => mesh_rows(snapshot),
        ResourceTab::Zones => zone_rows(snapshot),
        ResourceTab::Dataplanes => dataplane_rows(snapshot),
        ResourceTab::Services => service_rows(snapshot),
        ResourceTab::Policies => policy_rows(snapshot),
    };

    let mut table = TableData::default();
    table.set_rows(headers, rows, Local::now());
    table
}

fn mesh_rows(snapshot: &MeshSnapshot) -> (Vec<String>, Vec<RowData>) {
    let headers = to_headers(&["Name", "mTLS", "Dataplanes", "Services"]);
    let rows = snapshot
        .meshes
        .iter()
        .map(|mesh| {
            let proxies = snapshot
                .dataplanes
                .iter()
                .filter(|dataplane| dataplane.mesh == mesh.name)
                .count();
            let services = snapshot
                .dataplanes
                .iter()
                .filter(|dataplane| dataplane.mesh == mesh.name)
                .filter_map(DataplaneInfo::service)
                .collect::<BTreeSet<_>>()
                .len();
            let mtls = mesh.mtls_backend.clone().unwrap_or_else(|| "off".to_string());
            RowData {
                name: mesh.name.clone(),
                mesh: None,
                columns: vec![
                    mesh.name.clone(),
                    mtls.clone(),
                    proxies.to_string(),
                    services.to_string(),
                ],
                attributes: vec![
                    ("name".to_string(), mesh.name.clone()),
                    ("mtls".to_string(), mtls),
                ],
                detail: render_detail(mesh),
            }
        })
        .collect();
    (headers, rows)
}

fn zone_rows(snapshot: &MeshSnapshot) -> (Vec<String>, Vec<RowData>) {
    let headers = to_headers(&["Name", "Status", "Ingresses", "Egresses", "Version"]);
    let rows = snapshot
        .zones
        .iter()
        .map(|zone| RowData {
            name: zone.name.clone(),
            mesh: None,
            columns: vec![
                zone.name.clone(),
                zone.status.clone(),
                zone.ingresses.to_string(),
                zone.egresses.to_string(),
                zone.version.clone().unwrap_or_else(|| "-".to_string()),
            ],
            attributes: vec![
                ("name".to_string(), zone.name.clone()),
                ("status".to_string(), zone.status.clone()),
            ],
            detail: render_detail(zone),
        })
        .collect();
    (headers, rows)
}

fn dataplane_rows(snapshot: &MeshSnapshot) -> (Vec<String>, Vec<RowData>) {
    let headers = to_headers(&[
        "Name",
        "Mesh",
        "Zone",
        "Service",
        "Protocol",
        "Status",
        "Last Connected",
        "Version",
    ]);
    let rows = snapshot
        .dataplanes
        .iter()
        .map(|dataplane| {
            let zone = dataplane.zone().unwrap_or("-").to_string();
            let service = dataplane.service().unwrap_or("-").to_string();
            let protocol = dataplane.protocol().unwrap_or("-").to_string();
            let last_connected = dataplane
                .last_connected
                .clone()
                .unwrap_or_else(|| "-".to_string());

            let mut attributes = vec![
                ("name".to_string(), dataplane.name.clone()),
                ("mesh".to_string(), dataplane.mesh.clone()),
                ("zone".to_string(), zone.clone()),
                ("service".to_string(), service.clone()),
                ("protocol".to_string(), protocol.clone()),
                ("status".to_string(), dataplane.status.clone()),
                ("lastConnected".to_string(), last_connected.clone()),
            ];
            for (key, value) in &dataplane.tags {
                attributes.push(("tag".to_string(), format!("{key}:{value}")));
            }

            RowData {
                name: dataplane.name.clone(),
                mesh: Some(dataplane.mesh.clone()),
                columns: vec![
                    dataplane.name.clone(),
                    dataplane.mesh.clone(),
                    zone,
                    service,
                    protocol,
                    dataplane.status.clone(),
                    last_connected,
                    dataplane.version.clone().unwrap_or_else(|| "-".to_string()),
                ],
                attributes,
                detail: render_detail(dataplane),
            }
        })
        .collect();
    (headers, rows)
}

fn service_rows(snapshot: &MeshSnapshot) -> (Vec<String>, Vec<RowData>) {
    let headers = to_headers(&["Name", "Mesh", "Protocol", "Proxies", "Status"]);

    #[derive(Default)]
    struct ServiceStats {
        online: usize,
        total: usize,
        protocol: Option<String>,
    }

    let mut services: BTreeMap<(String, String), ServiceStats> = BTreeMap::new();
    for dataplane in &snapshot.dataplanes {
        let Some(service) = dataplane.service() else {
            continue;
        };
        let stats = services
            .entry((dataplane.mesh.clone(), service.to_string()))
            .or_default();
        stats.total += 1;
        if dataplane.online() {
            stats.online += 1;
        }
        if stats.protocol.is_none() {
            stats.protocol = dataplane.protocol().map(str::to_string);
        }
    }

    let rows = services
        .into_iter()
        .map(|((mesh, service), stats)| {
            let status = if stats.online == 0 {
                "Offline"
            } else if stats.online < stats.total {
                "Degraded"
            } else {
                "Online"
            };
            let protocol = stats.protocol.unwrap_or_else(|| "-".to_string());
            RowData {
                name: service.clone(),
                mesh: Some(mesh.clone()),
                columns: vec![
                    service.clone(),
                    mesh.clone(),
                    protocol.clone(),
                    format!("{}/{}", stats.online, stats.total),
                    status.to_string(),
                ],
                attributes: vec![
                    ("name".to_string(), service.clone()),
                    ("mesh".to_string(), mesh.clone()),
                    ("protocol".to_string(), protocol),
                    ("status".to_string(), status.to_string()),
                ],
                detail: format!(
                    "name: {service}\nmesh: {mesh}\nproxies online: {}/{}\nstatus: {status}\n",
                    stats.online, stats.total
                ),
            }
        })
        .collect();
    (headers, rows)
}

fn policy_rows(snapshot: &MeshSnapshot) -> (Vec<String>, Vec<RowData>) {
    let headers = to_headers(&["Name", "Mesh", "Kind"]);
    let rows = snapshot
        .policies
        .iter()
        .map(|policy| RowData {
            name: policy.name.clone(),
            mesh: Some(policy.mesh.clone()),
            columns: vec![policy.name.clone(), policy.mesh.clone(), policy.kind.clone()],
            attributes: vec![
                ("name".to_string(), policy.name.clone()),
                ("mesh".to_string(), policy.mesh.clone()),
                ("kind".to_string(), policy.kind.clone()),
            ],
            detail: render_detail(policy),
        })
        .collect();
    (headers, rows)
}

fn to_headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn render_detail<T: Serialize>(item: &T) -> String {
    serde_yaml::to_string(item).unwrap_or_default()
}

/// Loads the control-plane snapshot from disk and re-reads it when the file
/// changes; without a path, serves the built-in sample state.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    path: Option<PathBuf>,
    modified: Option<SystemTime>,
}

impl SnapshotSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            modified: None,
        }
    }

    pub fn label(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "sample data".to_string(),
        }
    }

    pub fn load(&mut self) -> Result<MeshSnapshot> {
        let Some(path) = self.path.clone() else {
            return sample_snapshot();
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        self.modified = fs::metadata(&path)
            .ok()
            .and_then(|meta| meta.modified().ok());
        decode_snapshot(&raw, is_json(&path))
            .with_context(|| format!("failed to parse snapshot {}", path.display()))
    }

    /// Returns a fresh snapshot when the backing file's mtime moved.
    pub fn reload_if_changed(&mut self) -> Result<Option<MeshSnapshot>> {
        let Some(path) = self.path.clone() else {
            return Ok(None);
        };

        let modified = fs::metadata(&path)
            .ok()
            .and_then(|meta| meta.modified().ok());
        if modified != self.modified {
            return self.load().map(Some);
        }
        Ok(None)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|extension| extension.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn decode_snapshot(raw: &str, json: bool) -> Result<MeshSnapshot> {
    if json {
        serde_json::from_str(raw).context("invalid JSON snapshot")
    } else {
        serde_yaml::from_str(raw).context("invalid YAML snapshot")
    }
}

pub fn sample_snapshot() -> Result<MeshSnapshot> {
    decode_snapshot(SAMPLE_SNAPSHOT, false).context("built-in sample snapshot is invalid")
}

const SAMPLE_SNAPSHOT: &str = r#"
meshes:
  - name: default
    mtls_backend: ca-1
  - name: payments
zones:
  - name: east
    status: Online
    version: 2.9.1
    ingresses: 2
    egresses: 1
  - name: west
    status: Online
    version: 2.9.1
    ingresses: 1
    egresses: 1
  - name: edge
    status: Offline
    version: 2.8.4
dataplanes:
  - name: backend-7df6
    mesh: default
    status: Online
    version: 2.9.1
    last_connected: "2026-02-11 09:14"
    tags:
      kuma.io/service: backend
      kuma.io/protocol: http
      kuma.io/zone: east
      version: v2
  - name: backend-a1c9
    mesh: default
    status: Offline
    version: 2.9.0
    last_connected: "2026-02-10 22:41"
    tags:
      kuma.io/service: backend
      kuma.io/protocol: http
      kuma.io/zone: west
      version: v1
  - name: frontend-0b32
    mesh: default
    status: Online
    version: 2.9.1
    last_connected: "2026-02-11 09:02"
    tags:
      kuma.io/service: frontend
      kuma.io/protocol: http
      kuma.io/zone: east
  - name: ledger-55e0
    mesh: payments
    status: Online
    version: 2.9.1
    last_connected: "2026-02-11 08:57"
    tags:
      kuma.io/service: ledger
      kuma.io/protocol: grpc
      kuma.io/zone: west
policies:
  - name: allow-all
    mesh: default
    kind: TrafficPermission
  - name: backend-timeout
    mesh: default
    kind: Timeout
  - name: ledger-mtls
    mesh: payments
    kind: TrafficPermission
"#;
