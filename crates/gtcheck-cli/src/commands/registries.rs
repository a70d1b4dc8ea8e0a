use crate::support::{layout_or_exit, load_registries_or_exit, print_json_or_exit};
use gtcheck_registry::LoadFailure;
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BackendRow {
    service: String,
    user_count: usize,
    collections: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRow {
    service: String,
    method_count: usize,
    methods: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureRow {
    path: String,
    reason: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistriesPayload {
    schema: u32,
    base_dir: String,
    backends: Vec<BackendRow>,
    api_surfaces: Vec<ApiRow>,
    failures: Vec<FailureRow>,
}

fn failure_rows<'a>(failures: impl Iterator<Item = &'a LoadFailure>) -> Vec<FailureRow> {
    failures
        .map(|failure| FailureRow {
            path: failure.path.display().to_string(),
            reason: failure.reason.clone(),
        })
        .collect()
}

pub fn run(base_dir: String, json_output: bool) {
    let layout = layout_or_exit(&base_dir);
    let registries = load_registries_or_exit(&layout);

    let backends: Vec<BackendRow> = registries
        .backends
        .snapshots()
        .map(|snapshot| BackendRow {
            service: snapshot.service().to_string(),
            user_count: snapshot.users().len(),
            collections: snapshot.collection_names().map(str::to_string).collect(),
        })
        .collect();
    let api_surfaces: Vec<ApiRow> = registries
        .apis
        .services()
        .map(|service| {
            let methods: Vec<String> = registries
                .apis
                .methods(service)
                .map(|methods| methods.iter().cloned().collect())
                .unwrap_or_default();
            ApiRow {
                service: service.to_string(),
                method_count: methods.len(),
                methods,
            }
        })
        .collect();
    let failures = failure_rows(
        registries
            .backends
            .failures()
            .iter()
            .chain(registries.apis.failures()),
    );

    if json_output {
        let payload = RegistriesPayload {
            schema: 1,
            base_dir,
            backends,
            api_surfaces,
            failures,
        };
        print_json_or_exit(&payload, "registries");
        return;
    }

    println!("gtcheck registries");
    println!("  Base dir: {base_dir}");
    println!("  Backends ({}):", backends.len());
    for row in &backends {
        println!(
            "    - {} users={} collections=[{}]",
            row.service,
            row.user_count,
            row.collections.join(", ")
        );
    }
    println!("  API surfaces ({}):", api_surfaces.len());
    for row in &api_surfaces {
        println!("    - {} methods={}", row.service, row.method_count);
    }
    if !failures.is_empty() {
        println!("  Load failures ({}):", failures.len());
        for row in &failures {
            println!("    - {}: {}", row.path, row.reason);
        }
    }
}
