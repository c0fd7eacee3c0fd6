//! End-to-end tests of the command layer against a directory store

use clap::Parser;
use ipam::application::ApplicationError;
use ipam::cli::{execute_command, Cli, CliError};
use ipam::domain::DomainError;
use ipam::exitcode;
use ipam::infrastructure::traits::{FileStore, KeyValueStore};
use ipam::infrastructure::InfraError;
use ipam::util::testing;
use rstest::{fixture, rstest};
use tempfile::TempDir;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn run(&self, args: &[&str]) -> Result<(), CliError> {
        let store = self.dir.path().join("store");
        let mut argv = vec!["ipam", "--store", store.to_str().unwrap()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).expect("valid arguments");
        execute_command(&cli)
    }

    fn ok(&self, args: &[&str]) {
        if let Err(e) = self.run(args) {
            panic!("ipam {:?} failed: {}", args, e);
        }
    }
}

/// Store with schema Test = Region > City and domain Sedgman holding
/// Australia 10.0.0.0/12 > Brisbane 10.0.0.0/19
#[fixture]
fn workspace() -> Workspace {
    let ws = Workspace {
        dir: TempDir::new().unwrap(),
    };
    ws.ok(&["schema", "create", "Test", "Region", "City"]);
    ws.ok(&["domain", "new", "Sedgman", "--schema", "Test"]);
    ws.ok(&["node", "add", "Sedgman", "Region", "Australia", "-n", "10.0.0.0/12"]);
    ws.ok(&[
        "node", "add", "Sedgman", "City", "Brisbane", "-p", "Australia", "-n", "10.0.0.0/19",
    ]);
    ws
}

fn stored_version(ws: &Workspace) -> u64 {
    let store = FileStore::new(ws.dir.path().join("store"));
    let bytes = store.get("ipam:domain:Sedgman")
        .unwrap()
        .expect("domain stored");
    let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    doc["version"].as_u64().unwrap()
}

#[rstest]
fn given_workspace_when_querying_then_commands_succeed(workspace: Workspace) {
    assert_eq!(stored_version(&workspace), 3);
    workspace.ok(&["schema", "list"]);
    workspace.ok(&["schema", "get", "Test"]);
    workspace.ok(&["domain", "list"]);
    workspace.ok(&["domain", "show", "Sedgman"]);
    workspace.ok(&["domain", "tree", "Sedgman"]);
    workspace.ok(&["node", "find", "Sedgman", "City", "--name", "brisbane"]);
    workspace.ok(&["node", "search", "Sedgman", "10.0.1.0/24"]);
    workspace.ok(&["node", "available", "Sedgman", "Australia", "--prefix", "20"]);
    workspace.ok(&["node", "available", "Sedgman"]);
}

#[rstest]
fn given_duplicate_city_when_adding_then_data_error_and_version_kept(workspace: Workspace) {
    let err = workspace
        .run(&[
            "node", "add", "Sedgman", "City", "brisbane", "-p", "Australia", "-n", "10.14.0.0/16",
        ])
        .unwrap_err();

    assert!(matches!(
        err,
        CliError::Infra(InfraError::Application(ApplicationError::Domain(
            DomainError::DuplicateSibling { .. }
        )))
    ));
    assert_eq!(err.exit_code(), exitcode::DATAERR);
    assert_eq!(stored_version(&workspace), 3);
}

#[rstest]
fn given_unforced_remove_when_running_then_confirm_delete(workspace: Workspace) {
    let err = workspace.run(&["node", "rm", "Sedgman", "Australia"]).unwrap_err();
    assert!(err.to_string().contains("confirm"));

    workspace.ok(&["node", "rm", "Sedgman", "Australia", "--force"]);
    assert_eq!(stored_version(&workspace), 4);
    workspace.ok(&["node", "find", "Sedgman", "City"]);
    workspace.ok(&["node", "search", "Sedgman", "10.0.0.0/19"]);
    let err = workspace
        .run(&["node", "rm", "Sedgman", "Australia/Brisbane", "--force"])
        .unwrap_err();
    assert_eq!(err.exit_code(), exitcode::NOINPUT);
}

#[rstest]
fn given_rejected_set_when_running_then_rejected_error(workspace: Workspace) {
    let err = workspace
        .run(&["node", "set", "Sedgman", "Australia", "--network", "10.0.0.0/24"])
        .unwrap_err();

    assert!(matches!(err, CliError::Rejected(_)));
    assert_eq!(err.exit_code(), exitcode::DATAERR);
    assert_eq!(stored_version(&workspace), 3);

    workspace.ok(&[
        "node", "set", "Sedgman", "Australia/Brisbane", "--name", "Gold Coast", "--dry-run",
    ]);
    assert_eq!(stored_version(&workspace), 3);
    workspace.ok(&["node", "set", "Sedgman", "Australia/Brisbane", "--name", "Gold Coast"]);
    assert_eq!(stored_version(&workspace), 4);
    workspace.ok(&["node", "find", "Sedgman", "City", "--name", "gold coast"]);
}

#[rstest]
fn given_empty_patch_when_setting_then_usage_error(workspace: Workspace) {
    let err = workspace.run(&["node", "set", "Sedgman", "Australia"]).unwrap_err();
    assert_eq!(err.exit_code(), exitcode::USAGE);
}

#[rstest]
#[case::unknown_domain(&["domain", "tree", "Nowhere"], exitcode::NOINPUT)]
#[case::unknown_schema(&["domain", "new", "Other", "--schema", "Nope"], exitcode::NOINPUT)]
#[case::unknown_path(&["node", "available", "Sedgman", "Europe"], exitcode::NOINPUT)]
#[case::existing_domain(&["domain", "new", "Sedgman", "--schema", "Test"], exitcode::CANTCREAT)]
#[case::existing_schema(&["schema", "create", "Test"], exitcode::CANTCREAT)]
#[case::bad_levels(&["schema", "set", "Test", "Region", "region"], exitcode::DATAERR)]
#[case::bad_network(&["node", "search", "Sedgman", "10.0.0.1/8"], exitcode::DATAERR)]
#[case::bad_prefix(&["node", "available", "Sedgman", "--prefix", "40"], exitcode::DATAERR)]
#[case::slash_in_name(
    &["node", "add", "Sedgman", "City", "Gold/Coast", "-p", "Australia", "-n", "10.1.0.0/16"],
    exitcode::DATAERR
)]
#[case::root_rename(&["node", "set", "Sedgman", "", "--name", "Other"], exitcode::DATAERR)]
fn given_bad_request_when_running_then_mapped_exit_code(
    workspace: Workspace,
    #[case] args: &[&str],
    #[case] code: i32,
) {
    let err = workspace.run(args).unwrap_err();
    assert_eq!(err.exit_code(), code, "{}", err);
}

#[rstest]
fn given_exported_document_when_reimporting_then_restored_and_stale_copy_conflicts(
    workspace: Workspace,
) {
    let store = FileStore::new(workspace.dir.path().join("store"));
    let bytes = store.get("ipam:domain:Sedgman")
        .unwrap()
        .unwrap();
    let file = workspace.dir.path().join("sedgman.json");
    std::fs::write(&file, &bytes).unwrap();

    workspace.ok(&["domain", "delete", "Sedgman"]);
    workspace.ok(&["domain", "import", "Sedgman", file.to_str().unwrap()]);

    assert_eq!(stored_version(&workspace), 4);
    workspace.ok(&["node", "find", "Sedgman", "City", "--name", "Brisbane"]);
    let err = workspace
        .run(&["domain", "import", "Sedgman", file.to_str().unwrap()])
        .unwrap_err();
    assert_eq!(err.exit_code(), exitcode::TEMPFAIL);
}
