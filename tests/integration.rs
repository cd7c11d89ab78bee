//! End-to-end coverage of the six scenarios in the dependency-graph design notes:
//! cross-file imports/calls, same-file inheritance, constructor instantiation,
//! cyclic impact analysis, ranked symbol lookup, and export/import round-tripping.

use std::fs;

use depgraph_core::adapter::AdapterRegistry;
use depgraph_core::config::Config;
use depgraph_core::incremental::Workspace;
use depgraph_core::model::EdgeKind;
use depgraph_core::query;
use depgraph_core::serialize;
use depgraph_core::walker;

fn build(root: &std::path::Path) -> Workspace {
    let config = Config::load(root);
    let registry = AdapterRegistry::with_default_adapters();
    let files = walker::walk_project(root, &config, &registry, false).expect("walk");

    let parsed: Vec<_> = files
        .iter()
        .filter_map(|absolute| {
            let relative = absolute.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            registry.parse_file(root, absolute, &relative).ok()
        })
        .collect();

    Workspace::build(parsed)
}

#[test]
fn scenario_1_cross_file_import_and_call() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("a.ts"), "export function foo() {}\n").unwrap();
    fs::write(
        tmp.path().join("b.ts"),
        "import { foo } from './a';\nexport function bar() { foo(); }\n",
    )
    .unwrap();

    let workspace = build(tmp.path());
    let graph = workspace.graph();

    assert!(graph.contains("a.ts::foo"));
    assert!(graph.contains("b.ts::__file__"));

    let import_edge = graph
        .edges()
        .find(|e| e.source == "b.ts::__file__" && e.kind == EdgeKind::Imports)
        .expect("imports edge from b.ts file-scope node");
    assert_eq!(import_edge.target, "a.ts::__file__");

    let call_edge = graph
        .edges()
        .find(|e| e.target == "a.ts::foo" && e.kind == EdgeKind::Calls)
        .expect("calls edge into a.ts::foo");
    assert_eq!(call_edge.source, "b.ts::bar");

    let dependents = query::get_dependents(graph, "a.ts::foo");
    assert!(dependents.iter().any(|s| s.id == "b.ts::bar"));
}

#[test]
fn scenario_2_same_file_extends_edge() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("animals.ts"),
        "class Animal {}\nclass Dog extends Animal {}\n",
    )
    .unwrap();

    let workspace = build(tmp.path());
    let graph = workspace.graph();

    let extends: Vec<_> = graph.edges().filter(|e| e.kind == EdgeKind::Extends).collect();
    assert_eq!(extends.len(), 1);
    assert_eq!(extends[0].source, "animals.ts::Dog");
    assert_eq!(extends[0].target, "animals.ts::Animal");
}

#[test]
fn scenario_3_constructor_call_emits_instantiates() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir(tmp.path().join("services")).unwrap();
    fs::write(
        tmp.path().join("services/UserService.ts"),
        "export class UserService {}\n",
    )
    .unwrap();
    fs::write(
        tmp.path().join("main.ts"),
        "import { UserService } from './services/UserService';\nfunction main() { new UserService(); }\n",
    )
    .unwrap();

    let workspace = build(tmp.path());
    let graph = workspace.graph();

    let instantiates: Vec<_> = graph.edges().filter(|e| e.kind == EdgeKind::Instantiates).collect();
    assert_eq!(instantiates.len(), 1);
    assert_eq!(instantiates[0].target, "services/UserService.ts::UserService");
}

#[test]
fn scenario_4_impact_terminates_on_a_cycle() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("cycle.ts"),
        "function a() { b(); }\nfunction b() { a(); }\n",
    )
    .unwrap();

    let workspace = build(tmp.path());
    let graph = workspace.graph();

    let impact = query::get_impact(graph, "cycle.ts::a");
    let ids: Vec<_> = impact.transitive_dependents.iter().map(|s| s.id.as_str()).collect();
    assert!(ids.contains(&"cycle.ts::b"));
    assert!(ids.contains(&"cycle.ts::a"), "mutual recursion should report the root back via the cycle");
    assert!(!impact.transitive_dependents.is_empty());
}

#[test]
fn scenario_5_find_symbols_ranks_by_dependent_count() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("user_service.ts"),
        "export class UserService {}\n",
    )
    .unwrap();
    fs::write(tmp.path().join("other.ts"), "let UserService = 1;\n").unwrap();
    fs::write(
        tmp.path().join("caller_one.ts"),
        "import { UserService } from './user_service';\nfunction one() { new UserService(); }\n",
    )
    .unwrap();
    fs::write(
        tmp.path().join("caller_two.ts"),
        "import { UserService } from './user_service';\nfunction two() { new UserService(); }\n",
    )
    .unwrap();

    let workspace = build(tmp.path());
    let graph = workspace.graph();

    let hits = query::find_symbols(graph, "UserService");
    assert!(hits.len() >= 2);
    assert_eq!(hits[0].symbol.id, "user_service.ts::UserService");
    assert!(hits[0].dependent_count >= hits[1].dependent_count);
}

#[test]
fn scenario_6_export_import_round_trip_preserves_architecture_summary() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("a.ts"), "export function foo() {}\n").unwrap();
    fs::write(
        tmp.path().join("b.ts"),
        "import { foo } from './a';\nexport function bar() { foo(); }\n",
    )
    .unwrap();

    let workspace = build(tmp.path());
    let before = query::get_architecture_summary(workspace.graph());

    let doc = serialize::export(workspace.graph(), &tmp.path().to_string_lossy(), chrono::Utc::now());
    let json = serialize::to_json_string(&doc).unwrap();

    let reimported = serialize::import(&json).unwrap();
    let reimported_workspace = Workspace::build(reimported);
    let after = query::get_architecture_summary(reimported_workspace.graph());

    assert_eq!(before.file_count, after.file_count);
    assert_eq!(before.symbol_count, after.symbol_count);
    assert_eq!(before.edge_count, after.edge_count);
    assert_eq!(workspace.graph().node_count(), reimported_workspace.graph().node_count());
    assert_eq!(workspace.graph().edge_count(), reimported_workspace.graph().edge_count());
}

#[test]
fn python_call_to_a_cross_file_class_is_classified_as_instantiates() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("services.py"), "class UserService:\n    pass\n").unwrap();
    fs::write(
        tmp.path().join("main.py"),
        "from services import UserService\n\ndef make():\n    UserService()\n",
    )
    .unwrap();

    let workspace = build(tmp.path());
    let graph = workspace.graph();

    let instantiates: Vec<_> = graph.edges().filter(|e| e.kind == EdgeKind::Instantiates).collect();
    assert_eq!(instantiates.len(), 1);
    assert_eq!(instantiates[0].target, "services.py::UserService");
    assert_eq!(instantiates[0].source, "main.py::make");
}

#[test]
fn method_call_on_unresolved_receiver_reaches_the_right_scoped_method_across_two_classes() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("animals.ts"),
        "class Dog { bark() {} }\nclass Seal { bark() {} }\nfunction use(x) { x.bark(); }\n",
    )
    .unwrap();

    let workspace = build(tmp.path());
    let graph = workspace.graph();

    let targets: Vec<_> = graph
        .edges()
        .filter(|e| e.kind == EdgeKind::Calls)
        .map(|e| e.target.as_str())
        .collect();
    assert_eq!(targets.len(), 2);
    assert!(targets.contains(&"animals.ts::Dog.bark"));
    assert!(targets.contains(&"animals.ts::Seal.bark"));
}

#[test]
fn watching_a_project_reflects_file_deletion() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("a.ts"), "export function foo() {}\n").unwrap();

    let mut workspace = build(tmp.path());
    assert!(workspace.graph().contains("a.ts::foo"));

    workspace.update_file("a.ts", None);
    assert!(!workspace.graph().contains("a.ts::foo"));
    assert_eq!(workspace.file_count(), 0);
}
